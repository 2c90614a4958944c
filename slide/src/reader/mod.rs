//! 全切片图像的读取接口。
//!
//! 这里不实现金字塔编解码，后端只包装现成的解码器，对外提供各层尺寸与RGB区域读取。

mod tiff_slide;

pub use self::tiff_slide::{TiffOpener, TiffSlide};

use crate::error::SlideError;
use image::RgbImage;
use std::path::Path;

/// 已打开的切片，至少有一层，第0层为原始分辨率。
pub trait SlideReader {
    fn level_count(&self) -> usize;

    /// 第`level`层的`(width, height)`；该层不存在时返回`None`。
    fn level_dimensions(&self, level: usize) -> Option<(u32, u32)>;

    /// 读取左上角为`(x, y)`、大小为`width * height`的区域，坐标均位于第`level`层。
    /// 越界检查由调用方负责。
    fn read_level_region(
        &mut self,
        level: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<RgbImage, SlideError>;

    /// 第0层尺寸与第`level`层尺寸之比，按轴分别计算。
    fn level_downsample(&self, level: usize) -> Option<(f64, f64)> {
        let (w0, h0) = self.level_dimensions(0)?;
        let (w, h) = self.level_dimensions(level)?;
        if w == 0 || h == 0 {
            return None;
        }
        Some((w0 as f64 / w as f64, h0 as f64 / h as f64))
    }
}

/// 按路径打开切片。会在多个工作线程间共享。
pub trait SlideOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn SlideReader>, SlideError>;
}
