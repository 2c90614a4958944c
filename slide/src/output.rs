//! 将裁剪结果写出为PNG平面图像与多分辨率TIFF（`.svs`）。

use crate::error::SlideError;
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tiff::encoder::{colortype, TiffEncoder};

/// 金字塔中每一层较短边的下限；再缩小一半就低于该值时停止。
pub const PYRAMID_MIN_SIDE: u32 = 256;

/// 第`idx`个（从1开始）ROI的输出文件名主干。
#[inline]
pub fn roi_file_stem(base_name: &str, idx: usize) -> String {
    format!("{base_name}-roi{idx}")
}

pub fn write_png<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<(), SlideError> {
    let path = path.as_ref();
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| SlideError::image(path, e))
}

/// 写出无压缩的多页TIFF：第一页为原图，之后每页缩小一半。
pub fn write_pyramid<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<(), SlideError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| SlideError::io(path, e))?;
    let mut encoder =
        TiffEncoder::new(BufWriter::new(file)).map_err(|e| SlideError::tiff(path, e))?;

    encoder
        .write_image::<colortype::RGB8>(image.width(), image.height(), image.as_raw())
        .map_err(|e| SlideError::tiff(path, e))?;
    let mut level = 0;
    let (mut w, mut h) = image.dimensions();
    while w.min(h) / 2 >= PYRAMID_MIN_SIDE {
        (w, h) = (w / 2, h / 2);
        level += 1;
        let reduced = imageops::resize(image, w, h, FilterType::Triangle);
        encoder
            .write_image::<colortype::RGB8>(w, h, reduced.as_raw())
            .map_err(|e| SlideError::tiff(path, e))?;
    }
    log::debug!("wrote `{}` with {} level(s)", path.display(), level + 1);
    Ok(())
}

/// 在`png_dir`与`svs_dir`下各写出一份同名结果。
pub fn save_region(
    image: &RgbImage,
    png_dir: &Path,
    svs_dir: &Path,
    stem: &str,
) -> Result<(), SlideError> {
    let png_path = png_dir.join(format!("{stem}.png"));
    write_png(image, png_path.as_path())?;
    log::info!("saved image as `{}`", png_path.display());

    let svs_path = svs_dir.join(format!("{stem}.svs"));
    write_pyramid(image, svs_path.as_path())?;
    log::info!("saved image as `{}`", svs_path.display());
    Ok(())
}
