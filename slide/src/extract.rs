use crate::error::SlideError;
use crate::geom::Roi;
use crate::reader::SlideReader;
use image::RgbImage;

/// 从切片的第`level`层读取ROI对应的RGB图像。
///
/// ROI的起点位于第0层坐标系中，按该层的缩放倍数换算；宽高则是该层上的像素数。
/// 返回的图像恰好为`roi.width * roi.height`。空ROI、越界以及不存在的层都会返回错误，
/// 而不是填充空白像素。
pub fn extract_region(
    slide: &mut dyn SlideReader,
    roi: &Roi,
    level: usize,
) -> Result<RgbImage, SlideError> {
    if roi.is_empty() {
        return Err(SlideError::EmptyRegion { roi: *roi });
    }
    let (level_w, level_h) = slide
        .level_dimensions(level)
        .ok_or_else(|| SlideError::UnsupportedLevel {
            level,
            count: slide.level_count(),
        })?;
    let (ds_x, ds_y) = slide
        .level_downsample(level)
        .ok_or_else(|| SlideError::UnsupportedLevel {
            level,
            count: slide.level_count(),
        })?;
    let out_of_bounds = || SlideError::OutOfBounds {
        roi: *roi,
        level,
        width: level_w,
        height: level_h,
    };

    if roi.x < 0 || roi.y < 0 {
        return Err(out_of_bounds());
    }
    let x = (roi.x as f64 / ds_x).floor() as u64;
    let y = (roi.y as f64 / ds_y).floor() as u64;
    if x + roi.width > level_w as u64 || y + roi.height > level_h as u64 {
        return Err(out_of_bounds());
    }

    // 以上检查保证了所有值都不超过该层的u32尺寸。
    slide.read_level_region(
        level,
        x as u32,
        y as u32,
        roi.width as u32,
        roi.height as u32,
    )
}
