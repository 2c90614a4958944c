use super::{SlideOpener, SlideReader};
use crate::error::SlideError;
use image::{Rgb, RgbImage};
use std::cmp::{max, min};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tiff::decoder::{ChunkType, Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::ColorType;

/// `Compression`标签中的JPEG（新式）取值。
const COMPRESSION_JPEG: u16 = 7;

/// 可以转换为RGB像素的采样布局。
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Layout {
    Gray,
    GrayAlpha,
    Rgb,
    Rgba,
}

impl Layout {
    /// JPEG压缩的YCbCr分块在解码时已转换为RGB；未压缩的YCbCr不支持。
    fn from_color_type(color: &ColorType, jpeg: bool) -> Option<Self> {
        match color {
            ColorType::Gray(8) => Some(Layout::Gray),
            ColorType::GrayA(8) => Some(Layout::GrayAlpha),
            ColorType::RGB(8) => Some(Layout::Rgb),
            ColorType::YCbCr(8) if jpeg => Some(Layout::Rgb),
            ColorType::RGBA(8) => Some(Layout::Rgba),
            _ => None,
        }
    }

    #[inline]
    fn samples(self) -> usize {
        match self {
            Layout::Gray => 1,
            Layout::GrayAlpha => 2,
            Layout::Rgb => 3,
            Layout::Rgba => 4,
        }
    }

    // 直接丢弃alpha通道，不做合成。
    #[inline]
    fn to_rgb(self, px: &[u8]) -> Rgb<u8> {
        match self {
            Layout::Gray | Layout::GrayAlpha => Rgb([px[0], px[0], px[0]]),
            Layout::Rgb | Layout::Rgba => Rgb([px[0], px[1], px[2]]),
        }
    }
}

/// 一个分辨率层，即TIFF中的一个IFD。
#[derive(Copy, Clone, Debug)]
struct Level {
    ifd: usize,
    width: u32,
    height: u32,
    tiled: bool,
}

/// 以（金字塔）TIFF存储的切片，例如Aperio SVS。
///
/// 文件中有分块IFD时只把分块IFD当作层，从而跳过SVS中按条带存储的缩略图、标签与宏观图；
/// 否则每个IFD都是一层。各层按宽度从大到小排列。
pub struct TiffSlide {
    path: PathBuf,
    decoder: Decoder<BufReader<File>>,
    levels: Vec<Level>,
    current_ifd: usize,
}

impl TiffSlide {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SlideError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(path.as_path()).map_err(|e| SlideError::io(path.as_path(), e))?;
        let mut decoder =
            Decoder::new(BufReader::new(file)).map_err(|e| SlideError::tiff(path.as_path(), e))?;
        let (levels, current_ifd) =
            scan_levels(&mut decoder).map_err(|e| SlideError::tiff(path.as_path(), e))?;
        log::debug!(
            "opened `{}` with {} level(s): {:?}",
            path.display(),
            levels.len(),
            levels.iter().map(|l| (l.width, l.height)).collect::<Vec<_>>()
        );
        Ok(Self {
            path,
            decoder,
            levels,
            current_ifd,
        })
    }

    fn seek(&mut self, ifd: usize) -> Result<(), SlideError> {
        if self.current_ifd != ifd {
            self.decoder
                .seek_to_image(ifd)
                .map_err(|e| SlideError::tiff(self.path.as_path(), e))?;
            self.current_ifd = ifd;
        }
        Ok(())
    }

    fn layout(&mut self) -> Result<Layout, SlideError> {
        let color = self
            .decoder
            .colortype()
            .map_err(|e| SlideError::tiff(self.path.as_path(), e))?;
        let compression = self
            .decoder
            .find_tag_unsigned::<u16>(Tag::Compression)
            .map_err(|e| SlideError::tiff(self.path.as_path(), e))?;
        let jpeg = compression == Some(COMPRESSION_JPEG);
        Layout::from_color_type(&color, jpeg).ok_or_else(|| SlideError::UnsupportedLayout {
            path: self.path.clone(),
            layout: format!("{color:?}"),
        })
    }

    fn unsupported(&self, layout: impl Into<String>) -> SlideError {
        SlideError::UnsupportedLayout {
            path: self.path.clone(),
            layout: layout.into(),
        }
    }
}

fn scan_levels(decoder: &mut Decoder<BufReader<File>>) -> tiff::TiffResult<(Vec<Level>, usize)> {
    let mut pages = Vec::new();
    let mut ifd = 0;
    loop {
        let (width, height) = decoder.dimensions()?;
        let tiled = matches!(decoder.get_chunk_type(), ChunkType::Tile);
        pages.push(Level {
            ifd,
            width,
            height,
            tiled,
        });
        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
        ifd += 1;
    }

    let mut levels: Vec<Level> = if pages.iter().any(|p| p.tiled) {
        pages.into_iter().filter(|p| p.tiled).collect()
    } else {
        pages
    };
    levels.sort_by(|a, b| b.width.cmp(&a.width));
    levels.dedup_by_key(|l| l.width);
    Ok((levels, ifd))
}

impl SlideReader for TiffSlide {
    #[inline]
    fn level_count(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    fn level_dimensions(&self, level: usize) -> Option<(u32, u32)> {
        self.levels.get(level).map(|l| (l.width, l.height))
    }

    fn read_level_region(
        &mut self,
        level: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<RgbImage, SlideError> {
        let lv = *self.levels.get(level).ok_or(SlideError::UnsupportedLevel {
            level,
            count: self.levels.len(),
        })?;
        let (x_end, y_end) = (x as u64 + width as u64, y as u64 + height as u64);
        if x_end > lv.width as u64 || y_end > lv.height as u64 {
            return Err(self.unsupported(format!(
                "region ({x}, {y}) {width}x{height} outside level {level}"
            )));
        }
        self.seek(lv.ifd)?;
        let layout = self.layout()?;
        let samples = layout.samples();

        // 条带视为与整层同宽的分块。
        let (chunk_w, chunk_h) = self.decoder.chunk_dimensions();
        if chunk_w == 0 || chunk_h == 0 {
            return Err(self.unsupported("zero sized chunks"));
        }
        let across = lv.width.div_ceil(chunk_w);
        let (x_end, y_end) = (x + width, y + height);

        let mut out = RgbImage::new(width, height);
        if width == 0 || height == 0 {
            return Ok(out);
        }
        for cy in (y / chunk_h)..=((y_end - 1) / chunk_h) {
            for cx in (x / chunk_w)..=((x_end - 1) / chunk_w) {
                let index = cy * across + cx;
                let (data_w, data_h) = self.decoder.chunk_data_dimensions(index);
                let data = match self
                    .decoder
                    .read_chunk(index)
                    .map_err(|e| SlideError::tiff(self.path.as_path(), e))?
                {
                    DecodingResult::U8(data) => data,
                    _ => return Err(self.unsupported("non 8-bit samples")),
                };
                // 边缘分块可能按有效区域裁剪，也可能保留整块大小。
                let full = chunk_w as usize * chunk_h as usize * samples;
                let row_samples = if data.len() >= full {
                    chunk_w as usize * samples
                } else {
                    data_w as usize * samples
                };
                let (ox, oy) = (cx * chunk_w, cy * chunk_h);
                let (x0, x1) = (max(x, ox), min(x_end, ox + data_w));
                let (y0, y1) = (max(y, oy), min(y_end, oy + data_h));
                for py in y0..y1 {
                    let row = (py - oy) as usize * row_samples;
                    for px in x0..x1 {
                        let at = row + (px - ox) as usize * samples;
                        let sample = data
                            .get(at..at + samples)
                            .ok_or_else(|| self.unsupported("truncated chunk"))?;
                        out.put_pixel(px - x, py - y, layout.to_rgb(sample));
                    }
                }
            }
        }
        Ok(out)
    }
}

/// 把所有路径都当作[`TiffSlide`]打开。
#[derive(Copy, Clone, Debug, Default)]
pub struct TiffOpener;

impl SlideOpener for TiffOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn SlideReader>, SlideError> {
        Ok(Box::new(TiffSlide::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::{Layout, TiffSlide};
    use crate::error::SlideError;
    use crate::output::write_pyramid;
    use crate::reader::SlideReader;
    use image::codecs::jpeg::JpegEncoder;
    use image::{ColorType, ImageFormat, Rgb, RgbImage};
    use std::path::Path;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    /// 手工写出单层、8位三通道的分块TIFF，`tiles`按行优先排列且至少两块。
    fn write_tiled(
        path: &Path,
        (width, height): (u32, u32),
        tile: u32,
        (compression, photometric): (u16, u16),
        tiles: &[Vec<u8>],
    ) {
        let mut buf = b"II*\0\0\0\0\0".to_vec();
        let mut offsets = Vec::new();
        for t in tiles {
            offsets.push(buf.len() as u32);
            buf.extend_from_slice(t);
            if buf.len() % 2 == 1 {
                buf.push(0);
            }
        }
        let bits_at = buf.len() as u32;
        for _ in 0..3 {
            buf.extend_from_slice(&8u16.to_le_bytes());
        }
        let offsets_at = buf.len() as u32;
        for o in offsets.iter() {
            buf.extend_from_slice(&o.to_le_bytes());
        }
        let counts_at = buf.len() as u32;
        for t in tiles {
            buf.extend_from_slice(&(t.len() as u32).to_le_bytes());
        }

        // (tag, type, count, value)，type 3为SHORT，4为LONG。
        let n = tiles.len() as u32;
        let entries: [(u16, u16, u32, u32); 11] = [
            (256, 4, 1, width),
            (257, 4, 1, height),
            (258, 3, 3, bits_at),
            (259, 3, 1, compression as u32),
            (262, 3, 1, photometric as u32),
            (277, 3, 1, 3),
            (284, 3, 1, 1),
            (322, 4, 1, tile),
            (323, 4, 1, tile),
            (324, 4, n, offsets_at),
            (325, 4, n, counts_at),
        ];
        let ifd_at = buf.len() as u32;
        buf[4..8].copy_from_slice(&ifd_at.to_le_bytes());
        buf.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (tag, kind, count, value) in entries {
            buf.extend_from_slice(&tag.to_le_bytes());
            buf.extend_from_slice(&kind.to_le_bytes());
            buf.extend_from_slice(&count.to_le_bytes());
            buf.extend_from_slice(&value.to_le_bytes());
        }
        buf.extend_from_slice(&0u32.to_le_bytes());
        std::fs::write(path, buf).unwrap();
    }

    /// 按整块大小切分图像，超出图像的部分补0。
    fn raw_tiles(img: &RgbImage, tile: u32) -> Vec<Vec<u8>> {
        let (w, h) = img.dimensions();
        let mut tiles = Vec::new();
        for ty in 0..h.div_ceil(tile) {
            for tx in 0..w.div_ceil(tile) {
                let mut data = Vec::with_capacity((tile * tile * 3) as usize);
                for y in ty * tile..(ty + 1) * tile {
                    for x in tx * tile..(tx + 1) * tile {
                        if x < w && y < h {
                            data.extend_from_slice(&img.get_pixel(x, y).0);
                        } else {
                            data.extend_from_slice(&[0, 0, 0]);
                        }
                    }
                }
                tiles.push(data);
            }
        }
        tiles
    }

    fn close(a: &Rgb<u8>, b: [u8; 3]) -> bool {
        a.0.iter().zip(b).all(|(&p, q)| p.abs_diff(q) <= 6)
    }

    #[test]
    fn test_flat_tiff_region() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.svs");
        gradient(97, 61)
            .save_with_format(&path, ImageFormat::Tiff)
            .unwrap();

        let mut slide = TiffSlide::open(&path).unwrap();
        assert_eq!(slide.level_count(), 1);
        assert_eq!(slide.level_dimensions(0), Some((97, 61)));
        assert_eq!(slide.level_dimensions(1), None);

        let region = slide.read_level_region(0, 10, 20, 30, 40).unwrap();
        assert_eq!(region.dimensions(), (30, 40));
        assert_eq!(*region.get_pixel(0, 0), Rgb([10, 20, 30]));
        assert_eq!(*region.get_pixel(29, 39), Rgb([39, 59, 98]));
    }

    #[test]
    fn test_tiled_region_across_edge_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiled.svs");
        // 3x2块，右侧与下方的块只有8个有效像素。
        let img = gradient(40, 24);
        write_tiled(&path, (40, 24), 16, (1, 2), &raw_tiles(&img, 16));

        let mut slide = TiffSlide::open(&path).unwrap();
        assert_eq!(slide.level_dimensions(0), Some((40, 24)));
        let region = slide.read_level_region(0, 10, 5, 30, 19).unwrap();
        assert_eq!(region.dimensions(), (30, 19));
        for (x, y) in [(0, 0), (5, 10), (6, 11), (21, 10), (22, 11), (29, 18)] {
            assert_eq!(region.get_pixel(x, y), img.get_pixel(x + 10, y + 5), "({x}, {y})");
        }
        let whole = slide.read_level_region(0, 0, 0, 40, 24).unwrap();
        assert_eq!(whole, img);
    }

    #[test]
    fn test_jpeg_ycbcr_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jpeg.svs");
        let colors = [[200, 30, 40], [20, 180, 60], [30, 40, 220], [128, 128, 128]];
        let tiles: Vec<Vec<u8>> = colors
            .iter()
            .map(|&c| {
                let tile = RgbImage::from_pixel(16, 16, Rgb(c));
                let mut bytes = Vec::new();
                JpegEncoder::new_with_quality(&mut bytes, 100)
                    .encode(tile.as_raw(), 16, 16, ColorType::Rgb8)
                    .unwrap();
                bytes
            })
            .collect();
        write_tiled(&path, (32, 32), 16, (7, 6), &tiles);

        let mut slide = TiffSlide::open(&path).unwrap();
        let region = slide.read_level_region(0, 0, 0, 32, 32).unwrap();
        assert!(close(region.get_pixel(5, 5), colors[0]));
        assert!(close(region.get_pixel(20, 5), colors[1]));
        assert!(close(region.get_pixel(5, 20), colors[2]));
        assert!(close(region.get_pixel(25, 25), colors[3]));
    }

    #[test]
    fn test_ycbcr_needs_jpeg() {
        use tiff::ColorType as TiffColor;
        assert_eq!(
            Layout::from_color_type(&TiffColor::YCbCr(8), true),
            Some(Layout::Rgb)
        );
        assert_eq!(Layout::from_color_type(&TiffColor::YCbCr(8), false), None);
        assert_eq!(Layout::from_color_type(&TiffColor::RGB(16), false), None);
    }

    #[test]
    fn test_pyramid_levels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pyramid.svs");
        write_pyramid(&gradient(600, 520), &path).unwrap();

        let mut slide = TiffSlide::open(&path).unwrap();
        assert_eq!(slide.level_count(), 2);
        assert_eq!(slide.level_dimensions(1), Some((300, 260)));
        assert_eq!(slide.level_downsample(1), Some((2.0, 2.0)));
        // 在两层之间来回切换。
        let top = slide.read_level_region(1, 0, 0, 300, 260).unwrap();
        assert_eq!(top.dimensions(), (300, 260));
        let base = slide.read_level_region(0, 599, 519, 1, 1).unwrap();
        assert_eq!(
            *base.get_pixel(0, 0),
            Rgb([(599 % 256) as u8, (519 % 256) as u8, ((599 + 519) % 256) as u8])
        );
    }

    #[test]
    fn test_open_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            TiffSlide::open(dir.path().join("missing.svs")),
            Err(SlideError::Io { .. })
        ));
        let junk = dir.path().join("junk.svs");
        std::fs::write(&junk, b"definitely not a tiff").unwrap();
        assert!(matches!(TiffSlide::open(&junk), Err(SlideError::Tiff { .. })));
    }

    #[test]
    fn test_region_outside_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.svs");
        gradient(16, 16)
            .save_with_format(&path, ImageFormat::Tiff)
            .unwrap();
        let mut slide = TiffSlide::open(&path).unwrap();
        assert!(slide.read_level_region(0, 10, 10, 7, 1).is_err());
        assert!(matches!(
            slide.read_level_region(3, 0, 0, 1, 1),
            Err(SlideError::UnsupportedLevel { level: 3, count: 1 })
        ));
    }
}
