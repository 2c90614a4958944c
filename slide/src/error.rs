use crate::geom::Roi;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 读取标注、读取切片与写出结果时可能出现的错误。
#[derive(Debug, Error)]
pub enum SlideError {
    #[error("cannot access `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("`{path}` is not valid JSON")]
    AnnotationSyntax {
        path: PathBuf,
        #[source]
        source: json::Error,
    },
    #[error("annotation #{index} in `{path}`: {reason}")]
    AnnotationSchema {
        path: PathBuf,
        index: usize,
        reason: String,
    },
    #[error("cannot decode slide `{path}`")]
    Tiff {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },
    #[error("cannot write `{path}`")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("slide `{path}` has an unsupported pixel layout: {layout}")]
    UnsupportedLayout { path: PathBuf, layout: String },
    #[error("level {level} is not available, the slide has {count} level(s)")]
    UnsupportedLevel { level: usize, count: usize },
    #[error("{roi} is empty")]
    EmptyRegion { roi: Roi },
    #[error("{roi} exceeds level {level} bounds ({width}x{height})")]
    OutOfBounds {
        roi: Roi,
        level: usize,
        width: u32,
        height: u32,
    },
    #[error("library search directory `{0}` does not exist")]
    MissingSearchDir(PathBuf),
    #[error("runtime has already been initialized")]
    AlreadyInitialized,
}

impl SlideError {
    #[inline]
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SlideError::Io {
            path: path.into(),
            source,
        }
    }

    #[inline]
    pub(crate) fn tiff(path: impl Into<PathBuf>, source: tiff::TiffError) -> Self {
        SlideError::Tiff {
            path: path.into(),
            source,
        }
    }

    #[inline]
    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        SlideError::Image {
            path: path.into(),
            source,
        }
    }
}

/// 转换任务开始前的配置错误。
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("conversion level must be in range [{min}, {max}], but got {level}")]
    LevelOutOfRange { level: u8, min: u8, max: u8 },
    #[error("could not find converter executable `{0}`")]
    MissingExecutable(PathBuf),
    #[error("could not get into source directory `{0}`")]
    MissingSourceDir(PathBuf),
    #[error("cannot create output directory `{path}`")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot list source directory")]
    Listing(#[from] walkdir::Error),
}
