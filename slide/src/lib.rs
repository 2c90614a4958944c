//! 全切片图像（whole-slide image）的格式转换与标注区域裁剪。

pub mod annotation;
pub mod batch;
pub mod convert;
pub mod error;
pub mod extract;
pub mod geom;
pub mod output;
pub mod pairing;
pub mod pool;
pub mod prelude;
pub mod reader;
pub mod report;
pub mod runtime;
