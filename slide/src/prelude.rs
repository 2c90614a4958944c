pub use super::batch::{RoiBatch, RoiJob};
pub use super::convert::{check_level, ConvertConfig, MAX_LEVEL, MIN_LEVEL};
pub use super::pairing::pair_folder;
pub use super::reader::TiffOpener;
pub use super::report::BatchSummary;
