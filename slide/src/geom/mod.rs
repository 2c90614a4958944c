pub mod color;
pub mod roi;

pub use color::{is_blue, Argb, BLUE_THRESHOLD};
pub use roi::{Region, Roi};
