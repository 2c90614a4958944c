pub mod args;
mod convert;
mod extract;
mod extract_folder;
mod utils;
