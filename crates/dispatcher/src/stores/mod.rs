//! Activity summary stores

pub mod json_file;
pub mod log;

pub use json_file::JsonFileStore;
pub use log::LogStore;
