pub mod convert;
pub mod download;
pub mod types;
pub mod upload;

pub use types::*;

pub use convert::{__path_convert_all, convert_all};
pub use download::{__path_download_file, download_file};
pub use upload::{__path_upload_file, upload_file};
