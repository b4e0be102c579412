pub mod exif;
pub mod format;
pub mod heic;
pub mod pipeline;
pub mod thumbnails;
