use crate::gallery::naming;
use std::path::PathBuf;

/// Where photos and thumbnails live on disk and under which URL prefix the
/// transport layer serves them.
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryLayout {
    pub photos_dir: PathBuf,
    pub thumbnails_dir: PathBuf,
    pub url_prefix: String,
}

impl GalleryLayout {
    pub fn new(photos_dir: impl Into<PathBuf>, url_prefix: &str) -> Self {
        let photos_dir = photos_dir.into();
        GalleryLayout {
            thumbnails_dir: photos_dir.join("thumbnails"),
            photos_dir,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn create_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.photos_dir)?;
        std::fs::create_dir_all(&self.thumbnails_dir)?;
        Ok(())
    }

    pub fn photo_path(&self, filename: &str) -> PathBuf {
        self.photos_dir.join(filename)
    }

    pub fn thumbnail_path(&self, photo_filename: &str) -> PathBuf {
        self.thumbnails_dir
            .join(naming::thumbnail_name(photo_filename))
    }

    pub fn photo_url(&self, filename: &str) -> String {
        format!("{}/{}", self.url_prefix, filename)
    }

    pub fn thumbnail_url(&self, photo_filename: &str) -> String {
        format!(
            "{}/thumbnails/{}",
            self.url_prefix,
            naming::thumbnail_name(photo_filename)
        )
    }
}
