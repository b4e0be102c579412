use crate::gallery::layout::GalleryLayout;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Overrides the default `~/.photo-gallery` home.
pub const HOME_ENV_VAR: &str = "PHOTO_GALLERY_HOME";

fn default_url_prefix() -> String {
    "/uploads".to_string()
}

fn default_max_upload_bytes() -> u64 {
    100 * 1024 * 1024
}

fn default_max_files_per_upload() -> usize {
    50
}

fn default_max_image_alloc_bytes() -> u64 {
    512 * 1024 * 1024
}

/// Gallery config stored in <home>/config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Defaults to <home>/uploads when unset.
    #[serde(default)]
    pub photos_dir: Option<PathBuf>,
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    #[serde(default = "default_max_files_per_upload")]
    pub max_files_per_upload: usize,
    /// Upper bound on the memory one image decode may allocate.
    #[serde(default = "default_max_image_alloc_bytes")]
    pub max_image_alloc_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            photos_dir: None,
            url_prefix: default_url_prefix(),
            max_upload_bytes: default_max_upload_bytes(),
            max_files_per_upload: default_max_files_per_upload(),
            max_image_alloc_bytes: default_max_image_alloc_bytes(),
        }
    }
}

impl Config {
    pub fn layout(&self, home: &Path) -> GalleryLayout {
        let photos_dir = self
            .photos_dir
            .clone()
            .unwrap_or_else(|| home.join("uploads"));
        GalleryLayout::new(photos_dir, &self.url_prefix)
    }
}

pub fn gallery_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(HOME_ENV_VAR).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("cannot determine the user's home directory")?;
    Ok(home.join(".photo-gallery"))
}

/// Staging area for uploads that have not entered the pipeline yet.
pub fn incoming_dir(home: &Path) -> PathBuf {
    home.join("tmp")
}

pub fn create_gallery_dirs(home: &Path, layout: &GalleryLayout) -> Result<()> {
    layout
        .create_dirs()
        .with_context(|| format!("creating photo directories under {:?}", layout.photos_dir))?;
    std::fs::create_dir_all(home.join("logs"))?;
    std::fs::create_dir_all(incoming_dir(home))?;
    Ok(())
}

pub fn read_config(home: &Path) -> Result<Config> {
    let path = home.join("config.json");
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {:?}", path))?;
    Ok(serde_json::from_str(&text).unwrap_or_else(|e| {
        tracing::warn!("config: malformed {:?}, using defaults: {}", path, e);
        Config::default()
    }))
}

pub fn write_config(home: &Path, config: &Config) -> Result<()> {
    std::fs::create_dir_all(home)?;
    let tmp = home.join("config.json.tmp");
    std::fs::write(&tmp, serde_json::to_string_pretty(config)?)?;
    std::fs::rename(&tmp, home.join("config.json"))?;
    Ok(())
}

pub fn append_operation_log(home: &Path, event: &str) {
    let log_path = home.join("logs").join("operation.log");
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(mut f) => {
            let now = chrono::Utc::now().to_rfc3339();
            let _ = writeln!(f, "[{}] {}", now, event);
        }
        Err(e) => tracing::debug!("operation log {:?} unavailable: {}", log_path, e),
    }
}
