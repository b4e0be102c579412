use crate::error::{GalleryError, Result};
use image::codecs::jpeg::JpegEncoder;
use std::path::{Path, PathBuf};

pub const THUMBNAIL_SIZE: u32 = 200;
pub const THUMBNAIL_QUALITY: u8 = 80;

/// Generate a 200×200 JPEG thumbnail of `source_path` at `out_path`.
///
/// Unlike a cache warm-up, a missing thumbnail here leaves the gallery
/// inconsistent, so every failure (including a decoder panic) is returned
/// as `ThumbnailFailure` for the caller to abort the upload.
pub fn generate_thumbnail(
    source_path: &Path,
    out_path: &Path,
    orientation: Option<u16>,
    max_alloc: Option<u64>,
) -> Result<PathBuf> {
    match std::panic::catch_unwind(|| {
        generate_thumbnail_inner(source_path, out_path, orientation, max_alloc)
    }) {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("panic in generate_thumbnail for {:?}", source_path);
            Err(GalleryError::thumbnail(source_path, "decoder panicked"))
        }
    }
}

fn generate_thumbnail_inner(
    source_path: &Path,
    out_path: &Path,
    orientation: Option<u16>,
    max_alloc: Option<u64>,
) -> Result<PathBuf> {
    let img = open_image(source_path, max_alloc).map_err(|e| {
        tracing::debug!("thumbnail: cannot decode {:?}: {}", source_path, e);
        GalleryError::thumbnail(source_path, e)
    })?;
    generate_thumbnail_from_image(img, out_path, orientation)
        .map_err(|e| match e {
            GalleryError::ThumbnailFailure { reason, .. } => {
                GalleryError::thumbnail(source_path, reason)
            }
            other => other,
        })
}

/// Decode by content (not extension) under the configured allocation limit.
fn open_image(path: &Path, max_alloc: Option<u64>) -> image::ImageResult<image::DynamicImage> {
    let mut reader = image::ImageReader::open(path)?.with_guessed_format()?;
    let mut limits = image::Limits::default();
    limits.max_alloc = max_alloc;
    reader.limits(limits);
    reader.decode()
}

/// Create the parent directory of `path` if it does not yet exist.
fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| GalleryError::storage(parent, e))?;
    }
    Ok(())
}

/// Apply EXIF orientation rotation to an image.
fn apply_orientation(img: image::DynamicImage, orientation: Option<u16>) -> image::DynamicImage {
    match orientation {
        Some(3) => img.rotate180(),
        Some(6) => img.rotate90(),
        Some(8) => img.rotate270(),
        Some(o) if matches!(o, 2 | 4 | 5 | 7) => {
            tracing::debug!("thumbnail: orientation {} (mirror) not applied", o);
            img
        }
        _ => img,
    }
}

/// Encode an image as JPEG at the given quality. Alpha is dropped first:
/// the JPEG encoder rejects RGBA input.
pub fn encode_jpeg(img: &image::DynamicImage, quality: u8) -> image::ImageResult<Vec<u8>> {
    let rgb = img.to_rgb8();
    let mut buf: Vec<u8> = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(&rgb)?;
    Ok(buf)
}

/// Write `bytes` to `path` through a sibling `.tmp` file and a rename, so a
/// reader never sees a half-written file.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    if let Err(e) = std::fs::write(&tmp, bytes) {
        let _ = std::fs::remove_file(&tmp);
        return Err(GalleryError::storage(&tmp, e));
    }
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        GalleryError::storage(path, e)
    })
}

/// Cover-fit `img` to exactly 200×200 (center crop, no letterboxing), apply
/// orientation, and save as JPEG quality 80.
pub fn generate_thumbnail_from_image(
    img: image::DynamicImage,
    out_path: &Path,
    orientation: Option<u16>,
) -> Result<PathBuf> {
    let resized = img.resize_to_fill(
        THUMBNAIL_SIZE,
        THUMBNAIL_SIZE,
        image::imageops::FilterType::Lanczos3,
    );
    let thumbnail = apply_orientation(resized, orientation);

    let bytes = encode_jpeg(&thumbnail, THUMBNAIL_QUALITY)
        .map_err(|e| GalleryError::thumbnail(out_path, e))?;

    ensure_parent_dir(out_path)?;
    write_atomically(out_path, &bytes)?;
    tracing::debug!("thumbnail saved to {:?}", out_path);
    Ok(out_path.to_path_buf())
}
