use crate::error::{GalleryError, Result};
use crate::gallery::{naming, GalleryLayout};
use crate::import::{exif, format};
use crate::photos::model::PhotoRecord;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// ── Private helpers ───────────────────────────────────────────────────────────

/// Photo files directly inside the photos directory. Thumbnails, HEIC
/// leftovers, temp and in-progress `.part` files and symlinks are skipped.
fn scan_photo_files(photos_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(photos_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::new(ErrorKind::Other, "walk failed"));
                return Err(GalleryError::storage(photos_dir, source));
            }
            Err(e) => {
                tracing::warn!("listing: skipping entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            tracing::debug!("listing: skipping non-UTF-8 name {:?}", entry.path());
            continue;
        };
        if naming::is_thumbnail_name(name) || !format::is_listable(entry.path()) {
            continue;
        }
        files.push((name.to_string(), entry.path().to_path_buf()));
    }

    Ok(files)
}

/// Creation time where the platform reports one, otherwise mtime.
fn upload_time(metadata: &std::fs::Metadata) -> Option<DateTime<Utc>> {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

fn remove_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(GalleryError::storage(path, e)),
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Derive the listing record of one stored photo from the filesystem.
pub fn photo_record(layout: &GalleryLayout, filename: &str, path: &Path) -> Result<PhotoRecord> {
    let metadata = std::fs::metadata(path).map_err(|e| GalleryError::storage(path, e))?;
    let exif_data = exif::extract_exif(path);
    let photo_date = exif::resolve_capture_time(path, &exif_data);
    let upload_date = upload_time(&metadata).unwrap_or(photo_date);

    Ok(PhotoRecord {
        filename: filename.to_string(),
        thumbnail: layout.thumbnail_url(filename),
        full_image: layout.photo_url(filename),
        photo_date,
        upload_date,
        size: metadata.len(),
    })
}

/// All stored photos, newest capture time first. Recomputed on every call.
pub fn list_photos(layout: &GalleryLayout) -> Result<Vec<PhotoRecord>> {
    let files = scan_photo_files(&layout.photos_dir)?;

    let mut photos: Vec<PhotoRecord> = files
        .par_iter()
        .filter_map(|(filename, path)| match photo_record(layout, filename, path) {
            Ok(record) => Some(record),
            Err(e) => {
                // Deleted between the scan and the stat; not worth failing the listing.
                tracing::debug!("listing: skipping {}: {}", filename, e);
                None
            }
        })
        .collect();

    // Filename as tie-break keeps the order stable across calls.
    photos.sort_by(|a, b| {
        b.photo_date
            .cmp(&a.photo_date)
            .then_with(|| a.filename.cmp(&b.filename))
    });

    tracing::debug!("list_photos {:?}: {} photos", layout.photos_dir, photos.len());
    Ok(photos)
}

/// Remove a photo and its thumbnail. Succeeds when either or both are already
/// gone; returns how many files were actually removed.
pub fn delete_photo(layout: &GalleryLayout, filename: &str) -> Result<usize> {
    if !naming::is_safe_filename(filename) {
        return Err(GalleryError::InputRejected(format!(
            "invalid filename: {:?}",
            filename
        )));
    }

    let mut removed = 0;
    if remove_if_exists(&layout.photo_path(filename))? {
        removed += 1;
    }
    if remove_if_exists(&layout.thumbnail_path(filename))? {
        removed += 1;
    }
    tracing::info!("delete_photo: {} ({} file(s) removed)", filename, removed);
    Ok(removed)
}
