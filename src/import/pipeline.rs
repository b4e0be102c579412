use crate::error::{GalleryError, Result};
use crate::gallery::{naming, Config, GalleryLayout};
use crate::import::heic::HeifDecoder;
use crate::import::{exif, format, heic, thumbnails};
use crate::photos::model::{
    PhotoFormat, StoredPhoto, UploadFailure, UploadReport, UploadResult, UploadedFile,
};
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Attempts at finding a free generated name before giving up.
const NAME_ATTEMPTS: usize = 5;

/// `.part` files older than this belong to an upload that was interrupted.
pub fn stale_upload_age() -> chrono::Duration {
    chrono::Duration::hours(1)
}

/// The upload ingestion pipeline: validate → stage → normalize →
/// thumbnail → publish → capture time, once per uploaded file.
///
/// Until its thumbnail exists a photo only lives under `<name>.part`, so a
/// concurrent listing never sees it. Holds no mutable state; concurrent
/// requests may share one instance.
pub struct Pipeline {
    layout: GalleryLayout,
    decoder: Box<dyn HeifDecoder>,
    max_upload_bytes: u64,
    max_files_per_upload: usize,
    max_image_alloc_bytes: Option<u64>,
}

/// An upload moved next to the photos but not yet visible.
#[derive(Debug)]
struct PendingPhoto {
    /// Final name in the photos directory.
    filename: String,
    /// The claimed `<filename>.part`; holds the final bytes before publishing.
    part_path: PathBuf,
    /// Where the uploaded bytes sit: `part_path` itself, or
    /// `<stem>.heic.part` while waiting for conversion.
    source_path: PathBuf,
}

impl PendingPhoto {
    fn needs_conversion(&self) -> bool {
        self.source_path != self.part_path
    }
}

impl Pipeline {
    pub fn new(layout: GalleryLayout, config: &Config, decoder: Box<dyn HeifDecoder>) -> Self {
        Pipeline {
            layout,
            decoder,
            max_upload_bytes: config.max_upload_bytes,
            max_files_per_upload: config.max_files_per_upload,
            max_image_alloc_bytes: Some(config.max_image_alloc_bytes),
        }
    }

    pub fn layout(&self) -> &GalleryLayout {
        &self.layout
    }

    /// Process every file of one request, sequentially and independently.
    ///
    /// Per-file failures are collected in the report; only request-level
    /// problems (empty or oversized batch) return an error, after the
    /// request's temp files have been discarded.
    pub fn process_batch(&self, files: Vec<UploadedFile>) -> Result<UploadReport> {
        if files.is_empty() {
            return Err(GalleryError::InputRejected("no files uploaded".to_string()));
        }
        if files.len() > self.max_files_per_upload {
            for file in &files {
                remove_quietly(&file.temp_path);
            }
            return Err(GalleryError::InputRejected(format!(
                "too many files: {} (max {})",
                files.len(),
                self.max_files_per_upload
            )));
        }

        tracing::info!("pipeline: processing batch of {} file(s)", files.len());
        let mut report = UploadReport::default();
        for file in files {
            let original_name = file.original_name.clone();
            match self.process_file(file) {
                Ok(result) => report.files.push(result),
                Err(e) => {
                    tracing::warn!("pipeline: {:?} failed: {}", original_name, e);
                    report.failures.push(UploadFailure {
                        original_name,
                        message: e.to_string(),
                    });
                }
            }
        }
        tracing::info!(
            "pipeline: batch done, stored={} failed={}",
            report.files.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Run one file through the pipeline. On any hard failure nothing of this
    /// upload is left behind: not the temp file, the staged or converted
    /// photo, nor a thumbnail.
    pub fn process_file(&self, file: UploadedFile) -> Result<UploadResult> {
        let extension = match format::validate_upload(&file, self.max_upload_bytes) {
            Ok(ext) => ext,
            Err(e) => {
                remove_quietly(&file.temp_path);
                return Err(e);
            }
        };
        let convert = format::format_for_extension(&extension) == Some(PhotoFormat::Heic);

        let pending = stage_upload(&self.layout, &file.temp_path, &extension, convert)?;
        tracing::debug!(
            "pipeline: {:?} staged for {}",
            file.original_name,
            pending.filename
        );

        match self.run_stages(&pending) {
            Ok((stored, photo_date)) => {
                tracing::debug!(
                    "pipeline: {:?} published as {} ({} bytes)",
                    file.original_name,
                    stored.filename,
                    stored.size
                );
                Ok(UploadResult {
                    filename: stored.filename,
                    original_name: file.original_name,
                    photo_date,
                })
            }
            Err(e) => {
                self.discard_pending(&pending);
                Err(e)
            }
        }
    }

    fn run_stages(&self, pending: &PendingPhoto) -> Result<(StoredPhoto, DateTime<Utc>)> {
        // Read EXIF from the uploaded bytes, before conversion re-encodes them.
        let source_exif = exif::extract_exif(&pending.source_path);

        // 1. HEIC/HEIF → JPEG; the decoder applies the container's rotation
        let orientation = if pending.needs_conversion() {
            heic::convert_heic_to_jpeg(
                &pending.source_path,
                &pending.part_path,
                self.decoder.as_ref(),
            )?;
            None
        } else {
            source_exif.orientation
        };

        // 2. Thumbnail under the final name; failure aborts the upload
        thumbnails::generate_thumbnail(
            &pending.part_path,
            &self.layout.thumbnail_path(&pending.filename),
            orientation,
            self.max_image_alloc_bytes,
        )?;

        // 3. Only now does the photo become visible
        let stored = publish(&self.layout, pending)?;

        // 4. Capture time; degrades, never fails
        let photo_date = exif::resolve_capture_time(&stored.path, &source_exif);
        Ok((stored, photo_date))
    }

    fn discard_pending(&self, pending: &PendingPhoto) {
        for path in [
            pending.source_path.clone(),
            pending.part_path.clone(),
            self.layout.thumbnail_path(&pending.filename),
        ] {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!("pipeline: removed {:?}", path),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("pipeline: cannot remove {:?}: {}", path, e),
            }
        }
    }

    /// Remove `.part` files, and their thumbnails, left behind by uploads that
    /// were interrupted more than `max_age` ago. Age comes from the generated
    /// name, so an upload still in flight in another process is left alone.
    pub fn sweep_stale_uploads(&self, max_age: chrono::Duration) -> usize {
        let now = Utc::now();
        let mut removed = 0;

        for entry in WalkDir::new(&self.layout.photos_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(filename) = entry.file_name().to_str().and_then(naming::strip_partial)
            else {
                continue;
            };
            match naming::generated_at(filename) {
                Some(issued) if now - issued > max_age => {}
                _ => continue,
            }
            remove_quietly(entry.path());
            remove_quietly(&self.layout.thumbnail_path(filename));
            removed += 1;
        }

        if removed > 0 {
            tracing::info!("pipeline: swept {} interrupted upload file(s)", removed);
        }
        removed
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!("pipeline: cannot remove {:?}: {}", path, e);
        }
    }
}

/// Move an uploaded temp file next to the photos under a fresh generated
/// name, still hidden behind the `.part` suffix.
///
/// HEIC uploads are claimed under their final `.jpg` name and parked as
/// `<stem>.heic.part` until conversion fills the claim.
fn stage_upload(
    layout: &GalleryLayout,
    temp_path: &Path,
    extension: &str,
    convert: bool,
) -> Result<PendingPhoto> {
    let final_extension = if convert { "jpg" } else { extension };
    let (filename, part_path) = match claim_unique_name(layout, final_extension) {
        Ok(claimed) => claimed,
        Err(e) => {
            remove_quietly(temp_path);
            return Err(e);
        }
    };
    let source_path = if convert {
        layout.photo_path(&naming::partial_name(&naming::replace_extension(
            &filename, extension,
        )))
    } else {
        part_path.clone()
    };

    if let Err(e) = move_file(temp_path, &source_path) {
        remove_quietly(&part_path);
        return Err(e);
    }
    Ok(PendingPhoto {
        filename,
        part_path,
        source_path,
    })
}

/// Rename, falling back to copy + delete when `from` is on another
/// filesystem. `from` is gone afterwards either way.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if let Err(rename_err) = std::fs::rename(from, to) {
        tracing::debug!(
            "pipeline: rename {:?} → {:?} failed ({}), copying",
            from,
            to,
            rename_err
        );
        if let Err(e) = std::fs::copy(from, to) {
            remove_quietly(to);
            remove_quietly(from);
            return Err(GalleryError::storage(to, e));
        }
        remove_quietly(from);
    }
    Ok(())
}

/// Rename the finished `.part` file to its final name. The last step of an
/// upload: nothing after it can fail.
fn publish(layout: &GalleryLayout, pending: &PendingPhoto) -> Result<StoredPhoto> {
    let size = std::fs::metadata(&pending.part_path)
        .map_err(|e| GalleryError::storage(&pending.part_path, e))?
        .len();
    let dest = layout.photo_path(&pending.filename);
    std::fs::rename(&pending.part_path, &dest).map_err(|e| GalleryError::storage(&dest, e))?;
    Ok(StoredPhoto {
        filename: pending.filename.clone(),
        path: dest,
        size,
    })
}

/// Reserve `<filename>.part` with `create_new`, so two concurrent uploads can
/// never end up sharing a name.
fn claim_unique_name(layout: &GalleryLayout, extension: &str) -> Result<(String, PathBuf)> {
    let mut last_err = None;
    for _ in 0..NAME_ATTEMPTS {
        let filename = naming::generate_filename(extension);
        if layout.photo_path(&filename).exists() {
            tracing::debug!("pipeline: {} already published, retrying", filename);
            continue;
        }
        let part_path = layout.photo_path(&naming::partial_name(&filename));
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&part_path)
        {
            Ok(_) => return Ok((filename, part_path)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!("pipeline: name collision on {}, retrying", filename);
                last_err = Some(GalleryError::storage(&part_path, e));
            }
            Err(e) => return Err(GalleryError::storage(&part_path, e)),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        GalleryError::storage(
            &layout.photos_dir,
            std::io::Error::new(ErrorKind::AlreadyExists, "no free filename"),
        )
    }))
}
