use crate::error::{GalleryError, Result};
use crate::photos::model::{PhotoFormat, UploadedFile};
use std::path::Path;

const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg"];
const PNG_EXTENSIONS: &[&str] = &["png"];
const HEIC_EXTENSIONS: &[&str] = &["heic", "heif"];

pub const UNSUPPORTED_TYPE_MESSAGE: &str = "only JPEG, PNG and HEIC images are supported";

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
}

/// Format for a lower-case extension without the dot.
pub fn format_for_extension(ext: &str) -> Option<PhotoFormat> {
    if JPEG_EXTENSIONS.contains(&ext) {
        Some(PhotoFormat::Jpeg)
    } else if PNG_EXTENSIONS.contains(&ext) {
        Some(PhotoFormat::Png)
    } else if HEIC_EXTENSIONS.contains(&ext) {
        Some(PhotoFormat::Heic)
    } else {
        None
    }
}

/// Detect the photo format from the file extension (case-insensitive).
/// Returns None for unsupported extensions.
pub fn detect_format(path: &Path) -> Option<PhotoFormat> {
    format_for_extension(&lowercase_extension(path)?)
}

/// Detect the format from a declared MIME type. Matching is by substring so
/// `image/jpeg`, `image/x-png` and `image/heic-sequence` are all accepted.
pub fn format_from_mime(mime: &str) -> Option<PhotoFormat> {
    let mime = mime.to_lowercase();
    if mime.contains("jpeg") || mime.contains("jpg") {
        Some(PhotoFormat::Jpeg)
    } else if mime.contains("png") {
        Some(PhotoFormat::Png)
    } else if mime.contains("heic") || mime.contains("heif") {
        Some(PhotoFormat::Heic)
    } else {
        None
    }
}

/// True for files the listing shows: jpg, jpeg or png.
pub fn is_listable(path: &Path) -> bool {
    matches!(
        detect_format(path),
        Some(PhotoFormat::Jpeg) | Some(PhotoFormat::Png)
    )
}

/// Check an upload against the accepted types and the size limit.
///
/// Returns the lower-case extension the stored file will carry: the
/// original one when it is accepted, otherwise one derived from the MIME type.
pub fn validate_upload(file: &UploadedFile, max_bytes: u64) -> Result<String> {
    if file.size > max_bytes {
        return Err(GalleryError::InputRejected(format!(
            "{} is too large: {} bytes (max {} bytes)",
            file.original_name, file.size, max_bytes
        )));
    }

    let name_ext = lowercase_extension(Path::new(&file.original_name));
    if let Some(ext) = name_ext.filter(|e| format_for_extension(e).is_some()) {
        return Ok(ext);
    }

    match format_from_mime(&file.mime_type) {
        Some(format) => Ok(format.canonical_extension().to_string()),
        None => {
            tracing::debug!(
                "rejecting upload {:?} (mime {:?})",
                file.original_name,
                file.mime_type
            );
            Err(GalleryError::InputRejected(
                UNSUPPORTED_TYPE_MESSAGE.to_string(),
            ))
        }
    }
}
