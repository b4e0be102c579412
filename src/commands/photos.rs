use crate::error::GalleryError;
use crate::gallery::naming;
use crate::import::format;
use crate::photos::model::{PhotoFormat, PhotoList, UploadReport, UploadedFile};
use crate::photos::repository;
use crate::state::AppState;
use serde::Serialize;
use std::path::Path;

/// `{ "success": bool, ...data, "message"? }`, the shape every transport returns.
#[derive(Debug, Serialize)]
pub struct CommandResponse<T: Serialize> {
    pub success: bool,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> CommandResponse<T> {
    pub fn ok(data: T) -> Self {
        CommandResponse {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        CommandResponse {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

impl CommandResponse<()> {
    pub fn done() -> Self {
        CommandResponse {
            success: true,
            data: None,
            message: None,
        }
    }
}

// ── Upload ────────────────────────────────────────────────────────────────────

/// Run an upload request through the pipeline.
///
/// Every file is attempted; `success` is true only when all of them were
/// stored, and the per-file outcomes are always included.
pub fn upload_photos(state: &AppState, files: Vec<UploadedFile>) -> CommandResponse<UploadReport> {
    let total = files.len();
    let report = match state.pipeline.process_batch(files) {
        Ok(report) => report,
        Err(e) => {
            state.log_operation(&format!("UPLOAD_REJECTED kind={} files={}", e.kind(), total));
            return CommandResponse::failed(e.to_string());
        }
    };

    for file in &report.files {
        state.log_operation(&format!(
            "UPLOAD_STORED filename={} original={}",
            file.filename, file.original_name
        ));
    }
    for failure in &report.failures {
        state.log_operation(&format!("UPLOAD_FAILED original={}", failure.original_name));
    }

    tracing::info!(
        "upload_photos: stored={} failed={}",
        report.files.len(),
        report.failures.len()
    );

    if report.all_succeeded() {
        CommandResponse::ok(report)
    } else {
        let message = format!("{} of {} uploads failed", report.failures.len(), total);
        CommandResponse {
            success: false,
            data: Some(report),
            message: Some(message),
        }
    }
}

// ── Listing ───────────────────────────────────────────────────────────────────

pub fn list_photos(state: &AppState) -> CommandResponse<PhotoList> {
    match repository::list_photos(state.layout()) {
        Ok(photos) => CommandResponse::ok(PhotoList { photos }),
        Err(e) => {
            tracing::warn!("list_photos: {}", e);
            CommandResponse::failed(e.to_string())
        }
    }
}

// ── Deletion ──────────────────────────────────────────────────────────────────

pub fn delete_photo(state: &AppState, filename: &str) -> CommandResponse<()> {
    match repository::delete_photo(state.layout(), filename) {
        Ok(removed) => {
            state.log_operation(&format!(
                "PHOTO_DELETED filename={} removed={}",
                filename, removed
            ));
            CommandResponse::done()
        }
        Err(e) => {
            tracing::warn!("delete_photo: {}: {}", filename, e);
            CommandResponse::failed(e.to_string())
        }
    }
}

// ── Local staging ─────────────────────────────────────────────────────────────

/// MIME type a browser would declare for a file with this name.
pub fn guess_mime_type(path: &Path) -> &'static str {
    match format::detect_format(path) {
        Some(PhotoFormat::Jpeg) => "image/jpeg",
        Some(PhotoFormat::Png) => "image/png",
        Some(PhotoFormat::Heic) => "image/heic",
        None => "application/octet-stream",
    }
}

/// Copy a local file into the incoming area so it can be handed to the
/// pipeline like a received upload. The source file is never modified.
pub fn stage_local_file(state: &AppState, source: &Path) -> Result<UploadedFile, GalleryError> {
    let original_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| GalleryError::InputRejected(format!("not a file name: {:?}", source)))?;

    let incoming = state.incoming_dir();
    std::fs::create_dir_all(&incoming).map_err(|e| GalleryError::storage(&incoming, e))?;
    let temp_path = incoming.join(naming::generate_filename("upload"));
    let size = std::fs::copy(source, &temp_path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        GalleryError::storage(source, e)
    })?;

    Ok(UploadedFile {
        mime_type: guess_mime_type(source).to_string(),
        original_name,
        temp_path,
        size,
    })
}
