use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoFormat {
    Jpeg,
    Png,
    /// HEIC/HEIF container; converted to JPEG before it is kept.
    Heic,
}

impl PhotoFormat {
    /// Extension used when the upload's own extension cannot be trusted.
    pub fn canonical_extension(&self) -> &'static str {
        match self {
            PhotoFormat::Jpeg => "jpg",
            PhotoFormat::Png => "png",
            PhotoFormat::Heic => "heic",
        }
    }
}

/// A file handed over by the transport layer. The pipeline owns `temp_path`:
/// it is moved into the gallery or deleted.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub mime_type: String,
    pub temp_path: PathBuf,
    pub size: u64,
}

/// A photo persisted under its generated name in the photos directory.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPhoto {
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Per-file upload response entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub filename: String,
    pub original_name: String,
    #[serde(serialize_with = "serialize_iso8601")]
    pub photo_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFailure {
    pub original_name: String,
    pub message: String,
}

/// Outcome of one upload request: every file lands in exactly one list.
#[derive(Debug, Default, Clone, Serialize)]
pub struct UploadReport {
    pub files: Vec<UploadResult>,
    pub failures: Vec<UploadFailure>,
}

impl UploadReport {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Listing entry, derived from the filesystem on every read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    pub filename: String,
    pub thumbnail: String,
    pub full_image: String,
    #[serde(serialize_with = "serialize_iso8601")]
    pub photo_date: DateTime<Utc>,
    #[serde(serialize_with = "serialize_iso8601")]
    pub upload_date: DateTime<Utc>,
    pub size: u64,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct PhotoList {
    pub photos: Vec<PhotoRecord>,
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2023-05-01T10:00:00.000Z`.
pub fn to_iso8601(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_iso8601<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&to_iso8601(t))
}
