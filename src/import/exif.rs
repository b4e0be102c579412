use chrono::{DateTime, Utc};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExifData {
    pub capture_time: Option<DateTime<Utc>>,
    pub orientation: Option<u16>,
}

/// Extract EXIF metadata from any container kamadak-exif understands
/// (JPEG, PNG eXIf, HEIF, TIFF). Never panics; returns all-None on any error.
pub fn extract_exif(path: &Path) -> ExifData {
    match std::panic::catch_unwind(|| extract_exif_inner(path)) {
        Ok(data) => data,
        Err(_) => {
            tracing::warn!("panic in extract_exif for {:?}", path);
            ExifData::default()
        }
    }
}

fn extract_exif_inner(path: &Path) -> ExifData {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!("cannot open {:?}: {}", path, e);
            return ExifData::default();
        }
    };
    let mut buf_reader = std::io::BufReader::new(file);
    let exif = match exif::Reader::new().read_from_container(&mut buf_reader) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!("no EXIF in {:?}: {}", path, e);
            return ExifData::default();
        }
    };

    ExifData {
        capture_time: read_datetime_original(&exif),
        orientation: read_orientation(&exif),
    }
}

fn read_datetime_original(exif: &exif::Exif) -> Option<DateTime<Utc>> {
    let field = exif.get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)?;
    let s = match &field.value {
        exif::Value::Ascii(vecs) => vecs.first().and_then(|v| std::str::from_utf8(v).ok())?,
        _ => return None,
    };
    parse_exif_datetime(s)
}

/// Parse an EXIF datetime (`YYYY:MM:DD HH:MM:SS`). EXIF carries no zone, so
/// the wall-clock value is taken as UTC.
pub fn parse_exif_datetime(s: &str) -> Option<DateTime<Utc>> {
    use chrono::{NaiveDateTime, TimeZone};
    let date = s.get(..10)?.replace(':', "-");
    let time = s.get(11..19)?;
    let normalized = format!("{} {}", date, time);
    let ndt = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S").ok()?;
    Some(Utc.from_utc_datetime(&ndt))
}

fn read_orientation(exif: &exif::Exif) -> Option<u16> {
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    match &field.value {
        exif::Value::Short(v) => v.first().copied(),
        _ => None,
    }
}

/// The DateTimeOriginal of an image file's bytes, re-serialized as a
/// standalone TIFF block. Returns None when there is nothing to carry.
pub fn capture_time_block(container: &[u8]) -> Option<Vec<u8>> {
    match std::panic::catch_unwind(|| capture_time_block_inner(container)) {
        Ok(block) => block,
        Err(_) => {
            tracing::warn!("panic while copying EXIF capture time");
            None
        }
    }
}

fn capture_time_block_inner(container: &[u8]) -> Option<Vec<u8>> {
    let exif = exif::Reader::new()
        .read_from_container(&mut std::io::Cursor::new(container))
        .ok()?;
    let field = exif.get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)?;

    let mut writer = exif::experimental::Writer::new();
    writer.push_field(field);
    let mut buf = std::io::Cursor::new(Vec::new());
    if let Err(e) = writer.write(&mut buf, false) {
        tracing::debug!("cannot re-encode DateTimeOriginal: {}", e);
        return None;
    }
    Some(buf.into_inner())
}

/// Insert `tiff` as an APP1 Exif segment right after the SOI marker.
/// None if `jpeg` is not a JPEG stream or the block does not fit a segment.
pub fn embed_in_jpeg(jpeg: &[u8], tiff: &[u8]) -> Option<Vec<u8>> {
    const EXIF_HEADER: &[u8] = b"Exif\0\0";
    if !jpeg.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let segment_len = u16::try_from(2 + EXIF_HEADER.len() + tiff.len()).ok()?;

    let mut out = Vec::with_capacity(jpeg.len() + segment_len as usize + 2);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(EXIF_HEADER);
    out.extend_from_slice(tiff);
    out.extend_from_slice(&jpeg[2..]);
    Some(out)
}

/// Last-modification time of `path`, if the filesystem reports one.
pub fn file_modified_time(path: &Path) -> Option<DateTime<Utc>> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Utc>::from(modified))
}

/// Best "photo was taken at" timestamp: the embedded capture time, else the
/// file's mtime. Never fails; as a last resort returns the current time.
pub fn resolve_capture_time(path: &Path, exif: &ExifData) -> DateTime<Utc> {
    if let Some(t) = exif.capture_time {
        return t;
    }
    tracing::debug!("capture time: no usable EXIF for {:?}, using mtime", path);
    file_modified_time(path).unwrap_or_else(|| {
        tracing::warn!("capture time: cannot stat {:?}, using now", path);
        Utc::now()
    })
}
