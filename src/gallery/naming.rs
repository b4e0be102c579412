/// Every thumbnail is named `thumb_<photo filename>`, so it can be found
/// from the photo name alone.
pub const THUMBNAIL_PREFIX: &str = "thumb_";

/// Suffix of an upload that is still being processed. The listing skips
/// these; the file is renamed to its final name once its thumbnail exists.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Generate a stored filename: `<unix millis>-<random 0..1e9>.<ext>`.
///
/// Uniqueness is probabilistic; callers still create the file with
/// `create_new` and retry on collision.
pub fn generate_filename(extension: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::random_range(0..1_000_000_000);
    format!("{}-{}.{}", millis, suffix, extension.to_lowercase())
}

pub fn thumbnail_name(photo_filename: &str) -> String {
    format!("{}{}", THUMBNAIL_PREFIX, photo_filename)
}

pub fn is_thumbnail_name(name: &str) -> bool {
    name.starts_with(THUMBNAIL_PREFIX)
}

pub fn partial_name(filename: &str) -> String {
    format!("{}{}", filename, PARTIAL_SUFFIX)
}

/// `"123-4.jpg.part"` → `Some("123-4.jpg")`; `None` for anything else.
pub fn strip_partial(name: &str) -> Option<&str> {
    name.strip_suffix(PARTIAL_SUFFIX).filter(|s| !s.is_empty())
}

/// When a generated name was issued, read back from its millisecond prefix.
pub fn generated_at(filename: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let (millis, _) = filename.split_once('-')?;
    chrono::DateTime::from_timestamp_millis(millis.parse().ok()?)
}

/// Swap the extension of a bare filename: `"123-4.heic"` → `"123-4.jpg"`.
pub fn replace_extension(filename: &str, extension: &str) -> String {
    let stem = match filename.rfind('.') {
        Some(0) | None => filename,
        Some(idx) => &filename[..idx],
    };
    format!("{}.{}", stem, extension)
}

/// Returns true iff `name` is a single, plain path component: non-empty,
/// no separators, no NUL, not `.` or `..`.
pub fn is_safe_filename(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    !name.contains(['/', '\\', '\0'])
}
