use crate::error::{GalleryError, Result};
use crate::import::{exif, thumbnails};
use std::path::Path;

/// JPEG quality for converted HEIC/HEIF photos (0.9 on a 0–1 scale).
pub const HEIC_JPEG_QUALITY: u8 = 90;

/// Decodes the primary image of a HEIC/HEIF container.
pub trait HeifDecoder: Send + Sync {
    fn name(&self) -> &str;

    fn decode(&self, bytes: &[u8]) -> anyhow::Result<image::DynamicImage>;
}

/// Used when the crate is built without the `heic` feature: every HEIC
/// upload fails conversion instead of being stored unconverted.
pub struct UnsupportedHeifDecoder;

impl HeifDecoder for UnsupportedHeifDecoder {
    fn name(&self) -> &str {
        "unsupported"
    }

    fn decode(&self, _bytes: &[u8]) -> anyhow::Result<image::DynamicImage> {
        anyhow::bail!("HEIC support not compiled in (build with --features heic)")
    }
}

#[cfg(feature = "heic")]
pub use libheif::LibheifDecoder;

#[cfg(feature = "heic")]
mod libheif {
    use super::HeifDecoder;
    use anyhow::Context;
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    /// Decoder backed by the system libheif.
    #[derive(Debug, Default)]
    pub struct LibheifDecoder;

    impl HeifDecoder for LibheifDecoder {
        fn name(&self) -> &str {
            "libheif"
        }

        fn decode(&self, bytes: &[u8]) -> anyhow::Result<image::DynamicImage> {
            let ctx = HeifContext::read_from_bytes(bytes).context("reading HEIF container")?;
            let handle = ctx
                .primary_image_handle()
                .context("locating primary image")?;
            let decoded = LibHeif::new()
                .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
                .context("decoding primary image")?;
            let plane = decoded
                .planes()
                .interleaved
                .context("decoded image has no interleaved RGB plane")?;

            // Rows are padded to `stride`; copy only the visible pixels.
            let row_len = plane.width as usize * 3;
            let mut pixels = Vec::with_capacity(row_len * plane.height as usize);
            for row in plane.data.chunks(plane.stride).take(plane.height as usize) {
                pixels.extend_from_slice(row.get(..row_len).context("short RGB row")?);
            }
            image::RgbImage::from_raw(plane.width, plane.height, pixels)
                .map(image::DynamicImage::ImageRgb8)
                .context("RGB buffer does not match image dimensions")
        }
    }
}

/// The decoder this build supports.
pub fn default_decoder() -> Box<dyn HeifDecoder> {
    #[cfg(feature = "heic")]
    {
        Box::new(LibheifDecoder)
    }
    #[cfg(not(feature = "heic"))]
    {
        Box::new(UnsupportedHeifDecoder)
    }
}

/// Convert the HEIC/HEIF file at `heic_path` into a JPEG at `jpeg_path`, then
/// remove the source.
///
/// The JPEG is fully encoded before anything is written. On failure the
/// source is left as it was and `jpeg_path` is not written; on success
/// only the JPEG remains. The embedded capture time is carried over.
/// Orientation is not, since the decoder already applies the container's
/// rotation.
pub fn convert_heic_to_jpeg(
    heic_path: &Path,
    jpeg_path: &Path,
    decoder: &dyn HeifDecoder,
) -> Result<()> {
    let input = std::fs::read(heic_path).map_err(|e| GalleryError::storage(heic_path, e))?;

    let img = decoder.decode(&input).map_err(|e| {
        tracing::warn!(
            "heic: {} decoder failed on {:?}: {:#}",
            decoder.name(),
            heic_path,
            e
        );
        GalleryError::conversion(heic_path, format!("{:#}", e))
    })?;
    let mut jpeg = thumbnails::encode_jpeg(&img, HEIC_JPEG_QUALITY)
        .map_err(|e| GalleryError::conversion(heic_path, e))?;
    if let Some(with_exif) =
        exif::capture_time_block(&input).and_then(|block| exif::embed_in_jpeg(&jpeg, &block))
    {
        jpeg = with_exif;
    }

    thumbnails::write_atomically(jpeg_path, &jpeg)?;

    if let Err(e) = std::fs::remove_file(heic_path) {
        // Keep the exactly-one-survivor rule: drop the copy, report the failure.
        let _ = std::fs::remove_file(jpeg_path);
        return Err(GalleryError::storage(heic_path, e));
    }

    tracing::info!(
        "heic: converted {:?} → {:?} ({}×{})",
        heic_path,
        jpeg_path,
        img.width(),
        img.height()
    );
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::test_support;
    use tempfile::TempDir;

    /// Treats the "HEIC" bytes as any format `image` can read, so tests can
    /// exercise conversion without libheif.
    pub(crate) struct FakeHeifDecoder;

    impl HeifDecoder for FakeHeifDecoder {
        fn name(&self) -> &str {
            "fake"
        }

        fn decode(&self, bytes: &[u8]) -> anyhow::Result<image::DynamicImage> {
            Ok(image::load_from_memory(bytes)?)
        }
    }

    fn convert(heic: &Path, decoder: &dyn HeifDecoder) -> Result<std::path::PathBuf> {
        let jpeg = heic.with_extension("jpg");
        convert_heic_to_jpeg(heic, &jpeg, decoder).map(|()| jpeg)
    }

    #[test]
    fn test_heic_converted_and_source_removed() {
        let tmp = TempDir::new().unwrap();
        let heic = tmp.path().join("123-4.heic");
        std::fs::write(&heic, test_support::png_bytes(64, 48)).unwrap();

        let out = convert(&heic, &FakeHeifDecoder).unwrap();
        assert_eq!(out, tmp.path().join("123-4.jpg"));
        assert!(!heic.exists(), "HEIC source must be removed");
        let img = image::open(&out).unwrap();
        assert_eq!((img.width(), img.height()), (64, 48));
        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_conversion_writes_to_requested_path() {
        let tmp = TempDir::new().unwrap();
        let heic = tmp.path().join("1-2.heic.part");
        let jpeg = tmp.path().join("1-2.jpg.part");
        std::fs::write(&heic, test_support::png_bytes(8, 8)).unwrap();

        convert_heic_to_jpeg(&heic, &jpeg, &FakeHeifDecoder).unwrap();
        assert!(!heic.exists());
        let bytes = std::fs::read(&jpeg).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Jpeg);
    }

    #[test]
    fn test_conversion_keeps_capture_time() {
        let tmp = TempDir::new().unwrap();
        let heic = tmp.path().join("IMG_7.heic");
        test_support::write_jpeg_with_exif(&heic, 40, 20, "2021:06:01 08:15:00", 6);

        let out = convert(&heic, &FakeHeifDecoder).unwrap();
        let data = crate::import::exif::extract_exif(&out);
        assert_eq!(
            data.capture_time.map(|t| t.to_rfc3339()),
            Some("2021-06-01T08:15:00+00:00".to_string())
        );
        assert_eq!(data.orientation, None);
    }

    #[test]
    fn test_corrupt_heic_fails_and_keeps_source() {
        let tmp = TempDir::new().unwrap();
        let heic = tmp.path().join("bad.heic");
        std::fs::write(&heic, b"ftypheic but not really").unwrap();

        let err = convert(&heic, &FakeHeifDecoder).unwrap_err();
        assert!(matches!(err, GalleryError::ConversionFailure { .. }), "{:?}", err);
        assert!(heic.exists(), "source must be left in place");
        assert!(!tmp.path().join("bad.jpg").exists(), "no partial JPEG");
        assert!(!tmp.path().join("bad.jpg.tmp").exists());
    }

    #[test]
    fn test_unsupported_decoder_reports_conversion_failure() {
        let tmp = TempDir::new().unwrap();
        let heic = tmp.path().join("x.heic");
        std::fs::write(&heic, test_support::png_bytes(8, 8)).unwrap();

        let err = convert(&heic, &UnsupportedHeifDecoder).unwrap_err();
        assert!(err.to_string().contains("not compiled in"));
        assert!(heic.exists());
    }

    #[test]
    fn test_missing_heic_is_storage_failure() {
        let err = convert(Path::new("/nonexistent/x.heic"), &FakeHeifDecoder).unwrap_err();
        assert!(matches!(err, GalleryError::StorageFailure { .. }));
    }
}
