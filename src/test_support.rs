//! Synthetic image fixtures shared by the unit and integration tests.

use std::path::Path;

/// Write a decodable JPEG (solid colour) of the given size.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    let img = image::DynamicImage::new_rgb8(width, height);
    img.save_with_format(path, image::ImageFormat::Jpeg).unwrap();
}

/// Write a decodable RGBA PNG of the given size.
pub fn write_png(path: &Path, width: u32, height: u32) {
    let img = image::DynamicImage::new_rgba8(width, height);
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::new_rgb8(width, height);
    let mut buf: Vec<u8> = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// Build the APP1 payload ("Exif\0\0" + TIFF) holding Orientation in IFD0
/// and DateTimeOriginal in the Exif sub-IFD (the layout kamadak-exif requires).
///
/// TIFF layout (little-endian, offsets from the TIFF header start):
///   0-7:   header ("II" + 0x002A + IFD0 offset=8)
///   8-37:  IFD0, 2 entries: Orientation(0x0112), ExifIFD-ptr(0x8769)
///   38-55: ExifIFD, 1 entry: DateTimeOriginal(0x9003) count=20 offset=56
///   56-75: DateTimeOriginal value (19 ASCII chars + NUL)
fn exif_app1(datetime_original: &str, orientation: u16) -> Vec<u8> {
    assert_eq!(
        datetime_original.len(),
        19,
        "EXIF datetime must be 'YYYY:MM:DD HH:MM:SS'"
    );
    let mut dt_bytes = datetime_original.as_bytes().to_vec();
    dt_bytes.push(0);

    let mut tiff: Vec<u8> = Vec::new();
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&[0x2A, 0x00]);
    tiff.extend_from_slice(&8u32.to_le_bytes());

    assert_eq!(tiff.len(), 8);
    tiff.extend_from_slice(&2u16.to_le_bytes());
    tiff.extend_from_slice(&0x0112u16.to_le_bytes());
    tiff.extend_from_slice(&3u16.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&(orientation as u32).to_le_bytes());
    tiff.extend_from_slice(&0x8769u16.to_le_bytes());
    tiff.extend_from_slice(&4u16.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&38u32.to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());

    assert_eq!(tiff.len(), 38);
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x9003u16.to_le_bytes());
    tiff.extend_from_slice(&2u16.to_le_bytes());
    tiff.extend_from_slice(&20u32.to_le_bytes());
    tiff.extend_from_slice(&56u32.to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());

    assert_eq!(tiff.len(), 56);
    tiff.extend_from_slice(&dt_bytes);

    let mut app1 = b"Exif\x00\x00".to_vec();
    app1.extend_from_slice(&tiff);
    app1
}

/// Write a decodable JPEG carrying EXIF DateTimeOriginal and Orientation.
///
/// Encodes a real image, strips its SOI, then emits
/// SOI + APP1(EXIF) + the rest of the encoded stream.
pub fn write_jpeg_with_exif(
    path: &Path,
    width: u32,
    height: u32,
    datetime_original: &str,
    orientation: u16,
) {
    let app1 = exif_app1(datetime_original, orientation);
    let app1_len = (app1.len() + 2) as u16;

    let img = image::DynamicImage::new_rgb8(width, height);
    let mut jpeg_buf: Vec<u8> = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut jpeg_buf),
        image::ImageFormat::Jpeg,
    )
    .unwrap();

    let mut output: Vec<u8> = Vec::new();
    output.extend_from_slice(&[0xFF, 0xD8]);
    output.extend_from_slice(&[0xFF, 0xE1]);
    output.extend_from_slice(&app1_len.to_be_bytes());
    output.extend_from_slice(&app1);
    output.extend_from_slice(&jpeg_buf[2..]);

    std::fs::write(path, &output).unwrap();
}

/// Set a file's modification time to a fixed instant.
pub fn set_mtime(path: &Path, t: chrono::DateTime<chrono::Utc>) {
    let file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(std::time::SystemTime::from(t)).unwrap();
}
