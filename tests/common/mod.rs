#![allow(dead_code)]

use std::{io::Cursor, path::Path};

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};

pub enum ExifEntry<'a> {
    Ascii(u16, &'a str),
    Short(u16, u16),
}

impl ExifEntry<'_> {
    fn tag(&self) -> u16 {
        match self {
            ExifEntry::Ascii(tag, _) | ExifEntry::Short(tag, _) => *tag,
        }
    }
}

pub const MAKE: u16 = 0x010f;
pub const ORIENTATION: u16 = 0x0112;
pub const DATE_TIME: u16 = 0x0132;
pub const UNKNOWN_TAG: u16 = 0xbeef;

/// Little-endian TIFF structure with a single IFD holding `entries` in the
/// given order.
fn tiff_block(entries: &[ExifEntry]) -> Vec<u8> {
    let ifd_len = 2 + entries.len() * 12 + 4;
    let mut data_offset = (8 + ifd_len) as u32;
    let mut ifd = Vec::new();
    let mut data = Vec::new();

    ifd.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for entry in entries {
        ifd.extend_from_slice(&entry.tag().to_le_bytes());
        match entry {
            ExifEntry::Ascii(_, text) => {
                let mut bytes = text.as_bytes().to_vec();
                bytes.push(0);
                ifd.extend_from_slice(&2u16.to_le_bytes());
                ifd.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                if bytes.len() <= 4 {
                    bytes.resize(4, 0);
                    ifd.extend_from_slice(&bytes);
                } else {
                    ifd.extend_from_slice(&data_offset.to_le_bytes());
                    data_offset += bytes.len() as u32;
                    data.extend_from_slice(&bytes);
                }
            }
            ExifEntry::Short(_, value) => {
                ifd.extend_from_slice(&3u16.to_le_bytes());
                ifd.extend_from_slice(&1u32.to_le_bytes());
                ifd.extend_from_slice(&value.to_le_bytes());
                ifd.extend_from_slice(&[0, 0]);
            }
        }
    }
    ifd.extend_from_slice(&0u32.to_le_bytes());

    let mut tiff = vec![b'I', b'I', 0x2a, 0x00];
    tiff.extend_from_slice(&8u32.to_le_bytes());
    tiff.extend_from_slice(&ifd);
    tiff.extend_from_slice(&data);
    tiff
}

/// Encodes `image` as JPEG and splices an APP1 EXIF segment in after SOI.
pub fn jpeg_with_exif(image: &DynamicImage, entries: &[ExifEntry]) -> Vec<u8> {
    let mut jpeg = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
        .unwrap();
    assert_eq!(&jpeg[..2], &[0xff, 0xd8]);

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&tiff_block(entries));

    let mut segment = vec![0xff, 0xe1];
    segment.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    segment.extend_from_slice(&payload);

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&segment);
    out.extend_from_slice(&jpeg[2..]);
    out
}

pub fn write_jpeg_with_exif(path: &Path, entries: &[ExifEntry]) {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([200, 190, 180])));
    std::fs::write(path, jpeg_with_exif(&image, entries)).unwrap();
}

/// White sheet on a dark desk: `width` x `height` canvas with the sheet
/// covering the inner region between `margin` pixels of background.
pub fn receipt_on_desk(width: u32, height: u32, margin: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let inside = x >= margin && x < width - margin && y >= margin && y < height - margin;
        Luma([if inside { 245 } else { 20 }])
    })
}

/// High-variance texture with no flat tiles at any common patch size.
pub fn busy_texture(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| Luma([((x * 37 + y * 91) % 256) as u8]))
}
