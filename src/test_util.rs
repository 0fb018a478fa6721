//! Shared test fixtures: small synthetic images encoded in memory.

use chrono::{NaiveDate, NaiveDateTime};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;

use crate::pipeline::SourceImage;

fn gradient_rgba(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
            255,
        ])
    })
}

/// Encode a small gradient PNG in memory.
pub fn encode_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = gradient_rgba(width, height);
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png)
        .expect("encode test png");
    bytes.into_inner()
}

/// Encode a small gradient JPEG in memory.
pub fn encode_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    });
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, 90);
    img.write_with_encoder(encoder).expect("encode test jpeg");
    bytes
}

/// A PNG [`SourceImage`] with a fixed modification instant.
pub fn source_from_png(width: u32, height: u32, name: &str) -> SourceImage {
    let modified: NaiveDateTime = NaiveDate::from_ymd_opt(2023, 6, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    SourceImage::from_bytes(encode_test_png(width, height), name.to_string(), modified)
        .expect("test source image")
}
