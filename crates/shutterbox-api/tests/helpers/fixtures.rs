//! Media fixtures built in memory.

use image::{ImageFormat, RgbImage};
use std::io::Cursor;

/// A decodable PNG of the given dimensions.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .expect("Failed to encode fixture PNG");
    buf.into_inner()
}
