use catoon_contracts::GeneratedImage;
use image::{DynamicImage, Rgba, RgbaImage};

use crate::codec::encode_png;

pub const PLACEHOLDER_EDGE: u32 = 400;

/// Solid fills used when no real avatar can be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderColor {
    /// Development stand-in returned by the mock provider.
    Mock,
    /// Degraded result for when every stage failed.
    Degraded,
}

impl PlaceholderColor {
    pub fn rgb(self) -> [u8; 3] {
        match self {
            PlaceholderColor::Mock => [255, 107, 107],
            PlaceholderColor::Degraded => [100, 200, 255],
        }
    }
}

/// 400×400 opaque RGBA PNG filled with `color`.
pub fn placeholder(color: PlaceholderColor) -> GeneratedImage {
    let [r, g, b] = color.rgb();
    let canvas = RgbaImage::from_pixel(PLACEHOLDER_EDGE, PLACEHOLDER_EDGE, Rgba([r, g, b, 255]));
    match encode_png(&DynamicImage::ImageRgba8(canvas)) {
        Ok(bytes) => GeneratedImage::png(bytes),
        Err(err) => {
            // In-memory PNG encoding of a fixed-size buffer does not fail in practice.
            tracing::error!(error = %err, "placeholder encoding failed");
            GeneratedImage::png(Vec::new())
        }
    }
}
