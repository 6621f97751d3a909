use async_trait::async_trait;
use catoon_contracts::{GeneratedImage, Style};
use image::imageops::FilterType;
use image::DynamicImage;

use crate::codec::encode_png;
use crate::error::ProviderResult;
use crate::placeholder::{placeholder, PlaceholderColor};
use crate::providers::AvatarProvider;

pub const TRANSFORM_EDGE: u32 = 400;
const SATURATION: f32 = 1.5;
const BRIGHTNESS: f32 = 1.1;
const SHARPEN_SIGMA: f32 = 1.0;
const SHARPEN_THRESHOLD: i32 = 2;

/// Offline enhancement: square crop, color boost, sharpen.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTransform;

impl LocalTransform {
    pub fn try_transform(&self, image: &[u8]) -> ProviderResult<GeneratedImage> {
        let decoded = image::load_from_memory(image)?;
        let mut canvas = decoded
            .resize_to_fill(TRANSFORM_EDGE, TRANSFORM_EDGE, FilterType::Lanczos3)
            .to_rgba8();
        for pixel in canvas.pixels_mut() {
            let [r, g, b, a] = pixel.0;
            let [r, g, b] = enhance(r, g, b);
            pixel.0 = [r, g, b, a];
        }
        let sharpened = DynamicImage::ImageRgba8(canvas).unsharpen(SHARPEN_SIGMA, SHARPEN_THRESHOLD);
        Ok(GeneratedImage::png(encode_png(&sharpened)?))
    }

    /// Like [`try_transform`](Self::try_transform) but heals any fault into
    /// the degraded placeholder.
    pub fn transform(&self, image: &[u8]) -> GeneratedImage {
        match self.try_transform(image) {
            Ok(image) => image,
            Err(err) => {
                tracing::warn!(error = %err, "local transform failed; returning placeholder");
                placeholder(PlaceholderColor::Degraded)
            }
        }
    }
}

#[async_trait]
impl AvatarProvider for LocalTransform {
    fn name(&self) -> &str {
        "local"
    }

    async fn generate(&self, image: &[u8], _style: &Style) -> ProviderResult<GeneratedImage> {
        self.try_transform(image)
    }
}

fn enhance(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (h, s, l) = rgb_to_hsl(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let (r, g, b) = hsl_to_rgb(h, (s * SATURATION).min(1.0), l);
    [brighten(r), brighten(g), brighten(b)]
}

fn brighten(channel: f32) -> u8 {
    (channel * 255.0 * BRIGHTNESS).round().clamp(0.0, 255.0) as u8
}

fn rgb_to_hsl(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    if max == min {
        return (0.0, 0.0, l);
    }
    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    (h / 6.0, s, l)
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    if s == 0.0 {
        return (l, l, l);
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    (
        hue_to_channel(p, q, h + 1.0 / 3.0),
        hue_to_channel(p, q, h),
        hue_to_channel(p, q, h - 1.0 / 3.0),
    )
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = if t < 0.0 {
        t + 1.0
    } else if t > 1.0 {
        t - 1.0
    } else {
        t
    };
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}
