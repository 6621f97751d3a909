use catoon_contracts::{Brightness, Contrast, EyeRegion, FurColor, FurPattern, ImageFeatures};
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};

use crate::config::ExtractorKind;
use crate::error::ProviderResult;

const SAMPLE_EDGE: u32 = 50;
const EDGE_THRESHOLD: u8 = 50;
const LAPLACIAN: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 8.0, -1.0, -1.0, -1.0, -1.0];

/// Derives coarse visual descriptors from an encoded photo.
///
/// Implementations never fail: on any internal fault they return
/// [`ImageFeatures::fallback`].
pub trait FeatureExtractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, image: &[u8]) -> ImageFeatures;
}

pub fn feature_extractor_for(kind: ExtractorKind) -> Box<dyn FeatureExtractor> {
    match kind {
        ExtractorKind::Pixel => Box::new(PixelFeatureExtractor),
        ExtractorKind::Heuristic => Box::new(HeuristicFeatureExtractor),
    }
}

/// Full pixel analysis: channel statistics, a 50×50 color census and
/// Laplacian edge density.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelFeatureExtractor;

impl FeatureExtractor for PixelFeatureExtractor {
    fn name(&self) -> &'static str {
        "pixel"
    }

    fn extract(&self, image: &[u8]) -> ImageFeatures {
        match analyze(image) {
            Ok(features) => features,
            Err(err) => {
                tracing::warn!(error = %err, "feature analysis failed; using fallback features");
                ImageFeatures::fallback()
            }
        }
    }
}

/// Degraded variant that only looks at the encoded byte length.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicFeatureExtractor;

impl FeatureExtractor for HeuristicFeatureExtractor {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn extract(&self, image: &[u8]) -> ImageFeatures {
        let size = image.len();
        let brightness = if size > 500_000 {
            Brightness::Bright
        } else if size < 200_000 {
            Brightness::Dark
        } else {
            Brightness::Medium
        };
        let contrast = if size > 300_000 {
            Contrast::High
        } else {
            Contrast::Medium
        };
        ImageFeatures {
            dominant_colors: vec![FurColor::Brown, FurColor::White, FurColor::Gray],
            brightness,
            contrast,
            fur_pattern: FurPattern::Solid,
            eye_region: EyeRegion::Medium,
        }
    }
}

fn analyze(image: &[u8]) -> ProviderResult<ImageFeatures> {
    let decoded = image::load_from_memory(image)?;
    // Alpha is dropped, so translucent pixels count at their RGB value.
    let rgb = decoded.to_rgb8();
    let stats = ChannelStats::of(&rgb)
        .ok_or_else(|| crate::error::ProviderError::decode("image has no pixels"))?;

    let mean = stats.mean_of_means();
    let stdev = stats.mean_of_stdevs();

    // Colors and edge density are both measured on the 50×50 sample.
    let sample = decoded.resize_to_fill(SAMPLE_EDGE, SAMPLE_EDGE, FilterType::Triangle);

    Ok(ImageFeatures {
        dominant_colors: dominant_colors(&sample.to_rgb8()),
        brightness: classify_brightness(mean),
        contrast: classify_contrast(stdev),
        fur_pattern: estimate_fur_pattern(&sample.to_luma8()),
        eye_region: classify_eye_region(mean),
    })
}

struct ChannelStats {
    means: [f64; 3],
    stdevs: [f64; 3],
}

impl ChannelStats {
    fn of(image: &RgbImage) -> Option<Self> {
        let count = image.width() as f64 * image.height() as f64;
        if count == 0.0 {
            return None;
        }
        let mut sums = [0f64; 3];
        let mut squares = [0f64; 3];
        for pixel in image.pixels() {
            for (channel, value) in pixel.0.iter().enumerate() {
                let value = *value as f64;
                sums[channel] += value;
                squares[channel] += value * value;
            }
        }
        let mut means = [0f64; 3];
        let mut stdevs = [0f64; 3];
        for channel in 0..3 {
            let mean = sums[channel] / count;
            means[channel] = mean;
            stdevs[channel] = (squares[channel] / count - mean * mean).max(0.0).sqrt();
        }
        Some(Self { means, stdevs })
    }

    fn mean_of_means(&self) -> f64 {
        self.means.iter().sum::<f64>() / 3.0
    }

    fn mean_of_stdevs(&self) -> f64 {
        self.stdevs.iter().sum::<f64>() / 3.0
    }
}

fn classify_brightness(mean: f64) -> Brightness {
    if mean > 170.0 {
        Brightness::Bright
    } else if mean < 100.0 {
        Brightness::Dark
    } else {
        Brightness::Medium
    }
}

fn classify_contrast(stdev: f64) -> Contrast {
    if stdev > 60.0 {
        Contrast::High
    } else if stdev < 30.0 {
        Contrast::Low
    } else {
        Contrast::Medium
    }
}

fn classify_eye_region(mean: f64) -> EyeRegion {
    if mean > 150.0 {
        EyeRegion::Light
    } else if mean < 120.0 {
        EyeRegion::Dark
    } else {
        EyeRegion::Medium
    }
}

fn dominant_colors(sample: &RgbImage) -> Vec<FurColor> {
    let mut counts = [0usize; 9];
    let mut first_seen = [usize::MAX; 9];
    for (idx, pixel) in sample.pixels().enumerate() {
        let [r, g, b] = pixel.0;
        let bucket = bucket_index(classify_color(r, g, b));
        counts[bucket] += 1;
        if first_seen[bucket] == usize::MAX {
            first_seen[bucket] = idx;
        }
    }
    let mut order: Vec<usize> = (0..counts.len()).filter(|idx| counts[*idx] > 0).collect();
    order.sort_by(|a, b| counts[*b].cmp(&counts[*a]).then(first_seen[*a].cmp(&first_seen[*b])));
    order
        .into_iter()
        .take(ImageFeatures::MAX_DOMINANT_COLORS)
        .map(|idx| FurColor::ALL[idx])
        .collect()
}

fn bucket_index(color: FurColor) -> usize {
    FurColor::ALL
        .iter()
        .position(|candidate| *candidate == color)
        .unwrap_or(0)
}

pub(crate) fn classify_color(r: u8, g: u8, b: u8) -> FurColor {
    let gray = (r as f32 + g as f32 + b as f32) / 3.0;
    if gray < 60.0 {
        return FurColor::Black;
    }
    if gray > 200.0 {
        return FurColor::White;
    }
    if gray > 120.0 && gray < 180.0 {
        return FurColor::Gray;
    }

    if r > g && r > b {
        if r > 150 && g < 100 && b < 100 {
            return FurColor::Red;
        }
        if r > 120 && g > 80 && b < 80 {
            return FurColor::Orange;
        }
        return FurColor::Brown;
    }
    if g > r && g > b {
        return FurColor::Green;
    }
    if b > r && b > g {
        return FurColor::Blue;
    }

    if r > 100 && g > 100 && b < 80 {
        return FurColor::Yellow;
    }
    if r > 80 && g > 50 && b > 50 {
        return FurColor::Brown;
    }
    FurColor::Gray
}

fn estimate_fur_pattern(gray: &GrayImage) -> FurPattern {
    let total = gray.width() as usize * gray.height() as usize;
    if total == 0 {
        return FurPattern::Solid;
    }
    let edges: GrayImage = imageops::filter3x3(gray, &LAPLACIAN);
    let edge_count = edges
        .pixels()
        .filter(|pixel| pixel.0[0] > EDGE_THRESHOLD)
        .count();
    classify_edge_density(edge_count as f64 / total as f64)
}

fn classify_edge_density(density: f64) -> FurPattern {
    if density > 0.3 {
        FurPattern::Striped
    } else if density > 0.2 {
        FurPattern::Spotted
    } else if density > 0.1 {
        FurPattern::Mixed
    } else {
        FurPattern::Solid
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgb};

    use super::*;

    pub(crate) fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), format)
            .expect("encode test image");
        bytes
    }

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        encode(&RgbImage::from_pixel(width, height, Rgb(rgb)), ImageFormat::Png)
    }

    #[test]
    fn white_photo_is_bright_low_contrast_and_solid() {
        let features = PixelFeatureExtractor.extract(&solid(64, 64, [250, 250, 250]));
        assert_eq!(features.dominant_colors, vec![FurColor::White]);
        assert_eq!(features.brightness, Brightness::Bright);
        assert_eq!(features.contrast, Contrast::Low);
        assert_eq!(features.fur_pattern, FurPattern::Solid);
        assert_eq!(features.eye_region, EyeRegion::Light);
    }

    #[test]
    fn dark_photo_is_dark_everywhere() {
        let features = PixelFeatureExtractor.extract(&solid(40, 80, [20, 20, 30]));
        assert_eq!(features.dominant_colors, vec![FurColor::Black]);
        assert_eq!(features.brightness, Brightness::Dark);
        assert_eq!(features.eye_region, EyeRegion::Dark);
    }

    #[test]
    fn dominant_colors_are_ranked_by_frequency() {
        let image = RgbImage::from_fn(50, 50, |_, y| match y {
            0..=29 => Rgb([200, 110, 20]),
            30..=44 => Rgb([110, 70, 40]),
            _ => Rgb([255, 255, 255]),
        });
        let features = PixelFeatureExtractor.extract(&encode(&image, ImageFormat::Png));
        assert_eq!(
            features.dominant_colors,
            vec![FurColor::Orange, FurColor::Brown, FurColor::White]
        );
    }

    #[test]
    fn thin_stripes_read_as_striped_high_contrast() {
        let image = RgbImage::from_fn(64, 64, |x, _| {
            if x % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let features = PixelFeatureExtractor.extract(&encode(&image, ImageFormat::Png));
        assert_eq!(features.fur_pattern, FurPattern::Striped);
        assert_eq!(features.contrast, Contrast::High);
        assert_eq!(features.brightness, Brightness::Medium);
    }

    #[test]
    fn wide_stripes_on_a_large_photo_read_as_striped() {
        let image = RgbImage::from_fn(1600, 1600, |x, _| {
            if (x / 32) % 2 == 0 {
                Rgb([230, 150, 60])
            } else {
                Rgb([40, 30, 20])
            }
        });
        let features = PixelFeatureExtractor.extract(&encode(&image, ImageFormat::Png));
        assert_eq!(features.fur_pattern, FurPattern::Striped);
    }

    #[test]
    fn extraction_is_deterministic() {
        let image = RgbImage::from_fn(90, 60, |x, y| Rgb([(x * 2) as u8, (y * 3) as u8, 90]));
        let bytes = encode(&image, ImageFormat::Jpeg);
        let first = PixelFeatureExtractor.extract(&bytes);
        let second = PixelFeatureExtractor.extract(&bytes);
        assert_eq!(first, second);
        assert!(!first.dominant_colors.is_empty());
        assert!(first.dominant_colors.len() <= ImageFeatures::MAX_DOMINANT_COLORS);
    }

    #[test]
    fn garbage_input_yields_fallback_features() {
        assert_eq!(
            PixelFeatureExtractor.extract(b"definitely not an image"),
            ImageFeatures::fallback()
        );
        assert_eq!(PixelFeatureExtractor.extract(&[]), ImageFeatures::fallback());
    }

    #[test]
    fn heuristic_extractor_reads_byte_length() {
        let small = HeuristicFeatureExtractor.extract(&vec![0u8; 10]);
        assert_eq!(small.brightness, Brightness::Dark);
        assert_eq!(small.contrast, Contrast::Medium);
        assert_eq!(
            small.dominant_colors,
            vec![FurColor::Brown, FurColor::White, FurColor::Gray]
        );

        let medium = HeuristicFeatureExtractor.extract(&vec![0u8; 350_000]);
        assert_eq!(medium.brightness, Brightness::Medium);
        assert_eq!(medium.contrast, Contrast::High);

        let large = HeuristicFeatureExtractor.extract(&vec![0u8; 600_000]);
        assert_eq!(large.brightness, Brightness::Bright);
        assert_eq!(large.fur_pattern, FurPattern::Solid);
        assert_eq!(large.eye_region, EyeRegion::Medium);
    }

    #[test]
    fn color_buckets_follow_threshold_order() {
        assert_eq!(classify_color(10, 10, 10), FurColor::Black);
        assert_eq!(classify_color(230, 230, 230), FurColor::White);
        assert_eq!(classify_color(150, 150, 150), FurColor::Gray);
        assert_eq!(classify_color(220, 90, 30), FurColor::Red);
        assert_eq!(classify_color(200, 110, 20), FurColor::Orange);
        assert_eq!(classify_color(110, 70, 40), FurColor::Brown);
        assert_eq!(classify_color(40, 160, 60), FurColor::Green);
        assert_eq!(classify_color(40, 60, 170), FurColor::Blue);
        assert_eq!(classify_color(110, 110, 20), FurColor::Yellow);
    }

    #[test]
    fn selection_happens_by_kind() {
        assert_eq!(feature_extractor_for(ExtractorKind::Pixel).name(), "pixel");
        assert_eq!(
            feature_extractor_for(ExtractorKind::Heuristic).name(),
            "heuristic"
        );
    }
}
