use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FurColor {
    Black,
    White,
    Gray,
    Brown,
    Orange,
    Red,
    Yellow,
    Blue,
    Green,
}

impl FurColor {
    pub const ALL: [FurColor; 9] = [
        FurColor::Black,
        FurColor::White,
        FurColor::Gray,
        FurColor::Brown,
        FurColor::Orange,
        FurColor::Red,
        FurColor::Yellow,
        FurColor::Blue,
        FurColor::Green,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FurColor::Black => "black",
            FurColor::White => "white",
            FurColor::Gray => "gray",
            FurColor::Brown => "brown",
            FurColor::Orange => "orange",
            FurColor::Red => "red",
            FurColor::Yellow => "yellow",
            FurColor::Blue => "blue",
            FurColor::Green => "green",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|color| color.as_str() == normalized)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Brightness {
    Bright,
    Dark,
    Medium,
}

impl Brightness {
    pub fn as_str(self) -> &'static str {
        match self {
            Brightness::Bright => "bright",
            Brightness::Dark => "dark",
            Brightness::Medium => "medium",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Contrast {
    High,
    Low,
    Medium,
}

impl Contrast {
    pub fn as_str(self) -> &'static str {
        match self {
            Contrast::High => "high",
            Contrast::Low => "low",
            Contrast::Medium => "medium",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FurPattern {
    Solid,
    Striped,
    Spotted,
    Mixed,
}

impl FurPattern {
    pub fn as_str(self) -> &'static str {
        match self {
            FurPattern::Solid => "solid",
            FurPattern::Striped => "striped",
            FurPattern::Spotted => "spotted",
            FurPattern::Mixed => "mixed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EyeRegion {
    Light,
    Dark,
    Medium,
}

impl EyeRegion {
    pub fn as_str(self) -> &'static str {
        match self {
            EyeRegion::Light => "light",
            EyeRegion::Dark => "dark",
            EyeRegion::Medium => "medium",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(FurColor, Brightness, Contrast, FurPattern, EyeRegion);

/// Coarse visual descriptors of a cat photo used to condition prompts.
///
/// Always fully populated: extractors return [`ImageFeatures::fallback`]
/// instead of a partial value when analysis fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFeatures {
    pub dominant_colors: Vec<FurColor>,
    pub brightness: Brightness,
    pub contrast: Contrast,
    pub fur_pattern: FurPattern,
    pub eye_region: EyeRegion,
}

impl ImageFeatures {
    pub const MAX_DOMINANT_COLORS: usize = 3;

    pub fn fallback() -> Self {
        Self {
            dominant_colors: vec![FurColor::Brown, FurColor::White],
            brightness: Brightness::Medium,
            contrast: Contrast::Medium,
            fur_pattern: FurPattern::Solid,
            eye_region: EyeRegion::Medium,
        }
    }
}

impl Default for ImageFeatures {
    fn default() -> Self {
        Self::fallback()
    }
}
