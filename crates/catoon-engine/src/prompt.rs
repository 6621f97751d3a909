use catoon_contracts::{Brightness, EyeRegion, FurPattern, ImageFeatures, Style};

pub const NEGATIVE_PROMPT: &str = "ugly, blurry, low quality, distorted, nsfw, realistic, photographic, 2D flat art, anime, manga, watermark, text, signature, cropped, rectangular, elongated, stretched";
pub const HOST_NEGATIVE_PROMPT: &str =
    "ugly, blurry, low quality, distorted, nsfw, realistic, photographic";
pub const REGIONAL_STYLE_HINT: &str = "卡通风格";

/// Full descriptive prompt for the primary diffusion model.
pub fn build_prompt(features: &ImageFeatures, style: &Style) -> String {
    let colors = features
        .dominant_colors
        .iter()
        .map(|color| describe_color(color.as_str()))
        .collect::<Vec<&str>>()
        .join(" and ");
    format!(
        "3D cartoon cat avatar, Pixar animation style, Disney 3D rendering, {colors}, {pattern}, {eyes}, cute round face, big expressive eyes, soft fur texture, vibrant colors, square composition, centered portrait, professional 3D modeling, {style} style, high quality, adorable kawaii, chibi proportions, clean simple background, {lighting}",
        pattern = describe_pattern(features.fur_pattern),
        eyes = describe_eyes(features.eye_region),
        style = style.as_str(),
        lighting = describe_lighting(features.brightness),
    )
}

pub fn build_host_prompt(style: &Style) -> String {
    format!(
        "cute Q-version 3D cartoon cat avatar, kawaii style, big eyes, soft colors, chibi, adorable, simple background, {} style, high quality",
        style.as_str()
    )
}

pub fn build_transform_instruction(style: &Style) -> String {
    format!(
        "Transform this cat photo into a cute cartoon Q-version 3D style avatar. Make it kawaii, adorable, with big eyes, soft colors, and simple background. Style: {}",
        style.as_str()
    )
}

pub fn build_regional_prompt(style: &Style) -> String {
    format!(
        "将这张猫咪照片转换为Q版卡通3D风格头像，可爱风格，大眼睛，柔和色彩，简单背景，{}风格",
        style.as_str()
    )
}

/// Fur phrase for a color token. Unknown tokens pass through unchanged.
pub fn describe_color(token: &str) -> &str {
    match token {
        "black" => "black fur",
        "white" => "white fur",
        "gray" => "gray fur",
        "brown" => "brown fur",
        "orange" => "orange tabby fur",
        "red" => "ginger fur",
        "yellow" => "cream colored fur",
        "blue" => "blue-gray fur",
        "green" => "unusual green-tinted fur",
        other => other,
    }
}

fn describe_pattern(pattern: FurPattern) -> &'static str {
    match pattern {
        FurPattern::Solid => "solid colored fur",
        FurPattern::Striped => "striped tabby pattern",
        FurPattern::Spotted => "spotted pattern",
        FurPattern::Mixed => "mixed fur patterns",
    }
}

fn describe_eyes(eyes: EyeRegion) -> &'static str {
    match eyes {
        EyeRegion::Light => "bright expressive eyes",
        EyeRegion::Dark => "deep dark eyes",
        EyeRegion::Medium => "warm colored eyes",
    }
}

fn describe_lighting(brightness: Brightness) -> &'static str {
    match brightness {
        Brightness::Bright => "well-lit, bright lighting",
        Brightness::Dark => "soft moody lighting",
        Brightness::Medium => "natural lighting",
    }
}

#[cfg(test)]
mod tests {
    use catoon_contracts::{Contrast, FurColor};

    use super::*;

    #[test]
    fn fallback_features_render_the_documented_prompt() {
        let prompt = build_prompt(&ImageFeatures::fallback(), &Style::default());
        assert_eq!(
            prompt,
            "3D cartoon cat avatar, Pixar animation style, Disney 3D rendering, brown fur and white fur, solid colored fur, warm colored eyes, cute round face, big expressive eyes, soft fur texture, vibrant colors, square composition, centered portrait, professional 3D modeling, cartoon style, high quality, adorable kawaii, chibi proportions, clean simple background, natural lighting"
        );
    }

    #[test]
    fn descriptors_follow_features() {
        let features = ImageFeatures {
            dominant_colors: vec![FurColor::Orange, FurColor::Red],
            brightness: Brightness::Bright,
            contrast: Contrast::High,
            fur_pattern: FurPattern::Striped,
            eye_region: EyeRegion::Light,
        };
        let prompt = build_prompt(&features, &Style::new("pixel"));
        assert!(prompt.contains("orange tabby fur and ginger fur"));
        assert!(prompt.contains("striped tabby pattern"));
        assert!(prompt.contains("bright expressive eyes"));
        assert!(prompt.ends_with("well-lit, bright lighting"));
    }

    #[test]
    fn every_builder_carries_the_style_literally() {
        let style = Style::new("watercolor noir");
        let features = ImageFeatures::fallback();
        for prompt in [
            build_prompt(&features, &style),
            build_host_prompt(&style),
            build_transform_instruction(&style),
            build_regional_prompt(&style),
        ] {
            assert!(prompt.contains("watercolor noir"), "{prompt}");
        }
    }

    #[test]
    fn unknown_color_tokens_pass_through() {
        assert_eq!(describe_color("tortoiseshell"), "tortoiseshell");
        assert_eq!(describe_color("yellow"), "cream colored fur");
    }

    #[test]
    fn empty_color_list_still_renders() {
        let features = ImageFeatures {
            dominant_colors: Vec::new(),
            ..ImageFeatures::fallback()
        };
        let prompt = build_prompt(&features, &Style::default());
        assert!(prompt.starts_with("3D cartoon cat avatar, Pixar animation style, Disney 3D rendering, , solid"));
    }
}
