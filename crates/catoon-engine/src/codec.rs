use std::io::Cursor;

use catoon_contracts::GeneratedImage;
use image::{DynamicImage, ImageFormat};

use crate::error::{ProviderError, ProviderResult};

pub fn encode_png(image: &DynamicImage) -> ProviderResult<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Normalizes a provider payload to PNG. PNG bytes pass through untouched;
/// other decodable formats are transcoded; anything else is rejected.
pub fn ensure_png(bytes: Vec<u8>) -> ProviderResult<GeneratedImage> {
    if bytes.is_empty() {
        return Err(ProviderError::decode("provider returned an empty payload"));
    }
    let format = image::guess_format(&bytes)
        .map_err(|err| ProviderError::decode(format!("unrecognised payload: {err}")))?;
    if format == ImageFormat::Png {
        return Ok(GeneratedImage::png(bytes));
    }
    let decoded = image::load_from_memory_with_format(&bytes, format)?;
    tracing::debug!(format = ?format, "transcoding provider payload to png");
    Ok(GeneratedImage::png(encode_png(&decoded)?))
}
