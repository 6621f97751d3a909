use std::time::Duration;

use async_trait::async_trait;
use catoon_contracts::{GeneratedImage, Style};

use super::AvatarProvider;
use crate::error::ProviderResult;
use crate::placeholder::{placeholder, PlaceholderColor};

/// Development stand-in: waits, then returns a solid fill.
#[derive(Debug, Clone, Copy)]
pub struct MockProvider {
    delay: Duration,
}

impl MockProvider {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl AvatarProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, _image: &[u8], style: &Style) -> ProviderResult<GeneratedImage> {
        tracing::debug!(style = %style, delay_ms = self.delay.as_millis() as u64, "mock generation");
        tokio::time::sleep(self.delay).await;
        Ok(placeholder(PlaceholderColor::Mock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn waits_for_the_delay_then_returns_the_mock_fill() -> anyhow::Result<()> {
        let started = std::time::Instant::now();
        let image = MockProvider::new(Duration::from_millis(20))
            .generate(b"", &Style::default())
            .await?;
        assert!(started.elapsed() >= Duration::from_millis(20));
        let pixel = image::load_from_memory(&image.bytes)?.to_rgba8().get_pixel(0, 0).0;
        assert_eq!(pixel, [255, 107, 107, 255]);
        Ok(())
    }
}
