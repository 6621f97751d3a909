use std::time::Instant;

use catoon_contracts::providers::ProviderRegistry;
use catoon_contracts::{GeneratedImage, Style};
use reqwest::Client;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::placeholder::{placeholder, PlaceholderColor};
use crate::providers::{provider_by_name, AvatarProvider, PROVIDER_NAMES};

/// `served_by` value when no stage produced an image.
pub const PLACEHOLDER_STAGE: &str = "placeholder";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptReport {
    pub stage: String,
    pub outcome: AttemptOutcome,
    pub error: Option<String>,
    pub error_kind: Option<&'static str>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct AvatarOutcome {
    pub image: GeneratedImage,
    pub attempts: Vec<AttemptReport>,
    pub served_by: String,
}

impl AvatarOutcome {
    pub fn is_placeholder(&self) -> bool {
        self.served_by == PLACEHOLDER_STAGE
    }
}

/// Ordered fallback chain over avatar providers.
///
/// Stages run one at a time; the first success wins. When every stage
/// fails the terminal placeholder is returned, so generation never errors.
pub struct AvatarPipeline {
    stages: Vec<Box<dyn AvatarProvider>>,
    terminal: PlaceholderColor,
}

impl AvatarPipeline {
    pub fn new(stages: Vec<Box<dyn AvatarProvider>>, terminal: PlaceholderColor) -> Self {
        Self { stages, terminal }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::from_config_with_client(config, Client::new())
    }

    pub fn from_config_with_client(config: &EngineConfig, client: Client) -> Self {
        for name in &config.chain {
            if !PROVIDER_NAMES.contains(&name.trim()) {
                tracing::warn!(provider = %name, "unknown provider in chain; skipping");
            }
        }
        let registry = ProviderRegistry::new(
            PROVIDER_NAMES
                .iter()
                .filter_map(|name| provider_by_name(name, config, &client))
                .collect(),
        );
        Self::new(registry.into_ordered(&config.chain), PlaceholderColor::Degraded)
    }

    pub fn stage_names(&self) -> Vec<String> {
        self.stages
            .iter()
            .map(|stage| stage.name().to_string())
            .collect()
    }

    pub async fn generate_avatar(&self, image: &[u8], style: &Style) -> GeneratedImage {
        self.generate_avatar_with_report(image, style).await.image
    }

    pub async fn generate_avatar_with_report(&self, image: &[u8], style: &Style) -> AvatarOutcome {
        let mut attempts = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let name = stage.name();
            let started = Instant::now();
            tracing::info!(stage = name, style = %style, "avatar stage started");
            let result = stage.generate(image, style).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match result {
                Ok(generated) => {
                    tracing::info!(stage = name, bytes = generated.len(), elapsed_ms, "avatar stage succeeded");
                    attempts.push(AttemptReport {
                        stage: name.to_string(),
                        outcome: AttemptOutcome::Succeeded,
                        error: None,
                        error_kind: None,
                        elapsed_ms,
                    });
                    return AvatarOutcome {
                        image: generated,
                        attempts,
                        served_by: name.to_string(),
                    };
                }
                Err(err) => {
                    tracing::warn!(stage = name, kind = err.kind(), error = %err, elapsed_ms, "avatar stage failed");
                    attempts.push(AttemptReport {
                        stage: name.to_string(),
                        outcome: AttemptOutcome::Failed,
                        error: Some(err.to_string()),
                        error_kind: Some(err.kind()),
                        elapsed_ms,
                    });
                }
            }
        }
        tracing::warn!(attempts = attempts.len(), "every avatar stage failed; returning placeholder");
        AvatarOutcome {
            image: placeholder(self.terminal),
            attempts,
            served_by: PLACEHOLDER_STAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use image::{ImageFormat, Rgb, RgbImage};

    use super::*;
    use crate::error::{ProviderError, ProviderResult};
    use crate::features::tests::encode;
    use crate::transform::LocalTransform;

    struct Scripted {
        name: &'static str,
        reply: Option<Vec<u8>>,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn ok(name: &'static str, bytes: Vec<u8>) -> (Box<dyn AvatarProvider>, Arc<AtomicUsize>) {
            Self::boxed(name, Some(bytes))
        }

        fn failing(name: &'static str) -> (Box<dyn AvatarProvider>, Arc<AtomicUsize>) {
            Self::boxed(name, None)
        }

        fn boxed(name: &'static str, reply: Option<Vec<u8>>) -> (Box<dyn AvatarProvider>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let provider = Scripted {
                name,
                reply,
                calls: calls.clone(),
            };
            (Box::new(provider), calls)
        }
    }

    #[async_trait]
    impl AvatarProvider for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn generate(&self, _image: &[u8], _style: &Style) -> ProviderResult<GeneratedImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Some(bytes) => Ok(GeneratedImage::png(bytes.clone())),
                None => Err(ProviderError::Timeout {
                    provider: self.name.to_string(),
                }),
            }
        }
    }

    fn photo_jpeg() -> Vec<u8> {
        encode(
            &RgbImage::from_fn(300, 200, |x, y| Rgb([(x % 200) as u8 + 30, (y % 150) as u8 + 40, 90])),
            ImageFormat::Jpeg,
        )
    }

    #[tokio::test]
    async fn primary_success_short_circuits_the_chain() {
        let png = encode(&RgbImage::from_pixel(512, 512, Rgb([10, 20, 30])), ImageFormat::Png);
        let (primary, primary_calls) = Scripted::ok("siliconcloud", png.clone());
        let (secondary, secondary_calls) = Scripted::ok("huggingface", vec![1, 2, 3]);
        let pipeline = AvatarPipeline::new(
            vec![primary, secondary, Box::new(LocalTransform)],
            PlaceholderColor::Degraded,
        );

        let outcome = pipeline
            .generate_avatar_with_report(&photo_jpeg(), &Style::new("cartoon"))
            .await;
        assert_eq!(outcome.image.bytes, png);
        assert_eq!(outcome.image.mime_type, "image/png");
        assert_eq!(outcome.served_by, "siliconcloud");
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.attempts.len(), 1);
    }

    #[tokio::test]
    async fn remote_failures_fall_back_to_the_local_transform() -> anyhow::Result<()> {
        let (primary, primary_calls) = Scripted::failing("siliconcloud");
        let (secondary, secondary_calls) = Scripted::failing("huggingface");
        let pipeline = AvatarPipeline::new(
            vec![primary, secondary, Box::new(LocalTransform)],
            PlaceholderColor::Degraded,
        );

        let outcome = pipeline
            .generate_avatar_with_report(&photo_jpeg(), &Style::default())
            .await;
        assert_eq!(outcome.served_by, "local");
        assert_eq!(outcome.image.dimensions()?, (400, 400));
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 1);

        let stages: Vec<(&str, AttemptOutcome)> = outcome
            .attempts
            .iter()
            .map(|attempt| (attempt.stage.as_str(), attempt.outcome))
            .collect();
        assert_eq!(
            stages,
            vec![
                ("siliconcloud", AttemptOutcome::Failed),
                ("huggingface", AttemptOutcome::Failed),
                ("local", AttemptOutcome::Succeeded),
            ]
        );
        assert_eq!(outcome.attempts[0].error_kind, Some("network_timeout"));
        Ok(())
    }

    #[tokio::test]
    async fn total_failure_returns_the_degraded_placeholder() -> anyhow::Result<()> {
        let (primary, _) = Scripted::failing("siliconcloud");
        let (secondary, _) = Scripted::failing("huggingface");
        let pipeline = AvatarPipeline::new(
            vec![primary, secondary, Box::new(LocalTransform)],
            PlaceholderColor::Degraded,
        );

        let outcome = pipeline
            .generate_avatar_with_report(b"not an image at all", &Style::default())
            .await;
        assert!(outcome.is_placeholder());
        assert_eq!(
            outcome.attempts.last().and_then(|attempt| attempt.error_kind),
            Some("decode_failure")
        );
        let decoded = image::load_from_memory(&outcome.image.bytes)?.to_rgba8();
        assert_eq!(decoded.dimensions(), (400, 400));
        assert!(decoded.pixels().all(|pixel| pixel.0 == [100, 200, 255, 255]));
        Ok(())
    }

    #[tokio::test]
    async fn empty_chain_still_yields_an_image() -> anyhow::Result<()> {
        let pipeline = AvatarPipeline::new(Vec::new(), PlaceholderColor::Degraded);
        let image = pipeline.generate_avatar(b"", &Style::default()).await;
        assert_eq!(image.dimensions()?, (400, 400));
        Ok(())
    }

    #[tokio::test]
    async fn default_config_chain_runs_offline_to_the_local_transform() -> anyhow::Result<()> {
        let pipeline = AvatarPipeline::from_config(&EngineConfig::default());
        assert_eq!(
            pipeline.stage_names(),
            vec!["siliconcloud", "huggingface", "local"]
        );
        let outcome = pipeline
            .generate_avatar_with_report(&photo_jpeg(), &Style::default())
            .await;
        assert_eq!(outcome.served_by, "local");
        assert_eq!(outcome.attempts[0].error_kind, Some("credential_missing"));
        assert_eq!(outcome.attempts[1].error_kind, Some("credential_missing"));
        Ok(())
    }

    #[test]
    fn chain_order_is_configuration() {
        let config = EngineConfig::from_lookup(|name| match name {
            "CATOON_PROVIDERS" => Some("local,mock,nonsense,openai".to_string()),
            _ => None,
        });
        let pipeline = AvatarPipeline::from_config(&config);
        assert_eq!(pipeline.stage_names(), vec!["local", "mock", "openai"]);
    }
}
