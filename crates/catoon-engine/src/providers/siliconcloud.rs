use async_trait::async_trait;
use catoon_contracts::models::ModelSpec;
use catoon_contracts::{GeneratedImage, Style};
use rand::Rng;
use reqwest::Client;
use serde_json::{json, Value};

use super::{resolve_model, AvatarProvider};
use crate::config::{EngineConfig, ProviderEndpoint, GENERATION_TIMEOUT};
use crate::error::{ProviderError, ProviderResult};
use crate::features::FeatureExtractor;
use crate::http::{download_image, first_str, response_json_or_error};
use crate::prompt::{build_prompt, NEGATIVE_PROMPT};

const NAME: &str = "siliconcloud";
const SEED_RANGE: std::ops::Range<u32> = 0..1_000_000;

/// Primary cloud diffusion service. Prompts are built from the photo's
/// extracted features; the photo itself is never uploaded.
pub struct SiliconCloudProvider {
    endpoint: ProviderEndpoint,
    model: Option<ModelSpec>,
    extractor: Box<dyn FeatureExtractor>,
    client: Client,
}

impl SiliconCloudProvider {
    pub fn new(config: &EngineConfig, extractor: Box<dyn FeatureExtractor>, client: Client) -> Self {
        Self {
            endpoint: config.siliconcloud.clone(),
            model: resolve_model(&config.models, NAME, config.siliconcloud_model.as_deref()),
            extractor,
            client,
        }
    }

    fn endpoint_url(&self) -> String {
        format!("{}/images/generations", self.endpoint.api_base)
    }

    fn request_body(model: &ModelSpec, prompt: &str, seed: u32) -> Value {
        json!({
            "model": model.name,
            "prompt": prompt,
            "negative_prompt": NEGATIVE_PROMPT,
            "image_size": model.size_label('x'),
            "batch_size": 1,
            "num_inference_steps": model.inference_steps.unwrap_or(25),
            "guidance_scale": model.guidance_scale.unwrap_or(8.0),
            "seed": seed,
        })
    }
}

#[async_trait]
impl AvatarProvider for SiliconCloudProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn generate(&self, image: &[u8], style: &Style) -> ProviderResult<GeneratedImage> {
        let Some(api_key) = self.endpoint.api_key.as_deref() else {
            return Err(ProviderError::credential_missing(NAME, "SILICONCLOUD_API_KEY"));
        };
        let Some(model) = self.model.as_ref() else {
            return Err(ProviderError::rejected(NAME, None, "no model configured"));
        };

        let features = self.extractor.extract(image);
        let prompt = build_prompt(&features, style);
        tracing::debug!(
            extractor = self.extractor.name(),
            features = ?features,
            prompt = %prompt,
            "siliconcloud prompt"
        );

        let seed = rand::thread_rng().gen_range(SEED_RANGE);
        let response = self
            .client
            .post(self.endpoint_url())
            .bearer_auth(api_key)
            .timeout(GENERATION_TIMEOUT)
            .json(&Self::request_body(model, &prompt, seed))
            .send()
            .await
            .map_err(|err| ProviderError::from_reqwest(NAME, err))?;
        let payload = response_json_or_error(NAME, response).await?;

        let Some(url) = first_str(&payload, &["/data/0/url", "/images/0/url"]) else {
            return Err(ProviderError::rejected(
                NAME,
                None,
                "response carried no image url",
            ));
        };
        download_image(&self.client, NAME, url).await
    }
}

#[cfg(test)]
mod tests {
    use image::{ImageFormat, Rgb, RgbImage};

    use super::*;
    use crate::features::tests::encode;
    use crate::features::PixelFeatureExtractor;
    use crate::http::tests::{serve, Reply};

    fn provider(base: &str, key: Option<&str>) -> SiliconCloudProvider {
        let base = base.to_string();
        let key = key.map(str::to_string);
        let config = EngineConfig::from_lookup(move |name| match name {
            "SILICONCLOUD_API_BASE" => Some(base.clone()),
            "SILICONCLOUD_API_KEY" => key.clone(),
            _ => None,
        });
        SiliconCloudProvider::new(&config, Box::new(PixelFeatureExtractor), Client::new())
    }

    #[tokio::test]
    async fn posts_feature_prompt_and_downloads_result() -> anyhow::Result<()> {
        let png = encode(&RgbImage::from_pixel(16, 16, Rgb([9, 9, 9])), ImageFormat::Png);
        let (image_base, image_rx) = serve(vec![Reply::bytes("image/png", png.clone())]);
        let (api_base, api_rx) = serve(vec![Reply::json(
            200,
            json!({"data": [{"url": format!("{image_base}/out/0.png")}]}),
        )]);

        let photo = encode(&RgbImage::from_pixel(32, 32, Rgb([250, 250, 250])), ImageFormat::Png);
        let image = provider(&api_base, Some("sk-test"))
            .generate(&photo, &Style::new("pixel"))
            .await?;
        assert_eq!(image.bytes, png);

        let request = api_rx.recv()?;
        assert_eq!(request.request_line, "POST /images/generations HTTP/1.1");
        assert_eq!(request.header("authorization").as_deref(), Some("Bearer sk-test"));
        let body = request.json();
        assert_eq!(body["model"], "stabilityai/stable-diffusion-xl-base-1.0");
        assert_eq!(body["image_size"], "1024x1024");
        assert_eq!(body["batch_size"], 1);
        assert_eq!(body["num_inference_steps"], 25);
        assert_eq!(body["guidance_scale"], 8.0);
        assert!(body["seed"].as_u64().map(|seed| seed < 1_000_000).unwrap_or(false));
        let prompt = body["prompt"].as_str().unwrap_or_default();
        assert!(prompt.contains("white fur"), "{prompt}");
        assert!(prompt.contains("pixel style"), "{prompt}");
        assert_eq!(body["negative_prompt"], NEGATIVE_PROMPT);

        assert_eq!(image_rx.recv()?.request_line, "GET /out/0.png HTTP/1.1");
        Ok(())
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let err = provider("http://127.0.0.1:9", None)
            .generate(b"photo", &Style::default())
            .await
            .err()
            .map(|err| err.kind());
        assert_eq!(err, Some("credential_missing"));
    }

    #[tokio::test]
    async fn empty_result_list_is_rejected() {
        let (api_base, _rx) = serve(vec![Reply::json(200, json!({"data": []}))]);
        let err = provider(&api_base, Some("sk-test"))
            .generate(b"photo", &Style::default())
            .await
            .err()
            .map(|err| err.to_string());
        assert_eq!(
            err.as_deref(),
            Some("siliconcloud rejected the request: response carried no image url")
        );
    }
}
