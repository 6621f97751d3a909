use async_trait::async_trait;
use catoon_contracts::models::ModelSpec;
use catoon_contracts::{GeneratedImage, Style};
use reqwest::Client;
use serde::Serialize;
use serde_json::json;

use super::AvatarProvider;
use crate::config::{EngineConfig, ProviderEndpoint, GENERATION_TIMEOUT};
use crate::error::{ProviderError, ProviderResult};
use crate::http::image_or_error;
use crate::prompt::{build_host_prompt, HOST_NEGATIVE_PROMPT};

const NAME: &str = "huggingface";
const TOKEN_PREFIX: &str = "hf_";
const PROBE_PREVIEW_CHARS: usize = 200;

/// Secondary inference host. Walks its candidate models in order and
/// returns the first image any of them produces.
pub struct HuggingFaceProvider {
    endpoint: ProviderEndpoint,
    models: Vec<ModelSpec>,
    client: Client,
}

/// Result of a connectivity check against the first candidate model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub model: String,
    pub status: u16,
    pub ok: bool,
    pub body_preview: String,
}

impl HuggingFaceProvider {
    pub fn new(config: &EngineConfig, client: Client) -> Self {
        Self {
            endpoint: config.huggingface.clone(),
            models: config.models.candidates(NAME),
            client,
        }
    }

    pub fn models(&self) -> &[ModelSpec] {
        &self.models
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/models/{}", self.endpoint.api_base, model)
    }

    fn api_key(&self) -> ProviderResult<&str> {
        self.endpoint
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::credential_missing(NAME, "HUGGINGFACE_API_TOKEN"))
    }

    async fn generate_with(
        &self,
        api_key: &str,
        model: &ModelSpec,
        prompt: &str,
    ) -> ProviderResult<GeneratedImage> {
        let body = json!({
            "inputs": prompt,
            "parameters": {
                "negative_prompt": HOST_NEGATIVE_PROMPT,
                "num_inference_steps": model.inference_steps.unwrap_or(20),
                "guidance_scale": model.guidance_scale.unwrap_or(9.0),
                "width": model.width,
                "height": model.height,
            }
        });
        let response = self
            .client
            .post(self.model_url(&model.name))
            .bearer_auth(api_key)
            .timeout(GENERATION_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::from_reqwest(NAME, err))?;
        image_or_error(NAME, response).await
    }

    /// Checks the token shape and reports how the first candidate model
    /// answers a trivial request.
    pub async fn probe(&self) -> ProviderResult<ProbeReport> {
        let api_key = self.api_key()?;
        if !api_key.starts_with(TOKEN_PREFIX) {
            return Err(ProviderError::rejected(
                NAME,
                None,
                format!("token must start with '{TOKEN_PREFIX}'"),
            ));
        }
        let Some(model) = self.models.first() else {
            return Err(ProviderError::rejected(NAME, None, "no candidate models configured"));
        };
        let response = self
            .client
            .post(self.model_url(&model.name))
            .bearer_auth(api_key)
            .timeout(GENERATION_TIMEOUT)
            .json(&json!({"inputs": "test"}))
            .send()
            .await
            .map_err(|err| ProviderError::from_reqwest(NAME, err))?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Ok(ProbeReport {
            model: model.name.clone(),
            status: status.as_u16(),
            ok: status.is_success(),
            body_preview: body.chars().take(PROBE_PREVIEW_CHARS).collect(),
        })
    }
}

#[async_trait]
impl AvatarProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn generate(&self, _image: &[u8], style: &Style) -> ProviderResult<GeneratedImage> {
        let api_key = self.api_key()?;
        let prompt = build_host_prompt(style);
        for model in &self.models {
            tracing::info!(model = %model.name, "trying huggingface model");
            match self.generate_with(api_key, model, &prompt).await {
                Ok(image) => {
                    tracing::info!(model = %model.name, bytes = image.len(), "huggingface model succeeded");
                    return Ok(image);
                }
                Err(err) => {
                    tracing::warn!(model = %model.name, error = %err, "huggingface model failed; trying next");
                }
            }
        }
        Err(ProviderError::Exhausted {
            provider: NAME.to_string(),
            attempts: self.models.len(),
        })
    }
}
