use async_trait::async_trait;
use base64::Engine;
use catoon_contracts::{GeneratedImage, Style};
use reqwest::Client;
use serde_json::{json, Value};

use super::{resolve_model, AvatarProvider};
use crate::codec::ensure_png;
use crate::config::{EngineConfig, ProviderEndpoint, GENERATION_TIMEOUT};
use crate::error::{ProviderError, ProviderResult};
use crate::http::{download_image, first_str, response_json_or_error};
use crate::prompt::build_transform_instruction;

const NAME: &str = "openai";
const DEFAULT_MODEL: &str = "dall-e-3";

/// Any host speaking the OpenAI images API. `api_base` is the full
/// generations URL.
pub struct OpenAiCompatibleProvider {
    endpoint: ProviderEndpoint,
    model: String,
    size: String,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: &EngineConfig, client: Client) -> Self {
        let spec = resolve_model(&config.models, NAME, config.openai_model.as_deref());
        Self {
            endpoint: config.openai.clone(),
            model: spec
                .as_ref()
                .map(|spec| spec.name.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            size: spec
                .as_ref()
                .map(|spec| spec.size_label('x'))
                .unwrap_or_else(|| "1024x1024".to_string()),
            client,
        }
    }

    async fn image_from_payload(&self, payload: &Value) -> ProviderResult<GeneratedImage> {
        if let Some(encoded) = payload.pointer("/data/0/b64_json").and_then(Value::as_str) {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|err| ProviderError::decode(format!("invalid b64_json: {err}")))?;
            return ensure_png(bytes);
        }
        match first_str(payload, &["/data/0/url"]) {
            Some(url) => download_image(&self.client, NAME, url).await,
            None => Err(ProviderError::rejected(NAME, None, "response carried no image")),
        }
    }
}

#[async_trait]
impl AvatarProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn generate(&self, _image: &[u8], style: &Style) -> ProviderResult<GeneratedImage> {
        let Some(api_key) = self.endpoint.api_key.as_deref() else {
            return Err(ProviderError::credential_missing(NAME, "OPENAI_API_KEY"));
        };
        let body = json!({
            "model": self.model,
            "prompt": build_transform_instruction(style),
            "size": self.size,
            "quality": "standard",
            "n": 1,
        });
        let response = self
            .client
            .post(&self.endpoint.api_base)
            .bearer_auth(api_key)
            .timeout(GENERATION_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::from_reqwest(NAME, err))?;
        let payload = response_json_or_error(NAME, response).await?;
        self.image_from_payload(&payload).await
    }
}
