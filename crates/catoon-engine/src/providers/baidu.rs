use async_trait::async_trait;
use catoon_contracts::{GeneratedImage, Style};
use reqwest::Client;
use serde_json::{json, Value};

use super::{resolve_model, AvatarProvider};
use crate::config::{EngineConfig, ProviderEndpoint, GENERATION_TIMEOUT};
use crate::error::{ProviderError, ProviderResult};
use crate::http::{download_image, first_str, response_json_or_error};
use crate::prompt::{build_regional_prompt, REGIONAL_STYLE_HINT};

const NAME: &str = "baidu";
const RESULT_URL: &str = "/data/sub_task_result_list/0/final_image_list/0/img_url";

/// Regional text-to-image service behind an OAuth client-credentials token.
pub struct BaiduProvider {
    endpoint: ProviderEndpoint,
    secret: Option<String>,
    size: (u32, u32),
    client: Client,
}

impl BaiduProvider {
    pub fn new(config: &EngineConfig, client: Client) -> Self {
        let size = resolve_model(&config.models, NAME, None)
            .map(|model| (model.width, model.height))
            .unwrap_or((512, 512));
        Self {
            endpoint: config.baidu.clone(),
            secret: config.baidu_secret.clone(),
            size,
            client,
        }
    }

    async fn access_token(&self, api_key: &str, secret: &str) -> ProviderResult<String> {
        let response = self
            .client
            .get(format!("{}/oauth/2.0/token", self.endpoint.api_base))
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", api_key),
                ("client_secret", secret),
            ])
            .timeout(GENERATION_TIMEOUT)
            .send()
            .await
            .map_err(|err| ProviderError::from_reqwest(NAME, err))?;
        let payload = response_json_or_error(NAME, response).await?;
        payload
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                let reason = payload
                    .get("error_description")
                    .and_then(Value::as_str)
                    .unwrap_or("no access_token in response");
                ProviderError::rejected(NAME, None, format!("token exchange failed: {reason}"))
            })
    }
}

#[async_trait]
impl AvatarProvider for BaiduProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn generate(&self, _image: &[u8], style: &Style) -> ProviderResult<GeneratedImage> {
        let Some(api_key) = self.endpoint.api_key.as_deref() else {
            return Err(ProviderError::credential_missing(NAME, "BAIDU_API_KEY"));
        };
        let Some(secret) = self.secret.as_deref() else {
            return Err(ProviderError::credential_missing(NAME, "BAIDU_SECRET_KEY"));
        };
        let token = self.access_token(api_key, secret).await?;

        let response = self
            .client
            .post(format!("{}/rpc/2.0/ai/v1/txt2img", self.endpoint.api_base))
            .query(&[("access_token", token.as_str())])
            .timeout(GENERATION_TIMEOUT)
            .json(&json!({
                "prompt": build_regional_prompt(style),
                "width": self.size.0,
                "height": self.size.1,
                "image_num": 1,
                "style": REGIONAL_STYLE_HINT,
            }))
            .send()
            .await
            .map_err(|err| ProviderError::from_reqwest(NAME, err))?;
        let payload = response_json_or_error(NAME, response).await?;
        if let Some(code) = payload.get("error_code").filter(|code| !code.is_null()) {
            let message = payload
                .get("error_msg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(ProviderError::rejected(
                NAME,
                None,
                format!("error_code {code}: {message}"),
            ));
        }
        let Some(url) = first_str(&payload, &[RESULT_URL]) else {
            return Err(ProviderError::rejected(NAME, None, "response carried no image url"));
        };
        download_image(&self.client, NAME, url).await
    }
}
