use std::time::{Duration, Instant};

use async_trait::async_trait;
use catoon_contracts::{GeneratedImage, Style};
use reqwest::Client;
use serde_json::{json, Value};

use super::{resolve_model, AvatarProvider};
use crate::config::{EngineConfig, ProviderEndpoint, GENERATION_TIMEOUT};
use crate::error::{ProviderError, ProviderResult};
use crate::http::{download_image, first_str, response_json_or_error};
use crate::prompt::build_regional_prompt;

const NAME: &str = "aliyun";
const DEFAULT_MODEL: &str = "wanx-v1";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// DashScope asynchronous text-to-image: submit a task, poll it, download.
pub struct AliyunProvider {
    endpoint: ProviderEndpoint,
    model: String,
    size: String,
    poll_interval: Duration,
    poll_budget: Duration,
    client: Client,
}

impl AliyunProvider {
    pub fn new(config: &EngineConfig, client: Client) -> Self {
        let spec = resolve_model(&config.models, NAME, None);
        Self {
            endpoint: config.aliyun.clone(),
            model: spec
                .as_ref()
                .map(|spec| spec.name.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            size: spec
                .as_ref()
                .map(|spec| spec.size_label('*'))
                .unwrap_or_else(|| "1024*1024".to_string()),
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_budget: GENERATION_TIMEOUT,
            client,
        }
    }

    pub fn with_polling(mut self, interval: Duration, budget: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_budget = budget;
        self
    }

    async fn submit(&self, api_key: &str, style: &Style) -> ProviderResult<String> {
        let response = self
            .client
            .post(format!(
                "{}/services/aigc/text2image/image-synthesis",
                self.endpoint.api_base
            ))
            .bearer_auth(api_key)
            .header("X-DashScope-Async", "enable")
            .timeout(GENERATION_TIMEOUT)
            .json(&json!({
                "model": self.model,
                "input": { "prompt": build_regional_prompt(style) },
                "parameters": { "size": self.size, "n": 1 },
            }))
            .send()
            .await
            .map_err(|err| ProviderError::from_reqwest(NAME, err))?;
        let payload = response_json_or_error(NAME, response).await?;
        first_str(&payload, &["/output/task_id"])
            .map(str::to_string)
            .ok_or_else(|| ProviderError::rejected(NAME, None, "response carried no task_id"))
    }

    async fn poll(&self, api_key: &str, task_id: &str) -> ProviderResult<Value> {
        let started = Instant::now();
        loop {
            let response = self
                .client
                .get(format!("{}/tasks/{}", self.endpoint.api_base, task_id))
                .bearer_auth(api_key)
                .timeout(GENERATION_TIMEOUT)
                .send()
                .await
                .map_err(|err| ProviderError::from_reqwest(NAME, err))?;
            let payload = response_json_or_error(NAME, response).await?;
            let status = payload
                .pointer("/output/task_status")
                .and_then(Value::as_str)
                .map(|value| value.to_ascii_uppercase())
                .unwrap_or_default();
            match status.as_str() {
                "SUCCEEDED" => return Ok(payload),
                "FAILED" | "CANCELED" | "UNKNOWN" => {
                    let message = payload
                        .pointer("/output/message")
                        .and_then(Value::as_str)
                        .unwrap_or("no message");
                    return Err(ProviderError::rejected(
                        NAME,
                        None,
                        format!("task {task_id} {status}: {message}"),
                    ));
                }
                _ => {}
            }
            if started.elapsed() >= self.poll_budget {
                return Err(ProviderError::Timeout {
                    provider: NAME.to_string(),
                });
            }
            tracing::debug!(task_id, status = %status, "aliyun task still running");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl AvatarProvider for AliyunProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn generate(&self, _image: &[u8], style: &Style) -> ProviderResult<GeneratedImage> {
        let Some(api_key) = self.endpoint.api_key.as_deref() else {
            return Err(ProviderError::credential_missing(NAME, "DASHSCOPE_API_KEY"));
        };
        let task_id = self.submit(api_key, style).await?;
        tracing::info!(task_id = %task_id, "aliyun task submitted");
        let payload = self.poll(api_key, &task_id).await?;
        let Some(url) = first_str(&payload, &["/output/results/0/url"]) else {
            return Err(ProviderError::rejected(NAME, None, "task result carried no image url"));
        };
        download_image(&self.client, NAME, url).await
    }
}
