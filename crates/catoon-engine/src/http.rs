use catoon_contracts::GeneratedImage;
use reqwest::{Client, Response};
use serde_json::Value;

use crate::codec::ensure_png;
use crate::config::DOWNLOAD_TIMEOUT;
use crate::error::{ProviderError, ProviderResult};

const ERROR_BODY_CHARS: usize = 512;

pub(crate) async fn response_json_or_error(provider: &str, response: Response) -> ProviderResult<Value> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| ProviderError::from_reqwest(provider, err))?;
    if !status.is_success() {
        return Err(ProviderError::rejected(
            provider,
            Some(status.as_u16()),
            truncate_text(&body, ERROR_BODY_CHARS),
        ));
    }
    serde_json::from_str(&body).map_err(|err| {
        ProviderError::rejected(
            provider,
            Some(status.as_u16()),
            format!("invalid JSON payload: {err}"),
        )
    })
}

/// Reads an image body, rejecting non-2xx responses with their text.
pub(crate) async fn image_or_error(provider: &str, response: Response) -> ProviderResult<GeneratedImage> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::rejected(
            provider,
            Some(status.as_u16()),
            truncate_text(&body, ERROR_BODY_CHARS),
        ));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|err| ProviderError::from_reqwest(provider, err))?;
    ensure_png(bytes.to_vec())
}

pub(crate) async fn download_image(
    client: &Client,
    provider: &str,
    url: &str,
) -> ProviderResult<GeneratedImage> {
    tracing::debug!(provider, url, "downloading generated image");
    let response = client
        .get(url)
        .timeout(DOWNLOAD_TIMEOUT)
        .send()
        .await
        .map_err(|err| ProviderError::from_reqwest(provider, err))?;
    image_or_error(provider, response).await
}

pub(crate) fn first_str<'a>(payload: &'a Value, pointers: &[&str]) -> Option<&'a str> {
    pointers
        .iter()
        .filter_map(|pointer| payload.pointer(pointer))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|value| !value.is_empty())
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
