mod aliyun;
mod baidu;
mod huggingface;
mod mock;
mod openai;
mod siliconcloud;

use async_trait::async_trait;
use catoon_contracts::models::{ModelCatalog, ModelSpec};
use catoon_contracts::providers::NamedProvider;
use catoon_contracts::{GeneratedImage, Style};
use reqwest::Client;

use crate::config::EngineConfig;
use crate::error::ProviderResult;
use crate::features::feature_extractor_for;
use crate::transform::LocalTransform;

pub use aliyun::AliyunProvider;
pub use baidu::BaiduProvider;
pub use huggingface::{HuggingFaceProvider, ProbeReport};
pub use mock::MockProvider;
pub use openai::OpenAiCompatibleProvider;
pub use siliconcloud::SiliconCloudProvider;

pub const PROVIDER_NAMES: [&str; 7] = [
    "siliconcloud",
    "huggingface",
    "openai",
    "baidu",
    "aliyun",
    "mock",
    "local",
];

/// One way of turning a cat photo into an avatar.
#[async_trait]
pub trait AvatarProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, image: &[u8], style: &Style) -> ProviderResult<GeneratedImage>;
}

impl NamedProvider for Box<dyn AvatarProvider> {
    fn name(&self) -> &str {
        AvatarProvider::name(&**self)
    }
}

/// Builds the adapter registered under `name`, or `None` for unknown names.
pub fn provider_by_name(
    name: &str,
    config: &EngineConfig,
    client: &Client,
) -> Option<Box<dyn AvatarProvider>> {
    let provider: Box<dyn AvatarProvider> = match name.trim() {
        "siliconcloud" => Box::new(SiliconCloudProvider::new(
            config,
            feature_extractor_for(config.extractor),
            client.clone(),
        )),
        "huggingface" => Box::new(HuggingFaceProvider::new(config, client.clone())),
        "openai" => Box::new(OpenAiCompatibleProvider::new(config, client.clone())),
        "baidu" => Box::new(BaiduProvider::new(config, client.clone())),
        "aliyun" => Box::new(AliyunProvider::new(config, client.clone())),
        "mock" => Box::new(MockProvider::new(config.mock_delay)),
        "local" => Box::new(LocalTransform),
        _ => return None,
    };
    Some(provider)
}

/// Picks `requested` from the catalog. Unknown names borrow the parameters
/// of the provider's first catalog entry.
fn resolve_model(
    catalog: &ModelCatalog,
    provider: &str,
    requested: Option<&str>,
) -> Option<ModelSpec> {
    let Some(name) = requested else {
        return catalog.first_for(provider);
    };
    catalog.get(name).cloned().or_else(|| {
        catalog.first_for(provider).map(|template| ModelSpec {
            name: name.to_string(),
            ..template
        })
    })
}
