use std::env;
use std::time::Duration;

use catoon_contracts::models::ModelCatalog;

pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(60);
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_CHAIN: [&str; 3] = ["siliconcloud", "huggingface", "local"];

const DEFAULT_SILICONCLOUD_BASE: &str = "https://api.siliconflow.cn/v1";
const DEFAULT_HUGGINGFACE_BASE: &str = "https://api-inference.huggingface.co";
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/images/generations";
const DEFAULT_BAIDU_BASE: &str = "https://aip.baidubce.com";
const DEFAULT_DASHSCOPE_BASE: &str = "https://dashscope.aliyuncs.com/api/v1";
const DEFAULT_MOCK_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractorKind {
    #[default]
    Pixel,
    Heuristic,
}

impl ExtractorKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pixel" | "full" => Some(Self::Pixel),
            "heuristic" | "simple" => Some(Self::Heuristic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoint {
    pub api_base: String,
    pub api_key: Option<String>,
}

/// Credentials, endpoints and chain order, read once at startup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub siliconcloud: ProviderEndpoint,
    pub siliconcloud_model: Option<String>,
    pub huggingface: ProviderEndpoint,
    pub openai: ProviderEndpoint,
    pub openai_model: Option<String>,
    pub baidu: ProviderEndpoint,
    pub baidu_secret: Option<String>,
    pub aliyun: ProviderEndpoint,
    pub models: ModelCatalog,
    pub chain: Vec<String>,
    pub extractor: ExtractorKind,
    pub mock_delay: Duration,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let base = |key: &str, default: &str| {
            get(key)
                .map(|value| value.trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let mut models = ModelCatalog::default();
        if let Some(raw) = get("HUGGINGFACE_MODELS") {
            models = models.with_candidates("huggingface", &split_list(&raw));
        }

        let chain = get("CATOON_PROVIDERS")
            .map(|raw| split_list(&raw))
            .filter(|names| !names.is_empty())
            .unwrap_or_else(|| DEFAULT_CHAIN.iter().map(|name| name.to_string()).collect());

        let extractor = get("CATOON_FEATURE_EXTRACTOR")
            .and_then(|raw| ExtractorKind::parse(&raw))
            .unwrap_or_default();

        let mock_delay = get("CATOON_MOCK_DELAY_MS")
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(DEFAULT_MOCK_DELAY_MS);

        Self {
            siliconcloud: ProviderEndpoint {
                api_base: base("SILICONCLOUD_API_BASE", DEFAULT_SILICONCLOUD_BASE),
                api_key: get("SILICONCLOUD_API_KEY"),
            },
            siliconcloud_model: get("SILICONCLOUD_MODEL"),
            huggingface: ProviderEndpoint {
                api_base: base("HUGGINGFACE_API_BASE", DEFAULT_HUGGINGFACE_BASE),
                api_key: get("HUGGINGFACE_API_TOKEN"),
            },
            openai: ProviderEndpoint {
                api_base: base("OPENAI_COMPATIBLE_URL", DEFAULT_OPENAI_URL),
                api_key: get("OPENAI_API_KEY").or_else(|| get("ALTERNATIVE_AI_KEY")),
            },
            openai_model: get("OPENAI_IMAGE_MODEL"),
            baidu: ProviderEndpoint {
                api_base: base("BAIDU_API_BASE", DEFAULT_BAIDU_BASE),
                api_key: get("BAIDU_API_KEY"),
            },
            baidu_secret: get("BAIDU_SECRET_KEY"),
            aliyun: ProviderEndpoint {
                api_base: base("DASHSCOPE_API_BASE", DEFAULT_DASHSCOPE_BASE),
                api_key: get("DASHSCOPE_API_KEY"),
            },
            models,
            chain,
            extractor,
            mock_delay: Duration::from_millis(mock_delay),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}
