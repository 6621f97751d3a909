mod codec;
pub mod config;
pub mod error;
pub mod features;
mod http;
pub mod pipeline;
pub mod placeholder;
pub mod prompt;
pub mod providers;
pub mod transform;

pub use config::{EngineConfig, ExtractorKind};
pub use error::{ProviderError, ProviderResult};
pub use features::{feature_extractor_for, FeatureExtractor};
pub use pipeline::{AttemptOutcome, AttemptReport, AvatarOutcome, AvatarPipeline};
pub use placeholder::{placeholder, PlaceholderColor};
pub use providers::{provider_by_name, AvatarProvider};
pub use transform::LocalTransform;
