use thiserror::Error;

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Failure of one stage in the avatar chain. Never escapes the pipeline.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider}: {variable} not set")]
    CredentialMissing {
        provider: String,
        variable: &'static str,
    },

    #[error("{provider} rejected the request{}: {message}", status_suffix(*.status))]
    Rejected {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error("{provider} request timed out")]
    Timeout { provider: String },

    #[error("{provider} transport error: {message}")]
    Transport { provider: String, message: String },

    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("{provider}: all {attempts} candidate models failed")]
    Exhausted { provider: String, attempts: usize },
}

impl ProviderError {
    pub fn credential_missing(provider: &str, variable: &'static str) -> Self {
        Self::CredentialMissing {
            provider: provider.to_string(),
            variable,
        }
    }

    pub fn rejected<S: Into<String>>(provider: &str, status: Option<u16>, message: S) -> Self {
        Self::Rejected {
            provider: provider.to_string(),
            status,
            message: message.into(),
        }
    }

    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::Decode(message.into())
    }

    pub fn from_reqwest(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout {
                provider: provider.to_string(),
            };
        }
        if let Some(status) = err.status() {
            return Self::rejected(provider, Some(status.as_u16()), err.to_string());
        }
        Self::Transport {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }

    /// Provider the failure is attributed to; decode faults carry none.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::CredentialMissing { provider, .. }
            | Self::Rejected { provider, .. }
            | Self::Timeout { provider }
            | Self::Transport { provider, .. }
            | Self::Exhausted { provider, .. } => Some(provider),
            Self::Decode(_) => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::CredentialMissing { .. } => "credential_missing",
            Self::Rejected { .. } => "provider_rejected",
            Self::Timeout { .. } => "network_timeout",
            Self::Transport { .. } => "transport",
            Self::Decode(_) => "decode_failure",
            Self::Exhausted { .. } => "exhausted",
        }
    }
}

impl From<image::ImageError> for ProviderError {
    fn from(err: image::ImageError) -> Self {
        ProviderError::Decode(err.to_string())
    }
}

fn status_suffix(status: Option<u16>) -> String {
    status.map(|code| format!(" ({code})")).unwrap_or_default()
}
