use crate::source::Source;
use thiserror::Error;

/// Failures reported by a wallet or identity provider SDK.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("The provider is not available in this environment")]
    Unavailable,

    #[error("The user rejected the request: {0}")]
    Rejected(String),

    #[error("Network failure while talking to the provider: {0}")]
    Network(String),

    #[error("The provider did not answer within {0} seconds")]
    Timeout(u64),

    #[error("The provider returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Errors a caller may want to retry, as opposed to a plain refusal.
    pub fn is_network_level(&self) -> bool {
        matches!(self, ProviderError::Network(_) | ProviderError::Timeout(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{source_kind} login failed")]
pub struct LoginError {
    pub source_kind: Source,
    pub source: ProviderError,
}
