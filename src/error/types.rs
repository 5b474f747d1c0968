//! Node pool error types

use thiserror::Error;

/// Errors raised while building pools, node configs and bootstrap addresses
///
/// Messages are stable and rendered verbatim, so callers may match on
/// `to_string()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid pool or node configuration
    #[error("{0}")]
    Configuration(String),

    /// Malformed Cloud ID
    #[error("Cloud ID is not properly formatted")]
    CloudIdFormat,

    /// URL that can't be turned into a node config
    #[error("{0}")]
    InvalidUrl(String),
}

impl Error {
    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether this error was raised by configuration validation
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Result alias used across the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;
