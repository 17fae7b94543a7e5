//! Configuration errors.

/// Errors from loading or validating the storefront environment.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("missing required setting: {0}")]
    Missing(&'static str),
}
