//! Settings error types.

/// Errors raised while loading settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for settings results.
pub type Result<T> = std::result::Result<T, SettingsError>;
