//! Store error taxonomy

/// Errors from the version store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Network or HTTP transport failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// Requested version does not exist server-side
    #[error("version {index} not found")]
    VersionNotFound {
        /// Requested index
        index: u32,
    },

    /// Server answered with an unexpected status
    #[error("unexpected status {code}")]
    Status {
        /// HTTP status code
        code: u16,
    },

    /// Response body did not decode
    #[error("decode failure: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
