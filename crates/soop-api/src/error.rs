use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("quality token not granted (result code {code})")]
    TokenNotGranted { code: i64 },
    #[error("invalid proxy endpoint: {0}")]
    InvalidProxy(String),
    #[error("other: {0}")]
    Other(String),
}

impl ApiError {
    /// Network-level failure (connect, timeout, non-2xx status), as opposed
    /// to a response that arrived but could not be interpreted.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Http(_))
    }
}
