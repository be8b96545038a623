use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Connection(String),
    #[error("cache operation on '{key}' failed: {message}")]
    Operation { key: String, message: String },
    #[error("cached value for '{key}' is not valid JSON: {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    pub(crate) fn operation(key: &str, message: impl ToString) -> Self {
        Self::Operation {
            key: key.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn codec(key: &str, source: serde_json::Error) -> Self {
        Self::Codec {
            key: key.to_string(),
            source,
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
