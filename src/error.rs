//! Error types for each stage of the pipeline.
//!
//! Ingestion errors ([`FetchError`], [`ExtractError`]) never leave the news
//! module: a failing source contributes nothing and a failing enrichment keeps
//! the bare headline. Downstream errors ([`GenerationError`], [`StoreError`])
//! are caught per news item by the cycle runner. [`ConfigError`] is fatal at
//! startup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("model returned an empty response")]
    EmptyResponse,
}

impl GenerationError {
    /// Network failures, rate limits and server errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Network(_) | GenerationError::EmptyResponse => true,
            GenerationError::Api { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {0} not found")]
    NotFound(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failure of a single news item in the publishing loop.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("content generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("publishing failed: {0}")]
    Publish(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("a generation cycle is already running")]
    RunInProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_messages_name_the_url() {
        let err = FetchError::Status {
            url: "https://www.ft.com/markets".to_string(),
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "https://www.ft.com/markets responded with status 503"
        );
    }

    #[test]
    fn test_item_error_wraps_store_error() {
        let err: ItemError = StoreError::NotFound("abc".to_string()).into();
        assert_eq!(err.to_string(), "publishing failed: document abc not found");
    }
}
