use thiserror::Error;

#[derive(Error, Debug)]
pub enum QualensError {
    #[error("API request failed: {0}")]
    Api(String),

    #[error("not found upstream: {0}")]
    NotFound(String),

    #[error("could not parse response from {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, QualensError>;
