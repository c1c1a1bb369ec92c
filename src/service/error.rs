use thiserror::Error;

/// Why a call to the remote model failed.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Request to the model endpoint failed: {0}")]
    Transport(String),
    #[error("Model endpoint answered with HTTP {0}: {1}")]
    Status(u16, String),
    #[error("Empty response from the model")]
    EmptyResponse,
    #[error("Model response is not the expected JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}
