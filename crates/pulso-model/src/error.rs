use thiserror::Error;

/// Failure calling the model endpoint.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("model returned an empty completion")]
    EmptyCompletion,

    #[error("could not decode model endpoint response: {0}")]
    Decode(String),
}
