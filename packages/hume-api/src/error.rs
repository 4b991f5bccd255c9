use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid JSON from the API: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid base64 audio payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("request must have a body")]
    MissingRequestBody,
}
