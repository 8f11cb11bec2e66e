use thiserror::Error;

pub use anyhow::Context;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    Amqp(#[from] lapin::Error),
    /// The job payload was malformed or described something we cannot fetch.
    #[error("invalid job: {0}")]
    Validation(String),
    /// The provider answered with a non-200 status.
    #[error("expected status 200 but got {status}; body is: {body}")]
    Fetch { status: u16, body: String },
    #[error("failed to decode history table: {0}")]
    Decode(String),
    #[error("failed to publish candle: {0}")]
    Publish(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn message<T: Into<String>>(msg: T) -> Self {
        AppError::Message(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn decode<T: Into<String>>(msg: T) -> Self {
        AppError::Decode(msg.into())
    }

    pub fn publish<T: Into<String>>(msg: T) -> Self {
        AppError::Publish(msg.into())
    }

    /// Whether the failure happened before any external call was made.
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}
