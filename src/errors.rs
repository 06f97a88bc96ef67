//! # Error Types Module
//!
//! Structured error types for configuration, classification, photo handling
//! and feedback parsing. Handlers and bootstrap code wrap these in
//! `anyhow::Error` once they cross into the dispatcher.

use thiserror::Error;

/// Errors raised while reading configuration at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Provide bot_token env variable")]
    MissingBotToken,
    #[error("Data path is not available: {0}")]
    DataPathMissing(String),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Errors raised by the breed classifier
#[derive(Debug, Clone, Error)]
pub enum ClassifierError {
    /// Checkpoint or class list missing, unreadable or inconsistent
    #[error("Classifier configuration error: {0}")]
    Configuration(String),
    /// Image could not be decoded or the model failed to run
    #[error("Inference error: {0}")]
    Inference(String),
}

/// Failure modes of the photo pipeline.
///
/// All of them end in the same apology for the user; the variant only
/// matters for logs and monitoring.
#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("Download failed: {0}")]
    DownloadFailed(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(#[from] ClassifierError),
    #[error("Formatting failed: {0}")]
    FormattingFailed(String),
    #[error("Sending the reply failed: {0}")]
    ReplyFailed(String),
}

/// Rejected inline button payloads
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedbackParseError {
    #[error("Callback payload is empty")]
    Empty,
    #[error("Callback payload has no separator: {0}")]
    MissingSeparator(String),
    #[error("Callback payload has an empty field: {0}")]
    EmptyField(String),
    #[error("Callback payload contains a forbidden character: {0:?}")]
    ForbiddenCharacter(String),
}
