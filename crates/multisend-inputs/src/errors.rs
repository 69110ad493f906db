use thiserror::Error;

/// Result type for input loading
pub type InputResult<T> = Result<T, InputError>;

/// Errors that can occur while loading operator inputs
#[derive(Error, Debug)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid network '{name}': {reason}")]
    InvalidNetwork { name: String, reason: String },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The key text itself is never included
    #[error("Invalid private key on line {line}: {reason}")]
    InvalidKey { line: usize, reason: String },

    #[error("Invalid amount '{input}': {reason}")]
    InvalidAmount { input: String, reason: String },

    #[error("No entries found in {0}")]
    Empty(String),

    #[error("Network not found: {0}")]
    NetworkNotFound(String),
}
