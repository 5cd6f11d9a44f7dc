// src/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraderError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Invalid answer pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Exercise '{0}' not found")]
    ExerciseNotFound(String),

    #[error("Quiz '{0}' not found")]
    QuizNotFound(String),

    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    /// Transport failure while talking to a sandbox worker. Carries the
    /// origin metadata so it can be logged.
    #[error("Worker channel fault at {}:{}: {message}", filename.as_deref().unwrap_or("<unknown>"), lineno.map(|l| l.to_string()).unwrap_or_else(|| "?".to_string()))]
    Channel {
        message: String,
        filename: Option<String>,
        lineno: Option<u32>,
    },
}

impl GraderError {
    pub fn channel(message: impl Into<String>) -> Self {
        GraderError::Channel {
            message: message.into(),
            filename: None,
            lineno: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GraderError>;
