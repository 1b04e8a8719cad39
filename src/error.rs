use thiserror::Error;

#[derive(Debug, Error)]
pub enum BriefError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Output file not found: {0}")]
    OutputMissing(String),
    #[error("Unknown indicator: {0}")]
    UnknownIndicator(String),
    #[error("Invalid period '{0}', expected YYYY-MM")]
    InvalidPeriod(String),
}

impl From<serde_json::Error> for BriefError {
    fn from(value: serde_json::Error) -> Self {
        BriefError::Serialization(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BriefError>;
