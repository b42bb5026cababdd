use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaceError>;

#[derive(Error, Debug)]
pub enum PaceError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for PaceError {
    fn from(err: toml::de::Error) -> Self {
        PaceError::Config(err.to_string())
    }
}
