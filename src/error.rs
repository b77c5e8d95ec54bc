use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Data parsing error: {0}")]
    ParseError(String),

    #[error("Missing expected data: {0}")]
    MissingData(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
