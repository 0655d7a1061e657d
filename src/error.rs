//! Error types for Konkordanca

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Book not found: {0}")]
    BookNotFound(String),

    #[error("Verse not found: {0}")]
    VerseNotFound(String),

    #[error("Malformed reference: {0}")]
    MalformedReference(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Corpus error: {0}")]
    Corpus(String),
}

impl serde::Serialize for EngineError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Corpus(format!("{err:#}"))
    }
}
