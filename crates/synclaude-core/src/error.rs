//! Error types for synclaude core

use thiserror::Error;

/// Result type alias using synclaude Error
pub type Result<T> = std::result::Result<T, Error>;

/// synclaude error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Model catalog unavailable: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Launch error: {0}")]
    Launch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures talking to the remote model catalog.
///
/// The variants keep "nothing came back" apart from "the API said no", since
/// the first is usually the network and the second is usually the key.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("no response received from {url}: {reason}")]
    NoResponse { url: String, reason: String },

    #[error("catalog returned HTTP {status}: {body}")]
    ErrorResponse { status: u16, body: String },

    #[error("could not build catalog request for {url}: {reason}")]
    InvalidRequest { url: String, reason: String },

    #[error("catalog response body was not understood: {0}")]
    MalformedBody(String),
}

/// A single catalog entry that could not be turned into a model record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("model entry is missing an id")]
    MissingId,

    #[error("model entry does not match the expected shape: {0}")]
    Shape(String),
}
