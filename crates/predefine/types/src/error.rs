use crate::name::{SourceLocator, TypeName};
use thiserror::Error;

/// Errors from an artifact source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("artifact {hash} not found at {locator}")]
    NotFound { locator: SourceLocator, hash: String },

    #[error("failed to read artifact {hash} from {locator}: {source}")]
    Io {
        locator: SourceLocator,
        hash: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the byte-code container codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed artifact: {0}")]
    Malformed(String),
}

/// Errors from the host definition primitive.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefineError {
    /// The host already has this name through another path.
    #[error("type already defined by the host: {0}")]
    DuplicateName(TypeName),

    #[error("host rejected definition: {0}")]
    Host(String),
}
