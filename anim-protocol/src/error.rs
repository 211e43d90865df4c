//! Protocol error types

use thiserror::Error;

/// Errors raised while decoding a single protocol line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Line has too few fields: {0:?}")]
    TooFewFields(String),

    #[error("Unknown declaration key: {0}")]
    UnknownDeclaration(String),

    #[error("Malformed color line: {0:?}")]
    MalformedColor(String),

    #[error("Invalid hex value: {0:?}")]
    InvalidHex(String),
}
