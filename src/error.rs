//! Error types for DID syntax and DID Document decoding.
//!
//! Every error in this module is raised synchronously at the point of parsing;
//! no partially decoded value is ever returned alongside one. Resolution
//! failures are not errors in this sense: they travel inside
//! [`crate::types::ResolutionMetadata`] as a [`crate::ResolutionError`] code.

use thiserror::Error;

/// Errors that can occur while parsing a DID or decoding a DID Document
#[derive(Error, Debug)]
pub enum Error {
    /// The input does not follow the DID-URL grammar
    #[error("malformed DID syntax: {0:?}")]
    InvalidDid(String),

    /// A mandatory field is absent
    #[error("missing field: {0}")]
    MissingField(String),

    /// A field is present but has a shape that cannot be decoded
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    /// The input is not valid JSON, or not the JSON type expected
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_field(field: &str, reason: impl ToString) -> Self {
        Error::InvalidField {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}
