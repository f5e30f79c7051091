//! Core types for DID resolution.
//!
//! This module provides the inputs and outputs of the resolution protocol:
//! resolution options, resolution metadata, the resolution result, and the
//! closed set of resolution error codes.
//!
//! See <https://www.w3.org/TR/did-core/#did-resolution>

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::Document;

/// Media type of a JSON-encoded DID Document
pub const DID_JSON: &str = "application/did+json";

/// Error codes a DID resolution may end with
///
/// This set is closed: a method resolver maps every failure it meets onto one
/// of these codes.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionError {
    /// The DID does not conform to the DID syntax
    #[error("invalidDid")]
    InvalidDid,
    /// The resolver could not find the DID Document
    #[error("notFound")]
    NotFound,
    /// The representation requested via `accept` is not supported
    #[error("representationNotSupported")]
    RepresentationNotSupported,
    /// No resolver is registered for the DID method
    #[error("unsupportedDidMethod")]
    UnsupportedDidMethod,
}

/// Metadata about the resolution process
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionMetadata {
    /// Media type of the returned document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Set if and only if resolution failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResolutionError>,
}

/// Resolution result containing the DID Document and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// Metadata about the resolution process
    pub metadata: ResolutionMetadata,

    /// The resolved DID Document, absent on failure
    #[serde(rename = "didDocument")]
    pub document: Option<Document>,
}

impl ResolutionResult {
    /// A failed resolution carrying `error` and no document
    pub fn error(error: ResolutionError) -> Self {
        Self {
            metadata: ResolutionMetadata {
                content_type: None,
                error: Some(error),
            },
            document: None,
        }
    }

    /// A successful resolution
    pub fn success(content_type: impl Into<String>, document: Document) -> Self {
        Self {
            metadata: ResolutionMetadata {
                content_type: Some(content_type.into()),
                error: None,
            },
            document: Some(document),
        }
    }

    /// The error code, if resolution failed
    pub fn error_code(&self) -> Option<ResolutionError> {
        self.metadata.error
    }

    pub fn is_error(&self) -> bool {
        self.metadata.error.is_some()
    }
}

/// Options for DID resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionOptions {
    /// Media type of the caller's preferred representation of the DID Document
    pub accept: String,
}

impl ResolutionOptions {
    pub fn new(accept: impl Into<String>) -> Self {
        Self {
            accept: accept.into(),
        }
    }
}

impl Default for ResolutionOptions {
    fn default() -> Self {
        Self::new(DID_JSON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::did::Did;
    use serde_json::json;

    #[test]
    fn test_error_codes() {
        let test_cases = vec![
            (ResolutionError::InvalidDid, "invalidDid"),
            (ResolutionError::NotFound, "notFound"),
            (ResolutionError::RepresentationNotSupported, "representationNotSupported"),
            (ResolutionError::UnsupportedDidMethod, "unsupportedDidMethod"),
        ];

        for (error, code) in test_cases {
            assert_eq!(error.to_string(), code);
            assert_eq!(serde_json::to_value(error).unwrap(), json!(code));
        }
    }

    #[test]
    fn test_result_encoding() {
        let failed = ResolutionResult::error(ResolutionError::NotFound);
        assert!(failed.is_error());
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({"metadata": {"error": "notFound"}, "didDocument": null})
        );

        let document = Document::new(Did::parse("did:example:123").unwrap());
        let resolved = ResolutionResult::success(DID_JSON, document.clone());
        assert_eq!(resolved.error_code(), None);
        assert_eq!(
            serde_json::to_value(&resolved).unwrap(),
            json!({
                "metadata": {"contentType": "application/did+json"},
                "didDocument": {"id": "did:example:123"}
            })
        );

        let decoded: ResolutionResult = serde_json::from_value(serde_json::to_value(&resolved).unwrap()).unwrap();
        assert_eq!(decoded.document, Some(document));
    }

    #[test]
    fn test_default_options() {
        assert_eq!(ResolutionOptions::default().accept, DID_JSON);
    }
}
