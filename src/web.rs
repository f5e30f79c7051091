//! Resolver for the `did:web` method.
//!
//! The method-specific identifier is turned into an HTTP(S) URL, the DID
//! Document found there is fetched and parsed, and its `id` is checked against
//! the requested DID before it is returned.
//!
//! See <https://w3c-ccg.github.io/did-method-web/>

use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::did::Did;
use crate::document::Document;
use crate::resolver::{MethodResolver, Resolvable};
use crate::types::{ResolutionError, ResolutionOptions, ResolutionResult, DID_JSON};

/// Registry name of the method
pub const METHOD: &str = "web";

/// Characters that would move a decoded segment out of its URL component
const URL_DELIMITERS: [char; 5] = ['/', '@', '?', '#', '\\'];

/// URL scheme used to fetch documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scheme {
    #[default]
    Https,
    /// Plain HTTP. Meant for tests and local development only.
    Http,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Https => "https",
            Scheme::Http => "http",
        }
    }
}

/// Transport settings of a [`WebResolver`]
#[derive(Debug, Clone, Default)]
pub struct WebResolverConfig {
    pub scheme: Scheme,
    /// Overall request timeout; none by default
    pub timeout: Option<Duration>,
}

/// Failures while fetching a `did:web` document
#[derive(Error, Debug)]
pub enum WebError {
    /// The DID does not map onto a valid URL
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// A method-specific id segment decodes to invalid UTF-8 or a URL delimiter
    #[error("method-specific id segment {0:?} cannot be mapped onto a URL")]
    Segment(String),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("HTTP {0} when fetching DID document")]
    Status(StatusCode),

    /// The response body is not a valid DID Document
    #[error("invalid DID document: {0}")]
    Document(#[from] crate::error::Error),

    /// The fetched document describes another DID
    #[error("document id {found} does not match {expected}")]
    IdMismatch { expected: String, found: String },
}

impl WebError {
    /// The resolution error code this failure is reported as
    pub fn code(&self) -> ResolutionError {
        match self {
            WebError::Url(_) | WebError::Segment(_) | WebError::Document(_) => {
                ResolutionError::InvalidDid
            }
            WebError::Request(_) | WebError::Status(_) | WebError::IdMismatch { .. } => {
                ResolutionError::NotFound
            }
        }
    }
}

/// Resolver for `did:web` DIDs
#[derive(Debug, Clone)]
pub struct WebResolver {
    /// HTTP client for fetching DID Documents
    client: Client,
    config: WebResolverConfig,
}

impl WebResolver {
    /// Creates a resolver with its own HTTP client built from `config`
    pub fn new(config: WebResolverConfig) -> Result<Self, WebError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, config))
    }

    /// Creates a resolver around an existing HTTP client
    pub fn with_client(client: Client, config: WebResolverConfig) -> Self {
        Self { client, config }
    }

    /// A resolver fetching over HTTPS
    pub fn https() -> Self {
        Self::with_client(Client::new(), WebResolverConfig::default())
    }

    /// A resolver fetching over plain HTTP
    pub fn http() -> Self {
        let config = WebResolverConfig {
            scheme: Scheme::Http,
            ..WebResolverConfig::default()
        };
        Self::with_client(Client::new(), config)
    }

    pub fn config(&self) -> &WebResolverConfig {
        &self.config
    }

    /// Converts a `did:web` DID to the URL of its DID Document
    ///
    /// Each method-specific-id segment is percent-decoded. A single segment is
    /// a host whose document lives under `/.well-known`; further segments
    /// form the path. A segment that decodes to invalid UTF-8 or to any of
    /// `/ @ ? # \` is rejected, so the decoded host is the host fetched.
    pub fn document_url(&self, did: &Did) -> Result<Url, WebError> {
        let segments = did
            .method_ids
            .iter()
            .map(|segment| decode_segment(segment))
            .collect::<Result<Vec<String>, WebError>>()?;

        let location = match segments.as_slice() {
            [host] => format!("{}/.well-known/did.json", host),
            _ => format!("{}/did.json", segments.join("/")),
        };

        Url::parse(&format!("{}://{}", self.config.scheme.as_str(), location)).map_err(WebError::from)
    }

    async fn fetch_document(&self, did: &Did) -> Result<Document, WebError> {
        let url = self.document_url(did)?;
        debug!(%url, "fetching DID document");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(WebError::Status(response.status()));
        }

        let body = response.bytes().await?;
        let document = Document::parse(&body)?;

        let expected = did.did();
        let found = document.id.did();
        if found != expected {
            return Err(WebError::IdMismatch { expected, found });
        }

        Ok(document)
    }
}

fn decode_segment(segment: &str) -> Result<String, WebError> {
    let decoded = percent_decode_str(segment)
        .decode_utf8()
        .map_err(|_| WebError::Segment(segment.to_string()))?;
    if decoded.contains(URL_DELIMITERS) {
        return Err(WebError::Segment(segment.to_string()));
    }
    Ok(decoded.into_owned())
}

#[async_trait]
impl MethodResolver for WebResolver {
    async fn resolve(
        &self,
        did_url: &str,
        did: &Did,
        _resolver: &dyn Resolvable,
        options: &ResolutionOptions,
    ) -> ResolutionResult {
        if options.accept != DID_JSON {
            debug!(did_url, accept = %options.accept, "unsupported representation requested");
            return ResolutionResult::error(ResolutionError::RepresentationNotSupported);
        }

        match self.fetch_document(did).await {
            Ok(document) => ResolutionResult::success(DID_JSON, document),
            Err(err) => {
                let code = err.code();
                warn!(did_url, error = %err, %code, "did:web resolution failed");
                ResolutionResult::error(code)
            }
        }
    }
}
