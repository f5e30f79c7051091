//! Decentralized Identifiers: syntax, DID Documents, and resolution.
//!
//! This library parses and renders DIDs and DID-URLs, decodes and encodes DID
//! Documents in their canonical JSON shape, and dispatches resolution requests
//! to method-specific resolvers held in a caller-built [`Registry`]. A resolver
//! for the `did:web` method is included.

mod did;
mod document;
mod error;
mod resolver;
pub mod shape;
mod types;
pub mod web;

pub use did::{Did, Parameter};
pub use document::{
    Document, PublicKey, Service, VerificationMethod, VerificationMethods, VerificationReference,
};
pub use error::Error;
pub use resolver::{MethodResolver, Registry, Resolvable, Resolver};
pub use types::{ResolutionError, ResolutionMetadata, ResolutionOptions, ResolutionResult, DID_JSON};
pub use web::{WebResolver, WebResolverConfig};

/// Resolves a DID-URL with the built-in `did:web` resolver over HTTPS
///
/// # Arguments
/// * `did_url` - The DID or DID-URL to resolve
/// * `options` - Optional resolution parameters
///
/// # Example
/// ```no_run
/// use did_resolver::resolve;
///
/// #[tokio::main]
/// async fn main() {
///     let result = resolve("did:web:example.com", None).await;
///     match result.metadata.error {
///         Some(error) => eprintln!("resolution failed: {error}"),
///         None => println!("Resolved DID Document: {:?}", result.document),
///     }
/// }
/// ```
pub async fn resolve(did_url: &str, options: Option<ResolutionOptions>) -> ResolutionResult {
    let registry = Registry::new().with(web::METHOD, WebResolver::https());
    Resolver::new(registry)
        .resolve(did_url, &options.unwrap_or_default())
        .await
}
