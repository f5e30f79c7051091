//! DID resolution dispatch.
//!
//! A [`Resolver`] owns a [`Registry`] mapping DID method names to
//! [`MethodResolver`]s. Resolving a DID-URL parses it, selects the resolver
//! registered for its method, and returns that resolver's result unmodified.
//! The registry is assembled by the caller and handed over at construction;
//! it is read-only afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::did::Did;
use crate::types::{ResolutionError, ResolutionOptions, ResolutionResult};

/// Anything that can resolve a DID-URL
///
/// Method resolvers receive the dispatching [`Resolver`] through this trait so
/// that they can resolve other DIDs recursively.
#[async_trait]
pub trait Resolvable: Send + Sync {
    async fn resolve(&self, did_url: &str, options: &ResolutionOptions) -> ResolutionResult;
}

/// Resolution algorithm of a single DID method
///
/// Implementations must report every failure as a [`ResolutionError`] code in
/// the returned metadata.
#[async_trait]
pub trait MethodResolver: Send + Sync {
    /// Resolves `did_url`, of which `did` is the parsed form
    async fn resolve(
        &self,
        did_url: &str,
        did: &Did,
        resolver: &dyn Resolvable,
        options: &ResolutionOptions,
    ) -> ResolutionResult;
}

/// Adapts a plain function to [`MethodResolver`]
struct FnResolver<F>(F);

#[async_trait]
impl<F> MethodResolver for FnResolver<F>
where
    F: Fn(&str, &Did, &dyn Resolvable, &ResolutionOptions) -> ResolutionResult + Send + Sync,
{
    async fn resolve(
        &self,
        did_url: &str,
        did: &Did,
        resolver: &dyn Resolvable,
        options: &ResolutionOptions,
    ) -> ResolutionResult {
        (self.0)(did_url, did, resolver, options)
    }
}

/// Method name to resolver mapping
#[derive(Clone, Default)]
pub struct Registry {
    resolvers: HashMap<String, Arc<dyn MethodResolver>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `resolver` for `method`, replacing any previous one
    pub fn register(
        &mut self,
        method: impl Into<String>,
        resolver: impl MethodResolver + 'static,
    ) -> &mut Self {
        self.resolvers.insert(method.into(), Arc::new(resolver));
        self
    }

    /// Registers a plain function as the resolver for `method`
    pub fn register_fn<F>(&mut self, method: impl Into<String>, resolver: F) -> &mut Self
    where
        F: Fn(&str, &Did, &dyn Resolvable, &ResolutionOptions) -> ResolutionResult
            + Send
            + Sync
            + 'static,
    {
        self.register(method, FnResolver(resolver))
    }

    /// Builder form of [`Registry::register`]
    pub fn with(mut self, method: impl Into<String>, resolver: impl MethodResolver + 'static) -> Self {
        self.register(method, resolver);
        self
    }

    pub fn get(&self, method: &str) -> Option<&dyn MethodResolver> {
        self.resolvers.get(method).map(|resolver| resolver.as_ref())
    }

    pub fn contains(&self, method: &str) -> bool {
        self.resolvers.contains_key(method)
    }

    /// Registered method names, sorted
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.resolvers.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("methods", &self.methods())
            .finish()
    }
}

/// Dispatches resolution requests to method resolvers
#[derive(Debug, Clone)]
pub struct Resolver {
    registry: Registry,
}

impl Resolver {
    /// Creates a new Resolver over a fully assembled registry
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Resolves a DID or DID-URL
    ///
    /// # Example
    /// ```no_run
    /// use did_resolver::{Registry, ResolutionOptions, Resolver, WebResolver};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let registry = Registry::new().with("web", WebResolver::https());
    ///     let resolver = Resolver::new(registry);
    ///     let result = resolver
    ///         .resolve("did:web:example.com", &ResolutionOptions::default())
    ///         .await;
    ///     println!("Resolved DID Document: {:?}", result.document);
    /// }
    /// ```
    pub async fn resolve(&self, did_url: &str, options: &ResolutionOptions) -> ResolutionResult {
        let did = match Did::parse(did_url) {
            Ok(did) => did,
            Err(err) => {
                debug!(%err, "rejecting DID resolution request");
                return ResolutionResult::error(ResolutionError::InvalidDid);
            }
        };

        let Some(method_resolver) = self.registry.get(&did.method) else {
            debug!(did_url, method = %did.method, "no resolver registered for DID method");
            return ResolutionResult::error(ResolutionError::UnsupportedDidMethod);
        };

        debug!(did_url, method = %did.method, "dispatching DID resolution");
        let result = method_resolver.resolve(did_url, &did, self, options).await;
        if let Some(error) = result.metadata.error {
            debug!(did_url, %error, "DID resolution failed");
        }
        result
    }
}

#[async_trait]
impl Resolvable for Resolver {
    async fn resolve(&self, did_url: &str, options: &ResolutionOptions) -> ResolutionResult {
        Resolver::resolve(self, did_url, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::types::DID_JSON;

    fn echo(did_url: &str, did: &Did, _: &dyn Resolvable, options: &ResolutionOptions) -> ResolutionResult {
        let mut document = Document::new(Did::parse(&did.did()).unwrap());
        document.also_known_as.push(did_url.to_string());
        ResolutionResult::success(options.accept.clone(), document)
    }

    /// Resolves `did:alias:<id>` by resolving `did:example:<id>`
    struct AliasResolver;

    #[async_trait]
    impl MethodResolver for AliasResolver {
        async fn resolve(
            &self,
            _did_url: &str,
            did: &Did,
            resolver: &dyn Resolvable,
            options: &ResolutionOptions,
        ) -> ResolutionResult {
            let target = format!("did:example:{}", did.method_specific_id());
            resolver.resolve(&target, options).await
        }
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let resolver = Resolver::new(Registry::new());
        let result = resolver
            .resolve("did:unknownmethod:x", &ResolutionOptions::default())
            .await;

        assert_eq!(result.error_code(), Some(ResolutionError::UnsupportedDidMethod));
        assert!(result.document.is_none());
    }

    #[tokio::test]
    async fn test_invalid_did() {
        let mut registry = Registry::new();
        registry.register_fn("example", echo);
        let resolver = Resolver::new(registry);

        for did_url in ["", "notadid", "did:example:12%G4", "did:example:"] {
            let result = resolver.resolve(did_url, &ResolutionOptions::default()).await;
            assert_eq!(result.error_code(), Some(ResolutionError::InvalidDid), "{did_url:?}");
            assert!(result.document.is_none());
        }
    }

    #[tokio::test]
    async fn test_dispatches_to_registered_method() {
        let mut registry = Registry::new();
        registry.register_fn("example", echo);
        let resolver = Resolver::new(registry);

        let did_url = "did:example:123;service=agent/path?q=1#key-1";
        let result = resolver
            .resolve(did_url, &ResolutionOptions::new("application/did+ld+json"))
            .await;

        assert!(!result.is_error());
        assert_eq!(result.metadata.content_type.as_deref(), Some("application/did+ld+json"));
        let document = result.document.unwrap();
        assert_eq!(document.id.to_string(), "did:example:123");
        assert_eq!(document.also_known_as, vec![did_url]);
    }

    #[tokio::test]
    async fn test_returns_resolver_errors_unmodified() {
        let mut registry = Registry::new();
        registry.register_fn("example", |_: &str, _: &Did, _: &dyn Resolvable, _: &ResolutionOptions| {
            ResolutionResult::error(ResolutionError::NotFound)
        });
        let resolver = Resolver::new(registry);

        let result = resolver
            .resolve("did:example:123", &ResolutionOptions::default())
            .await;
        assert_eq!(result, ResolutionResult::error(ResolutionError::NotFound));
    }

    #[tokio::test]
    async fn test_recursive_resolution() {
        let mut registry = Registry::new();
        registry
            .register_fn("example", echo)
            .register("alias", AliasResolver);
        let resolver = Resolver::new(registry);

        let result = resolver
            .resolve("did:alias:123", &ResolutionOptions::default())
            .await;
        assert_eq!(result.metadata.content_type.as_deref(), Some(DID_JSON));
        assert_eq!(result.document.unwrap().id.to_string(), "did:example:123");

        let result = Resolver::new(Registry::new().with("alias", AliasResolver))
            .resolve("did:alias:123", &ResolutionOptions::default())
            .await;
        assert_eq!(result.error_code(), Some(ResolutionError::UnsupportedDidMethod));
    }

    #[test]
    fn test_registry() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());

        registry.register_fn("web", echo).register_fn("example", echo);
        let registry = registry.with("alias", AliasResolver);

        assert_eq!(registry.len(), 3);
        assert!(registry.contains("web"));
        assert!(registry.get("key").is_none());
        assert_eq!(registry.methods(), vec!["alias", "example", "web"]);
        assert_eq!(
            format!("{:?}", Resolver::new(registry)),
            r#"Resolver { registry: Registry { methods: ["alias", "example", "web"] } }"#
        );
    }
}
