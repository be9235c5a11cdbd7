//! # Resolver
//!
//! An abstract mapping from controller identifier to controller document,
//! and from a verification-method id within that document to a bound
//! [`KeyVerifier`] for a specific relation (`assertion` or `authentication`).
//!
//! The trait is deliberately synchronous: the generic in-memory
//! implementation never suspends, and the crate's non-goals exclude any
//! network-fetching implementation, so there is no call for an async trait
//! surface here. A wrapping, I/O-performing resolver is free to block
//! internally; that adaptation lives outside this crate.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::VpvcError;
use crate::key::{KeyVerifier, PublicKey};

/// One verification method: a key id bound to a public key, asserted by a
/// specific controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationMethod {
    /// The verification method id, conventionally `<controller-id>#<fragment>`.
    pub id: String,

    /// The controller that asserts this verification method. Must equal the
    /// owning [`ControllerDocument::id`].
    pub controller: String,

    /// The public key.
    pub public_key: PublicKey,
}

/// A controller document: an identity and the verification methods it
/// authorizes, split by relation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ControllerDocument {
    /// The controller's identifier.
    pub id: String,

    /// Every verification method this document defines.
    pub verification_method: Vec<VerificationMethod>,

    /// Verification-method ids authorized to sign credentials.
    #[serde(default)]
    pub assertion: Vec<String>,

    /// Verification-method ids authorized to sign presentations.
    #[serde(default)]
    pub authentication: Vec<String>,
}

impl ControllerDocument {
    /// Start building a controller document with the given identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    /// Add a verification method.
    #[must_use]
    pub fn with_verification_method(mut self, method: VerificationMethod) -> Self {
        self.verification_method.push(method);
        self
    }

    /// Authorize a verification-method id for the `assertion` relation.
    #[must_use]
    pub fn assert_with(mut self, verification_method_id: impl Into<String>) -> Self {
        self.assertion.push(verification_method_id.into());
        self
    }

    /// Authorize a verification-method id for the `authentication` relation.
    #[must_use]
    pub fn authenticate_with(mut self, verification_method_id: impl Into<String>) -> Self {
        self.authentication.push(verification_method_id.into());
        self
    }
}

/// The relation a key is being resolved for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    /// Keys authorized to sign credentials.
    Assertion,
    /// Keys authorized to sign presentations.
    Authentication,
}

/// A recoverable failure to resolve a specific key within an already-known
/// controller. Distinct from [`VpvcError::UnresolvedController`], which
/// means the controller itself is unknown to the trust store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum KeyResolutionError {
    /// Neither the full verification-method id nor its bare fragment
    /// matched any verification method in the document.
    #[error("no verification method matches this key id")]
    UnknownKey,

    /// The key exists but is not listed in the requested relation.
    #[error("key is not authorized for this relation")]
    NotAuthorizedForRelation,
}

/// An index built once per controller document at insertion time, so that
/// full-id and bare-fragment lookups share a single path instead of
/// duplicating the search.
struct DocumentIndex {
    document: ControllerDocument,
    by_id: HashMap<String, usize>,
    by_fragment: HashMap<String, usize>,
}

impl DocumentIndex {
    fn build(document: ControllerDocument) -> Self {
        let mut by_id = HashMap::new();
        let mut by_fragment = HashMap::new();
        for (index, method) in document.verification_method.iter().enumerate() {
            by_id.insert(method.id.clone(), index);
            let fragment = method.id.split_once('#').map_or(method.id.as_str(), |(_, frag)| frag);
            by_fragment.insert(fragment.to_string(), index);
        }
        Self { document, by_id, by_fragment }
    }

    fn find(&self, kid: &str) -> Option<usize> {
        if let Some(&index) = self.by_id.get(kid) {
            return Some(index);
        }
        let fragment = kid.split_once('#').map_or(kid, |(_, frag)| frag);
        self.by_fragment.get(fragment).copied()
    }

    fn authorized_for(&self, method_index: usize, relation: Relation) -> bool {
        let method = &self.document.verification_method[method_index];
        let allowed = match relation {
            Relation::Assertion => &self.document.assertion,
            Relation::Authentication => &self.document.authentication,
        };
        allowed.iter().any(|allowed_id| self.find(allowed_id) == Some(method_index))
    }
}

/// A controller successfully resolved from the trust store, exposing
/// relation-scoped key resolution.
#[derive(Clone)]
pub struct ResolvedController {
    index: Arc<DocumentIndex>,
}

impl ResolvedController {
    /// Resolve `kid` to a verifier bound to an `assertion`-authorized key.
    ///
    /// # Errors
    /// Returns [`KeyResolutionError`] if no verification method matches, or
    /// if it matches but is not authorized to sign credentials.
    pub fn resolve_assertion_key(&self, kid: &str) -> Result<KeyVerifier, KeyResolutionError> {
        self.resolve_relation_key(kid, Relation::Assertion)
    }

    /// Resolve `kid` to a verifier bound to an `authentication`-authorized
    /// key.
    ///
    /// # Errors
    /// Returns [`KeyResolutionError`] if no verification method matches, or
    /// if it matches but is not authorized to sign presentations.
    pub fn resolve_authentication_key(&self, kid: &str) -> Result<KeyVerifier, KeyResolutionError> {
        self.resolve_relation_key(kid, Relation::Authentication)
    }

    fn resolve_relation_key(
        &self, kid: &str, relation: Relation,
    ) -> Result<KeyVerifier, KeyResolutionError> {
        let index = self.index.find(kid).ok_or(KeyResolutionError::UnknownKey)?;
        if !self.index.authorized_for(index, relation) {
            return Err(KeyResolutionError::NotAuthorizedForRelation);
        }
        let method = &self.index.document.verification_method[index];
        Ok(KeyVerifier::new(method.public_key.clone()))
    }

    /// The resolved document's own identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.index.document.id
    }
}

/// A schema compiled by [`Resolver::resolve_schema`], invoked only when
/// [`crate::verifier::VerificationOptions::validate_credential_schemas`] is
/// set.
pub trait SchemaValidator {
    /// Check `credential` (the full JSON value of the credential payload)
    /// against this schema.
    fn validate(&self, credential: &serde_json::Value) -> bool;
}

/// Maps controller identifiers to controller documents, and schema
/// identifiers to compiled validators. No network I/O is performed by the
/// generic in-memory implementation; a resolver that does perform I/O is a
/// higher-level collaborator outside this crate's scope.
pub trait Resolver {
    /// Resolve `identifier` (a controller id or a key id; any `#fragment`
    /// is stripped before lookup) to its controller document.
    ///
    /// # Errors
    /// Returns [`VpvcError::UnresolvedController`] if the trust store has no
    /// entry for the (fragment-stripped) identifier. This is the one
    /// resolver failure that aborts verification rather than being recorded
    /// as a recoverable problem, because it means the caller never supplied
    /// the parties needed to evaluate the presentation at all.
    fn resolve_controller(&self, identifier: &str) -> Result<ResolvedController, VpvcError>;

    /// Resolve a schema identifier to a compiled validator. Only called when
    /// schema validation is enabled; the default implementation reports
    /// schemas as unsupported, which the claim validator folds into a
    /// `SchemaViolation` problem rather than propagating.
    ///
    /// # Errors
    /// Returns an error if the identifier cannot be resolved to a schema.
    fn resolve_schema(&self, identifier: &str) -> anyhow::Result<Box<dyn SchemaValidator>> {
        Err(anyhow::anyhow!("schema resolution is not supported for `{identifier}`"))
    }
}

/// A generic, in-memory [`Resolver`] built from a fixed set of controller
/// documents. Suitable both for tests and for callers who have already
/// fetched and cached the trust store themselves.
#[derive(Clone, Default)]
pub struct InMemoryResolver {
    controllers: HashMap<String, Arc<DocumentIndex>>,
}

impl InMemoryResolver {
    /// An empty resolver; populate it with [`InMemoryResolver::add`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a resolver from an iterator of `(identifier, document)` pairs.
    #[must_use]
    pub fn from_documents(
        documents: impl IntoIterator<Item = (String, ControllerDocument)>,
    ) -> Self {
        let mut resolver = Self::new();
        for (identifier, document) in documents {
            resolver.add(identifier, document);
        }
        resolver
    }

    /// Add (or replace) a controller document under `identifier`.
    pub fn add(&mut self, identifier: impl Into<String>, document: ControllerDocument) {
        self.controllers.insert(identifier.into(), Arc::new(DocumentIndex::build(document)));
    }
}

impl Resolver for InMemoryResolver {
    fn resolve_controller(&self, identifier: &str) -> Result<ResolvedController, VpvcError> {
        let controller_id = identifier.split_once('#').map_or(identifier, |(id, _)| id);
        let index = self
            .controllers
            .get(controller_id)
            .ok_or_else(|| VpvcError::UnresolvedController(controller_id.to_string()))?;
        Ok(ResolvedController { index: Arc::clone(index) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{generate, export_public, Algorithm};

    fn doc_with_one_key(controller: &str, relation: Relation) -> (ControllerDocument, String) {
        let key = generate(Algorithm::Es256);
        let public = export_public(&key);
        let vm_id = format!("{controller}#{}", public.kid);
        let mut doc = ControllerDocument::new(controller).with_verification_method(
            VerificationMethod { id: vm_id.clone(), controller: controller.to_string(), public_key: public },
        );
        doc = match relation {
            Relation::Assertion => doc.assert_with(vm_id.clone()),
            Relation::Authentication => doc.authenticate_with(vm_id.clone()),
        };
        (doc, vm_id)
    }

    #[test]
    fn resolves_by_full_id_and_by_fragment() {
        let (doc, vm_id) = doc_with_one_key("https://issuer.example", Relation::Assertion);
        let fragment = vm_id.split_once('#').expect("has fragment").1.to_string();

        let mut resolver = InMemoryResolver::new();
        resolver.add("https://issuer.example", doc);
        let resolved = resolver.resolve_controller("https://issuer.example").expect("should resolve");

        assert!(resolved.resolve_assertion_key(&vm_id).is_ok());
        assert!(resolved.resolve_assertion_key(&fragment).is_ok());
    }

    #[test]
    fn unknown_controller_is_unresolved_error() {
        let resolver = InMemoryResolver::new();
        let err = resolver.resolve_controller("https://nobody.example").unwrap_err();
        assert!(matches!(err, VpvcError::UnresolvedController(_)));
    }

    #[test]
    fn key_not_authorized_for_relation_is_distinct_from_unknown() {
        let (doc, vm_id) = doc_with_one_key("https://issuer.example", Relation::Assertion);
        let mut resolver = InMemoryResolver::new();
        resolver.add("https://issuer.example", doc);
        let resolved = resolver.resolve_controller("https://issuer.example").expect("should resolve");

        // authorized only for assertion, not authentication
        assert_eq!(
            resolved.resolve_authentication_key(&vm_id).unwrap_err(),
            KeyResolutionError::NotAuthorizedForRelation
        );
        assert_eq!(
            resolved.resolve_assertion_key("not-a-real-kid").unwrap_err(),
            KeyResolutionError::UnknownKey
        );
    }

    #[test]
    fn resolving_with_embedded_fragment_strips_controller_prefix() {
        let (doc, vm_id) = doc_with_one_key("https://issuer.example", Relation::Assertion);
        let mut resolver = InMemoryResolver::new();
        resolver.add("https://issuer.example", doc);

        let resolved = resolver.resolve_controller(&vm_id).expect("should strip fragment and resolve");
        assert_eq!(resolved.id(), "https://issuer.example");
    }
}
