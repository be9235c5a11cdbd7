//! # Errors
//!
//! The verifier distinguishes two tiers of failure. A security property that
//! fails is a recoverable *problem* recorded on a [`crate::verifier::DetailedVerificationResult`]
//! alongside every other check the call made. A condition under which no
//! useful result can be produced at all — a token that cannot be parsed, a
//! controller the trust store has never heard of, a caller-asserted protocol
//! requirement (`nonce`, `aud`) that the token violates — aborts the call
//! with one of the variants below.
//!
//! Everything that is not part of this closed abort surface is composed
//! internally with [`anyhow::Result`] and converted at the public boundary.

use thiserror::Error;

/// The closed set of conditions under which [`crate::verifier::verify_presentation`]
/// aborts instead of returning an aggregate result.
#[derive(Debug, Error)]
pub enum VpvcError {
    /// The token was not a well-formed three-segment JWS, or a segment did
    /// not decode to the expected JSON shape.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The presentation's protected header did not carry a `kid`; there is
    /// no key to resolve and therefore no way to verify the signature.
    #[error("presentation header is missing the required `kid`")]
    MissingKid,

    /// The trust store has no controller document for the given identifier.
    #[error("unable to resolve controller `{0}`")]
    UnresolvedController(String),

    /// The caller required a specific `nonce` and the presentation's `nonce`
    /// claim did not match it.
    #[error("nonce mismatch: expected `{expected}`, found {actual:?}")]
    NonceMismatch {
        /// The nonce the caller required.
        expected: String,
        /// The nonce actually present on the presentation, if any.
        actual: Option<String>,
    },

    /// The caller required one of a set of audiences and the presentation's
    /// `aud` claim shared none of them.
    #[error("audience mismatch: expected one of {expected:?}, found {actual:?}")]
    AudienceMismatch {
        /// The audience set the caller required.
        expected: Vec<String>,
        /// The audience set actually present on the presentation, if any.
        actual: Option<Vec<String>>,
    },

    /// An internal composition error not covered by a more specific variant.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
