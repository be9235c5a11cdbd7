//! # Claim Checks
//!
//! Small, independently testable checks over JWT claims: the time-bounded
//! validity window, the anti-replay nonce, the intended audience, and
//! (optionally) conformance to a declared credential schema. The verifier
//! composes these; none of them parses a token or touches a signature.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::core::OneMany;
use crate::error::VpvcError;
use crate::resolver::Resolver;

/// Tolerance applied to a future-dated `iat`, to absorb clock drift between
/// signer and verifier. Never applied to `exp`: an expired credential is
/// expired regardless of whose clock is wrong.
pub const CLOCK_SKEW_SECS: i64 = 60;

/// A recoverable failure of the time-bounded validity window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TimeClaimFailure {
    /// `at` is at or after `exp`.
    #[error("expired")]
    Expired,

    /// `at` is before `nbf`.
    #[error("not yet valid")]
    NotYetValid,

    /// `at` is before `iat`, beyond [`CLOCK_SKEW_SECS`] tolerance.
    #[error("issued in the future")]
    IssuedInFuture,
}

/// Check `iat`/`nbf`/`exp` against the instant `at`.
///
/// `nbf`, where present, takes precedence over `iat` as the lower bound:
/// a token may be issued before it becomes valid. `iat` in the future
/// (beyond [`CLOCK_SKEW_SECS`]) is itself a failure, independent of `nbf`.
///
/// # Errors
/// Returns the first [`TimeClaimFailure`] encountered, checked in the order
/// expiry, not-yet-valid (via `nbf`), issued-in-future (via `iat`).
pub fn check_time_claims(
    iat: DateTime<Utc>, nbf: Option<DateTime<Utc>>, exp: Option<DateTime<Utc>>, at: DateTime<Utc>,
) -> Result<(), TimeClaimFailure> {
    if let Some(exp) = exp {
        if at > exp {
            return Err(TimeClaimFailure::Expired);
        }
    }
    if let Some(nbf) = nbf {
        if at < nbf {
            return Err(TimeClaimFailure::NotYetValid);
        }
    }
    let skew = chrono::Duration::seconds(CLOCK_SKEW_SECS);
    if at + skew < iat {
        return Err(TimeClaimFailure::IssuedInFuture);
    }
    Ok(())
}

/// Check a presentation's `nonce` claim against the caller's expectation.
///
/// # Errors
/// Returns [`VpvcError::NonceMismatch`] if `expected` is `Some` and does not
/// equal `actual`. A caller that did not require a nonce (`expected: None`)
/// always succeeds, regardless of what the presentation carries.
pub fn check_nonce(actual: Option<&str>, expected: Option<&str>) -> Result<(), VpvcError> {
    let Some(expected) = expected else { return Ok(()) };
    if actual == Some(expected) {
        return Ok(());
    }
    Err(VpvcError::NonceMismatch {
        expected: expected.to_string(),
        actual: actual.map(str::to_string),
    })
}

/// Check a presentation's `aud` claim against the caller's expected set.
///
/// # Errors
/// Returns [`VpvcError::AudienceMismatch`] if `expected` is non-empty and
/// shares no member with `actual`. An empty `expected` set always succeeds.
pub fn check_audience(
    actual: Option<&OneMany<String>>, expected: &[String],
) -> Result<(), VpvcError> {
    if expected.is_empty() {
        return Ok(());
    }
    let matches = actual.is_some_and(|aud| aud.iter().any(|a| expected.iter().any(|e| e == a)));
    if matches {
        return Ok(());
    }
    Err(VpvcError::AudienceMismatch {
        expected: expected.to_vec(),
        actual: actual.map(|aud| aud.iter().cloned().collect()),
    })
}

/// Check a credential payload against every schema it declares conformance
/// to, via the resolver's [`crate::resolver::SchemaValidator`].
///
/// # Errors
/// Returns a description of the first unresolved or failing schema. This is
/// intentionally a plain `String`, not [`VpvcError`]: the verifier folds it
/// into a `SchemaViolation` problem rather than aborting.
pub fn check_schema(
    credential_json: &Value, schema_refs: &OneMany<crate::model::CredentialSchemaRef>,
    resolver: &dyn Resolver,
) -> Result<(), String> {
    for schema_ref in schema_refs.iter() {
        let validator = resolver
            .resolve_schema(&schema_ref.id)
            .map_err(|e| format!("could not resolve schema `{}`: {e}", schema_ref.id))?;
        if !validator.validate(credential_json) {
            return Err(format!("credential does not conform to schema `{}`", schema_ref.id));
        }
    }
    Ok(())
}
