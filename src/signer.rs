//! # Signing
//!
//! The inverse of [`crate::verifier`]: encode a payload as a compact JWS and
//! sign it with a [`KeySigner`]. Exists mainly so the crate's own tests (and
//! integration tests) can produce fixtures without a second dependency, but
//! it is public because a verification library that cannot also produce the
//! tokens it checks is awkward to test against in isolation.

use chrono::{DateTime, Utc};
use derive_builder::Builder;

use crate::core::OneMany;
use crate::encoding::{base64url, signing_input, Header};
use crate::envelope::EnvelopedCredential;
use crate::error::VpvcError;
use crate::key::KeySigner;
use crate::model::{Cnf, CredentialClaims, PresentationClaims};

/// Options shared by [`sign_credential`] and [`sign_presentation`]. Fields
/// not meaningful to a given call (`cnf`/`credential_schema` for a
/// presentation, `nonce`/`aud` for a credential) are simply left unset.
#[derive(Clone, Debug, Default, Builder)]
#[builder(default, setter(into, strip_option))]
pub struct SigningOptions {
    /// Issuance time. Defaults to the moment [`sign_credential`] or
    /// [`sign_presentation`] is called.
    pub issued_at: Option<DateTime<Utc>>,

    /// Not-valid-before time.
    pub nbf: Option<DateTime<Utc>>,

    /// Expiry time. For a credential, absent means long-lived. For a
    /// presentation, absent defaults to `issued_at + 3600s`.
    pub exp: Option<DateTime<Utc>>,

    /// Confirmation key, for a credential that binds its holder.
    pub cnf: Option<Cnf>,

    /// Intended audience, for a presentation.
    pub aud: Option<OneMany<String>>,

    /// Anti-replay nonce, for a presentation.
    pub nonce: Option<String>,
}

/// A presentation's default lifetime when [`SigningOptions::exp`] is unset.
const DEFAULT_PRESENTATION_LIFETIME_SECS: i64 = 3600;

/// Sign a credential payload, producing a compact JWS.
///
/// `iss` and `subject_claims` (merged into [`CredentialClaims::extra`] by
/// the caller before calling this function) are the caller's
/// responsibility; this function only fills in the time and confirmation
/// claims from `options` and produces the envelope.
///
/// # Errors
/// Returns [`VpvcError::Other`] if the payload cannot be JSON-encoded.
#[tracing::instrument(skip(claims, signer, options))]
pub fn sign_credential(
    mut claims: CredentialClaims, kid: &str, signer: &KeySigner<'_>, options: &SigningOptions,
) -> Result<String, VpvcError> {
    tracing::debug!(kid, "signing credential");
    claims.iat = options.issued_at.unwrap_or_else(Utc::now);
    claims.nbf = options.nbf;
    claims.exp = options.exp;
    if let Some(cnf) = &options.cnf {
        claims.cnf = Some(cnf.clone());
    }
    encode_and_sign(kid, signer, &claims)
}

/// Sign a presentation payload, wrapping `credentials` as enveloped
/// credentials and producing a compact JWS.
///
/// # Errors
/// Returns [`VpvcError::Other`] if the payload cannot be JSON-encoded.
#[tracing::instrument(skip(claims, credential_jws, signer, options))]
pub fn sign_presentation(
    mut claims: PresentationClaims, credential_jws: impl IntoIterator<Item = String>,
    kid: &str, signer: &KeySigner<'_>, options: &SigningOptions,
) -> Result<String, VpvcError> {
    tracing::debug!(kid, "signing presentation");
    let issued_at = options.issued_at.unwrap_or_else(Utc::now);
    claims.iat = issued_at;
    claims.nbf = options.nbf;
    claims.exp = options
        .exp
        .or_else(|| issued_at.checked_add_signed(chrono::Duration::seconds(DEFAULT_PRESENTATION_LIFETIME_SECS)));
    claims.nonce = options.nonce.clone();
    claims.aud = options.aud.clone();
    claims.verifiable_credential =
        credential_jws.into_iter().map(|jws| EnvelopedCredential::encode(&jws)).collect();
    encode_and_sign(kid, signer, &claims)
}

fn encode_and_sign<P: serde::Serialize>(
    kid: &str, signer: &KeySigner<'_>, payload: &P,
) -> Result<String, VpvcError> {
    let header = Header { alg: signer.algorithm(), typ: Some("jwt".to_string()), kid: Some(kid.to_string()) };
    let header_json = serde_json::to_vec(&header).map_err(|e| VpvcError::Other(e.into()))?;
    let payload_json = serde_json::to_vec(payload).map_err(|e| VpvcError::Other(e.into()))?;

    let header_segment = base64url::encode(&header_json);
    let payload_segment = base64url::encode(&payload_json);
    let input = signing_input(&header_segment, &payload_segment);
    let signature = signer.sign(&input).map_err(|e| VpvcError::Other(e.into()))?;
    let signature_segment = base64url::encode(&signature);

    Ok(format!("{header_segment}.{payload_segment}.{signature_segment}"))
}
