//! # Payload Data Model
//!
//! The JWT claim shapes this crate signs and verifies: a credential payload
//! (`CredentialClaims`) and a presentation payload (`PresentationClaims`).
//! Both carry the standard time claims plus the small set of claims the
//! verifier cares about; everything else the caller put on the credential
//! (`credentialSubject` and friends) round-trips through `extra`.

use chrono::serde::ts_seconds_option;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::OneMany;
use crate::envelope::EnvelopedCredential;

/// Confirmation claim (`cnf`): binds a credential to the holder key that
/// alone may present it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cnf {
    /// The key id of the holder's authentication key.
    pub kid: String,
}

/// A reference to a schema a credential claims conformance to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSchemaRef {
    /// Dereferenceable identifier for the schema.
    pub id: String,

    /// The schema language/type, e.g. `"JsonSchema"`.
    #[serde(rename = "type")]
    pub type_: String,
}

/// The payload of a signed credential JWS.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialClaims {
    /// Issuer controller id.
    pub iss: String,

    /// Issuance time.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub iat: DateTime<Utc>,

    /// Not-valid-before time. Absent means no lower bound.
    #[serde(with = "ts_seconds_option", default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<DateTime<Utc>>,

    /// Expiry time. Absent means the credential is long-lived by default;
    /// the verifier never invents one.
    #[serde(with = "ts_seconds_option", default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<DateTime<Utc>>,

    /// Binds this credential to a holder key; absent means the credential
    /// trivially satisfies the confirmation-key check.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cnf: Option<Cnf>,

    /// Optional schema(s) the credential claims to conform to.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub credential_schema: Option<OneMany<CredentialSchemaRef>>,

    /// Every other claim on the payload (`credentialSubject`, `@context`,
    /// `type`, ...), preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The payload of a signed presentation JWS.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationClaims {
    /// Holder identifier.
    pub iss: String,

    /// Issuance time.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub iat: DateTime<Utc>,

    /// Not-valid-before time.
    #[serde(with = "ts_seconds_option", default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<DateTime<Utc>>,

    /// Expiry time. The signer defaults this to `iat + 3600s` unless the
    /// caller overrides it; the verifier treats its absence as "no upper
    /// bound" rather than inventing one.
    #[serde(with = "ts_seconds_option", default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<DateTime<Utc>>,

    /// Anti-replay nonce, checked against [`crate::verifier::VerificationOptions::expected_nonce`].
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub nonce: Option<String>,

    /// Intended audience, checked against [`crate::verifier::VerificationOptions::expected_audience`].
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub aud: Option<OneMany<String>>,

    /// The enveloped credentials this presentation packages.
    #[serde(default)]
    pub verifiable_credential: Vec<EnvelopedCredential>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_claims_round_trip_preserves_extra_fields() {
        let json = serde_json::json!({
            "iss": "https://issuer.example",
            "iat": 1_700_000_000,
            "cnf": { "kid": "holder-key" },
            "credentialSubject": { "name": "Alice" },
        });
        let claims: CredentialClaims = serde_json::from_value(json).expect("should deserialize");
        assert_eq!(claims.iss, "https://issuer.example");
        assert_eq!(claims.cnf.as_ref().map(|c| c.kid.as_str()), Some("holder-key"));
        assert_eq!(claims.extra["credentialSubject"]["name"], "Alice");

        let round_tripped = serde_json::to_value(&claims).expect("should serialize");
        assert_eq!(round_tripped["credentialSubject"]["name"], "Alice");
    }

    #[test]
    fn presentation_claims_defaults_to_empty_credential_list() {
        let json = serde_json::json!({
            "iss": "https://holder.example",
            "iat": 1_700_000_000,
        });
        let claims: PresentationClaims = serde_json::from_value(json).expect("should deserialize");
        assert!(claims.verifiable_credential.is_empty());
        assert!(claims.aud.is_none());
    }
}
