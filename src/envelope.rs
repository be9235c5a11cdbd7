//! # Enveloped Credentials
//!
//! A signed credential JWS is embedded in a presentation as a `data:` URI
//! wrapped in a small typed object — or, in legacy producers, as the bare
//! `data:` URI string. Both forms decode to the same inner JWS.

use serde::{Deserialize, Serialize};

use crate::core::Kind;

/// The `data:` URI scheme prefix an enveloped credential's `id` carries.
pub const ENVELOPE_SCHEME: &str = "data:application/vc+jwt,";

/// The `type` value of an enveloped-credential object.
pub const ENVELOPED_TYPE: &str = "EnvelopedVerifiableCredential";

/// An enveloped credential, in either the current object form or the
/// legacy bare-string form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopedCredential {
    /// Legacy producers emitted the `data:` URI directly as a string.
    Legacy(String),

    /// The current form: a typed wrapper object.
    Object(EnvelopedCredentialObject),
}

/// The object form of an enveloped credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopedCredentialObject {
    /// JSON-LD context, present for object-form envelopes produced by this
    /// crate; ignored on input if present under a different shape.
    #[serde(rename = "@context", skip_serializing_if = "Option::is_none", default)]
    pub context: Option<Kind<serde_json::Value>>,

    /// The `data:` URI carrying the inner JWS.
    pub id: String,

    /// Must equal [`ENVELOPED_TYPE`].
    #[serde(rename = "type")]
    pub type_: String,
}

/// A malformed envelope: missing `data:` prefix, or an object whose `type`
/// is not [`ENVELOPED_TYPE`]. Recoverable — the verifier folds this into a
/// `MalformedCredential` problem on the affected sub-credential, it never
/// aborts the whole call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidEnvelope(pub String);

impl std::fmt::Display for InvalidEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid enveloped credential: {}", self.0)
    }
}

impl std::error::Error for InvalidEnvelope {}

impl EnvelopedCredential {
    /// Wrap a signed credential JWS as an enveloped credential object.
    #[must_use]
    pub fn encode(jws: &str) -> Self {
        Self::Object(EnvelopedCredentialObject {
            context: Some(Kind::String("https://www.w3.org/ns/credentials/v2".to_string())),
            id: format!("{ENVELOPE_SCHEME}{jws}"),
            type_: ENVELOPED_TYPE.to_string(),
        })
    }

    /// Extract the inner JWS, accepting either envelope form.
    ///
    /// # Errors
    /// Returns [`InvalidEnvelope`] if an object envelope's `type` is not
    /// [`ENVELOPED_TYPE`], or if the `data:` prefix is missing from either
    /// form's `id`/string value.
    pub fn decode(&self) -> Result<&str, InvalidEnvelope> {
        let id = match self {
            Self::Legacy(s) => s.as_str(),
            Self::Object(obj) => {
                if obj.type_ != ENVELOPED_TYPE {
                    return Err(InvalidEnvelope(format!(
                        "expected type `{ENVELOPED_TYPE}`, found `{}`",
                        obj.type_
                    )));
                }
                obj.id.as_str()
            }
        };
        id.strip_prefix(ENVELOPE_SCHEME)
            .ok_or_else(|| InvalidEnvelope(format!("id does not start with `{ENVELOPE_SCHEME}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_round_trips() {
        let envelope = EnvelopedCredential::encode("header.payload.sig");
        assert_eq!(envelope.decode().expect("should decode"), "header.payload.sig");
    }

    #[test]
    fn decode_accepts_legacy_string_form() {
        let envelope =
            EnvelopedCredential::Legacy(format!("{ENVELOPE_SCHEME}header.payload.sig"));
        assert_eq!(envelope.decode().expect("should decode"), "header.payload.sig");
    }

    #[test]
    fn decode_rejects_missing_prefix() {
        let envelope = EnvelopedCredential::Legacy("header.payload.sig".to_string());
        assert!(envelope.decode().is_err());
    }

    #[test]
    fn decode_rejects_wrong_object_type() {
        let envelope = EnvelopedCredential::Object(EnvelopedCredentialObject {
            context: None,
            id: format!("{ENVELOPE_SCHEME}header.payload.sig"),
            type_: "SomethingElse".to_string(),
        });
        assert!(envelope.decode().is_err());
    }

    #[test]
    fn encoded_object_serializes_with_expected_shape() {
        let envelope = EnvelopedCredential::encode("h.p.s");
        let json = serde_json::to_value(&envelope).expect("should serialize");
        assert_eq!(json["type"], ENVELOPED_TYPE);
        assert_eq!(json["id"], format!("{ENVELOPE_SCHEME}h.p.s"));
    }
}
