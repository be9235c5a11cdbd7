//! # Encoding
//!
//! Base64url (no padding) for JWS segments, and the compact-JWS parser: a
//! strict three-segment split plus header/payload JSON decoding. The parser
//! hands back both the decoded header/payload *and* the original segment
//! strings, because the signature covers `protected.payload` of the
//! *as-transmitted* encodings, never a re-serialization of the decoded
//! value.

use base64ct::{Base64UrlUnpadded, Encoding as _};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::key::Algorithm;

/// Base64url (RFC 4648 §5, unpadded) encode/decode.
pub mod base64url {
    use super::{Base64UrlUnpadded, Encoding as _};

    /// Encode `bytes` as unpadded base64url.
    #[must_use]
    pub fn encode(bytes: &[u8]) -> String {
        Base64UrlUnpadded::encode_string(bytes)
    }

    /// Decode an unpadded base64url string.
    ///
    /// # Errors
    /// Returns an error if `s` is not valid base64url.
    pub fn decode(s: &str) -> anyhow::Result<Vec<u8>> {
        Base64UrlUnpadded::decode_vec(s).map_err(|e| anyhow::anyhow!("invalid base64url: {e}"))
    }
}

/// The JWS protected header.
///
/// `kid` is `Option` rather than required so that a header missing it can
/// still be parsed and reported as [`crate::VpvcError::MissingKid`] by the
/// verifier, rather than failing at the JSON-decoding stage with an
/// indistinguishable parse error.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Header {
    /// Signature algorithm.
    pub alg: Algorithm,

    /// Media type of the JWS, conventionally `"jwt"`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub typ: Option<String>,

    /// Key identifier: either a bare thumbprint or `<controller-id>#<fragment>`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub kid: Option<String>,
}

/// A parsed (but not yet cryptographically verified) compact JWS.
pub struct ParsedJws<H, P> {
    /// The decoded protected header.
    pub header: H,

    /// The decoded payload.
    pub payload: P,

    /// The original (as-transmitted) base64url header segment.
    pub header_segment: String,

    /// The original (as-transmitted) base64url payload segment.
    pub payload_segment: String,

    /// The original (as-transmitted) base64url signature segment.
    pub signature_segment: String,
}

impl<H, P> ParsedJws<H, P> {
    /// The bytes the signature was computed over:
    /// `header_segment || '.' || payload_segment`, as ASCII.
    #[must_use]
    pub fn signing_input(&self) -> Vec<u8> {
        signing_input(&self.header_segment, &self.payload_segment)
    }

    /// The raw signature bytes.
    ///
    /// # Errors
    /// Returns an error if the signature segment is not valid base64url.
    pub fn signature_bytes(&self) -> anyhow::Result<Vec<u8>> {
        base64url::decode(&self.signature_segment)
    }
}

/// The bytes a JWS signature is computed over.
#[must_use]
pub fn signing_input(header_segment: &str, payload_segment: &str) -> Vec<u8> {
    format!("{header_segment}.{payload_segment}").into_bytes()
}

/// Split a compact JWS into its three segments, requiring exactly three
/// non-empty parts.
///
/// # Errors
/// Returns a description of the malformation if the token does not have
/// exactly three non-empty, dot-separated segments.
pub fn split(token: &str) -> Result<(&str, &str, &str), String> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(format!("expected 3 segments, found {}", parts.len()));
    }
    if parts.iter().any(|p| p.is_empty()) {
        return Err("one or more segments is empty".to_string());
    }
    Ok((parts[0], parts[1], parts[2]))
}

/// Parse a compact JWS, decoding the header and payload as JSON.
///
/// This is the tolerant, non-aborting form used when parsing an enveloped
/// credential: malformation is reported as a plain string so the caller can
/// fold it into a recoverable problem rather than an abort.
///
/// # Errors
/// Returns a description of the malformation on any parse failure.
pub fn try_parse<H, P>(token: &str) -> Result<ParsedJws<H, P>, String>
where
    H: DeserializeOwned,
    P: DeserializeOwned,
{
    let (header_segment, payload_segment, signature_segment) = split(token)?;

    let header_bytes =
        base64url::decode(header_segment).map_err(|e| format!("invalid header encoding: {e}"))?;
    let header: H = serde_json::from_slice(&header_bytes)
        .map_err(|e| format!("invalid header: {e}"))?;

    let payload_bytes = base64url::decode(payload_segment)
        .map_err(|e| format!("invalid payload encoding: {e}"))?;
    let payload: P = serde_json::from_slice(&payload_bytes)
        .map_err(|e| format!("invalid payload: {e}"))?;

    Ok(ParsedJws {
        header,
        payload,
        header_segment: header_segment.to_string(),
        payload_segment: payload_segment.to_string(),
        signature_segment: signature_segment.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64url_round_trips() {
        let encoded = base64url::encode(b"hello world");
        assert_eq!(base64url::decode(&encoded).expect("should decode"), b"hello world");
    }

    #[test]
    fn split_rejects_wrong_segment_count() {
        assert!(split("a.b").is_err());
        assert!(split("a.b.c.d").is_err());
    }

    #[test]
    fn split_rejects_empty_segment() {
        assert!(split("a..c").is_err());
    }

    #[test]
    fn split_accepts_three_segments() {
        assert_eq!(split("a.b.c").expect("should split"), ("a", "b", "c"));
    }

    #[test]
    fn try_parse_decodes_header_and_payload() {
        let header =
            base64url::encode(br#"{"alg":"ES256","kid":"abc"}"#);
        let payload = base64url::encode(br#"{"iss":"https://issuer.example"}"#);
        let token = format!("{header}.{payload}.sig");

        let parsed: ParsedJws<Header, serde_json::Value> =
            try_parse(&token).expect("should parse");
        assert_eq!(parsed.header.kid.as_deref(), Some("abc"));
        assert_eq!(parsed.payload["iss"], "https://issuer.example");
        assert_eq!(parsed.signature_segment, "sig");
    }
}
