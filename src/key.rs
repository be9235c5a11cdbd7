//! # Key Primitives
//!
//! ECDSA key generation, export, thumbprinting, signing and verification
//! over the two curves this crate supports: P-256 (`ES256`) and P-384
//! (`ES384`). Signatures are the IEEE-P1363 `r || s` concatenation that
//! `p256`/`p384`'s bundled `ecdsa::Signature::to_bytes` already produces —
//! never DER.
//!
//! Grounded in the RustCrypto `p256`/`p384`/`ecdsa` usage shown by
//! `other_examples/ca6cd6ed_srbryant86-certnode` (JWK thumbprinting and
//! ES256 verification) and `other_examples/e0aa6e99_IAmCoder-nl-wallet`
//! (ECDSA signing over JOSE claims).

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use signature::{Signer as _, Verifier as _};

/// Supported JOSE signature algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// ECDSA using P-256 and SHA-256.
    #[serde(rename = "ES256")]
    Es256,

    /// ECDSA using P-384 and SHA-384.
    #[serde(rename = "ES384")]
    Es384,
}

impl Algorithm {
    /// The curve this algorithm signs over.
    #[must_use]
    pub const fn curve(self) -> Curve {
        match self {
            Self::Es256 => Curve::P256,
            Self::Es384 => Curve::P384,
        }
    }
}

/// The named elliptic curve backing a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Curve {
    /// NIST P-256, used with `ES256`.
    #[serde(rename = "P-256")]
    P256,

    /// NIST P-384, used with `ES384`.
    #[serde(rename = "P-384")]
    P384,
}

/// A public key in JWK shape, restricted to the EC key types this crate
/// supports.
///
/// Invariant: `kid` is a pure function of `{kty, crv, x, y}` — see
/// [`thumbprint`]. Exporting the public half of a [`PrivateKey`] preserves
/// it verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    /// Key type; always `"EC"` for keys this crate produces.
    pub kty: String,

    /// The curve the key is defined over.
    pub crv: Curve,

    /// The algorithm this key is used with.
    pub alg: Algorithm,

    /// Stable key identifier: the RFC 7638 thumbprint of `{kty, crv, x, y}`.
    pub kid: String,

    /// Base64url-encoded big-endian X coordinate.
    pub x: String,

    /// Base64url-encoded big-endian Y coordinate.
    pub y: String,
}

/// A private key, in JWK shape. Carries the public components alongside the
/// private scalar `d` so the public key can always be recovered without a
/// curve operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrivateKey {
    /// The key's public half.
    #[serde(flatten)]
    pub public: PublicKey,

    /// Base64url-encoded big-endian private scalar.
    pub d: String,
}

/// Errors produced by the key primitives. These are internal to key
/// handling; callers see them wrapped in [`crate::VpvcError::Other`] or, in
/// the verifier, folded into a recoverable problem.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// The coordinate or scalar was not valid base64url.
    #[error("invalid base64url encoding: {0}")]
    Encoding(String),

    /// The decoded bytes did not form a valid point or scalar for the curve.
    #[error("invalid key material for {0:?}")]
    InvalidMaterial(Curve),
}

/// Generate a fresh private key for the given algorithm.
#[must_use]
pub fn generate(alg: Algorithm) -> PrivateKey {
    match alg.curve() {
        Curve::P256 => {
            let signing_key = p256::ecdsa::SigningKey::random(&mut rand_core::OsRng);
            let verifying_key = signing_key.verifying_key();
            let point = verifying_key.to_encoded_point(false);
            let x = Base64UrlUnpadded::encode_string(point.x().expect("uncompressed point has x"));
            let y = Base64UrlUnpadded::encode_string(point.y().expect("uncompressed point has y"));
            let d = Base64UrlUnpadded::encode_string(&signing_key.to_bytes());
            finish_generate(Curve::P256, alg, x, y, d)
        }
        Curve::P384 => {
            let signing_key = p384::ecdsa::SigningKey::random(&mut rand_core::OsRng);
            let verifying_key = signing_key.verifying_key();
            let point = verifying_key.to_encoded_point(false);
            let x = Base64UrlUnpadded::encode_string(point.x().expect("uncompressed point has x"));
            let y = Base64UrlUnpadded::encode_string(point.y().expect("uncompressed point has y"));
            let d = Base64UrlUnpadded::encode_string(&signing_key.to_bytes());
            finish_generate(Curve::P384, alg, x, y, d)
        }
    }
}

fn finish_generate(crv: Curve, alg: Algorithm, x: String, y: String, d: String) -> PrivateKey {
    let mut public = PublicKey { kty: "EC".to_string(), crv, alg, kid: String::new(), x, y };
    public.kid = thumbprint(&public);
    PrivateKey { public, d }
}

/// Export the public half of a private key. The `kid` is carried over
/// unchanged.
#[must_use]
pub fn export_public(private: &PrivateKey) -> PublicKey {
    private.public.clone()
}

/// Compute the RFC 7638 thumbprint of a public key's canonical
/// representation: the JSON object `{"crv":...,"kty":"EC","x":...,"y":...}`
/// with members in that fixed lexicographic order and no insignificant
/// whitespace, SHA-256-hashed and base64url-encoded.
#[must_use]
pub fn thumbprint(public: &PublicKey) -> String {
    let crv = match public.crv {
        Curve::P256 => "P-256",
        Curve::P384 => "P-384",
    };
    let canonical = format!(r#"{{"crv":"{crv}","kty":"EC","x":"{}","y":"{}"}}"#, public.x, public.y);
    let digest = Sha256::digest(canonical.as_bytes());
    Base64UrlUnpadded::encode_string(&digest)
}

/// A signer bound to one private key.
pub struct KeySigner<'a> {
    key: &'a PrivateKey,
}

impl<'a> KeySigner<'a> {
    /// Bind a signer to the given private key.
    #[must_use]
    pub const fn new(key: &'a PrivateKey) -> Self {
        Self { key }
    }

    /// The algorithm this signer produces signatures for.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.key.public.alg
    }

    /// The key id this signer's signatures should be verified under.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.key.public.kid
    }

    /// Sign `message`, returning the raw IEEE-P1363 `r || s` signature.
    ///
    /// # Errors
    /// Returns [`KeyError`] if the private scalar is not valid base64url or
    /// does not decode to a valid scalar for the key's curve.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, KeyError> {
        let d_bytes = Base64UrlUnpadded::decode_vec(&self.key.d)
            .map_err(|e| KeyError::Encoding(e.to_string()))?;
        match self.key.public.crv {
            Curve::P256 => {
                let signing_key = p256::ecdsa::SigningKey::from_slice(&d_bytes)
                    .map_err(|_| KeyError::InvalidMaterial(Curve::P256))?;
                let signature: p256::ecdsa::Signature = signing_key.sign(message);
                Ok(signature.to_bytes().to_vec())
            }
            Curve::P384 => {
                let signing_key = p384::ecdsa::SigningKey::from_slice(&d_bytes)
                    .map_err(|_| KeyError::InvalidMaterial(Curve::P384))?;
                let signature: p384::ecdsa::Signature = signing_key.sign(message);
                Ok(signature.to_bytes().to_vec())
            }
        }
    }
}

/// A verifier bound to one public key.
///
/// Constructed by the [`crate::resolver`] module when it resolves a `kid` to
/// a verification method, and by callers doing a direct (non-resolver)
/// round-trip check.
#[derive(Clone, Debug)]
pub struct KeyVerifier {
    key: PublicKey,
}

impl KeyVerifier {
    /// Bind a verifier to the given public key.
    #[must_use]
    pub const fn new(key: PublicKey) -> Self {
        Self { key }
    }

    /// The key this verifier checks signatures against.
    #[must_use]
    pub const fn public_key(&self) -> &PublicKey {
        &self.key
    }

    /// Verify `signature` over `message` under the header-declared `alg`.
    ///
    /// Returns `false` — never an error — for every failure mode: algorithm
    /// mismatch between the header and the key, malformed coordinates, a
    /// malformed signature, or a cryptographically invalid signature. Per
    /// design, algorithm mismatch is folded into ordinary signature-invalid
    /// outcomes rather than a distinct category.
    #[must_use]
    pub fn verify(&self, message: &[u8], signature: &[u8], alg: Algorithm) -> bool {
        if alg != self.key.alg || alg.curve() != self.key.crv {
            return false;
        }
        match self.key.crv {
            Curve::P256 => verify_p256(&self.key, message, signature),
            Curve::P384 => verify_p384(&self.key, message, signature),
        }
    }
}

fn verify_p256(key: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
    let Ok(x) = Base64UrlUnpadded::decode_vec(&key.x) else { return false };
    let Ok(y) = Base64UrlUnpadded::decode_vec(&key.y) else { return false };
    if x.len() != 32 || y.len() != 32 {
        return false;
    }
    let point = p256::EncodedPoint::from_affine_coordinates(
        elliptic_curve::generic_array::GenericArray::from_slice(&x),
        elliptic_curve::generic_array::GenericArray::from_slice(&y),
        false,
    );
    let Ok(verifying_key) = p256::ecdsa::VerifyingKey::from_encoded_point(&point) else {
        return false;
    };
    let Ok(sig) = p256::ecdsa::Signature::from_slice(signature) else { return false };
    verifying_key.verify(message, &sig).is_ok()
}

fn verify_p384(key: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
    let Ok(x) = Base64UrlUnpadded::decode_vec(&key.x) else { return false };
    let Ok(y) = Base64UrlUnpadded::decode_vec(&key.y) else { return false };
    if x.len() != 48 || y.len() != 48 {
        return false;
    }
    let point = p384::EncodedPoint::from_affine_coordinates(
        elliptic_curve::generic_array::GenericArray::from_slice(&x),
        elliptic_curve::generic_array::GenericArray::from_slice(&y),
        false,
    );
    let Ok(verifying_key) = p384::ecdsa::VerifyingKey::from_encoded_point(&point) else {
        return false;
    };
    let Ok(sig) = p384::ecdsa::Signature::from_slice(signature) else { return false };
    verifying_key.verify(message, &sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_sets_thumbprint_kid() {
        let key = generate(Algorithm::Es256);
        assert_eq!(key.public.kid, thumbprint(&key.public));
    }

    #[test]
    fn export_public_preserves_kid() {
        let key = generate(Algorithm::Es384);
        let public = export_public(&key);
        assert_eq!(public.kid, key.public.kid);
        assert_eq!(public, key.public);
    }

    #[test]
    fn sign_then_verify_round_trips_p256() {
        let key = generate(Algorithm::Es256);
        let signer = KeySigner::new(&key);
        let sig = signer.sign(b"hello world").expect("should sign");
        let verifier = KeyVerifier::new(export_public(&key));
        assert!(verifier.verify(b"hello world", &sig, Algorithm::Es256));
    }

    #[test]
    fn sign_then_verify_round_trips_p384() {
        let key = generate(Algorithm::Es384);
        let signer = KeySigner::new(&key);
        let sig = signer.sign(b"hello world").expect("should sign");
        let verifier = KeyVerifier::new(export_public(&key));
        assert!(verifier.verify(b"hello world", &sig, Algorithm::Es384));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let key1 = generate(Algorithm::Es256);
        let key2 = generate(Algorithm::Es256);
        let sig = KeySigner::new(&key1).sign(b"payload").expect("should sign");
        let verifier = KeyVerifier::new(export_public(&key2));
        assert!(!verifier.verify(b"payload", &sig, Algorithm::Es256));
    }

    #[test]
    fn verify_rejects_cross_curve_key() {
        let p256_key = generate(Algorithm::Es256);
        let sig = KeySigner::new(&p256_key).sign(b"payload").expect("should sign");

        let p384_key = generate(Algorithm::Es384);
        let verifier = KeyVerifier::new(export_public(&p384_key));
        assert!(!verifier.verify(b"payload", &sig, Algorithm::Es384));
    }

    #[test]
    fn thumbprint_is_deterministic() {
        let key = generate(Algorithm::Es256);
        assert_eq!(thumbprint(&key.public), thumbprint(&key.public));
    }
}
