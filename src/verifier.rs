//! # Verification
//!
//! The orchestration entry point: [`verify_presentation`] parses, resolves,
//! and checks a signed presentation and every credential it packages,
//! producing one [`DetailedVerificationResult`] that reports every
//! recoverable problem found rather than stopping at the first one.
//!
//! A small, closed set of conditions abort the call outright instead of
//! being folded into the result — see [`crate::VpvcError`]. Everything else
//! is a [`Problem`] recorded against either the presentation itself or one
//! of its packaged credentials.

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use serde_json::Value;

use crate::claims::{check_audience, check_nonce, check_schema, check_time_claims, TimeClaimFailure};
use crate::encoding::{try_parse, Header};
use crate::envelope::EnvelopedCredential;
use crate::error::VpvcError;
use crate::model::{CredentialClaims, PresentationClaims};
use crate::resolver::{KeyResolutionError, Resolver};

/// The closed set of recoverable security-property failures this crate
/// reports. Distinct from [`VpvcError`]: a `Problem` means verification ran
/// to completion and found something wrong, not that it could not run.
///
/// This is a flat, closed set rather than one variant per boolean flag a
/// naive port would produce: `SignatureInvalid` covers a presentation or a
/// credential signature alike (the `problems`/`credential_results` location
/// already says which), and `ValidityPeriodViolation` covers expiry,
/// not-yet-valid, and issued-in-future alike (the `detail` string says
/// which) — a caller cannot act differently on the sub-cases in either
/// group, only on which group it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProblemType {
    /// The signature did not verify under the resolved key, the key could
    /// not be resolved at all, or the key was not authorized for the
    /// relevant relation (`assertion` or `authentication`).
    SignatureInvalid,

    /// The subject falls outside its `nbf`/`exp`/`iat`-skew window.
    ValidityPeriodViolation,

    /// A credential's `cnf.kid` does not match the key that signed the
    /// enclosing presentation.
    ConfirmationKeyMismatch,

    /// A credential's signing `kid` is not prefixed by its own `iss`.
    IssuerKidMismatch,

    /// An enveloped credential could not be parsed as a well-formed JWS.
    MalformedCredential,

    /// A credential does not conform to a schema it declares.
    SchemaViolation,
}

/// One recorded problem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Problem {
    /// The kind of failure.
    pub problem_type: ProblemType,

    /// A short, stable, human-readable summary.
    pub title: String,

    /// Additional detail specific to this occurrence.
    pub detail: String,
}

impl Problem {
    fn new(problem_type: ProblemType, title: &str, detail: impl Into<String>) -> Self {
        Self { problem_type, title: title.to_string(), detail: detail.into() }
    }
}

/// The verification outcome for one packaged credential.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CredentialVerificationResult {
    /// `true` when this credential has no recorded problems.
    pub verified: bool,

    /// Every problem found on this credential.
    pub problems: Vec<Problem>,
}

impl CredentialVerificationResult {
    fn from_problems(problems: Vec<Problem>) -> Self {
        Self { verified: problems.is_empty(), problems }
    }
}

/// The full result of verifying a presentation.
#[derive(Clone, Debug, Default)]
pub struct DetailedVerificationResult {
    /// `true` only when the presentation itself and every packaged
    /// credential have no recorded problems.
    pub verified: bool,

    /// Problems found on the presentation itself: its own signature, time
    /// claims, and any packaged credential's confirmation-key mismatch (a
    /// presentation-level property even though it is only detectable while
    /// walking a credential). Protocol checks the caller opted into
    /// (`expected_nonce`/`expected_audience`) abort the call on mismatch
    /// rather than appearing here.
    pub problems: Vec<Problem>,

    /// Per-credential results, in presentation order.
    pub credential_results: Vec<CredentialVerificationResult>,

    /// The presentation's protected header, if the token parsed.
    pub header: Option<Header>,

    /// The presentation's payload, if the token parsed.
    pub payload: Option<PresentationClaims>,
}

/// Caller-supplied protocol expectations and feature toggles. Constructed
/// via [`VerificationOptionsBuilder`].
///
/// There is no [`Default`] impl: [`verification_time`](Self::verification_time)
/// is required, not optional, and a default would have to either invent a
/// wall-clock reading (breaking the purity guarantee in SPEC_FULL.md §5 —
/// "given a fixed controller store and fixed verification time, it produces
/// the same result") or an arbitrary instant such as the Unix epoch (failing
/// every token's time claims silently). Callers name the instant explicitly,
/// every time.
#[derive(Clone, Debug, Builder)]
pub struct VerificationOptions {
    /// The instant to evaluate time claims against.
    #[builder(setter(into))]
    pub verification_time: DateTime<Utc>,

    /// A nonce the presentation's `nonce` claim must equal. A mismatch
    /// aborts the call; see [`VpvcError::NonceMismatch`].
    #[builder(default, setter(into, strip_option))]
    pub expected_nonce: Option<String>,

    /// Audiences the presentation's `aud` claim must intersect. A mismatch
    /// aborts the call; see [`VpvcError::AudienceMismatch`]. Empty means no
    /// requirement.
    #[builder(default, setter(into))]
    pub expected_audience: Vec<String>,

    /// Whether to check each credential against any schema it declares.
    #[builder(default, setter(into))]
    pub validate_credential_schemas: bool,
}

impl VerificationOptions {
    /// Options requiring only the verification instant, with every other
    /// field at its default (no nonce/audience requirement, no schema
    /// validation).
    #[must_use]
    pub fn at(verification_time: DateTime<Utc>) -> Self {
        Self {
            verification_time,
            expected_nonce: None,
            expected_audience: Vec::new(),
            validate_credential_schemas: false,
        }
    }
}

/// Verify a compact-JWS presentation token.
///
/// # Errors
/// Aborts with [`VpvcError`] when the token cannot be parsed, the
/// presentation header has no `kid`, a controller referenced by the
/// presentation or any packaged credential cannot be resolved, or the
/// caller's `expected_nonce`/`expected_audience` requirements are violated.
/// Every other failure is recorded as a [`Problem`] in the returned result.
#[tracing::instrument(skip(token, resolver, options))]
pub fn verify_presentation(
    token: &str, resolver: &dyn Resolver, options: &VerificationOptions,
) -> Result<DetailedVerificationResult, VpvcError> {
    tracing::debug!("verifying presentation");

    let parsed: crate::encoding::ParsedJws<Header, PresentationClaims> = try_parse(token)
        .map_err(VpvcError::MalformedToken)?;

    let kid = parsed.header.kid.clone().ok_or(VpvcError::MissingKid)?;
    let at = options.verification_time;

    tracing::debug!(kid, alg = ?parsed.header.alg, "resolving presentation signer");
    let holder = resolver.resolve_controller(&kid)?;

    let mut problems = Vec::new();

    match holder.resolve_authentication_key(&kid) {
        Ok(verifier) => {
            let input = parsed.signing_input();
            let signature = parsed.signature_bytes().map_err(VpvcError::Other)?;
            if !verifier.verify(&input, &signature, parsed.header.alg) {
                problems.push(Problem::new(
                    ProblemType::SignatureInvalid,
                    "presentation signature invalid",
                    format!("signature did not verify under key `{kid}`"),
                ));
            }
        }
        Err(e) => problems.push(Problem::new(
            ProblemType::SignatureInvalid,
            "presentation signing key not resolvable",
            key_resolution_detail(&kid, e),
        )),
    }

    if let Err(failure) = check_time_claims(parsed.payload.iat, parsed.payload.nbf, parsed.payload.exp, at) {
        problems.push(time_claim_problem(failure, "presentation"));
    }

    check_nonce(parsed.payload.nonce.as_deref(), options.expected_nonce.as_deref())?;
    check_audience(parsed.payload.aud.as_ref(), &options.expected_audience)?;

    let mut credential_results = Vec::with_capacity(parsed.payload.verifiable_credential.len());
    for enveloped in &parsed.payload.verifiable_credential {
        let (credential_result, confirmation_problem) =
            verify_credential(enveloped, &kid, resolver, options, at);
        problems.extend(confirmation_problem);
        credential_results.push(credential_result);
    }

    let result = DetailedVerificationResult {
        verified: problems.is_empty() && credential_results.iter().all(|r| r.verified),
        problems,
        credential_results,
        header: Some(parsed.header),
        payload: Some(parsed.payload),
    };
    tracing::debug!(verified = result.verified, problem_count = result.problems.len(), "verification complete");
    Ok(result)
}

/// Verify one packaged credential. Returns its own result plus, separately,
/// any confirmation-key mismatch — `is_signed_by_confirmation_key` is a
/// presentation-level property per the problem-type table, so it is
/// reported on the presentation's own problem list, not the credential's.
#[tracing::instrument(skip(enveloped, resolver, options, at))]
fn verify_credential(
    enveloped: &EnvelopedCredential, presentation_kid: &str, resolver: &dyn Resolver,
    options: &VerificationOptions, at: DateTime<Utc>,
) -> (CredentialVerificationResult, Option<Problem>) {
    let jws = match enveloped.decode() {
        Ok(jws) => jws,
        Err(e) => {
            return (
                CredentialVerificationResult::from_problems(vec![Problem::new(
                    ProblemType::MalformedCredential,
                    "credential envelope invalid",
                    e.to_string(),
                )]),
                None,
            );
        }
    };

    let parsed: crate::encoding::ParsedJws<Header, CredentialClaims> = match try_parse(jws) {
        Ok(parsed) => parsed,
        Err(e) => {
            return (
                CredentialVerificationResult::from_problems(vec![Problem::new(
                    ProblemType::MalformedCredential,
                    "credential token malformed",
                    e,
                )]),
                None,
            );
        }
    };

    let Some(credential_kid) = parsed.header.kid.clone() else {
        return (
            CredentialVerificationResult::from_problems(vec![Problem::new(
                ProblemType::SignatureInvalid,
                "credential header missing kid",
                "no key id to resolve a verifier against",
            )]),
            None,
        );
    };

    let mut problems = Vec::new();

    if !credential_kid.starts_with(parsed.payload.iss.as_str()) {
        problems.push(Problem::new(
            ProblemType::IssuerKidMismatch,
            "credential signing key not owned by issuer",
            format!("kid `{credential_kid}` is not prefixed by issuer `{}`", parsed.payload.iss),
        ));
    }

    // Unlike the presentation's own holder (step 3, which aborts the whole
    // call when unresolvable), an unresolvable *credential* issuer is just
    // one more fact about this credential: it is folded into this
    // credential's own problem list so a bundle of several credentials still
    // reports every other one's outcome.
    match resolver.resolve_controller(&parsed.payload.iss) {
        Ok(issuer) => match issuer.resolve_assertion_key(&credential_kid) {
            Ok(verifier) => match parsed.signature_bytes() {
                Ok(signature) => {
                    let input = parsed.signing_input();
                    if !verifier.verify(&input, &signature, parsed.header.alg) {
                        problems.push(Problem::new(
                            ProblemType::SignatureInvalid,
                            "credential signature invalid",
                            format!("signature did not verify under key `{credential_kid}`"),
                        ));
                    }
                }
                Err(e) => problems.push(Problem::new(
                    ProblemType::SignatureInvalid,
                    "credential signature segment malformed",
                    e.to_string(),
                )),
            },
            Err(e) => problems.push(Problem::new(
                ProblemType::SignatureInvalid,
                "credential signing key not resolvable",
                key_resolution_detail(&credential_kid, e),
            )),
        },
        Err(e) => problems.push(Problem::new(
            ProblemType::SignatureInvalid,
            "credential issuer not resolvable",
            format!("issuer `{}` not found in trust store: {e}", parsed.payload.iss),
        )),
    }

    if let Err(failure) = check_time_claims(parsed.payload.iat, parsed.payload.nbf, parsed.payload.exp, at) {
        problems.push(time_claim_problem(failure, "credential"));
    }

    let confirmation_problem = parsed.payload.cnf.as_ref().and_then(|cnf| {
        (cnf.kid != presentation_kid).then(|| {
            Problem::new(
                ProblemType::ConfirmationKeyMismatch,
                "presentation signer does not hold the credential",
                format!(
                    "credential is bound to `{}`, presentation was signed by `{presentation_kid}`",
                    cnf.kid
                ),
            )
        })
    });

    if options.validate_credential_schemas {
        if let Some(schema_refs) = &parsed.payload.credential_schema {
            match serde_json::to_value(&parsed.payload) {
                Ok(credential_json) => {
                    if let Err(detail) = check_schema(&credential_json, schema_refs, resolver) {
                        problems.push(Problem::new(
                            ProblemType::SchemaViolation,
                            "credential schema violation",
                            detail,
                        ));
                    }
                }
                Err(e) => problems.push(Problem::new(
                    ProblemType::SchemaViolation,
                    "credential payload could not be re-encoded for schema validation",
                    e.to_string(),
                )),
            }
        }
    }

    (CredentialVerificationResult::from_problems(problems), confirmation_problem)
}

fn time_claim_problem(failure: TimeClaimFailure, subject: &str) -> Problem {
    let detail = match failure {
        TimeClaimFailure::Expired => format!("{subject} `exp` has passed"),
        TimeClaimFailure::NotYetValid => format!("{subject} `nbf` has not yet arrived"),
        TimeClaimFailure::IssuedInFuture => {
            format!("{subject} `iat` is beyond clock-skew tolerance")
        }
    };
    Problem::new(ProblemType::ValidityPeriodViolation, "outside validity period", detail)
}

fn key_resolution_detail(kid: &str, error: KeyResolutionError) -> String {
    match error {
        KeyResolutionError::UnknownKey => format!("no verification method matches `{kid}`"),
        KeyResolutionError::NotAuthorizedForRelation => {
            format!("`{kid}` is not authorized for the required relation")
        }
    }
}
