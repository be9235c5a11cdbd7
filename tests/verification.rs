//! Black-box tests against the public API: build a small trust store and a
//! signed presentation with the crate's own signer, then verify it back.

use std::sync::Once;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use vpvc::claims::CLOCK_SKEW_SECS;
use vpvc::key::{export_public, generate, Algorithm, KeySigner};
use vpvc::model::{Cnf, CredentialClaims, PresentationClaims};
use vpvc::resolver::{ControllerDocument, InMemoryResolver, Resolver, VerificationMethod};
use vpvc::signer::{sign_credential, sign_presentation, SigningOptionsBuilder};
use vpvc::verifier::VerificationOptionsBuilder;
use vpvc::{verify_presentation, VerificationOptions, VpvcError};

static INIT: Once = Once::new();

/// Install a `tracing` subscriber once per test binary, so the
/// `#[tracing::instrument]`ed verification path has somewhere to log to
/// when several tests (including the concurrency one below) run
/// concurrently against it.
fn init_tracer() {
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::ERROR).finish();
        tracing::subscriber::set_global_default(subscriber).expect("subscriber set");
    });
}

struct TrustStore {
    resolver: InMemoryResolver,
    issuer_id: String,
    issuer_key: vpvc::key::PrivateKey,
    issuer_kid: String,
    holder_id: String,
    holder_key: vpvc::key::PrivateKey,
    holder_kid: String,
}

fn build_trust_store() -> TrustStore {
    let mut resolver = InMemoryResolver::new();

    let issuer_id = "https://issuer.example".to_string();
    let issuer_key = generate(Algorithm::Es256);
    let issuer_public = export_public(&issuer_key);
    let issuer_kid = format!("{issuer_id}#{}", issuer_public.kid);
    let issuer_doc = ControllerDocument::new(&issuer_id)
        .with_verification_method(VerificationMethod {
            id: issuer_kid.clone(),
            controller: issuer_id.clone(),
            public_key: issuer_public,
        })
        .assert_with(issuer_kid.clone());
    resolver.add(issuer_id.clone(), issuer_doc);

    let holder_id = "https://holder.example".to_string();
    let holder_key = generate(Algorithm::Es256);
    let holder_public = export_public(&holder_key);
    let holder_kid = format!("{holder_id}#{}", holder_public.kid);
    let holder_doc = ControllerDocument::new(&holder_id)
        .with_verification_method(VerificationMethod {
            id: holder_kid.clone(),
            controller: holder_id.clone(),
            public_key: holder_public,
        })
        .authenticate_with(holder_kid.clone());
    resolver.add(holder_id.clone(), holder_doc);

    TrustStore { resolver, issuer_id, issuer_key, issuer_kid, holder_id, holder_key, holder_kid }
}

#[test]
fn signed_presentation_round_trips_through_verification() {
    let store = build_trust_store();

    let issuer_signer = KeySigner::new(&store.issuer_key);
    let credential_claims = CredentialClaims { iss: store.issuer_id.clone(), ..Default::default() };
    let credential_options = SigningOptionsBuilder::default()
        .cnf(Cnf { kid: store.holder_kid.clone() })
        .build()
        .expect("valid options");
    let credential =
        sign_credential(credential_claims, &store.issuer_kid, &issuer_signer, &credential_options)
            .expect("should sign credential");

    let holder_signer = KeySigner::new(&store.holder_key);
    let presentation_claims = PresentationClaims { iss: store.holder_id.clone(), ..Default::default() };
    let presentation_options =
        SigningOptionsBuilder::default().nonce("n-0s6_WzA2Mj").build().expect("valid options");
    let presentation = sign_presentation(
        presentation_claims,
        vec![credential],
        &store.holder_kid,
        &holder_signer,
        &presentation_options,
    )
    .expect("should sign presentation");

    let verify_options = VerificationOptionsBuilder::default()
        .verification_time(chrono::Utc::now())
        .expected_nonce("n-0s6_WzA2Mj")
        .build()
        .expect("valid options");
    let result =
        verify_presentation(&presentation, &store.resolver, &verify_options).expect("should not abort");

    assert!(result.verified, "unexpected problems: {:?}", result.problems);
    assert!(result.credential_results[0].verified);
    assert_eq!(result.payload.expect("payload present").iss, store.holder_id);
}

#[test]
fn iat_within_clock_skew_tolerance_still_verifies() {
    let store = build_trust_store();
    let holder_signer = KeySigner::new(&store.holder_key);
    let future_iat = chrono::Utc::now() + chrono::Duration::seconds(CLOCK_SKEW_SECS - 5);
    let options = SigningOptionsBuilder::default().issued_at(future_iat).build().expect("valid options");
    let claims = PresentationClaims { iss: store.holder_id.clone(), ..Default::default() };
    let presentation =
        sign_presentation(claims, std::iter::empty(), &store.holder_kid, &holder_signer, &options)
            .expect("should sign");

    let result = verify_presentation(&presentation, &store.resolver, &VerificationOptions::at(chrono::Utc::now()))
        .expect("should not abort");
    assert!(result.verified, "unexpected problems: {:?}", result.problems);
}

#[test]
fn malformed_token_aborts_with_descriptive_error() {
    let resolver = InMemoryResolver::new();
    let err = verify_presentation("not-a-jws", &resolver, &VerificationOptions::at(chrono::Utc::now()))
        .expect_err("a non-JWS string cannot be verified");
    assert!(matches!(err, VpvcError::MalformedToken(_)));
}

#[test]
fn kid_transparently_accepted_as_full_id_or_bare_fragment() {
    let store = build_trust_store();
    let resolved = store.resolver.resolve_controller(&store.holder_id).expect("resolves by id");
    let fragment = store.holder_kid.split_once('#').expect("has a fragment").1;
    assert!(resolved.resolve_authentication_key(&store.holder_kid).is_ok());
    assert!(resolved.resolve_authentication_key(fragment).is_ok());
}

#[test]
fn verification_is_read_only_and_trivially_shareable_across_calls() {
    // the resolver and every signed token are immutable data; verifying the
    // same presentation from multiple threads needs no synchronization
    // beyond what `Arc` already gives the resolver's internal index.
    init_tracer();
    let store = build_trust_store();
    let holder_signer = KeySigner::new(&store.holder_key);
    let claims = PresentationClaims { iss: store.holder_id.clone(), ..Default::default() };
    let presentation = sign_presentation(
        claims,
        std::iter::empty(),
        &store.holder_kid,
        &holder_signer,
        &SigningOptionsBuilder::default().build().expect("valid options"),
    )
    .expect("should sign");

    let resolver = std::sync::Arc::new(store.resolver);
    let mut handles = Vec::new();
    for _ in 0..4 {
        let resolver = std::sync::Arc::clone(&resolver);
        let presentation = presentation.clone();
        handles.push(std::thread::spawn(move || {
            verify_presentation(&presentation, resolver.as_ref(), &VerificationOptions::at(chrono::Utc::now()))
                .expect("should not abort")
        }));
    }
    for handle in handles {
        assert!(handle.join().expect("thread should not panic").verified);
    }
}
