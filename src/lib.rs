//! # Verifiable Presentation Verification Core
//!
//! A library that decides whether a signed presentation of one or more
//! verifiable credentials is trustworthy, and reports precisely which
//! security property failed when it is not.
//!
//! The crate composes nested JWS envelopes (a presentation containing
//! credentials, each itself a signed token), resolves signing material
//! through an abstract [`resolver::Resolver`], enforces the binding between
//! a credential's intended holder and the presentation's signer (the
//! confirmation-key / `cnf` check), and reports a [`verifier::DetailedVerificationResult`]
//! rather than throwing on the first problem it finds.
//!
//! Out of scope: CLI surfaces, report writers, fraud heuristics, schema
//! fetching over the network, and controller-document builders. This crate
//! exposes the interfaces ([`signer`], [`verifier`], [`resolver::Resolver`])
//! those collaborators consume.

pub mod claims;
pub mod core;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod key;
pub mod model;
pub mod resolver;
pub mod signer;
pub mod verifier;

pub use error::VpvcError;
pub use verifier::{verify_presentation, DetailedVerificationResult, VerificationOptions};
