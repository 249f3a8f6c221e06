// Licensed under the Apache-2.0 license

//! Detached image signatures: the digest, the signature container and the
//! verifier that turns (image, signature, public key) into a trust decision.
//!
//! The crate is `no_std` so the same verifier runs inside the secure loader
//! and in the host tooling. RSA arithmetic still needs `alloc`.

#![no_std]

#[cfg(test)]
extern crate std;

mod digest;
mod signature;
mod verifier;

pub use digest::{hash, ImageDigest, DIGEST_LEN};
pub use signature::{Signature, SignatureError};
pub use verifier::{verify, RejectReason, TrustAnchor, TrustDecision, Verifier};

/// The RSA crate is re-exported so callers handle the same key types.
pub use rsa;
