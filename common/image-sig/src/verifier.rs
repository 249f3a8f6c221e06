// Licensed under the Apache-2.0 license

use crate::digest::{hash, ImageDigest};
use crate::signature::Signature;
use core::fmt;
use rsa::pkcs1v15::Pkcs1v15Sign;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use secboot_config::MIN_KEY_BITS;
use sha2::Sha256;

/// Why an image was not trusted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("signature is missing")]
    MissingSignature,
    #[error("signature is malformed")]
    MalformedSignature,
    #[error("signature is {actual} bytes, expected {expected}")]
    SignatureLength { expected: usize, actual: usize },
    #[error("public key is malformed")]
    MalformedKey,
    #[error("public key is {bits} bits, below the {min} bit minimum")]
    WeakKey { bits: usize, min: usize },
    #[error("public key does not match the pinned fingerprint")]
    UntrustedKey,
    #[error("signature does not match the image")]
    SignatureMismatch,
    #[error("image could not be read")]
    ImageUnavailable,
    #[error("image exceeds the {max} byte load buffer")]
    ImageTooLarge { max: usize },
}

/// Outcome of a verification. There is no partially trusted state.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrustDecision {
    Verified,
    Rejected(RejectReason),
}

impl TrustDecision {
    pub fn is_verified(&self) -> bool {
        matches!(self, TrustDecision::Verified)
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            TrustDecision::Verified => None,
            TrustDecision::Rejected(reason) => Some(*reason),
        }
    }
}

impl fmt::Display for TrustDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrustDecision::Verified => write!(f, "verified"),
            TrustDecision::Rejected(reason) => write!(f, "rejected: {}", reason),
        }
    }
}

/// A public key the verifier is willing to trust, with its SHA-256 fingerprint
/// over the SPKI DER encoding.
#[derive(Clone, Debug)]
pub struct TrustAnchor {
    key: RsaPublicKey,
    fingerprint: ImageDigest,
}

impl TrustAnchor {
    /// Parses an SPKI DER public key, the form embedded in the loader.
    pub fn from_der(der: &[u8]) -> Result<Self, RejectReason> {
        let key = RsaPublicKey::from_public_key_der(der).map_err(|_| RejectReason::MalformedKey)?;
        check_strength(&key)?;
        Ok(Self {
            key,
            fingerprint: hash(der),
        })
    }

    pub fn from_pem(pem: &str) -> Result<Self, RejectReason> {
        let key = RsaPublicKey::from_public_key_pem(pem).map_err(|_| RejectReason::MalformedKey)?;
        Self::from_key(key)
    }

    pub fn from_key(key: RsaPublicKey) -> Result<Self, RejectReason> {
        check_strength(&key)?;
        let der = key
            .to_public_key_der()
            .map_err(|_| RejectReason::MalformedKey)?;
        Ok(Self {
            fingerprint: hash(der.as_bytes()),
            key,
        })
    }

    /// Parses `der` and accepts it only if its fingerprint equals `expected`.
    pub fn pinned(der: &[u8], expected: &ImageDigest) -> Result<Self, RejectReason> {
        let anchor = Self::from_der(der)?;
        if !anchor.fingerprint.ct_eq(expected) {
            return Err(RejectReason::UntrustedKey);
        }
        Ok(anchor)
    }

    pub fn key(&self) -> &RsaPublicKey {
        &self.key
    }

    pub fn fingerprint(&self) -> ImageDigest {
        self.fingerprint
    }

    /// Length every valid signature under this key must have.
    pub fn signature_len(&self) -> usize {
        self.key.size()
    }
}

fn check_strength(key: &RsaPublicKey) -> Result<(), RejectReason> {
    let bits = key.n().bits();
    if bits < MIN_KEY_BITS {
        return Err(RejectReason::WeakKey {
            bits,
            min: MIN_KEY_BITS,
        });
    }
    Ok(())
}

/// Checks detached RSASSA-PKCS1-v1_5 / SHA-256 signatures against one anchor.
pub struct Verifier<'a> {
    anchor: &'a TrustAnchor,
}

impl<'a> Verifier<'a> {
    pub fn new(anchor: &'a TrustAnchor) -> Self {
        Self { anchor }
    }

    /// Recomputes the digest of `image` and checks `signature` over it.
    ///
    /// Total over its inputs: every failure is a `Rejected` decision.
    pub fn verify(&self, image: &[u8], signature: Option<&Signature>) -> TrustDecision {
        let Some(signature) = signature else {
            return TrustDecision::Rejected(RejectReason::MissingSignature);
        };
        let digest = hash(image);
        self.verify_digest(&digest, signature.as_bytes())
    }

    pub fn verify_digest(&self, digest: &ImageDigest, signature: &[u8]) -> TrustDecision {
        let expected = self.anchor.signature_len();
        if signature.len() != expected {
            return TrustDecision::Rejected(RejectReason::SignatureLength {
                expected,
                actual: signature.len(),
            });
        }
        // The PKCS#1 v1.5 unpadding compares the encoded message in constant time.
        match self
            .anchor
            .key
            .verify(Pkcs1v15Sign::new::<Sha256>(), digest.as_bytes(), signature)
        {
            Ok(()) => TrustDecision::Verified,
            Err(_) => TrustDecision::Rejected(RejectReason::SignatureMismatch),
        }
    }
}

/// One-shot verification over raw bytes: image, detached signature and SPKI DER key.
pub fn verify(image: &[u8], signature: &[u8], public_key_der: &[u8]) -> TrustDecision {
    let anchor = match TrustAnchor::from_der(public_key_der) {
        Ok(anchor) => anchor,
        Err(reason) => return TrustDecision::Rejected(reason),
    };
    let signature = match Signature::from_bytes(signature) {
        Ok(signature) => signature,
        Err(_) => return TrustDecision::Rejected(RejectReason::MalformedSignature),
    };
    Verifier::new(&anchor).verify(image, Some(&signature))
}
