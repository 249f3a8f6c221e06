// Licensed under the Apache-2.0 license

use image_sig::{ImageDigest, RejectReason, Signature, TrustAnchor, TrustDecision, Verifier};

/// Decides whether a loaded image may run.
///
/// Implementations are total: malformed input, a missing signature or a bad
/// key must all come back as `TrustDecision::Rejected`, never as a panic.
///
/// Parameters:
///   image:      the loaded image buffer, exactly as it will be executed
///   signature:  the detached signature, or `None` if none could be read
pub trait ImageVerifier {
    fn verify(&self, image: &[u8], signature: Option<&Signature>) -> TrustDecision;
}

/// RSA-2048+ / SHA-256 PKCS#1 v1.5 verification against the public key
/// embedded in the loader.
pub struct RsaImageVerifier {
    anchor: Result<TrustAnchor, RejectReason>,
}

impl RsaImageVerifier {
    pub fn new(anchor: TrustAnchor) -> Self {
        Self { anchor: Ok(anchor) }
    }

    /// Builds the verifier from an SPKI DER blob. A key that fails to parse
    /// is not an error here; every later verification is rejected with it.
    pub fn from_embedded_key(der: &[u8]) -> Self {
        Self {
            anchor: TrustAnchor::from_der(der),
        }
    }

    /// Like `from_embedded_key`, but the key must also match `pin`.
    pub fn from_pinned_key(der: &[u8], pin: &ImageDigest) -> Self {
        Self {
            anchor: TrustAnchor::pinned(der, pin),
        }
    }

    pub fn anchor(&self) -> Option<&TrustAnchor> {
        self.anchor.as_ref().ok()
    }
}

impl ImageVerifier for RsaImageVerifier {
    fn verify(&self, image: &[u8], signature: Option<&Signature>) -> TrustDecision {
        match &self.anchor {
            Ok(anchor) => Verifier::new(anchor).verify(image, signature),
            Err(reason) => TrustDecision::Rejected(*reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_embedded_key_rejects_everything() {
        let verifier = RsaImageVerifier::from_embedded_key(b"not a key");
        assert!(verifier.anchor().is_none());
        let sig = Signature::from_bytes(&[0u8; 256]).unwrap();
        assert_eq!(
            verifier.verify(b"image", Some(&sig)),
            TrustDecision::Rejected(RejectReason::MalformedKey)
        );
        assert_eq!(
            verifier.verify(b"image", None),
            TrustDecision::Rejected(RejectReason::MalformedKey)
        );
    }

    #[test]
    fn test_pinned_malformed_key() {
        let pin = ImageDigest::from_bytes([0u8; 32]);
        let verifier = RsaImageVerifier::from_pinned_key(b"", &pin);
        assert_eq!(
            verifier.verify(b"image", None),
            TrustDecision::Rejected(RejectReason::MalformedKey)
        );
    }
}
