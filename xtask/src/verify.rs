// Licensed under the Apache-2.0 license

use crate::keys::public_key_der;
use anyhow::{bail, Context, Result};
use image_sig::{RejectReason, Signature, TrustAnchor, TrustDecision, Verifier};
use log::debug;
use secboot_builder::KeyStore;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub fn verify(
    image: &Path,
    signature: &Path,
    public_key: Option<&Path>,
    store: &KeyStore,
) -> Result<()> {
    let der = public_key_der(public_key, store)?;
    match check(image, signature, &der)? {
        TrustDecision::Verified => {
            println!("✓ Signature VERIFIED");
            Ok(())
        }
        TrustDecision::Rejected(reason) => bail!("✗ Verification FAILED: {}", reason),
    }
}

/// Verifies the files on disk. A missing signature is a rejection; an
/// unreadable image is an operational error.
pub fn check(image: &Path, signature: &Path, public_key_der: &[u8]) -> Result<TrustDecision> {
    let bytes =
        fs::read(image).with_context(|| format!("cannot read image {}", image.display()))?;
    let anchor = match TrustAnchor::from_der(public_key_der) {
        Ok(anchor) => anchor,
        Err(reason) => return Ok(TrustDecision::Rejected(reason)),
    };
    debug!("Trust anchor fingerprint {}", anchor.fingerprint());
    let signature = match fs::read(signature) {
        Ok(sig) => match Signature::from_bytes(&sig) {
            Ok(sig) => Some(sig),
            Err(_) => return Ok(TrustDecision::Rejected(RejectReason::MalformedSignature)),
        },
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No signature at {}", signature.display());
            None
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("cannot read signature {}", signature.display()))
        }
    };
    Ok(Verifier::new(&anchor).verify(&bytes, signature.as_ref()))
}
