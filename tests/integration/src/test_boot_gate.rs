// Licensed under the Apache-2.0 license

use crate::test::{pattern, read, Workspace, OTHER_KEY, SIGNING_KEY};
use image_sig::{hash, RejectReason, TrustDecision};
use secboot_builder::sign_image;
use secboot_error::BootError;
use secboot_rom::{BootGate, GateOutcome, GateState, MemoryImageSource, RsaImageVerifier};

fn staged<'s>(image: &'s [u8], sig: Option<&'s [u8]>) -> MemoryImageSource<'s> {
    MemoryImageSource::new(Some(image), sig)
}

/// Signs `image` in a fresh workspace and returns (workspace, signature).
fn signed(image: &[u8]) -> (Workspace, Vec<u8>) {
    let ws = Workspace::new(&SIGNING_KEY);
    let path = ws.write_image("app.efi", image);
    let report = sign_image(&path, &ws.store, 2048).unwrap();
    let sig = read(&report.signature);
    (ws, sig)
}

#[test]
fn test_signed_image_is_launched() {
    let image = pattern(64 * 1024);
    let (ws, sig) = signed(&image);
    let mut buffer = vec![0u8; 128 * 1024];
    let mut gate = BootGate::new(
        RsaImageVerifier::from_embedded_key(&ws.public_der()),
        &mut buffer,
    );

    let outcome = gate.evaluate(&mut staged(&image, Some(&sig)));
    assert!(matches!(gate.state(), GateState::Trusted));
    let GateOutcome::Launch(loaded) = outcome else {
        panic!("signed image was not launched: {:?}", outcome);
    };
    assert_eq!(loaded, &image[..]);
    let launched = gate.launch().unwrap();
    assert_eq!(launched.as_ptr(), loaded.as_ptr());
    assert!(matches!(gate.state(), GateState::Terminal));
}

#[test]
fn test_tampered_image_halts() {
    let mut image = pattern(4096);
    let (ws, sig) = signed(&image);
    image[4095] ^= 0x80;
    let mut buffer = vec![0u8; 8192];
    let mut gate = BootGate::new(
        RsaImageVerifier::from_embedded_key(&ws.public_der()),
        &mut buffer,
    );

    assert_eq!(
        gate.evaluate(&mut staged(&image, Some(&sig))),
        GateOutcome::Halt(RejectReason::SignatureMismatch)
    );
    assert_eq!(gate.launch(), Err(BootError::GATE_INVALID_TRANSITION));
    assert_eq!(gate.halt(), BootError::VERIFY_SIGNATURE_MISMATCH);
}

#[test]
fn test_wrong_embedded_key_halts() {
    let image = pattern(4096);
    let (_, sig) = signed(&image);
    let other = Workspace::new(&OTHER_KEY);
    let mut buffer = vec![0u8; 8192];
    let mut gate = BootGate::new(
        RsaImageVerifier::from_embedded_key(&other.public_der()),
        &mut buffer,
    );

    assert_eq!(
        gate.evaluate(&mut staged(&image, Some(&sig))),
        GateOutcome::Halt(RejectReason::SignatureMismatch)
    );
}

#[test]
fn test_missing_signature_halts() {
    let image = pattern(4096);
    let (ws, _) = signed(&image);
    let mut buffer = vec![0u8; 8192];
    let mut gate = BootGate::new(
        RsaImageVerifier::from_embedded_key(&ws.public_der()),
        &mut buffer,
    );

    assert_eq!(
        gate.evaluate(&mut staged(&image, None)),
        GateOutcome::Halt(RejectReason::MissingSignature)
    );
    assert_eq!(gate.halt(), BootError::VERIFY_MISSING_SIGNATURE);
}

#[test]
fn test_truncated_signature_halts() {
    let image = pattern(4096);
    let (ws, sig) = signed(&image);
    let mut buffer = vec![0u8; 8192];
    let mut gate = BootGate::new(
        RsaImageVerifier::from_embedded_key(&ws.public_der()),
        &mut buffer,
    );

    assert_eq!(
        gate.evaluate(&mut staged(&image, Some(&sig[..200]))),
        GateOutcome::Halt(RejectReason::SignatureLength {
            expected: 256,
            actual: 200
        })
    );
}

#[test]
fn test_pinned_key() {
    let image = pattern(4096);
    let (ws, sig) = signed(&image);
    let der = ws.public_der();

    let mut buffer = vec![0u8; 8192];
    let mut gate = BootGate::new(
        RsaImageVerifier::from_pinned_key(&der, &hash(&der)),
        &mut buffer,
    );
    assert!(matches!(
        gate.evaluate(&mut staged(&image, Some(&sig))),
        GateOutcome::Launch(_)
    ));

    let other = Workspace::new(&OTHER_KEY);
    let mut buffer = vec![0u8; 8192];
    let mut gate = BootGate::new(
        RsaImageVerifier::from_pinned_key(&der, &hash(&other.public_der())),
        &mut buffer,
    );
    assert_eq!(
        gate.evaluate(&mut staged(&image, Some(&sig))),
        GateOutcome::Halt(RejectReason::UntrustedKey)
    );
    assert_eq!(gate.decision(), Some(TrustDecision::Rejected(RejectReason::UntrustedKey)));
}

#[test]
fn test_malformed_embedded_key_halts() {
    let image = pattern(4096);
    let (_, sig) = signed(&image);
    let mut buffer = vec![0u8; 8192];
    let mut gate = BootGate::new(RsaImageVerifier::from_embedded_key(b"garbage"), &mut buffer);

    assert_eq!(
        gate.evaluate(&mut staged(&image, Some(&sig))),
        GateOutcome::Halt(RejectReason::MalformedKey)
    );
    assert_eq!(gate.halt(), BootError::VERIFY_MALFORMED_KEY);
}

#[test]
fn test_image_larger_than_load_buffer_halts() {
    let image = pattern(4096);
    let (ws, sig) = signed(&image);
    let mut buffer = vec![0u8; 1024];
    let mut gate = BootGate::new(
        RsaImageVerifier::from_embedded_key(&ws.public_der()),
        &mut buffer,
    );

    assert_eq!(
        gate.evaluate(&mut staged(&image, Some(&sig))),
        GateOutcome::Halt(RejectReason::ImageTooLarge { max: 1024 })
    );
    assert!(matches!(gate.state(), GateState::Untrusted));
}
