// Licensed under the Apache-2.0 license

use crate::test::{pattern, read, Workspace, OTHER_KEY, SIGNING_KEY};
use image_sig::{verify, RejectReason, TrustDecision};
use secboot_builder::{sign_image, Error, KeyStore, Persisted};
use secboot_config::{SigningConfig, SIGNATURE_EXTENSION};

const MIB: usize = 1024 * 1024;

#[test]
fn test_zero_image_scenario() {
    let ws = Workspace::new(&SIGNING_KEY);
    let image = ws.write_image("hello.efi", &[0u8; 1024]);
    let report = sign_image(&image, &ws.store, 2048).unwrap();
    assert_eq!(SIGNATURE_EXTENSION, "sig");
    assert_eq!(report.signature, SigningConfig::default().signature_path(&image));
    let sig = read(&report.signature);
    assert_eq!(sig.len(), 256);
    assert_eq!(verify(&[0u8; 1024], &sig, &ws.public_der()), TrustDecision::Verified);

    let mut modified = [0u8; 1024];
    modified[500] = 0x01;
    assert_eq!(
        verify(&modified, &sig, &ws.public_der()),
        TrustDecision::Rejected(RejectReason::SignatureMismatch)
    );
}

#[test]
fn test_single_byte_flips_reject() {
    let ws = Workspace::new(&SIGNING_KEY);
    let mut bytes = pattern(MIB);
    let image = ws.write_image("app.efi", &bytes);
    let report = sign_image(&image, &ws.store, 2048).unwrap();
    let sig = read(&report.signature);
    let der = ws.public_der();
    assert!(verify(&bytes, &sig, &der).is_verified());

    for index in [0, MIB / 2, MIB - 1] {
        bytes[index] ^= 0x01;
        assert_eq!(
            verify(&bytes, &sig, &der),
            TrustDecision::Rejected(RejectReason::SignatureMismatch),
            "flip at {} was accepted",
            index
        );
        bytes[index] ^= 0x01;
    }
    assert!(verify(&bytes, &sig, &der).is_verified());
}

#[test]
fn test_wrong_key_rejects() {
    let ws = Workspace::new(&SIGNING_KEY);
    let other = Workspace::new(&OTHER_KEY);
    let image = ws.write_image("app.efi", b"application");
    let report = sign_image(&image, &ws.store, 2048).unwrap();

    assert_eq!(
        verify(b"application", &read(&report.signature), &other.public_der()),
        TrustDecision::Rejected(RejectReason::SignatureMismatch)
    );
}

#[test]
fn test_key_persistence_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = KeyStore::new(dir.path().join("keys"));
    let image = dir.path().join("app.efi");
    std::fs::write(&image, b"application").unwrap();

    let first = sign_image(&image, &store, 2048).unwrap();
    assert_eq!(first.keys, Persisted::Written);
    let old_sig = read(&first.signature);
    let key_bytes = read(&store.private_key_path());
    let der = read(&store.public_der_path());

    let (_, persisted) = store.ensure(2048).unwrap();
    assert_eq!(persisted, Persisted::Reused);
    let second = sign_image(&image, &store, 2048).unwrap();
    assert_eq!(second.keys, Persisted::Reused);

    assert_eq!(read(&store.private_key_path()), key_bytes);
    assert_eq!(read(&store.public_der_path()), der);
    assert!(verify(b"application", &old_sig, &der).is_verified());
}

#[test]
fn test_signing_refuses_foreign_public_key() {
    let ws = Workspace::new(&SIGNING_KEY);
    let other = Workspace::new(&OTHER_KEY);
    std::fs::write(ws.store.public_der_path(), other.public_der()).unwrap();
    let image = ws.write_image("app.efi", b"application");

    assert!(matches!(
        sign_image(&image, &ws.store, 2048),
        Err(Error::Mismatch { path }) if path == ws.store.public_der_path()
    ));
    assert!(!SigningConfig::default().signature_path(&image).exists());
}

#[test]
fn test_rotation_invalidates_old_signatures() {
    let ws = Workspace::new(&SIGNING_KEY);
    let image = ws.write_image("app.efi", b"application");
    let old_sig = read(&sign_image(&image, &ws.store, 2048).unwrap().signature);

    ws.store.persist_overwrite(&OTHER_KEY).unwrap();
    assert_eq!(
        verify(b"application", &old_sig, &ws.public_der()),
        TrustDecision::Rejected(RejectReason::SignatureMismatch)
    );
    let new_sig = read(&sign_image(&image, &ws.store, 2048).unwrap().signature);
    assert!(verify(b"application", &new_sig, &ws.public_der()).is_verified());
}

#[test]
fn test_malformed_signatures_reject() {
    let ws = Workspace::new(&SIGNING_KEY);
    let der = ws.public_der();
    for sig in [&b""[..], &[0u8; 256][..], &[0u8; 255][..], &[0xffu8; 512][..]] {
        assert!(!verify(b"application", sig, &der).is_verified());
    }
}
