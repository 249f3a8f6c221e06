// Licensed under the Apache-2.0 license

use anyhow::{Context, Result};
use log::debug;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::RsaPublicKey;
use secboot_builder::{public_key_fingerprint, KeyStore, Persisted};
use std::fs;
use std::path::Path;

/// What `keygen` did with the key directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeygenAction {
    Generated,
    Reused,
    Rotated,
}

pub fn keygen(store: &KeyStore, bits: usize, force: bool) -> Result<KeygenAction> {
    let (pair, action) = if force {
        let existed = store.exists();
        let pair = store.rotate(bits)?;
        let action = if existed {
            KeygenAction::Rotated
        } else {
            KeygenAction::Generated
        };
        (pair, action)
    } else {
        let (pair, persisted) = store.ensure(bits)?;
        let action = match persisted {
            Persisted::Written => KeygenAction::Generated,
            Persisted::Reused => KeygenAction::Reused,
        };
        (pair, action)
    };
    let dir = store.dir().display();
    match action {
        KeygenAction::Generated => println!("✓ Keys generated in {}", dir),
        KeygenAction::Reused => println!("✓ Using existing keys in {}", dir),
        KeygenAction::Rotated => println!("✓ Keys rotated in {}", dir),
    }
    println!("  {}-bit RSA, fingerprint {}", pair.bits(), pair.fingerprint()?);
    Ok(action)
}

pub fn fingerprint(store: &KeyStore) -> Result<()> {
    let key = store
        .load_public()
        .with_context(|| format!("no public key in {}", store.dir().display()))?;
    println!("{}", public_key_fingerprint(&key)?);
    Ok(())
}

/// Reads a public key as SPKI DER, the form the loader embeds.
///
/// PEM input is converted. Bytes that do not parse are returned unchanged
/// so the verifier rejects them as a malformed key.
pub fn public_key_der(path: Option<&Path>, store: &KeyStore) -> Result<Vec<u8>> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None if store.public_der_path().is_file() => store.public_der_path(),
        None => store.public_pem_path(),
    };
    let bytes = fs::read(&path)
        .with_context(|| format!("cannot read public key {}", path.display()))?;
    if bytes.starts_with(b"-----BEGIN") {
        let pem = String::from_utf8_lossy(&bytes);
        let key = RsaPublicKey::from_public_key_pem(&pem)
            .ok()
            .or_else(|| RsaPublicKey::from_pkcs1_pem(&pem).ok());
        if let Some(key) = key {
            debug!("Converted PEM public key {} to DER", path.display());
            return Ok(key.to_public_key_der()?.as_bytes().to_vec());
        }
    }
    Ok(bytes)
}
