// Licensed under the Apache-2.0 license

use crate::keystore::{KeyStore, Persisted};
use crate::{read_file, write_atomic, Error, Result, PUBLIC_MODE};
use image_sig::{hash, ImageDigest, Signature};
use log::info;
use rand::rngs::OsRng;
use rsa::pkcs1v15::Pkcs1v15Sign;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use secboot_config::{signature_path_for, MAX_KEY_BITS, MIN_KEY_BITS, SIGNATURE_EXTENSION};
use sha2::Sha256;
use std::path::{Path, PathBuf};

/// Produces RSASSA-PKCS1-v1_5 / SHA-256 signatures, the same encoding as
/// `openssl dgst -sha256 -sign`.
pub struct Signer<'k> {
    key: &'k RsaPrivateKey,
}

impl<'k> Signer<'k> {
    pub fn new(key: &'k RsaPrivateKey) -> Self {
        Self { key }
    }

    /// Hashes the whole image in one pass and signs the digest.
    pub fn sign(&self, image: &[u8]) -> Result<Signature> {
        self.sign_digest(&hash(image))
    }

    pub fn sign_digest(&self, digest: &ImageDigest) -> Result<Signature> {
        self.key
            .validate()
            .map_err(|e| Error::Key(e.to_string()))?;
        let bits = self.key.n().bits();
        if !(MIN_KEY_BITS..=MAX_KEY_BITS).contains(&bits) {
            return Err(Error::Key(format!("cannot sign with a {} bit key", bits)));
        }
        let raw = self
            .key
            .sign_with_rng(&mut OsRng, Pkcs1v15Sign::new::<Sha256>(), digest.as_bytes())
            .map_err(Error::Crypto)?;
        Signature::from_bytes(&raw).map_err(|e| Error::Key(e.to_string()))
    }
}

/// Result of signing one image file.
#[derive(Clone, Debug)]
pub struct SignReport {
    pub image: PathBuf,
    pub signature: PathBuf,
    pub digest: ImageDigest,
    pub signature_len: usize,
    pub key_fingerprint: ImageDigest,
    pub keys: Persisted,
}

/// Signs `image` and writes the detached signature to `<image>.sig`,
/// generating a key pair in `store` first if it has none.
pub fn sign_image(image: &Path, store: &KeyStore, bits: usize) -> Result<SignReport> {
    sign_image_to(
        image,
        &signature_path_for(image, SIGNATURE_EXTENSION),
        store,
        bits,
    )
}

/// Like `sign_image`, with an explicit signature path.
pub fn sign_image_to(
    image: &Path,
    signature_path: &Path,
    store: &KeyStore,
    bits: usize,
) -> Result<SignReport> {
    let bytes = read_file(image)?;
    let (pair, keys) = store.ensure(bits)?;
    let digest = hash(&bytes);
    let signature = Signer::new(pair.private()).sign_digest(&digest)?;
    write_atomic(signature_path, signature.as_bytes(), PUBLIC_MODE)?;
    info!(
        "Signed {} ({} bytes, sha256 {}) -> {}",
        image.display(),
        bytes.len(),
        digest,
        signature_path.display()
    );
    Ok(SignReport {
        image: image.to_path_buf(),
        signature: signature_path.to_path_buf(),
        digest,
        signature_len: signature.len(),
        key_fingerprint: pair.fingerprint()?,
        keys,
    })
}
