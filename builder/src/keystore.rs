// Licensed under the Apache-2.0 license

use crate::{read_file, write_atomic, Error, Result, PRIVATE_MODE, PUBLIC_MODE};
use image_sig::{hash, ImageDigest};
use log::{debug, info, warn};
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use secboot_config::{KeyLayout, SigningConfig, MAX_KEY_BITS, MIN_KEY_BITS};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// An RSA key pair. The public half is always derived from the private one.
#[derive(Clone)]
pub struct KeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl KeyPair {
    /// Generates a fresh key pair from the OS entropy source.
    pub fn generate(bits: usize) -> Result<Self> {
        check_bits(bits)?;
        debug!("Generating {}-bit RSA key pair", bits);
        let private = RsaPrivateKey::new(&mut OsRng, bits).map_err(Error::Generation)?;
        Ok(Self::from_private(private))
    }

    pub fn from_private(private: RsaPrivateKey) -> Self {
        let public = private.to_public_key();
        Self { private, public }
    }

    pub fn private(&self) -> &RsaPrivateKey {
        &self.private
    }

    pub fn public(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn bits(&self) -> usize {
        self.public.n().bits()
    }

    pub fn fingerprint(&self) -> Result<ImageDigest> {
        public_key_fingerprint(&self.public)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

fn check_bits(bits: usize) -> Result<()> {
    if !(MIN_KEY_BITS..=MAX_KEY_BITS).contains(&bits) {
        return Err(Error::Key(format!(
            "{} bit keys are not supported, use {} to {} bits",
            bits, MIN_KEY_BITS, MAX_KEY_BITS
        )));
    }
    Ok(())
}

/// SHA-256 over the SPKI DER encoding, the value a loader pins.
pub fn public_key_fingerprint(key: &RsaPublicKey) -> Result<ImageDigest> {
    let der = key
        .to_public_key_der()
        .map_err(|e| Error::Key(e.to_string()))?;
    Ok(hash(der.as_bytes()))
}

/// What `persist` did with the key directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Persisted {
    /// New key files were written.
    Written,
    /// A private key was already present and was kept.
    Reused,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyKind {
    Private,
    Public,
}

pub enum KeyMaterial {
    Private(RsaPrivateKey),
    Public(RsaPublicKey),
}

impl KeyMaterial {
    pub fn kind(&self) -> KeyKind {
        match self {
            KeyMaterial::Private(_) => KeyKind::Private,
            KeyMaterial::Public(_) => KeyKind::Public,
        }
    }

    pub fn public_key(&self) -> RsaPublicKey {
        match self {
            KeyMaterial::Private(key) => key.to_public_key(),
            KeyMaterial::Public(key) => key.clone(),
        }
    }
}

/// The on-disk home of one signing key pair.
///
/// A private key, once written, is never replaced implicitly: `persist` and
/// `ensure` reuse it, and only `persist_overwrite`/`rotate` replace it.
#[derive(Clone, Debug)]
pub struct KeyStore {
    dir: PathBuf,
    layout: KeyLayout,
}

impl KeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_layout(dir, KeyLayout::default())
    }

    pub fn with_layout(dir: impl Into<PathBuf>, layout: KeyLayout) -> Self {
        Self {
            dir: dir.into(),
            layout,
        }
    }

    pub fn from_config(config: &SigningConfig) -> Self {
        Self::new(&config.keys_dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn private_key_path(&self) -> PathBuf {
        self.dir.join(self.layout.private_pem)
    }

    pub fn public_pem_path(&self) -> PathBuf {
        self.dir.join(self.layout.public_pem)
    }

    pub fn public_der_path(&self) -> PathBuf {
        self.dir.join(self.layout.public_der)
    }

    /// True if a private key is present.
    pub fn exists(&self) -> bool {
        self.private_key_path().is_file()
    }

    /// Writes `pair` unless a key is already present.
    ///
    /// An existing private key wins and is reported as `Reused`; missing
    /// public files are re-derived from it and stored ones must match it
    /// (`Mismatch` otherwise). Public files without a private key are
    /// refused as `Orphaned`.
    pub fn persist(&self, pair: &KeyPair) -> Result<Persisted> {
        if self.exists() {
            let existing = KeyPair::from_private(self.load_private()?);
            if existing.public() != pair.public() {
                warn!(
                    "Keeping existing key in {}; the supplied key was not written",
                    self.dir.display()
                );
            }
            self.restore_public(&existing)?;
            return Ok(Persisted::Reused);
        }
        for path in [self.public_pem_path(), self.public_der_path()] {
            if path.exists() {
                return Err(Error::Orphaned { path });
            }
        }
        self.write_pair(pair)?;
        Ok(Persisted::Written)
    }

    /// Replaces any existing key material with `pair`. Signatures made with
    /// the previous key stop verifying.
    pub fn persist_overwrite(&self, pair: &KeyPair) -> Result<()> {
        if self.exists() {
            warn!("Overwriting key pair in {}", self.dir.display());
        }
        self.write_pair(pair)
    }

    /// Generates a new key pair and overwrites the stored one.
    pub fn rotate(&self, bits: usize) -> Result<KeyPair> {
        let pair = KeyPair::generate(bits)?;
        self.persist_overwrite(&pair)?;
        info!(
            "Rotated signing key in {}; previously issued signatures no longer verify",
            self.dir.display()
        );
        Ok(pair)
    }

    /// Loads the stored key pair, or generates and persists one if none exists.
    pub fn ensure(&self, bits: usize) -> Result<(KeyPair, Persisted)> {
        if self.exists() {
            let pair = KeyPair::from_private(self.load_private()?);
            if pair.bits() != bits {
                warn!(
                    "Reusing existing {}-bit key; requested size {} ignored",
                    pair.bits(),
                    bits
                );
            }
            self.restore_public(&pair)?;
            debug!("Using existing key pair in {}", self.dir.display());
            return Ok((pair, Persisted::Reused));
        }
        let pair = KeyPair::generate(bits)?;
        let persisted = self.persist(&pair)?;
        info!(
            "Generated {}-bit key pair in {}",
            pair.bits(),
            self.dir.display()
        );
        Ok((pair, persisted))
    }

    pub fn load(&self, kind: KeyKind) -> Result<KeyMaterial> {
        match kind {
            KeyKind::Private => self.load_private().map(KeyMaterial::Private),
            KeyKind::Public => self.load_public().map(KeyMaterial::Public),
        }
    }

    /// Reads the private key, accepting PKCS#8 or PKCS#1 PEM.
    pub fn load_private(&self) -> Result<RsaPrivateKey> {
        let path = self.private_key_path();
        let pem = Zeroizing::new(read_file(&path)?);
        let pem = std::str::from_utf8(&pem).map_err(|_| Error::Format {
            path: path.clone(),
            reason: "private key is not PEM text".to_string(),
        })?;
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| Error::Format {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        key.validate().map_err(|e| Error::Key(e.to_string()))?;
        check_bits(key.n().bits())?;
        Ok(key)
    }

    /// Reads the public key from the DER file, falling back to the PEM file.
    pub fn load_public(&self) -> Result<RsaPublicKey> {
        let der_path = self.public_der_path();
        if der_path.is_file() {
            let der = read_file(&der_path)?;
            return RsaPublicKey::from_public_key_der(&der).map_err(|e| Error::Format {
                path: der_path,
                reason: e.to_string(),
            });
        }
        let pem_path = self.public_pem_path();
        if !pem_path.is_file() {
            return Err(Error::NotFound { path: der_path });
        }
        let pem = fs::read_to_string(&pem_path).map_err(Error::io(&pem_path))?;
        RsaPublicKey::from_public_key_pem(&pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(&pem))
            .map_err(|e| Error::Format {
                path: pem_path,
                reason: e.to_string(),
            })
    }

    fn write_pair(&self, pair: &KeyPair) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(Error::io(&self.dir))?;
        let path = self.private_key_path();
        let pem = pair
            .private()
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| Error::Format {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        // Private first: an interrupted write leaves a reusable private key,
        // never an orphaned public one.
        write_atomic(&path, pem.as_bytes(), PRIVATE_MODE)?;
        self.write_public(pair.public(), true)
    }

    /// Re-derives missing public files from the private key and refuses
    /// stored ones that belong to a different key.
    fn restore_public(&self, pair: &KeyPair) -> Result<()> {
        for path in [self.public_der_path(), self.public_pem_path()] {
            if !path.is_file() {
                continue;
            }
            let stored = self.read_public_file(&path)?;
            if &stored != pair.public() {
                return Err(Error::Mismatch { path });
            }
        }
        self.write_public(pair.public(), false)
    }

    fn read_public_file(&self, path: &Path) -> Result<RsaPublicKey> {
        let bytes = read_file(path)?;
        let parsed = match std::str::from_utf8(&bytes) {
            Ok(pem) if pem.trim_start().starts_with("-----BEGIN") => {
                RsaPublicKey::from_public_key_pem(pem)
                    .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
                    .map_err(|e| e.to_string())
            }
            _ => RsaPublicKey::from_public_key_der(&bytes).map_err(|e| e.to_string()),
        };
        parsed.map_err(|reason| Error::Format {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn write_public(&self, key: &RsaPublicKey, overwrite: bool) -> Result<()> {
        let pem_path = self.public_pem_path();
        if overwrite || !pem_path.exists() {
            let pem = key
                .to_public_key_pem(LineEnding::LF)
                .map_err(|e| Error::Format {
                    path: pem_path.clone(),
                    reason: e.to_string(),
                })?;
            write_atomic(&pem_path, pem.as_bytes(), PUBLIC_MODE)?;
            debug!("Wrote {}", pem_path.display());
        }
        let der_path = self.public_der_path();
        if overwrite || !der_path.exists() {
            let der = key.to_public_key_der().map_err(|e| Error::Format {
                path: der_path.clone(),
                reason: e.to_string(),
            })?;
            write_atomic(&der_path, der.as_bytes(), PUBLIC_MODE)?;
            debug!("Wrote {}", der_path.display());
        }
        Ok(())
    }
}
