// Licensed under the Apache-2.0 license

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
mod signing;
#[cfg(feature = "std")]
pub use signing::{signature_path_for, ConfigError, SigningConfig};

/// Smallest RSA modulus accepted for signing or verification.
pub const MIN_KEY_BITS: usize = 2048;

/// Largest RSA modulus supported; bounds the signature buffer in the loader.
pub const MAX_KEY_BITS: usize = 4096;

pub const DEFAULT_KEY_BITS: usize = 2048;

/// Upper bound of a detached signature, in bytes.
pub const MAX_SIGNATURE_LEN: usize = MAX_KEY_BITS / 8;

pub const DEFAULT_KEYS_DIR: &str = "keys";

/// Extension appended to the image file name to form the detached signature path.
pub const SIGNATURE_EXTENSION: &str = "sig";

/// File names used inside the key directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyLayout {
    /// PKCS#8 PEM private key, owner read/write only.
    pub private_pem: &'static str,
    /// SPKI PEM public key, world readable.
    pub public_pem: &'static str,
    /// SPKI DER public key, world readable; this is the blob embedded in the loader.
    pub public_der: &'static str,
}

impl Default for KeyLayout {
    fn default() -> Self {
        KeyLayout {
            private_pem: "private_key.pem",
            public_pem: "public_key.pem",
            public_der: "public_key.der",
        }
    }
}

/// Limits applied by the secure loader to the image buffer it reads into.
/// The signature buffer is fixed at `MAX_SIGNATURE_LEN`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoaderConfig {
    pub max_image_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            max_image_size: 16 * 1024 * 1024,
        }
    }
}
