// Licensed under the Apache-2.0 license

use core::fmt;
use sha2::{Digest, Sha256};

pub const DIGEST_LEN: usize = 32;

/// SHA-256 of an image, computed in a single pass.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDigest([u8; DIGEST_LEN]);

impl ImageDigest {
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Constant-time equality. Use this, not `==`, whenever one side is attacker supplied.
    pub fn ct_eq(&self, other: &ImageDigest) -> bool {
        constant_time_eq::constant_time_eq_32(&self.0, &other.0)
    }
}

pub fn hash(image: &[u8]) -> ImageDigest {
    ImageDigest(Sha256::digest(image).into())
}

impl fmt::Display for ImageDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ImageDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageDigest({})", self)
    }
}
