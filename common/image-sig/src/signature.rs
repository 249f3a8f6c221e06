// Licensed under the Apache-2.0 license

use arrayvec::ArrayVec;
use core::fmt;
use secboot_config::MAX_SIGNATURE_LEN;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature is empty")]
    Empty,
    #[error("signature is {len} bytes, larger than the {max} byte maximum")]
    TooLong { len: usize, max: usize },
}

/// A detached signature held in a fixed-capacity buffer.
///
/// The capacity covers the largest supported modulus, so reading a
/// signature never grows a heap allocation.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(ArrayVec<u8, MAX_SIGNATURE_LEN>);

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        if bytes.is_empty() {
            return Err(SignatureError::Empty);
        }
        let mut buf = ArrayVec::new();
        buf.try_extend_from_slice(bytes)
            .map_err(|_| SignatureError::TooLong {
                len: bytes.len(),
                max: MAX_SIGNATURE_LEN,
            })?;
        Ok(Self(buf))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({} bytes)", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes() {
        let sig = Signature::from_bytes(&[0xab; 256]).unwrap();
        assert_eq!(sig.len(), 256);
        assert_eq!(sig.as_bytes(), &[0xab; 256][..]);
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(Signature::from_bytes(&[]), Err(SignatureError::Empty));
    }

    #[test]
    fn test_oversized_rejected() {
        assert_eq!(
            Signature::from_bytes(&[0u8; MAX_SIGNATURE_LEN + 1]),
            Err(SignatureError::TooLong {
                len: MAX_SIGNATURE_LEN + 1,
                max: MAX_SIGNATURE_LEN
            })
        );
        assert!(Signature::from_bytes(&[0u8; MAX_SIGNATURE_LEN]).is_ok());
    }
}
