// Licensed under the Apache-2.0 license

//! Fixed halt codes reported by the secure loader.
//!
//! The loader has no operator to read a stack of error kinds, so every
//! boot-time failure is reduced to one of these codes before the fatal
//! error handler runs.

#![no_std]

use core::fmt;
use core::num::NonZeroU32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BootError(NonZeroU32);

impl BootError {
    const fn new_const(code: u32) -> Self {
        match NonZeroU32::new(code) {
            Some(code) => Self(code),
            None => panic!("BootError code must be non-zero"),
        }
    }

    pub const fn code(self) -> u32 {
        self.0.get()
    }

    pub const GATE_INVALID_TRANSITION: BootError = BootError::new_const(0xb001_0001);
    pub const GATE_IMAGE_UNAVAILABLE: BootError = BootError::new_const(0xb001_0002);
    pub const GATE_IMAGE_TOO_LARGE: BootError = BootError::new_const(0xb001_0003);

    pub const VERIFY_MISSING_SIGNATURE: BootError = BootError::new_const(0xb002_0001);
    pub const VERIFY_MALFORMED_SIGNATURE: BootError = BootError::new_const(0xb002_0002);
    pub const VERIFY_SIGNATURE_LENGTH: BootError = BootError::new_const(0xb002_0003);
    pub const VERIFY_MALFORMED_KEY: BootError = BootError::new_const(0xb002_0004);
    pub const VERIFY_WEAK_KEY: BootError = BootError::new_const(0xb002_0005);
    pub const VERIFY_UNTRUSTED_KEY: BootError = BootError::new_const(0xb002_0006);
    pub const VERIFY_SIGNATURE_MISMATCH: BootError = BootError::new_const(0xb002_0007);
}

impl From<BootError> for u32 {
    fn from(err: BootError) -> u32 {
        err.code()
    }
}

impl From<BootError> for NonZeroU32 {
    fn from(err: BootError) -> NonZeroU32 {
        err.0
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let codes = [
            BootError::GATE_INVALID_TRANSITION,
            BootError::GATE_IMAGE_UNAVAILABLE,
            BootError::GATE_IMAGE_TOO_LARGE,
            BootError::VERIFY_MISSING_SIGNATURE,
            BootError::VERIFY_MALFORMED_SIGNATURE,
            BootError::VERIFY_SIGNATURE_LENGTH,
            BootError::VERIFY_MALFORMED_KEY,
            BootError::VERIFY_WEAK_KEY,
            BootError::VERIFY_UNTRUSTED_KEY,
            BootError::VERIFY_SIGNATURE_MISMATCH,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in codes.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_code_conversion() {
        let code: u32 = BootError::VERIFY_SIGNATURE_MISMATCH.into();
        assert_eq!(code, 0xb002_0007);
    }
}
