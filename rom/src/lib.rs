/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Pre-OS secure loader: reads a candidate image and its detached
    signature, verifies them against the embedded public key and either
    chain-loads the image or halts.

--*/

#![no_std]

pub mod boot_gate;
pub use boot_gate::{BootGate, GateOutcome, States as GateState};
pub mod image_source;
pub use image_source::{ImageSource, LoadError, MemoryImageSource};
pub mod image_verifier;
pub use image_verifier::{ImageVerifier, RsaImageVerifier};

pub use image_sig::{RejectReason, Signature, TrustDecision};
pub use secboot_error::BootError;

/// Receives control once an image has been verified.
pub trait ImageLauncher {
    /// Transfers execution to `image`. The slice is the exact buffer that
    /// was hashed and verified.
    fn launch(&mut self, image: &[u8]) -> !;
}

pub trait FatalErrorHandler {
    fn fatal_error(&mut self, code: u32) -> !;
}

static mut FATAL_ERROR_HANDLER: Option<&'static mut dyn FatalErrorHandler> = None;

/// Set the fatal error handler.
///
/// SAFETY: it is important that the passed fatal handler is never used otherwise
/// and no other references exist to it. It is recommended to create a single instance
/// of the struct and pass it in immediatly, and never use it otherwise.
pub fn set_fatal_error_handler(handler: &'static mut dyn FatalErrorHandler) {
    unsafe {
        FATAL_ERROR_HANDLER = Some(handler);
    }
}

#[inline(never)]
#[allow(clippy::empty_loop)]
pub fn fatal_error(code: u32) -> ! {
    #[allow(static_mut_refs)]
    if let Some(handler) = unsafe { FATAL_ERROR_HANDLER.as_mut() } {
        handler.fatal_error(code);
    } else {
        // If no handler is set, just loop forever
        loop {}
    }
}

/// Maps a rejection onto the fixed halt code reported to the fatal handler.
pub fn halt_code(reason: RejectReason) -> BootError {
    match reason {
        RejectReason::MissingSignature => BootError::VERIFY_MISSING_SIGNATURE,
        RejectReason::MalformedSignature => BootError::VERIFY_MALFORMED_SIGNATURE,
        RejectReason::SignatureLength { .. } => BootError::VERIFY_SIGNATURE_LENGTH,
        RejectReason::MalformedKey => BootError::VERIFY_MALFORMED_KEY,
        RejectReason::WeakKey { .. } => BootError::VERIFY_WEAK_KEY,
        RejectReason::UntrustedKey => BootError::VERIFY_UNTRUSTED_KEY,
        RejectReason::SignatureMismatch => BootError::VERIFY_SIGNATURE_MISMATCH,
        RejectReason::ImageUnavailable => BootError::GATE_IMAGE_UNAVAILABLE,
        RejectReason::ImageTooLarge { .. } => BootError::GATE_IMAGE_TOO_LARGE,
    }
}
