// Licensed under the Apache-2.0 license

//! The trust boundary of the loader.
//!
//! A `BootGate` reads one candidate image and its detached signature,
//! hands them to an `ImageVerifier` and then either launches the verified
//! buffer or halts. It is single-shot: once it has left `Idle` it never
//! loads again, and there is no way back from `Untrusted`.

use crate::image_source::{ImageSource, LoadError};
use crate::image_verifier::ImageVerifier;
use crate::{fatal_error, halt_code, ImageLauncher};
use core::fmt::Write;
use image_sig::{RejectReason, Signature, TrustDecision};
use romtime::HexWord;
use secboot_config::MAX_SIGNATURE_LEN;
use secboot_error::BootError;
use smlang::statemachine;

statemachine! {
    derive_states: [Clone, Copy, Debug],
    derive_events: [Clone, Copy, Debug],
    transitions: {
        // syntax: CurrentState Event [guard] / action = NextState

        // the image source has filled the load buffer
        *Idle + Load [is_image_loaded] / on_image_loaded = ImageLoaded,
        Idle + Load [!is_image_loaded] / on_load_failed = Untrusted,

        ImageLoaded + Verify / on_verify = Verifying,

        Verifying + Decide [is_verified] / on_trusted = Trusted,
        Verifying + Decide [!is_verified] / on_untrusted = Untrusted,

        Trusted + Launch = Terminal,
        Untrusted + Halt = Terminal,
    }
}

/// What the loader must do once the gate has decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateOutcome<'a> {
    /// Execute this buffer. It is the same slice that was verified.
    Launch(&'a [u8]),
    Halt(RejectReason),
}

pub struct GateContext<'a, V: ImageVerifier> {
    verifier: V,
    buffer: Option<&'a mut [u8]>,
    image: Option<&'a [u8]>,
    signature: Option<Signature>,
    signature_fault: Option<RejectReason>,
    decision: Option<TrustDecision>,
}

impl<'a, V: ImageVerifier> GateContext<'a, V> {
    fn new(verifier: V, buffer: &'a mut [u8]) -> Self {
        Self {
            verifier,
            buffer: Some(buffer),
            image: None,
            signature: None,
            signature_fault: None,
            decision: None,
        }
    }

    /// Fills the load buffer and the signature buffer from `source`. Runs
    /// at most once; the buffer is consumed by the first call.
    fn load(&mut self, source: &mut impl ImageSource) {
        let Some(buf) = self.buffer.take() else {
            return;
        };
        let capacity = buf.len();
        match source.read_image(buf) {
            Ok(len) if len <= capacity => {
                let buf: &'a [u8] = buf;
                self.image = Some(&buf[..len]);
            }
            Ok(_) | Err(LoadError::TooLarge) => {
                self.reject(RejectReason::ImageTooLarge { max: capacity });
                return;
            }
            Err(_) => {
                self.reject(RejectReason::ImageUnavailable);
                return;
            }
        }

        let mut sig = [0u8; MAX_SIGNATURE_LEN];
        match source.read_signature(&mut sig) {
            Ok(len) if len <= sig.len() => match Signature::from_bytes(&sig[..len]) {
                Ok(signature) => self.signature = Some(signature),
                Err(_) => self.signature_fault = Some(RejectReason::MalformedSignature),
            },
            Ok(_) | Err(LoadError::TooLarge) => {
                self.signature_fault = Some(RejectReason::MalformedSignature)
            }
            // Absent or unreadable: verification rejects it as missing.
            Err(_) => self.signature = None,
        }
    }

    fn reject(&mut self, reason: RejectReason) {
        self.decision = Some(TrustDecision::Rejected(reason));
    }

    fn rejection(&self) -> RejectReason {
        self.decision
            .and_then(|decision| decision.reason())
            .unwrap_or(RejectReason::ImageUnavailable)
    }
}

impl<V: ImageVerifier> StateMachineContext for GateContext<'_, V> {
    fn is_image_loaded(&self) -> Result<bool, ()> {
        Ok(self.image.is_some())
    }

    fn is_verified(&self) -> Result<bool, ()> {
        Ok(matches!(self.decision, Some(TrustDecision::Verified)))
    }

    fn on_image_loaded(&mut self) -> Result<(), ()> {
        let len = self.image.map_or(0, |image| image.len());
        romtime::println!("[secure-loader] Loaded image of {} bytes", len);
        if self.signature.is_none() && self.signature_fault.is_none() {
            romtime::println!("[secure-loader] No signature found");
        }
        Ok(())
    }

    fn on_load_failed(&mut self) -> Result<(), ()> {
        if self.decision.is_none() {
            self.reject(RejectReason::ImageUnavailable);
        }
        romtime::println!("[secure-loader] [x] Image load failed: {}", self.rejection());
        Ok(())
    }

    fn on_verify(&mut self) -> Result<(), ()> {
        let decision = match (self.image, self.signature_fault) {
            (Some(_), Some(reason)) => TrustDecision::Rejected(reason),
            (Some(image), None) => self.verifier.verify(image, self.signature.as_ref()),
            (None, _) => TrustDecision::Rejected(RejectReason::ImageUnavailable),
        };
        self.decision = Some(decision);
        Ok(())
    }

    fn on_trusted(&mut self) -> Result<(), ()> {
        romtime::println!("[secure-loader] [ok] Signature verification PASSED");
        romtime::println!("[secure-loader] [ok] Application authorized");
        Ok(())
    }

    fn on_untrusted(&mut self) -> Result<(), ()> {
        romtime::println!(
            "[secure-loader] [x] Signature verification FAILED: {}",
            self.rejection()
        );
        Ok(())
    }
}

pub struct BootGate<'a, V: ImageVerifier> {
    sm: StateMachine<GateContext<'a, V>>,
}

impl<'a, V: ImageVerifier> BootGate<'a, V> {
    /// `buffer` is the load region; its length bounds the accepted image size.
    pub fn new(verifier: V, buffer: &'a mut [u8]) -> Self {
        Self {
            sm: StateMachine::new(GateContext::new(verifier, buffer)),
        }
    }

    pub fn state(&self) -> States {
        *self.sm.state()
    }

    pub fn decision(&self) -> Option<TrustDecision> {
        self.sm.context().decision
    }

    /// Loads and verifies the candidate, stopping at the Trusted/Untrusted
    /// decision. On a gate that has already left `Idle` nothing is reloaded
    /// and the existing decision is reported again.
    pub fn evaluate(&mut self, source: &mut impl ImageSource) -> GateOutcome<'a> {
        if matches!(self.state(), States::Idle) {
            self.sm.context_mut().load(source);
            let _ = self.sm.process_event(Events::Load);
            if matches!(self.state(), States::ImageLoaded) {
                let _ = self.sm.process_event(Events::Verify);
                let _ = self.sm.process_event(Events::Decide);
            }
        }
        self.outcome()
    }

    fn outcome(&self) -> GateOutcome<'a> {
        match (self.state(), self.sm.context().image) {
            (States::Trusted, Some(image)) => GateOutcome::Launch(image),
            _ => GateOutcome::Halt(self.sm.context().rejection()),
        }
    }

    /// Takes the `Trusted → Terminal` transition and returns the buffer to
    /// execute. Refused in every other state.
    pub fn launch(&mut self) -> Result<&'a [u8], BootError> {
        let image = self.sm.context().image;
        match (self.sm.process_event(Events::Launch), image) {
            (Ok(_), Some(image)) => Ok(image),
            _ => Err(BootError::GATE_INVALID_TRANSITION),
        }
    }

    /// Takes the `Untrusted → Terminal` transition and returns the halt code.
    pub fn halt(&mut self) -> BootError {
        let reason = self.sm.context().rejection();
        match self.sm.process_event(Events::Halt) {
            Ok(_) => halt_code(reason),
            Err(_) => BootError::GATE_INVALID_TRANSITION,
        }
    }

    /// Runs the gate to its terminal state: either `launcher` receives the
    /// verified buffer or the fatal error handler receives a halt code.
    pub fn boot<L: ImageLauncher>(mut self, source: &mut impl ImageSource, launcher: &mut L) -> ! {
        if let GateOutcome::Launch(_) = self.evaluate(source) {
            match self.launch() {
                Ok(image) => launcher.launch(image),
                Err(err) => halt(err),
            }
        }
        let err = self.halt();
        halt(err)
    }
}

fn halt(err: BootError) -> ! {
    romtime::println!("[secure-loader] Boot halted: 0x{}", HexWord(err.code()));
    fatal_error(err.code())
}
