// Licensed under the Apache-2.0 license

use crate::keys::public_key_der;
use anyhow::{anyhow, Context, Result};
use image_sig::{ImageDigest, DIGEST_LEN};
use log::debug;
use secboot_builder::KeyStore;
use secboot_config::LoaderConfig;
use secboot_rom::{
    set_fatal_error_handler, BootGate, FatalErrorHandler, ImageLauncher, ImageSource, LoadError,
    RsaImageVerifier,
};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

/// Image and signature read from the host filesystem.
pub struct FileImageSource {
    image: PathBuf,
    signature: PathBuf,
}

impl FileImageSource {
    pub fn new(image: &Path, signature: &Path) -> Self {
        Self {
            image: image.to_path_buf(),
            signature: signature.to_path_buf(),
        }
    }
}

fn read_into(path: &Path, buf: &mut [u8]) -> Result<usize, LoadError> {
    let mut file = File::open(path).map_err(|e| {
        debug!("Cannot open {}: {}", path.display(), e);
        match e.kind() {
            ErrorKind::NotFound => LoadError::NotFound,
            _ => LoadError::Io,
        }
    })?;
    let len = file.metadata().map_err(|_| LoadError::Io)?.len();
    let len = usize::try_from(len).map_err(|_| LoadError::TooLarge)?;
    let dest = buf.get_mut(..len).ok_or(LoadError::TooLarge)?;
    file.read_exact(dest).map_err(|_| LoadError::Io)?;
    Ok(len)
}

impl ImageSource for FileImageSource {
    fn read_image(&mut self, buf: &mut [u8]) -> Result<usize, LoadError> {
        read_into(&self.image, buf)
    }

    fn read_signature(&mut self, buf: &mut [u8]) -> Result<usize, LoadError> {
        read_into(&self.signature, buf)
    }
}

/// Host stand-in for chain-loading: prints the loader banner and exits 0.
struct HostLauncher;

impl ImageLauncher for HostLauncher {
    fn launch(&mut self, image: &[u8]) -> ! {
        println!();
        println!("═══════════════════════════════════════════════");
        println!("  Secure UEFI Loader");
        println!("═══════════════════════════════════════════════");
        println!();
        println!("  [✓] Signature verification PASSED");
        println!("  [✓] Application authorized");
        println!("  Chain-loading {} byte image", image.len());
        std::process::exit(0);
    }
}

struct HostFatalErrorHandler;

impl FatalErrorHandler for HostFatalErrorHandler {
    fn fatal_error(&mut self, code: u32) -> ! {
        eprintln!("Boot halted with fatal error 0x{:08x}", code);
        std::process::exit(1);
    }
}

struct StdoutPrinter;

impl core::fmt::Write for StdoutPrinter {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        print!("{}", s);
        Ok(())
    }
}

pub fn parse_pin(hex_str: &str) -> Result<ImageDigest> {
    let bytes = hex::decode(hex_str.trim()).context("pin is not valid hex")?;
    let bytes: [u8; DIGEST_LEN] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow!("pin must be {} bytes, got {}", DIGEST_LEN, b.len()))?;
    Ok(ImageDigest::from_bytes(bytes))
}

pub fn boot(
    image: &Path,
    signature: &Path,
    public_key: Option<&Path>,
    store: &KeyStore,
    pin: Option<&str>,
) -> Result<()> {
    let der = public_key_der(public_key, store)?;
    let verifier = match pin {
        Some(pin) => RsaImageVerifier::from_pinned_key(&der, &parse_pin(pin)?),
        None => RsaImageVerifier::from_embedded_key(&der),
    };

    romtime::set_printer(Box::leak(Box::new(StdoutPrinter)));
    set_fatal_error_handler(Box::leak(Box::new(HostFatalErrorHandler)));

    let mut buffer = vec![0u8; LoaderConfig::default().max_image_size];
    let gate = BootGate::new(verifier, &mut buffer);
    let mut source = FileImageSource::new(image, signature);
    gate.boot(&mut source, &mut HostLauncher)
}
