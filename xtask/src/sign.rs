// Licensed under the Apache-2.0 license

use anyhow::Result;
use secboot_builder::{sign_image_to, KeyStore, Persisted};
use secboot_config::SigningConfig;
use std::path::Path;

pub fn sign(image: &Path, config: &SigningConfig) -> Result<()> {
    let store = KeyStore::from_config(config);
    let signature = config.signature_path(image);
    let report = sign_image_to(image, &signature, &store, config.key_bits)?;
    if report.keys == Persisted::Written {
        println!("✓ Keys generated in {}", store.dir().display());
    }
    println!("✓ Signed: {}", report.signature.display());
    println!("  sha256 {}", report.digest);
    println!(
        "  {} byte signature, key fingerprint {}",
        report.signature_len, report.key_fingerprint
    );
    Ok(())
}
