// Licensed under the Apache-2.0 license

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use secboot_builder::KeyStore;
use secboot_config::SigningConfig;
use simple_logger::SimpleLogger;
use std::path::{Path, PathBuf};

mod boot;
mod keys;
mod sign;
mod verify;

#[derive(Parser)]
#[command(version, about = "Secure boot image signing and verification", long_about = None)]
struct Xtask {
    /// TOML file with signing settings; flags override its values
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    xtask: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the signing key pair if none exists
    Keygen {
        #[arg(long)]
        keys_dir: Option<PathBuf>,

        /// RSA modulus size
        #[arg(long)]
        bits: Option<usize>,

        /// Replace an existing key pair. Every signature made with the old key stops verifying.
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Sign an image, writing <image>.sig next to it
    Sign {
        image: PathBuf,

        #[arg(long)]
        keys_dir: Option<PathBuf>,

        /// RSA modulus size used if keys have to be generated
        #[arg(long)]
        bits: Option<usize>,
    },

    /// Verify an image against its detached signature
    Verify {
        image: PathBuf,

        /// Signature file, defaults to <image>.sig
        signature: Option<PathBuf>,

        /// Public key (DER or PEM), defaults to the key directory
        #[arg(long)]
        public_key: Option<PathBuf>,

        #[arg(long)]
        keys_dir: Option<PathBuf>,
    },

    /// Run the secure loader's boot gate against files on the host
    Boot {
        image: PathBuf,

        /// Signature file, defaults to <image>.sig
        signature: Option<PathBuf>,

        /// Public key (DER or PEM), defaults to the key directory
        #[arg(long)]
        public_key: Option<PathBuf>,

        #[arg(long)]
        keys_dir: Option<PathBuf>,

        /// Expected SHA-256 fingerprint of the public key, in hex
        #[arg(long, value_name = "HEX")]
        pin: Option<String>,
    },

    /// Print the SHA-256 fingerprint of the public key
    Fingerprint {
        #[arg(long)]
        keys_dir: Option<PathBuf>,
    },
}

/// Loads the config file (or the defaults) and applies command line overrides.
fn signing_config(
    file: Option<&Path>,
    keys_dir: Option<&Path>,
    bits: Option<usize>,
) -> Result<SigningConfig> {
    let mut config = match file {
        Some(path) => SigningConfig::load(path)?,
        None => SigningConfig::default(),
    };
    if let Some(dir) = keys_dir {
        config.keys_dir = dir.to_path_buf();
    }
    if let Some(bits) = bits {
        config.key_bits = bits;
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: &Xtask) -> Result<()> {
    let file = cli.config.as_deref();
    match &cli.xtask {
        Commands::Keygen {
            keys_dir,
            bits,
            force,
        } => {
            let config =
                signing_config(file, keys_dir.as_deref(), *bits).context("keygen step failed")?;
            keys::keygen(&KeyStore::from_config(&config), config.key_bits, *force)
                .map(|_| ())
                .context("keygen step failed")
        }
        Commands::Sign {
            image,
            keys_dir,
            bits,
        } => {
            let config =
                signing_config(file, keys_dir.as_deref(), *bits).context("sign step failed")?;
            sign::sign(image, &config).context("sign step failed")
        }
        Commands::Verify {
            image,
            signature,
            public_key,
            keys_dir,
        } => {
            let config =
                signing_config(file, keys_dir.as_deref(), None).context("verify step failed")?;
            let signature = signature
                .clone()
                .unwrap_or_else(|| config.signature_path(image));
            let store = KeyStore::from_config(&config);
            verify::verify(image, &signature, public_key.as_deref(), &store)
        }
        Commands::Boot {
            image,
            signature,
            public_key,
            keys_dir,
            pin,
        } => {
            let config =
                signing_config(file, keys_dir.as_deref(), None).context("boot step failed")?;
            let signature = signature
                .clone()
                .unwrap_or_else(|| config.signature_path(image));
            let store = KeyStore::from_config(&config);
            boot::boot(
                image,
                &signature,
                public_key.as_deref(),
                &store,
                pin.as_deref(),
            )
        }
        Commands::Fingerprint { keys_dir } => {
            let config = signing_config(file, keys_dir.as_deref(), None)
                .context("fingerprint step failed")?;
            keys::fingerprint(&KeyStore::from_config(&config))
        }
    }
}

fn main() {
    let cli = Xtask::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = SimpleLogger::new().with_level(level).env().init();

    run(&cli).unwrap_or_else(|e| {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    });
}
