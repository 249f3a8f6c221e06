// Licensed under the Apache-2.0 license

use crate::{DEFAULT_KEYS_DIR, DEFAULT_KEY_BITS, MAX_KEY_BITS, MIN_KEY_BITS, SIGNATURE_EXTENSION};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Build-time signing settings.
///
/// Every field is optional in the TOML file; missing fields take the
/// compiled-in defaults.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SigningConfig {
    pub keys_dir: PathBuf,
    pub key_bits: usize,
    pub signature_extension: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        SigningConfig {
            keys_dir: PathBuf::from(DEFAULT_KEYS_DIR),
            key_bits: DEFAULT_KEY_BITS,
            signature_extension: SIGNATURE_EXTENSION.to_string(),
        }
    }
}

impl SigningConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: SigningConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_KEY_BITS..=MAX_KEY_BITS).contains(&self.key_bits) || self.key_bits % 8 != 0 {
            return Err(ConfigError::Invalid(format!(
                "key_bits must be a multiple of 8 between {} and {}, got {}",
                MIN_KEY_BITS, MAX_KEY_BITS, self.key_bits
            )));
        }
        if self.signature_extension.is_empty()
            || self
                .signature_extension
                .contains(|c: char| c == '/' || c == '\\' || c == '.')
        {
            return Err(ConfigError::Invalid(format!(
                "signature_extension {:?} is not a plain extension",
                self.signature_extension
            )));
        }
        Ok(())
    }

    /// Path of the detached signature that sits next to `image`.
    pub fn signature_path(&self, image: &Path) -> PathBuf {
        signature_path_for(image, &self.signature_extension)
    }
}

/// Appends `.<extension>` to the full image file name.
pub fn signature_path_for(image: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(image.as_os_str());
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}
