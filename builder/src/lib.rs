// Licensed under the Apache-2.0 license

//! Build-time half of secure boot: key management and detached image signing.

mod error;
pub mod keystore;
pub mod signer;

pub use error::{Error, Result};
pub use keystore::{public_key_fingerprint, KeyKind, KeyMaterial, KeyPair, KeyStore, Persisted};
pub use signer::{sign_image, sign_image_to, SignReport, Signer};

use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub(crate) const PRIVATE_MODE: u32 = 0o600;
pub(crate) const PUBLIC_MODE: u32 = 0o644;

/// Writes `contents` to a temporary file next to `path` and renames it into
/// place, so readers see either the old file or the complete new one.
pub(crate) fn write_atomic(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(Error::io(dir))?;
    set_mode(tmp.as_file(), mode).map_err(Error::io(tmp.path()))?;
    tmp.write_all(contents).map_err(Error::io(tmp.path()))?;
    tmp.as_file().sync_all().map_err(Error::io(tmp.path()))?;
    tmp.persist(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

#[cfg(unix)]
fn set_mode(file: &fs::File, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &fs::File, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(Error::io(path))
}
