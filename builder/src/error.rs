// Licensed under the Apache-2.0 license

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("key generation failed: {0}")]
    Generation(#[source] rsa::Error),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} not found", path.display())]
    NotFound { path: PathBuf },
    #[error("{}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },
    #[error("invalid key: {0}")]
    Key(String),
    #[error("signing failed: {0}")]
    Crypto(#[source] rsa::Error),
    #[error(
        "{} exists without a private key; refusing to generate over it (rotate to replace)",
        path.display()
    )]
    Orphaned { path: PathBuf },
    #[error(
        "{} does not match the stored private key; rotate to replace it",
        path.display()
    )]
    Mismatch { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Maps an I/O failure on `path`, keeping "not found" distinct.
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Error {
        let path = path.into();
        move |source| {
            if source.kind() == io::ErrorKind::NotFound {
                Error::NotFound { path }
            } else {
                Error::Io { path, source }
            }
        }
    }
}
