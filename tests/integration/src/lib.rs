// Licensed under the Apache-2.0 license

//! End-to-end scenarios: keys are generated and persisted by the build-time
//! tooling, images are signed to disk, and the loader's boot gate decides.

#[cfg(test)]
mod test_boot_gate;
#[cfg(test)]
mod test_sign_verify;

#[cfg(test)]
mod test {
    use secboot_builder::{KeyPair, KeyStore};
    use std::path::{Path, PathBuf};
    use std::sync::LazyLock;
    use tempfile::TempDir;

    // Key generation dominates test time, so each key is created once.
    pub static SIGNING_KEY: LazyLock<KeyPair> =
        LazyLock::new(|| KeyPair::generate(2048).expect("key generation failed"));
    pub static OTHER_KEY: LazyLock<KeyPair> =
        LazyLock::new(|| KeyPair::generate(2048).expect("key generation failed"));

    /// A temporary build directory holding a key store and signed images.
    pub struct Workspace {
        pub dir: TempDir,
        pub store: KeyStore,
    }

    impl Workspace {
        pub fn new(key: &KeyPair) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let store = KeyStore::new(dir.path().join("keys"));
            store.persist(key).unwrap();
            Self { dir, store }
        }

        pub fn write_image(&self, name: &str, contents: &[u8]) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, contents).unwrap();
            path
        }

        pub fn public_der(&self) -> Vec<u8> {
            std::fs::read(self.store.public_der_path()).unwrap()
        }
    }

    pub fn read(path: &Path) -> Vec<u8> {
        std::fs::read(path).unwrap()
    }

    /// Deterministic, non-repeating test payload.
    pub fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 + i / 251) as u8).collect()
    }
}
