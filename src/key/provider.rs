//! Key material for the certificates of one chain.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use super::{KeyAlgorithm, KeyPair};
use crate::error::{ChainKitError, Result};

/// Produces key pairs for certificate subjects.
///
/// Without a cache directory every label receives a fresh key. With one, the
/// key for a label is read from `<dir>/<label>.key` when that file exists and
/// is generated and stored there otherwise, so regenerating a fixture yields
/// the same keys (and, since ECDSA, Ed25519 and PKCS#1 v1.5 signing are
/// deterministic, the same certificates).
///
/// A provider belongs to a single [`Chain`](crate::chain::Chain); keys are
/// memoized per label only within this provider.
#[derive(Debug)]
pub struct KeyProvider {
    algorithm: KeyAlgorithm,
    cache_dir: Option<PathBuf>,
    issued: HashMap<String, Arc<KeyPair>>,
}

impl KeyProvider {
    /// A provider generating fresh keys of `algorithm`.
    pub fn new(algorithm: KeyAlgorithm) -> Self {
        Self {
            algorithm,
            cache_dir: None,
            issued: HashMap::new(),
        }
    }

    /// A provider that persists keys below `dir`.
    pub fn with_cache_dir(algorithm: KeyAlgorithm, dir: impl Into<PathBuf>) -> Self {
        Self {
            algorithm,
            cache_dir: Some(dir.into()),
            issued: HashMap::new(),
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    /// Generates a fresh key pair; never consults the cache.
    pub fn new_key_pair(&self) -> Result<KeyPair> {
        debug!(algorithm = ?self.algorithm, "generating key pair");
        KeyPair::generate(self.algorithm)
    }

    /// Returns the key pair for `label`, loading or creating it as needed.
    pub fn key_for(&mut self, label: &str) -> Result<Arc<KeyPair>> {
        if let Some(key) = self.issued.get(label) {
            return Ok(Arc::clone(key));
        }

        let key = match &self.cache_dir {
            Some(dir) => Self::load_or_create(dir, label, self.algorithm)?,
            None => self.new_key_pair()?,
        };
        let key = Arc::new(key);
        self.issued.insert(label.to_string(), Arc::clone(&key));
        Ok(key)
    }

    fn load_or_create(dir: &Path, label: &str, algorithm: KeyAlgorithm) -> Result<KeyPair> {
        let path = dir.join(format!("{}.key", file_stem(label)));
        if path.exists() {
            debug!(path = %path.display(), "loading cached key");
            let pem = fs::read_to_string(&path).map_err(|e| ChainKitError::io(&path, e))?;
            let key = KeyPair::import_from_pkcs8_pem(&pem)?;
            if key.algorithm() != algorithm {
                warn!(
                    path = %path.display(),
                    cached = ?key.algorithm(),
                    configured = ?algorithm,
                    "cached key does not match the configured algorithm; using cached key"
                );
            }
            return Ok(key);
        }

        debug!(path = %path.display(), ?algorithm, "generating cached key");
        let key = KeyPair::generate(algorithm)?;
        fs::create_dir_all(dir).map_err(|e| ChainKitError::io(dir, e))?;
        fs::write(&path, key.to_pkcs8_pem()?).map_err(|e| ChainKitError::io(&path, e))?;
        Ok(key)
    }
}

/// Maps a label onto a portable file name.
///
/// Percent-encoding keeps the mapping injective, so distinct labels never
/// share a key file.
fn file_stem(label: &str) -> String {
    urlencoding::encode(label).into_owned()
}
