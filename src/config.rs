//! Chain-wide generation settings.

use std::path::PathBuf;

use bon::Builder;

use crate::cert::params::Validity;
use crate::key::KeyAlgorithm;

pub const DEFAULT_AIA_BASE_URL: &str = "http://url-for-aia";
pub const DEFAULT_CRL_BASE_URL: &str = "http://url-for-crl";

/// Settings shared by every certificate of a [`Chain`](crate::chain::Chain).
///
/// # Example
/// ```
/// use chainkit::config::ChainConfig;
/// use chainkit::key::KeyAlgorithm;
///
/// let config = ChainConfig::builder()
///     .key_algorithm(KeyAlgorithm::EcdsaP256)
///     .created_by("generate-chains")
///     .build();
/// assert!(config.issuer_urls);
/// assert_eq!(config.aia_base_url, "http://url-for-aia");
/// ```
#[derive(Debug, Clone, Builder)]
pub struct ChainConfig {
    /// Algorithm of newly generated keys.
    #[builder(default)]
    pub key_algorithm: KeyAlgorithm,
    /// Directory of persisted keys; fresh keys every run when unset.
    #[builder(into)]
    pub key_cache_dir: Option<PathBuf>,
    /// Validity assigned to new certificates.
    #[builder(default)]
    pub validity: Validity,
    /// Whether non-root certificates get default `authorityInfoAccess` and
    /// `crlDistributionPoints` extensions.
    #[builder(default = true)]
    pub issuer_urls: bool,
    #[builder(into, default = DEFAULT_AIA_BASE_URL.to_string())]
    pub aia_base_url: String,
    #[builder(into, default = DEFAULT_CRL_BASE_URL.to_string())]
    pub crl_base_url: String,
    /// Generator name written as `[Created by: ...]` above the description.
    #[builder(into)]
    pub created_by: Option<String>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ChainConfig {
    /// `caIssuers` location of certificates issued by `issuer_label`.
    pub fn aia_url(&self, issuer_label: &str) -> String {
        format!("{}/{issuer_label}.cer", self.aia_base_url.trim_end_matches('/'))
    }

    /// CRL location of certificates issued by `issuer_label`.
    pub fn crl_url(&self, issuer_label: &str) -> String {
        format!("{}/{issuer_label}.crl", self.crl_base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixture_generator() {
        let config = ChainConfig::default();
        assert_eq!(config.key_algorithm, KeyAlgorithm::Rsa(2048));
        assert!(config.key_cache_dir.is_none());
        assert_eq!(config.validity, Validity::fixture_default());
        assert_eq!(config.aia_url("Root"), "http://url-for-aia/Root.cer");
        assert_eq!(config.crl_url("Root"), "http://url-for-crl/Root.crl");
    }

    #[test]
    fn test_base_urls_tolerate_trailing_slash() {
        let config = ChainConfig::builder()
            .aia_base_url("http://aia.test/")
            .issuer_urls(false)
            .build();
        assert_eq!(config.aia_url("Intermediate"), "http://aia.test/Intermediate.cer");
        assert!(!config.issuer_urls);
    }
}
