//! The certificate registry from which fixture chains are assembled.

use std::path::Path;

use tracing::{debug, warn};

use crate::cert::extensions::ExtensionSet;
use crate::cert::params::DistinguishedName;
use crate::cert::{self, CertId, Certificate, CertificateKind};
use crate::config::ChainConfig;
use crate::error::{ChainKitError, Result};
use crate::issuer::Issuer;
use crate::key::provider::KeyProvider;
use crate::serializer::ChainSerializer;

/// Owns the certificates of one fixture and the keys they are signed with.
///
/// Certificates reference their issuer by [`CertId`]; an issuer must already
/// exist when a certificate is created, so creation order is always a valid
/// signing order.
///
/// # Example
/// ```no_run
/// use chainkit::chain::Chain;
/// use chainkit::config::ChainConfig;
///
/// # fn main() -> chainkit::error::Result<()> {
/// let mut chain = Chain::new(ChainConfig::default());
/// let root = chain.create_self_signed_root("Root")?;
/// let target = chain.create_end_entity("Target", root)?;
/// chain
///     .extensions_mut(target)?
///     .set_property("certificatePolicies", "critical,1.2.3.4")?;
///
/// let order = chain.path_to_root(target)?;
/// chain.write_chain("Target issued directly by the root.", &order, "chain.pem")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Chain {
    config: ChainConfig,
    keys: KeyProvider,
    certificates: Vec<Certificate>,
    serial_counter: u64,
}

impl Chain {
    /// A chain whose keys come from a provider built from `config`.
    pub fn new(config: ChainConfig) -> Self {
        let keys = match &config.key_cache_dir {
            Some(dir) => KeyProvider::with_cache_dir(config.key_algorithm, dir.clone()),
            None => KeyProvider::new(config.key_algorithm),
        };
        Self::with_key_provider(config, keys)
    }

    /// A chain drawing keys from `keys`.
    pub fn with_key_provider(config: ChainConfig, keys: KeyProvider) -> Self {
        Self {
            config,
            keys,
            certificates: Vec::new(),
            serial_counter: 0,
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn key_provider_mut(&mut self) -> &mut KeyProvider {
        &mut self.keys
    }

    /// Creates a self-signed CA certificate.
    pub fn create_self_signed_root(&mut self, name: &str) -> Result<CertId> {
        let id = self.create(name, CertificateKind::Root, None)?;
        let extensions = &mut self.certificates[id.0].extensions;
        extensions.set_property("basicConstraints", "critical,CA:TRUE")?;
        extensions.set_property("keyUsage", "critical,keyCertSign,cRLSign")?;
        extensions.set_property("subjectKeyIdentifier", "hash")?;
        Ok(id)
    }

    /// Creates a CA certificate issued by `issuer`.
    pub fn create_intermediate(&mut self, name: &str, issuer: CertId) -> Result<CertId> {
        let id = self.create(name, CertificateKind::Intermediate, Some(issuer))?;
        let extensions = &mut self.certificates[id.0].extensions;
        extensions.set_property("basicConstraints", "critical,CA:TRUE")?;
        extensions.set_property("keyUsage", "critical,keyCertSign,cRLSign")?;
        extensions.set_property("subjectKeyIdentifier", "hash")?;
        extensions.set_property("authorityKeyIdentifier", "keyid:always")?;
        self.add_issuer_urls(id, issuer)?;
        Ok(id)
    }

    /// Creates a leaf certificate issued by `issuer`.
    pub fn create_end_entity(&mut self, name: &str, issuer: CertId) -> Result<CertId> {
        let id = self.create(name, CertificateKind::EndEntity, Some(issuer))?;
        let extensions = &mut self.certificates[id.0].extensions;
        extensions.set_property("basicConstraints", "critical,CA:FALSE")?;
        extensions.set_property("keyUsage", "critical,digitalSignature,keyEncipherment")?;
        extensions.set_property("extendedKeyUsage", "serverAuth,clientAuth")?;
        extensions.set_property("subjectKeyIdentifier", "hash")?;
        extensions.set_property("authorityKeyIdentifier", "keyid:always")?;
        self.add_issuer_urls(id, issuer)?;
        Ok(id)
    }

    fn create(
        &mut self,
        name: &str,
        kind: CertificateKind,
        issuer: Option<CertId>,
    ) -> Result<CertId> {
        if let Some(issuer) = issuer {
            self.get(issuer)?;
        }

        let label = self.unique_label(name);
        let key = self.keys.key_for(&label)?;
        let serial_number = cert::derive_serial_number(&label, self.serial_counter);
        self.serial_counter += 1;

        let id = CertId(self.certificates.len());
        debug!(%label, ?kind, issuer = ?issuer.map(CertId::index), "creating certificate");
        self.certificates.push(Certificate {
            id,
            label,
            kind,
            issuer,
            subject: DistinguishedName::from_common_name(name),
            key,
            extensions: ExtensionSet::new(),
            serial_number,
            validity: self.config.validity.clone(),
            issued: None,
        });
        Ok(id)
    }

    fn add_issuer_urls(&mut self, id: CertId, issuer: CertId) -> Result<()> {
        if !self.config.issuer_urls {
            return Ok(());
        }
        let issuer_label = self.get(issuer)?.label().to_string();
        let aia = format!("caIssuers;URI:{}", self.config.aia_url(&issuer_label));
        let crl = format!("URI:{}", self.config.crl_url(&issuer_label));

        let extensions = &mut self.certificates[id.0].extensions;
        extensions.set_property("authorityInfoAccess", aia)?;
        extensions.set_property("crlDistributionPoints", crl)?;
        Ok(())
    }

    /// `name`, or `name_<n>` for the first free `n` when `name` is taken.
    fn unique_label(&self, name: &str) -> String {
        let taken = |label: &str| self.certificates.iter().any(|c| c.label == label);
        if !taken(name) {
            return name.to_string();
        }
        (1..)
            .map(|n| format!("{name}_{n}"))
            .find(|label| !taken(label.as_str()))
            .unwrap_or_else(|| name.to_string())
    }

    pub fn get(&self, id: CertId) -> Result<&Certificate> {
        self.certificates
            .get(id.0)
            .ok_or(ChainKitError::UnknownCertificate(id.0))
    }

    pub fn get_mut(&mut self, id: CertId) -> Result<&mut Certificate> {
        self.certificates
            .get_mut(id.0)
            .ok_or(ChainKitError::UnknownCertificate(id.0))
    }

    /// Shorthand for `get_mut(id)?.extensions_mut()`.
    pub fn extensions_mut(&mut self, id: CertId) -> Result<&mut ExtensionSet> {
        Ok(self.get_mut(id)?.extensions_mut())
    }

    /// Signs the certificate with its issuer's key and returns the signature.
    ///
    /// Finalizing an already finalized certificate returns the existing
    /// signature. Fails with [`ChainKitError::DependencyError`] when the
    /// issuer has not been finalized yet; extension encoding errors leave the
    /// certificate unfinalized.
    pub fn finalize(&mut self, id: CertId) -> Result<&[u8]> {
        let cert = self.get(id)?;
        if !cert.is_finalized() {
            let issued = match cert.issuer() {
                None => cert.issue(cert.to_be_signed(cert)?)?,
                Some(issuer_id) => {
                    let issuer = self.get(issuer_id)?;
                    if !issuer.is_finalized() {
                        return Err(ChainKitError::DependencyError {
                            subject: cert.name().to_string(),
                            issuer: issuer.name().to_string(),
                        });
                    }
                    issuer.issue(cert.to_be_signed(issuer)?)?
                }
            };
            debug!(label = cert.label(), "finalized certificate");
            self.certificates[id.0].mark_issued(issued);
        }

        let cert = self.get(id)?;
        cert.signature()
            .ok_or_else(|| ChainKitError::UnfinalizedCertificate(cert.name().to_string()))
    }

    /// Finalizes the issuers of `id` root-first, then `id` itself.
    pub fn finalize_with_issuers(&mut self, id: CertId) -> Result<()> {
        for ancestor in self.path_to_root(id)?.into_iter().rev() {
            self.finalize(ancestor)?;
        }
        Ok(())
    }

    /// Finalizes every certificate in creation order.
    pub fn finalize_all(&mut self) -> Result<()> {
        for index in 0..self.certificates.len() {
            self.finalize(CertId(index))?;
        }
        Ok(())
    }

    /// The issuer path from `id` up to its self-signed root, leaf first.
    pub fn path_to_root(&self, id: CertId) -> Result<Vec<CertId>> {
        let mut path = vec![id];
        let mut current = self.get(id)?;
        while let Some(issuer) = current.issuer() {
            path.push(issuer);
            current = self.get(issuer)?;
        }
        Ok(path)
    }

    /// Whether each certificate in `order` is issued by the next one and the
    /// last one is self-signed.
    pub fn follows_issuer_links(&self, order: &[CertId]) -> bool {
        let linked = order.windows(2).all(|pair| {
            self.get(pair[0])
                .map(|c| c.issuer() == Some(pair[1]))
                .unwrap_or(false)
        });
        let rooted = order
            .last()
            .and_then(|last| self.get(*last).ok())
            .is_some_and(Certificate::is_self_signed);
        linked && rooted
    }

    /// Resolves `order` into certificates.
    pub fn certificates(&self, order: &[CertId]) -> Result<Vec<&Certificate>> {
        order.iter().map(|id| self.get(*id)).collect()
    }

    /// Finalizes the listed certificates (and their issuers) and writes them
    /// in the given order.
    ///
    /// An order that does not run leaf to root along issuer links is written
    /// as given, with a warning.
    pub fn write_chain(
        &mut self,
        description: &str,
        order: &[CertId],
        path: impl AsRef<Path>,
    ) -> Result<()> {
        for id in order {
            self.finalize_with_issuers(*id)?;
        }
        if !self.follows_issuer_links(order) {
            warn!(
                path = %path.as_ref().display(),
                "chain order does not follow issuer links from leaf to root"
            );
        }

        let serializer = ChainSerializer::builder()
            .maybe_created_by(self.config.created_by.clone())
            .build();
        serializer.write_chain(description, &self.certificates(order)?, path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Certificate> {
        self.certificates.iter()
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyAlgorithm;

    fn chain() -> Chain {
        Chain::new(
            ChainConfig::builder()
                .key_algorithm(KeyAlgorithm::Ed25519)
                .build(),
        )
    }

    fn names(set: &ExtensionSet) -> Vec<&str> {
        set.iter().map(|(n, _)| n).collect()
    }

    #[test]
    fn test_chain_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Chain>();
    }

    #[test]
    fn test_default_extensions_per_kind() {
        let mut chain = chain();
        let root = chain.create_self_signed_root("Root").unwrap();
        let intermediate = chain.create_intermediate("Intermediate", root).unwrap();
        let target = chain.create_end_entity("Target", intermediate).unwrap();

        assert_eq!(
            names(chain.get(root).unwrap().extensions()),
            ["basicConstraints", "keyUsage", "subjectKeyIdentifier"]
        );
        assert_eq!(
            chain
                .get(intermediate)
                .unwrap()
                .extensions()
                .get_property("authorityInfoAccess")
                .unwrap()
                .raw,
            "caIssuers;URI:http://url-for-aia/Root.cer"
        );
        let leaf = chain.get(target).unwrap().extensions();
        assert_eq!(
            leaf.get_property("basicConstraints").unwrap().to_string(),
            "critical,CA:FALSE"
        );
        assert_eq!(
            leaf.get_property("crlDistributionPoints").unwrap().raw,
            "URI:http://url-for-crl/Intermediate.crl"
        );
    }

    #[test]
    fn test_issuer_urls_can_be_disabled() {
        let mut chain = Chain::new(
            ChainConfig::builder()
                .key_algorithm(KeyAlgorithm::Ed25519)
                .issuer_urls(false)
                .build(),
        );
        let root = chain.create_self_signed_root("Root").unwrap();
        let target = chain.create_end_entity("Target", root).unwrap();
        let extensions = chain.get(target).unwrap().extensions();
        assert!(!extensions.contains("authorityInfoAccess"));
        assert!(!extensions.contains("crlDistributionPoints"));
    }

    #[test]
    fn test_duplicate_names_get_unique_labels_and_serials() {
        let mut chain = chain();
        let first = chain.create_self_signed_root("Root").unwrap();
        let second = chain.create_self_signed_root("Root").unwrap();
        let third = chain.create_self_signed_root("Root").unwrap();

        let labels: Vec<_> = [first, second, third]
            .iter()
            .map(|id| chain.get(*id).unwrap().label().to_string())
            .collect();
        assert_eq!(labels, ["Root", "Root_1", "Root_2"]);
        assert_eq!(chain.get(second).unwrap().name(), "Root");
        assert_ne!(
            chain.get(first).unwrap().serial_number(),
            chain.get(second).unwrap().serial_number()
        );
    }

    #[test]
    fn test_unknown_issuer_is_rejected() {
        let mut chain = chain();
        let mut other = self::chain();
        let root = other.create_self_signed_root("Root").unwrap();
        other.create_self_signed_root("Other").unwrap();
        let foreign = other.create_self_signed_root("Foreign").unwrap();
        assert_eq!(root.index(), 0);

        assert!(matches!(
            chain.create_end_entity("Target", foreign),
            Err(ChainKitError::UnknownCertificate(2))
        ));
        assert!(chain.is_empty());
    }

    #[test]
    fn test_finalize_requires_finalized_issuer() {
        let mut chain = chain();
        let root = chain.create_self_signed_root("Root").unwrap();
        let intermediate = chain.create_intermediate("Intermediate", root).unwrap();

        let err = chain.finalize(intermediate).unwrap_err();
        assert!(matches!(
            err,
            ChainKitError::DependencyError { ref subject, ref issuer }
                if subject == "Intermediate" && issuer == "Root"
        ));
        assert!(!chain.get(intermediate).unwrap().is_finalized());

        chain.finalize(root).unwrap();
        chain.finalize(intermediate).unwrap();
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut chain = chain();
        let root = chain.create_self_signed_root("Root").unwrap();
        let first = chain.finalize(root).unwrap().to_vec();
        let second = chain.finalize(root).unwrap().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn test_finalized_certificate_is_frozen() {
        let mut chain = chain();
        let root = chain.create_self_signed_root("Root").unwrap();
        chain.finalize(root).unwrap();

        assert!(matches!(
            chain
                .extensions_mut(root)
                .unwrap()
                .set_property("inhibitAnyPolicy", "critical,0"),
            Err(ChainKitError::CertificateFinalized(_))
        ));
        assert!(matches!(
            chain
                .get_mut(root)
                .unwrap()
                .set_validity(crate::cert::params::Validity::for_days(1)),
            Err(ChainKitError::CertificateFinalized(_))
        ));
    }

    #[test]
    fn test_bad_extension_leaves_certificate_unfinalized() {
        let mut chain = chain();
        let root = chain.create_self_signed_root("Root").unwrap();
        chain
            .extensions_mut(root)
            .unwrap()
            .set_property("inhibitAnyPolicy", "critical,many")
            .unwrap();

        assert!(matches!(
            chain.finalize(root),
            Err(ChainKitError::ExtensionValueError { .. })
        ));
        assert!(!chain.get(root).unwrap().is_finalized());

        chain
            .extensions_mut(root)
            .unwrap()
            .set_property("inhibitAnyPolicy", "critical,1")
            .unwrap();
        chain.finalize(root).unwrap();
    }

    #[test]
    fn test_path_to_root_and_order_check() {
        let mut chain = chain();
        let root = chain.create_self_signed_root("Root").unwrap();
        let intermediate = chain.create_intermediate("Intermediate", root).unwrap();
        let target = chain.create_end_entity("Target", intermediate).unwrap();

        let path = chain.path_to_root(target).unwrap();
        assert_eq!(path, [target, intermediate, root]);
        assert!(chain.follows_issuer_links(&path));
        assert!(!chain.follows_issuer_links(&[root, intermediate, target]));
        assert!(!chain.follows_issuer_links(&[target, intermediate]));
    }

    #[test]
    fn test_finalize_with_issuers_signs_whole_path() {
        let mut chain = chain();
        let root = chain.create_self_signed_root("Root").unwrap();
        let intermediate = chain.create_intermediate("Intermediate", root).unwrap();
        let target = chain.create_end_entity("Target", intermediate).unwrap();
        let unrelated = chain.create_self_signed_root("Unrelated").unwrap();

        chain.finalize_with_issuers(target).unwrap();
        assert!(chain.iter().take(3).all(Certificate::is_finalized));
        assert!(!chain.get(unrelated).unwrap().is_finalized());

        chain.finalize_all().unwrap();
        assert!(chain.get(unrelated).unwrap().is_finalized());
    }
}
