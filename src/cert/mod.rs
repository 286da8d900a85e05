pub mod extensions;
pub mod grammar;
pub mod params;

use std::sync::Arc;

use der::{Decode, Encode, EncodePem};
use sha2::{Digest, Sha256};
use x509_cert::certificate::CertificateInner;
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::error::{ChainKitError, Result};
use crate::issuer::Issuer;
use crate::key::KeyPair;
use crate::tbs_certificate::TbsCertificate;
use extensions::ExtensionSet;
use grammar::EncodingContext;
use params::{DistinguishedName, Validity};

/// Handle of a certificate inside its [`Chain`](crate::chain::Chain).
///
/// Handles are only meaningful for the chain that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CertId(pub(crate) usize);

impl CertId {
    /// Position of the certificate in creation order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Which factory a certificate was created by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateKind {
    Root,
    Intermediate,
    EndEntity,
}

/// Represents the supported signature algorithms for certificates.
///
/// The algorithm is determined by the issuer's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption (PKCS#1 v1.5).
    Sha256WithRSA,
    /// SHA-256 with ECDSA (P-256).
    Sha256WithECDSA,
    /// SHA-384 with ECDSA (P-384).
    Sha384WithECDSA,
    /// SHA-512 with ECDSA (P-521).
    Sha512WithECDSA,
    /// Ed25519 (PureEdDSA).
    Ed25519,
}

impl SignatureAlgorithm {
    /// The algorithm used when `key` signs a certificate.
    pub fn for_key(key: &KeyPair) -> Self {
        match key {
            KeyPair::Rsa { .. } => SignatureAlgorithm::Sha256WithRSA,
            KeyPair::EcdsaP256 { .. } => SignatureAlgorithm::Sha256WithECDSA,
            KeyPair::EcdsaP384 { .. } => SignatureAlgorithm::Sha384WithECDSA,
            KeyPair::EcdsaP521 { .. } => SignatureAlgorithm::Sha512WithECDSA,
            KeyPair::Ed25519 { .. } => SignatureAlgorithm::Ed25519,
        }
    }

    pub fn oid(self) -> const_oid::ObjectIdentifier {
        match self {
            SignatureAlgorithm::Sha256WithRSA => const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha256WithECDSA => const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
            SignatureAlgorithm::Sha384WithECDSA => const_oid::db::rfc5912::ECDSA_WITH_SHA_384,
            SignatureAlgorithm::Sha512WithECDSA => const_oid::db::rfc5912::ECDSA_WITH_SHA_512,
            SignatureAlgorithm::Ed25519 => const_oid::db::rfc8410::ID_ED_25519,
        }
    }

    /// The OpenSSL short name, as printed in chain summaries.
    pub fn name(self) -> &'static str {
        match self {
            SignatureAlgorithm::Sha256WithRSA => "sha256WithRSAEncryption",
            SignatureAlgorithm::Sha256WithECDSA => "ecdsa-with-SHA256",
            SignatureAlgorithm::Sha384WithECDSA => "ecdsa-with-SHA384",
            SignatureAlgorithm::Sha512WithECDSA => "ecdsa-with-SHA512",
            SignatureAlgorithm::Ed25519 => "ED25519",
        }
    }

    pub fn from_oid(oid: &const_oid::ObjectIdentifier) -> Result<Self> {
        match *oid {
            const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION => {
                Ok(SignatureAlgorithm::Sha256WithRSA)
            }
            const_oid::db::rfc5912::ECDSA_WITH_SHA_256 => Ok(SignatureAlgorithm::Sha256WithECDSA),
            const_oid::db::rfc5912::ECDSA_WITH_SHA_384 => Ok(SignatureAlgorithm::Sha384WithECDSA),
            const_oid::db::rfc5912::ECDSA_WITH_SHA_512 => Ok(SignatureAlgorithm::Sha512WithECDSA),
            const_oid::db::rfc8410::ID_ED_25519 => Ok(SignatureAlgorithm::Ed25519),
            _ => Err(ChainKitError::DecodingError(format!(
                "Unsupported signature algorithm: {oid}"
            ))),
        }
    }
}

impl From<SignatureAlgorithm> for AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// RSA carries explicit NULL parameters; ECDSA and Ed25519 omit them.
    fn from(value: SignatureAlgorithm) -> Self {
        let parameters = match value {
            SignatureAlgorithm::Sha256WithRSA => Some(der::Any::from(der::asn1::AnyRef::NULL)),
            _ => None,
        };
        AlgorithmIdentifierOwned {
            oid: value.oid(),
            parameters,
        }
    }
}

/// A signed X.509 certificate together with its DER encoding.
#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    inner: CertificateInner,
    der: Vec<u8>,
}

impl IssuedCertificate {
    pub fn from_inner(inner: CertificateInner) -> Result<Self> {
        let der = inner
            .to_der()
            .map_err(|e| ChainKitError::EncodingError(e.to_string()))?;
        Ok(Self { inner, der })
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner: CertificateInner = CertificateInner::from_der(der)
            .map_err(|e| ChainKitError::DecodingError(e.to_string()))?;
        Ok(Self {
            inner,
            der: der.to_vec(),
        })
    }

    pub fn inner(&self) -> &CertificateInner {
        &self.inner
    }

    /// The DER encoding of the certificate.
    pub fn to_der(&self) -> &[u8] {
        &self.der
    }

    /// Encodes the certificate into a `CERTIFICATE` PEM block.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| ChainKitError::EncodingError(e.to_string()))
    }

    /// The raw signature bytes.
    pub fn signature(&self) -> &[u8] {
        self.inner.signature.raw_bytes()
    }
}

/// A certificate under construction inside a [`Chain`](crate::chain::Chain).
///
/// Everything except the issuer link can be changed until the certificate is
/// finalized; afterwards the certificate (and its [`ExtensionSet`]) is
/// immutable and every mutator fails with
/// [`ChainKitError::CertificateFinalized`].
#[derive(Debug, Clone)]
pub struct Certificate {
    pub(crate) id: CertId,
    pub(crate) label: String,
    pub(crate) kind: CertificateKind,
    pub(crate) issuer: Option<CertId>,
    pub(crate) subject: DistinguishedName,
    pub(crate) key: Arc<KeyPair>,
    pub(crate) extensions: ExtensionSet,
    pub(crate) serial_number: Vec<u8>,
    pub(crate) validity: Validity,
    pub(crate) issued: Option<IssuedCertificate>,
}

impl Certificate {
    pub fn id(&self) -> CertId {
        self.id
    }

    /// The subject's common name.
    pub fn name(&self) -> &str {
        &self.subject.common_name
    }

    /// The per-chain unique label; equal to the name unless the name was
    /// already taken.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> CertificateKind {
        self.kind
    }

    /// The issuing certificate, or `None` for a self-signed root.
    pub fn issuer(&self) -> Option<CertId> {
        self.issuer
    }

    pub fn is_self_signed(&self) -> bool {
        self.issuer.is_none()
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    pub fn key(&self) -> &Arc<KeyPair> {
        &self.key
    }

    pub fn extensions(&self) -> &ExtensionSet {
        &self.extensions
    }

    /// Mutable access to the extensions; mutators fail once finalized.
    pub fn extensions_mut(&mut self) -> &mut ExtensionSet {
        &mut self.extensions
    }

    pub fn serial_number(&self) -> &[u8] {
        &self.serial_number
    }

    pub fn validity(&self) -> &Validity {
        &self.validity
    }

    pub fn is_finalized(&self) -> bool {
        self.issued.is_some()
    }

    pub fn issued(&self) -> Option<&IssuedCertificate> {
        self.issued.as_ref()
    }

    /// The signature, once finalized.
    pub fn signature(&self) -> Option<&[u8]> {
        self.issued.as_ref().map(IssuedCertificate::signature)
    }

    /// The DER encoding, once finalized.
    pub fn to_der(&self) -> Result<&[u8]> {
        self.require_issued().map(IssuedCertificate::to_der)
    }

    /// The PEM encoding, once finalized.
    pub fn to_pem(&self) -> Result<String> {
        self.require_issued()?.to_pem()
    }

    /// Replaces the subject distinguished name.
    pub fn set_subject(&mut self, subject: DistinguishedName) -> Result<()> {
        self.ensure_mutable()?;
        self.subject = subject;
        Ok(())
    }

    /// Replaces the subject key, e.g. to share one key between certificates.
    pub fn set_key(&mut self, key: Arc<KeyPair>) -> Result<()> {
        self.ensure_mutable()?;
        self.key = key;
        Ok(())
    }

    pub fn set_validity(&mut self, validity: Validity) -> Result<()> {
        self.ensure_mutable()?;
        self.validity = validity;
        Ok(())
    }

    /// Assembles the to-be-signed structure for issuance by `issuer`.
    ///
    /// Extensions are encoded here, so grammar errors surface before anything
    /// is signed.
    pub(crate) fn to_be_signed(&self, issuer: &dyn Issuer) -> Result<TbsCertificate> {
        let subject_key = self.key.as_spki()?;
        let issuer_key = issuer.signing_key().as_spki()?;
        let ctx = EncodingContext {
            subject_key: &subject_key,
            issuer_key: &issuer_key,
        };

        let extensions = self
            .extensions
            .iter()
            .map(|(name, value)| grammar::encode_extension(name, value, &ctx))
            .collect::<Result<Vec<_>>>()?;

        Ok(TbsCertificate {
            serial_number: self.serial_number.clone(),
            signature_algorithm: SignatureAlgorithm::for_key(issuer.signing_key()),
            issuer: issuer.issuer_name()?,
            validity: self.validity.clone(),
            subject: self.subject.as_x509_name()?,
            subject_public_key_info: subject_key,
            extensions,
        })
    }

    pub(crate) fn mark_issued(&mut self, issued: IssuedCertificate) {
        self.extensions.freeze();
        self.issued = Some(issued);
    }

    fn require_issued(&self) -> Result<&IssuedCertificate> {
        self.issued
            .as_ref()
            .ok_or_else(|| ChainKitError::UnfinalizedCertificate(self.name().to_string()))
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.is_finalized() {
            return Err(ChainKitError::CertificateFinalized(self.name().to_string()));
        }
        Ok(())
    }
}

impl Issuer for Certificate {
    fn issuer_name(&self) -> Result<x509_cert::name::Name> {
        self.subject.as_x509_name()
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }
}

/// Derives a positive, minimally encoded 16-byte serial number from a
/// certificate label and the chain's serial counter.
pub(crate) fn derive_serial_number(label: &str, counter: u64) -> Vec<u8> {
    let digest = Sha256::digest(format!("{label}:{counter}").as_bytes());
    let mut serial = digest[..16].to_vec();
    serial[0] = (serial[0] & 0x7F) | 0x40;
    serial
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_numbers_are_positive_and_deterministic() {
        let first = derive_serial_number("Root", 0);
        assert_eq!(first.len(), 16);
        assert_eq!(first[0] & 0xC0, 0x40);
        assert_eq!(first, derive_serial_number("Root", 0));
        assert_ne!(first, derive_serial_number("Root", 1));
        assert_ne!(first, derive_serial_number("Intermediate", 0));
    }

    #[test]
    fn test_signature_algorithm_follows_issuer_key() {
        assert_eq!(
            SignatureAlgorithm::for_key(&KeyPair::generate_ecdsa_p384()),
            SignatureAlgorithm::Sha384WithECDSA
        );
        assert_eq!(
            SignatureAlgorithm::for_key(&KeyPair::generate_ed25519()),
            SignatureAlgorithm::Ed25519
        );
    }

    #[test]
    fn test_signature_algorithm_oid_round_trip() {
        for alg in [
            SignatureAlgorithm::Sha256WithRSA,
            SignatureAlgorithm::Sha256WithECDSA,
            SignatureAlgorithm::Sha384WithECDSA,
            SignatureAlgorithm::Sha512WithECDSA,
            SignatureAlgorithm::Ed25519,
        ] {
            assert_eq!(SignatureAlgorithm::from_oid(&alg.oid()).unwrap(), alg);
        }
    }

    #[test]
    fn test_rsa_algorithm_identifier_has_null_parameters() {
        let rsa: AlgorithmIdentifierOwned = SignatureAlgorithm::Sha256WithRSA.into();
        assert!(rsa.parameters.is_some());
        let ecdsa: AlgorithmIdentifierOwned = SignatureAlgorithm::Sha256WithECDSA.into();
        assert!(ecdsa.parameters.is_none());
    }
}
