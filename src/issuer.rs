use der::Encode;
use der::asn1::BitString;
use tracing::debug;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::cert::IssuedCertificate;
use crate::error::Result;
use crate::key::KeyPair;
use crate::tbs_certificate::TbsCertificate;

/// Represents an entity capable of issuing certificates.
///
/// This trait provides the issuer's name and signing key; [`issue`](Self::issue)
/// signs a prepared to-be-signed structure with that key.
pub trait Issuer {
    /// Returns the distinguished name placed in the issued certificate's
    /// `issuer` field.
    fn issuer_name(&self) -> Result<Name>;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Signs `tbs_cert` and assembles the certificate.
    ///
    /// The outer `signatureAlgorithm` always mirrors the TBS `signature`
    /// field.
    fn issue(&self, tbs_cert: TbsCertificate) -> Result<IssuedCertificate> {
        let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
        let tbs_der = tbs_cert_inner.to_der()?;
        debug!(
            algorithm = tbs_cert.signature_algorithm.name(),
            subject = %tbs_cert.subject,
            "signing certificate"
        );
        let signature = self.signing_key().sign_data(&tbs_der)?;

        let cert_inner = CertificateInner {
            tbs_certificate: tbs_cert_inner,
            signature_algorithm: tbs_cert.signature_algorithm.into(),
            signature: BitString::from_bytes(&signature)?,
        };
        IssuedCertificate::from_inner(cert_inner)
    }
}
