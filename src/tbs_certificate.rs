use der::Encode;
use der::asn1::{GeneralizedTime, UtcTime};
use time::OffsetDateTime;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::Time;

use crate::cert::SignatureAlgorithm;
use crate::cert::params::Validity;
use crate::error::{ChainKitError, Result};

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
///
/// Names, key and extensions are already in their X.509 form; only the
/// serial number and validity are converted when encoding.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `signature_algorithm` - The algorithm used to sign the certificate.
/// * `issuer` - The distinguished name of the certificate issuer.
/// * `validity` - The certificate's validity period.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key_info` - The public key of the certificate subject.
/// * `extensions` - X.509 extensions, in encoding order.
#[derive(Debug, Clone)]
pub struct TbsCertificate {
    pub serial_number: Vec<u8>,
    pub signature_algorithm: SignatureAlgorithm,
    pub issuer: Name,
    pub validity: Validity,
    pub subject: Name,
    pub subject_public_key_info: SubjectPublicKeyInfoOwned,
    pub extensions: Vec<Extension>,
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    ///
    /// An empty extension list omits the `extensions` field entirely.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.validity.not_before)?,
            not_after: to_x509_time(self.validity.not_after)?,
        };

        let serial_number = SerialNumber::new(self.serial_number.as_slice())
            .map_err(|e| ChainKitError::InvalidInput(format!("serial number: {e}")))?;

        let extensions = if self.extensions.is_empty() {
            None
        } else {
            Some(self.extensions.clone())
        };

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number,
            signature: self.signature_algorithm.into(),
            issuer: self.issuer.clone(),
            validity,
            subject: self.subject.clone(),
            subject_public_key_info: self.subject_public_key_info.clone(),
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions,
        })
    }

    /// Creates a `TbsCertificate` from a `TbsCertificateInner`.
    pub fn from_tbs_certificate_inner(inner: TbsCertificateInner) -> Result<Self> {
        let signature_algorithm = SignatureAlgorithm::from_oid(&inner.signature.oid)?;
        Ok(Self {
            serial_number: inner.serial_number.as_bytes().to_vec(),
            signature_algorithm,
            issuer: inner.issuer,
            validity: Validity {
                not_before: from_x509_time(&inner.validity.not_before),
                not_after: from_x509_time(&inner.validity.not_after),
            },
            subject: inner.subject,
            subject_public_key_info: inner.subject_public_key_info,
            extensions: inner.extensions.unwrap_or_default(),
        })
    }

    /// Encodes the `TbsCertificate` into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.to_tbs_certificate_inner()?.to_der()?)
    }
}

/// `UTCTime` through 2049, `GeneralizedTime` from 2050 on (RFC 5280 4.1.2.5).
pub fn to_x509_time(timestamp: OffsetDateTime) -> Result<Time> {
    let time = if timestamp.year() < 2050 {
        Time::UtcTime(UtcTime::from_system_time(timestamp.into())?)
    } else {
        Time::GeneralTime(GeneralizedTime::from_system_time(timestamp.into())?)
    };
    Ok(time)
}

pub fn from_x509_time(time: &Time) -> OffsetDateTime {
    match time {
        Time::UtcTime(ut) => OffsetDateTime::from(ut.to_system_time()),
        Time::GeneralTime(gt) => OffsetDateTime::from(gt.to_system_time()),
    }
}
