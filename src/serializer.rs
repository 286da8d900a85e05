//! The text artifact a chain is written to, and reading it back.
//!
//! An artifact consists of an optional `[Created by: ...]` line, the chain
//! description, and for each certificate a readable summary followed by its
//! `CERTIFICATE` PEM block:
//!
//! ```text
//! [Created by: generate-chains]
//!
//! Root has inhibitAnyPolicy=1.
//!
//! Certificate:
//!     Subject: CN=Target
//!     Issuer: CN=Intermediate
//!     ...
//!     X509v3 extensions:
//!         certificatePolicies: critical,1.2.3.5
//! -----BEGIN CERTIFICATE-----
//! ...
//! ```

use std::fmt;
use std::fs;
use std::path::Path;

use bon::Builder;
use time::OffsetDateTime;
use tracing::info;

use crate::cert::extensions::ExtensionValue;
use crate::cert::params::{self, Validity};
use crate::cert::{Certificate, IssuedCertificate, SignatureAlgorithm, grammar};
use crate::error::{ChainKitError, Result};
use crate::tbs_certificate::TbsCertificate;

const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Writes finalized certificates as a chain artifact.
#[derive(Debug, Clone, Default, Builder)]
pub struct ChainSerializer {
    /// Generator name for the `[Created by: ...]` header line.
    #[builder(into)]
    pub created_by: Option<String>,
}

impl ChainSerializer {
    /// Renders `certs`, in the given order, into the artifact text.
    ///
    /// Fails with [`ChainKitError::UnfinalizedCertificate`] if any
    /// certificate has not been signed.
    pub fn render_chain(&self, description: &str, certs: &[&Certificate]) -> Result<String> {
        let issued = certs
            .iter()
            .map(|cert| {
                cert.issued()
                    .ok_or_else(|| ChainKitError::UnfinalizedCertificate(cert.name().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut out = String::new();
        if let Some(created_by) = &self.created_by {
            out.push_str(&format!("[Created by: {created_by}]\n\n"));
        }
        out.push_str(description.trim());
        out.push_str("\n\n");

        for cert in issued {
            out.push_str(&DecodedCertificate::from_issued(cert)?.to_string());
            out.push_str(&cert.to_pem()?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Renders `certs` and writes them to `path`.
    ///
    /// Nothing is written when a certificate is unfinalized. An existing file
    /// is replaced; a failed write may leave it truncated.
    pub fn write_chain(
        &self,
        description: &str,
        certs: &[&Certificate],
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let path = path.as_ref();
        let text = self.render_chain(description, certs)?;
        fs::write(path, text).map_err(|e| ChainKitError::io(path, e))?;
        info!(path = %path.display(), certificates = certs.len(), "wrote chain");
        Ok(())
    }
}

/// Writes `certs` to `path` without a `[Created by: ...]` line.
pub fn write_chain(description: &str, certs: &[&Certificate], path: impl AsRef<Path>) -> Result<()> {
    ChainSerializer::default().write_chain(description, certs, path)
}

/// Decodes every `CERTIFICATE` block of an artifact, in file order.
///
/// Text outside the PEM blocks is ignored.
pub fn parse_chain(text: &str) -> Result<Vec<DecodedCertificate>> {
    pem::parse_many(text)?
        .iter()
        .filter(|block| block.tag() == CERTIFICATE_TAG)
        .map(|block| DecodedCertificate::from_der(block.contents()))
        .collect()
}

/// Reads and decodes the artifact at `path`.
pub fn read_chain(path: impl AsRef<Path>) -> Result<Vec<DecodedCertificate>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| ChainKitError::io(path, e))?;
    parse_chain(&text)
}

/// A certificate read back from DER, with its extensions rendered in the
/// extension grammar.
#[derive(Debug, Clone)]
pub struct DecodedCertificate {
    /// RFC 4514 form of the subject name.
    pub subject: String,
    /// RFC 4514 form of the issuer name.
    pub issuer: String,
    pub common_name: Option<String>,
    pub serial_number: Vec<u8>,
    pub validity: Validity,
    pub signature_algorithm: SignatureAlgorithm,
    pub extensions: Vec<(String, ExtensionValue)>,
    pub signature: Vec<u8>,
    pub der: Vec<u8>,
}

impl DecodedCertificate {
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Self::from_issued(&IssuedCertificate::from_der(der)?)
    }

    pub fn from_issued(cert: &IssuedCertificate) -> Result<Self> {
        let inner = cert.inner();
        let tbs = TbsCertificate::from_tbs_certificate_inner(inner.tbs_certificate.clone())?;

        Ok(Self {
            subject: tbs.subject.to_string(),
            issuer: tbs.issuer.to_string(),
            common_name: params::common_name(&tbs.subject),
            serial_number: tbs.serial_number,
            validity: tbs.validity,
            signature_algorithm: SignatureAlgorithm::from_oid(&inner.signature_algorithm.oid)?,
            extensions: tbs.extensions.iter().map(grammar::render_extension).collect(),
            signature: cert.signature().to_vec(),
            der: cert.to_der().to_vec(),
        })
    }

    /// The first value of extension `name`.
    pub fn extension(&self, name: &str) -> Option<&ExtensionValue> {
        self.extensions
            .iter()
            .find_map(|(n, v)| (n == name).then_some(v))
    }
}

fn format_time(t: &OffsetDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
        t.year(),
        u8::from(t.month()),
        t.day(),
        t.hour(),
        t.minute(),
        t.second()
    )
}

impl fmt::Display for DecodedCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Certificate:")?;
        writeln!(f, "    Subject: {}", self.subject)?;
        writeln!(f, "    Issuer: {}", self.issuer)?;
        writeln!(
            f,
            "    Serial Number: {}",
            grammar::colon_hex(&self.serial_number)
        )?;
        writeln!(f, "    Validity:")?;
        writeln!(f, "        Not Before: {}", format_time(&self.validity.not_before))?;
        writeln!(f, "        Not After : {}", format_time(&self.validity.not_after))?;
        writeln!(
            f,
            "    Signature Algorithm: {}",
            self.signature_algorithm.name()
        )?;
        if !self.extensions.is_empty() {
            writeln!(f, "    X509v3 extensions:")?;
            for (name, value) in &self.extensions {
                writeln!(f, "        {name}: {value}")?;
            }
        }
        Ok(())
    }
}
