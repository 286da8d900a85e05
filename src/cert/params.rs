use std::str::FromStr;

use bon::Builder;
use const_oid::db::rfc4519::CN;
use time::{Duration, OffsetDateTime};
use x509_cert::name::{Name, RdnSequence};

use crate::error::{ChainKitError, Result};

/// Distinguished name parameters for building an X.509 certificate.
///
/// This struct represents the subject or issuer name in a certificate. Only the
/// attributes that are set end up in the encoded name.
///
/// # Fields
/// * `common_name` - The common name (CN).
/// * `country` - The country (C).
/// * `state` - The state or province (ST).
/// * `locality` - The locality or city (L).
/// * `organization` - The organization (O).
/// * `organization_unit` - The organizational unit (OU).
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    #[builder(into)]
    pub common_name: String,
    #[builder(into)]
    pub country: Option<String>,
    #[builder(into)]
    pub state: Option<String>,
    #[builder(into)]
    pub locality: Option<String>,
    #[builder(into)]
    pub organization: Option<String>,
    #[builder(into)]
    pub organization_unit: Option<String>,
}

impl DistinguishedName {
    /// A name consisting of a single `CN` attribute.
    pub fn from_common_name(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            ..Default::default()
        }
    }

    /// Converts the distinguished name to an X.509-compatible format.
    ///
    /// # Returns
    /// An `x509_cert::name::Name` object.
    pub fn as_x509_name(&self) -> Result<Name> {
        let attributes = [
            ("CN", Some(&self.common_name)),
            ("OU", self.organization_unit.as_ref()),
            ("O", self.organization.as_ref()),
            ("L", self.locality.as_ref()),
            ("ST", self.state.as_ref()),
            ("C", self.country.as_ref()),
        ];

        let rfc4514_name = attributes
            .iter()
            .filter_map(|(key, value)| value.map(|v| format!("{key}={}", escape_attribute(v))))
            .collect::<Vec<_>>()
            .join(",");

        RdnSequence::from_str(&rfc4514_name)
            .map_err(|e| ChainKitError::InvalidInput(format!("{rfc4514_name}: {e}")))
    }

    /// Creates a `DistinguishedName` from an X.509-compatible format.
    ///
    /// Only the common name is recovered; the remaining attributes are left
    /// unset.
    pub fn from_x509_name(x509dn: &Name) -> Self {
        Self::from_common_name(common_name(x509dn).unwrap_or_default())
    }
}

/// Extracts the first common name attribute of `name`, if it is a string.
pub fn common_name(name: &Name) -> Option<String> {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .filter(|attr| attr.oid == CN)
        .find_map(|attr| attr.value.decode_as::<String>().ok())
}

/// Escapes the RFC 4514 special characters of an attribute value.
fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        let leading = i == 0 && (c == ' ' || c == '#');
        let trailing = i + 1 == value.chars().count() && c == ' ';
        if matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=') || leading || trailing {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// 2015-01-01 12:00:00 UTC
    pub const JANUARY_1_2015_UTC: i64 = 1_420_113_600;
    /// 2016-01-01 12:00:00 UTC
    pub const JANUARY_1_2016_UTC: i64 = 1_451_649_600;

    /// Creates a validity period starting now for the given number of days.
    ///
    /// # Arguments
    /// * `days` - The number of days for the validity period.
    pub fn for_days(days: i64) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            not_before: now,
            not_after: now + Duration::days(days),
        }
    }

    /// A validity period between two Unix timestamps.
    pub fn from_unix_range(not_before: i64, not_after: i64) -> Result<Self> {
        let convert = |ts: i64| {
            OffsetDateTime::from_unix_timestamp(ts)
                .map_err(|e| ChainKitError::InvalidInput(e.to_string()))
        };
        Ok(Self {
            not_before: convert(not_before)?,
            not_after: convert(not_after)?,
        })
    }

    /// The fixed window used for generated fixtures, so that regenerating a
    /// chain does not change its validity.
    pub fn fixture_default() -> Self {
        Self {
            not_before: OffsetDateTime::UNIX_EPOCH + Duration::seconds(Self::JANUARY_1_2015_UTC),
            not_after: OffsetDateTime::UNIX_EPOCH + Duration::seconds(Self::JANUARY_1_2016_UTC),
        }
    }
}

impl Default for Validity {
    fn default() -> Self {
        Self::fixture_default()
    }
}
