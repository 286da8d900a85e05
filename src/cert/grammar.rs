//! The textual extension grammar and its DER encoding.
//!
//! Extension payloads follow a subset of the OpenSSL `x509v3_config` syntax,
//! e.g. `CA:TRUE,pathlen:0`, `requireExplicitPolicy:0` or `anyPolicy,1.2.3.5`.
//! Each supported extension implements [`ExtensionGrammar`], which encodes a
//! payload into the DER `extnValue` and renders a DER value back into the
//! payload syntax.
//!
//! Any extension (known name or dotted OID) also accepts `DER:<hex>`, which is
//! emitted verbatim without validation.

use std::net::IpAddr;
use std::str::FromStr;
use std::sync::LazyLock;

use const_oid::{AssociatedOid, ObjectIdentifier};
use der::asn1::{Ia5String, OctetString};
use der::flagset::FlagSet;
use der::{Decode, Encode};
use regex::Regex;
use sha1::{Digest, Sha1};
use x509_cert::ext::Extension;
use x509_cert::ext::pkix::certpolicy::PolicyInformation;
use x509_cert::ext::pkix::crl::dp::DistributionPoint;
use x509_cert::ext::pkix::name::{DistributionPointName, GeneralName};
use x509_cert::ext::pkix::{
    AccessDescription, AuthorityInfoAccessSyntax, AuthorityKeyIdentifier, BasicConstraints,
    CertificatePolicies, CrlDistributionPoints, ExtendedKeyUsage, InhibitAnyPolicy, KeyUsage,
    KeyUsages, NameConstraints, PolicyConstraints, PolicyMapping, PolicyMappings,
    SubjectAltName, SubjectKeyIdentifier,
};
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use super::extensions::ExtensionValue;
use crate::error::{ChainKitError, Result};

/// `anyPolicy` (2.5.29.32.0)
pub const ANY_POLICY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.32.0");
const ANY_EXTENDED_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.37.0");
const ID_AD_OCSP: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.1");
const ID_AD_CA_ISSUERS: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.2");

static DOTTED_OID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-2](\.[0-9]+)+$").expect("valid OID pattern"));

/// Key material an extension may be derived from.
pub struct EncodingContext<'a> {
    pub subject_key: &'a SubjectPublicKeyInfoOwned,
    pub issuer_key: &'a SubjectPublicKeyInfoOwned,
}

/// Converts between an extension's textual payload and its DER `extnValue`.
pub trait ExtensionGrammar {
    /// The configuration name of the extension, e.g. `policyConstraints`.
    const NAME: &'static str;

    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes `payload` into the DER-encoded extension value.
    fn encode_value(payload: &str, ctx: &EncodingContext<'_>) -> Result<Vec<u8>>;

    /// Renders a DER-encoded extension value back into the payload syntax.
    fn render_value(der: &[u8]) -> Result<String>;
}

struct GrammarEntry {
    name: &'static str,
    oid: ObjectIdentifier,
    encode: fn(&str, &EncodingContext<'_>) -> Result<Vec<u8>>,
    render: fn(&[u8]) -> Result<String>,
}

impl GrammarEntry {
    const fn of<G: ExtensionGrammar>() -> Self {
        Self {
            name: G::NAME,
            oid: G::OID,
            encode: G::encode_value,
            render: G::render_value,
        }
    }
}

static GRAMMARS: &[GrammarEntry] = &[
    GrammarEntry::of::<BasicConstraintsGrammar>(),
    GrammarEntry::of::<KeyUsageGrammar>(),
    GrammarEntry::of::<ExtendedKeyUsageGrammar>(),
    GrammarEntry::of::<SubjectKeyIdentifierGrammar>(),
    GrammarEntry::of::<AuthorityKeyIdentifierGrammar>(),
    GrammarEntry::of::<CertificatePoliciesGrammar>(),
    GrammarEntry::of::<PolicyConstraintsGrammar>(),
    GrammarEntry::of::<InhibitAnyPolicyGrammar>(),
    GrammarEntry::of::<PolicyMappingsGrammar>(),
    GrammarEntry::of::<SubjectAltNameGrammar>(),
    GrammarEntry::of::<AuthorityInfoAccessGrammar>(),
    GrammarEntry::of::<CrlDistributionPointsGrammar>(),
];

fn grammar_by_name(name: &str) -> Option<&'static GrammarEntry> {
    GRAMMARS.iter().find(|g| g.name == name)
}

fn grammar_by_oid(oid: &ObjectIdentifier) -> Option<&'static GrammarEntry> {
    GRAMMARS.iter().find(|g| g.oid == *oid)
}

/// Resolves an extension name (or dotted OID) to its OID.
pub fn extension_oid(name: &str) -> Result<ObjectIdentifier> {
    if let Some(grammar) = grammar_by_name(name) {
        return Ok(grammar.oid);
    }
    match name {
        "nameConstraints" => Ok(NameConstraints::OID),
        _ if DOTTED_OID.is_match(name) => ObjectIdentifier::new(name)
            .map_err(|e| ChainKitError::extension(name, e.to_string())),
        _ => Err(ChainKitError::extension(name, "unknown extension name")),
    }
}

/// The configuration name of an extension OID, or its dotted form.
pub fn extension_name(oid: &ObjectIdentifier) -> String {
    match grammar_by_oid(oid) {
        Some(grammar) => grammar.name.to_string(),
        None if *oid == NameConstraints::OID => "nameConstraints".to_string(),
        None => oid.to_string(),
    }
}

/// Encodes one `(name, value)` entry of an extension set.
pub fn encode_extension(
    name: &str,
    value: &ExtensionValue,
    ctx: &EncodingContext<'_>,
) -> Result<Extension> {
    let (oid, der) = match value.raw.trim_start().strip_prefix("DER:") {
        Some(hex_payload) => (extension_oid(name)?, decode_hex(name, hex_payload)?),
        None => {
            let grammar = grammar_by_name(name).ok_or_else(|| {
                ChainKitError::extension(name, "no grammar for this extension; use DER:<hex>")
            })?;
            (grammar.oid, (grammar.encode)(value.raw.trim(), ctx)?)
        }
    };

    Ok(Extension {
        extn_id: oid,
        critical: value.critical,
        extn_value: OctetString::new(der)?,
    })
}

/// Renders a decoded extension back into a `(name, value)` entry.
///
/// Values that do not parse as their extension type are rendered as
/// `DER:<hex>`, so malformed fixtures survive a round trip.
///
/// Payloads that are computed at encoding time do not come back as written:
/// `subjectKeyIdentifier=hash` renders as the colon-hex identifier and
/// `authorityKeyIdentifier=keyid` / `keyid:always` as `keyid:<hex>`.
/// Whitespace inside payloads is not preserved either.
pub fn render_extension(extension: &Extension) -> (String, ExtensionValue) {
    let der = extension.extn_value.as_bytes();
    let raw = grammar_by_oid(&extension.extn_id)
        .and_then(|grammar| (grammar.render)(der).ok())
        .unwrap_or_else(|| format!("DER:{}", colon_hex(der)));
    (
        extension_name(&extension.extn_id),
        ExtensionValue::new(extension.critical, raw),
    )
}

/// Uppercase hex with `:` between bytes.
pub fn colon_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}

fn decode_hex(name: &str, payload: &str) -> Result<Vec<u8>> {
    let digits: String = payload
        .chars()
        .filter(|c| *c != ':' && !c.is_whitespace())
        .collect();
    hex::decode(digits).map_err(|e| ChainKitError::extension(name, e.to_string()))
}

fn items(payload: &str) -> impl Iterator<Item = &str> {
    payload.split(',').map(str::trim).filter(|item| !item.is_empty())
}

fn der_error(name: &str) -> impl Fn(der::Error) -> ChainKitError + '_ {
    move |e| ChainKitError::extension(name, e.to_string())
}

fn parse_u32(name: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| ChainKitError::extension(name, format!("\"{value}\" is not an integer")))
}

fn parse_policy(name: &str, value: &str) -> Result<ObjectIdentifier> {
    match value {
        "anyPolicy" => Ok(ANY_POLICY),
        _ => ObjectIdentifier::new(value)
            .map_err(|e| ChainKitError::extension(name, format!("\"{value}\": {e}"))),
    }
}

fn render_policy(oid: &ObjectIdentifier) -> String {
    if *oid == ANY_POLICY {
        "anyPolicy".to_string()
    } else {
        oid.to_string()
    }
}

fn ia5(name: &str, value: &str) -> Result<Ia5String> {
    Ia5String::new(value).map_err(der_error(name))
}

/// Parses `DNS:`, `URI:`, `email:` and `IP:` entries.
fn parse_general_name(name: &str, value: &str) -> Result<GeneralName> {
    let (kind, rest) = value
        .split_once(':')
        .ok_or_else(|| ChainKitError::extension(name, format!("\"{value}\" has no type prefix")))?;
    match kind {
        "DNS" => Ok(GeneralName::DnsName(ia5(name, rest)?)),
        "URI" => Ok(GeneralName::UniformResourceIdentifier(ia5(name, rest)?)),
        "email" => Ok(GeneralName::Rfc822Name(ia5(name, rest)?)),
        "IP" => {
            let address = IpAddr::from_str(rest)
                .map_err(|e| ChainKitError::extension(name, format!("\"{rest}\": {e}")))?;
            let octets = match address {
                IpAddr::V4(v4) => v4.octets().to_vec(),
                IpAddr::V6(v6) => v6.octets().to_vec(),
            };
            Ok(GeneralName::IpAddress(OctetString::new(octets).map_err(der_error(name))?))
        }
        _ => Err(ChainKitError::extension(
            name,
            format!("unsupported general name type \"{kind}\""),
        )),
    }
}

fn render_general_name(general_name: &GeneralName) -> Result<String> {
    match general_name {
        GeneralName::DnsName(dns) => Ok(format!("DNS:{dns}")),
        GeneralName::UniformResourceIdentifier(uri) => Ok(format!("URI:{uri}")),
        GeneralName::Rfc822Name(email) => Ok(format!("email:{email}")),
        GeneralName::IpAddress(octets) => {
            let bytes = octets.as_bytes();
            let address = match bytes.len() {
                4 => IpAddr::from(<[u8; 4]>::try_from(bytes).unwrap_or_default()),
                16 => IpAddr::from(<[u8; 16]>::try_from(bytes).unwrap_or_default()),
                _ => {
                    return Err(ChainKitError::DecodingError(
                        "IP address of unexpected length".to_string(),
                    ));
                }
            };
            Ok(format!("IP:{address}"))
        }
        _ => Err(ChainKitError::DecodingError(
            "Unsupported general name type".to_string(),
        )),
    }
}

fn key_identifier(spki: &SubjectPublicKeyInfoOwned) -> Vec<u8> {
    Sha1::digest(spki.subject_public_key.raw_bytes()).to_vec()
}

/// `CA:TRUE|FALSE[,pathlen:N]`
pub struct BasicConstraintsGrammar;

impl ExtensionGrammar for BasicConstraintsGrammar {
    const NAME: &'static str = "basicConstraints";
    const OID: ObjectIdentifier = BasicConstraints::OID;

    fn encode_value(payload: &str, _ctx: &EncodingContext<'_>) -> Result<Vec<u8>> {
        let mut bc = BasicConstraints {
            ca: false,
            path_len_constraint: None,
        };
        for item in items(payload) {
            let (key, value) = item.split_once(':').unwrap_or((item, ""));
            match key.to_ascii_lowercase().as_str() {
                "ca" => {
                    bc.ca = match value.to_ascii_lowercase().as_str() {
                        "true" => true,
                        "false" => false,
                        _ => {
                            return Err(ChainKitError::extension(
                                Self::NAME,
                                format!("CA must be TRUE or FALSE, got \"{value}\""),
                            ));
                        }
                    }
                }
                "pathlen" => {
                    let len = parse_u32(Self::NAME, value)?;
                    bc.path_len_constraint = Some(u8::try_from(len).map_err(|_| {
                        ChainKitError::extension(Self::NAME, "pathlen exceeds 255")
                    })?);
                }
                _ => {
                    return Err(ChainKitError::extension(
                        Self::NAME,
                        format!("unknown field \"{item}\""),
                    ));
                }
            }
        }
        bc.to_der().map_err(der_error(Self::NAME))
    }

    fn render_value(der: &[u8]) -> Result<String> {
        let bc = BasicConstraints::from_der(der)?;
        let mut rendered = if bc.ca { "CA:TRUE" } else { "CA:FALSE" }.to_string();
        if let Some(len) = bc.path_len_constraint {
            rendered.push_str(&format!(",pathlen:{len}"));
        }
        Ok(rendered)
    }
}

const KEY_USAGE_NAMES: [(&str, KeyUsages); 9] = [
    ("digitalSignature", KeyUsages::DigitalSignature),
    ("nonRepudiation", KeyUsages::NonRepudiation),
    ("keyEncipherment", KeyUsages::KeyEncipherment),
    ("dataEncipherment", KeyUsages::DataEncipherment),
    ("keyAgreement", KeyUsages::KeyAgreement),
    ("keyCertSign", KeyUsages::KeyCertSign),
    ("cRLSign", KeyUsages::CRLSign),
    ("encipherOnly", KeyUsages::EncipherOnly),
    ("decipherOnly", KeyUsages::DecipherOnly),
];

/// Comma list of key usage bit names.
pub struct KeyUsageGrammar;

impl ExtensionGrammar for KeyUsageGrammar {
    const NAME: &'static str = "keyUsage";
    const OID: ObjectIdentifier = <KeyUsage as AssociatedOid>::OID;

    fn encode_value(payload: &str, _ctx: &EncodingContext<'_>) -> Result<Vec<u8>> {
        let mut flags: FlagSet<KeyUsages> = FlagSet::default();
        for item in items(payload) {
            let (_, usage) = KEY_USAGE_NAMES
                .iter()
                .find(|(name, _)| *name == item)
                .ok_or_else(|| {
                    ChainKitError::extension(Self::NAME, format!("unknown key usage \"{item}\""))
                })?;
            flags |= *usage;
        }
        KeyUsage(flags).to_der().map_err(der_error(Self::NAME))
    }

    fn render_value(der: &[u8]) -> Result<String> {
        let ku = KeyUsage::from_der(der)?;
        Ok(KEY_USAGE_NAMES
            .iter()
            .filter(|(_, usage)| ku.0.contains(*usage))
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(","))
    }
}

const EXTENDED_KEY_USAGE_NAMES: [(&str, ObjectIdentifier); 7] = [
    ("serverAuth", const_oid::db::rfc5912::ID_KP_SERVER_AUTH),
    ("clientAuth", const_oid::db::rfc5912::ID_KP_CLIENT_AUTH),
    ("codeSigning", const_oid::db::rfc5912::ID_KP_CODE_SIGNING),
    ("emailProtection", const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION),
    ("timeStamping", const_oid::db::rfc5912::ID_KP_TIME_STAMPING),
    ("OCSPSigning", const_oid::db::rfc5912::ID_KP_OCSP_SIGNING),
    ("anyExtendedKeyUsage", ANY_EXTENDED_KEY_USAGE),
];

/// Comma list of purpose names or dotted OIDs.
pub struct ExtendedKeyUsageGrammar;

impl ExtensionGrammar for ExtendedKeyUsageGrammar {
    const NAME: &'static str = "extendedKeyUsage";
    const OID: ObjectIdentifier = ExtendedKeyUsage::OID;

    fn encode_value(payload: &str, _ctx: &EncodingContext<'_>) -> Result<Vec<u8>> {
        let oids = items(payload)
            .map(|item| {
                match EXTENDED_KEY_USAGE_NAMES.iter().find(|(name, _)| *name == item) {
                    Some((_, oid)) => Ok(*oid),
                    None => ObjectIdentifier::new(item).map_err(|e| {
                        ChainKitError::extension(Self::NAME, format!("\"{item}\": {e}"))
                    }),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        ExtendedKeyUsage(oids).to_der().map_err(der_error(Self::NAME))
    }

    fn render_value(der: &[u8]) -> Result<String> {
        let eku = ExtendedKeyUsage::from_der(der)?;
        Ok(eku
            .0
            .iter()
            .map(|oid| {
                EXTENDED_KEY_USAGE_NAMES
                    .iter()
                    .find(|(_, known)| known == oid)
                    .map(|(name, _)| name.to_string())
                    .unwrap_or_else(|| oid.to_string())
            })
            .collect::<Vec<_>>()
            .join(","))
    }
}

/// `hash` (SHA-1 of the subject public key) or explicit hex.
pub struct SubjectKeyIdentifierGrammar;

impl ExtensionGrammar for SubjectKeyIdentifierGrammar {
    const NAME: &'static str = "subjectKeyIdentifier";
    const OID: ObjectIdentifier = SubjectKeyIdentifier::OID;

    fn encode_value(payload: &str, ctx: &EncodingContext<'_>) -> Result<Vec<u8>> {
        let id = match payload {
            "hash" => key_identifier(ctx.subject_key),
            _ => decode_hex(Self::NAME, payload)?,
        };
        let ski = SubjectKeyIdentifier(OctetString::new(id).map_err(der_error(Self::NAME))?);
        ski.to_der().map_err(der_error(Self::NAME))
    }

    fn render_value(der: &[u8]) -> Result<String> {
        let ski = SubjectKeyIdentifier::from_der(der)?;
        Ok(colon_hex(ski.0.as_bytes()))
    }
}

/// `keyid`, `keyid:always` (SHA-1 of the issuer public key) or `keyid:<hex>`.
pub struct AuthorityKeyIdentifierGrammar;

impl ExtensionGrammar for AuthorityKeyIdentifierGrammar {
    const NAME: &'static str = "authorityKeyIdentifier";
    const OID: ObjectIdentifier = AuthorityKeyIdentifier::OID;

    fn encode_value(payload: &str, ctx: &EncodingContext<'_>) -> Result<Vec<u8>> {
        let mut key_identifier_bytes = None;
        for item in items(payload) {
            key_identifier_bytes = Some(match item {
                "keyid" | "keyid:always" => key_identifier(ctx.issuer_key),
                _ => match item.strip_prefix("keyid:") {
                    Some(hex_id) => decode_hex(Self::NAME, hex_id)?,
                    None => {
                        return Err(ChainKitError::extension(
                            Self::NAME,
                            format!("unsupported option \"{item}\""),
                        ));
                    }
                },
            });
        }

        let aki = AuthorityKeyIdentifier {
            key_identifier: key_identifier_bytes
                .map(OctetString::new)
                .transpose()
                .map_err(der_error(Self::NAME))?,
            authority_cert_issuer: None,
            authority_cert_serial_number: None,
        };
        aki.to_der().map_err(der_error(Self::NAME))
    }

    fn render_value(der: &[u8]) -> Result<String> {
        let aki = AuthorityKeyIdentifier::from_der(der)?;
        if aki.authority_cert_issuer.is_some() || aki.authority_cert_serial_number.is_some() {
            return Err(ChainKitError::DecodingError(
                "authority issuer and serial are not representable".to_string(),
            ));
        }
        Ok(aki
            .key_identifier
            .map(|id| format!("keyid:{}", colon_hex(id.as_bytes())))
            .unwrap_or_default())
    }
}

/// Comma list of `anyPolicy` or dotted policy OIDs.
pub struct CertificatePoliciesGrammar;

impl ExtensionGrammar for CertificatePoliciesGrammar {
    const NAME: &'static str = "certificatePolicies";
    const OID: ObjectIdentifier = CertificatePolicies::OID;

    fn encode_value(payload: &str, _ctx: &EncodingContext<'_>) -> Result<Vec<u8>> {
        let policies = items(payload)
            .map(|item| {
                Ok(PolicyInformation {
                    policy_identifier: parse_policy(Self::NAME, item)?,
                    policy_qualifiers: None,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        CertificatePolicies(policies)
            .to_der()
            .map_err(der_error(Self::NAME))
    }

    fn render_value(der: &[u8]) -> Result<String> {
        let policies = CertificatePolicies::from_der(der)?;
        if policies.0.iter().any(|p| p.policy_qualifiers.is_some()) {
            return Err(ChainKitError::DecodingError(
                "policy qualifiers are not representable".to_string(),
            ));
        }
        Ok(policies
            .0
            .iter()
            .map(|p| render_policy(&p.policy_identifier))
            .collect::<Vec<_>>()
            .join(","))
    }
}

/// `requireExplicitPolicy:N`, `inhibitPolicyMapping:N`
pub struct PolicyConstraintsGrammar;

impl ExtensionGrammar for PolicyConstraintsGrammar {
    const NAME: &'static str = "policyConstraints";
    const OID: ObjectIdentifier = PolicyConstraints::OID;

    fn encode_value(payload: &str, _ctx: &EncodingContext<'_>) -> Result<Vec<u8>> {
        let mut constraints = PolicyConstraints {
            require_explicit_policy: None,
            inhibit_policy_mapping: None,
        };
        for item in items(payload) {
            match item.split_once(':') {
                Some(("requireExplicitPolicy", n)) => {
                    constraints.require_explicit_policy = Some(parse_u32(Self::NAME, n)?)
                }
                Some(("inhibitPolicyMapping", n)) => {
                    constraints.inhibit_policy_mapping = Some(parse_u32(Self::NAME, n)?)
                }
                _ => {
                    return Err(ChainKitError::extension(
                        Self::NAME,
                        format!("unknown field \"{item}\""),
                    ));
                }
            }
        }
        constraints.to_der().map_err(der_error(Self::NAME))
    }

    fn render_value(der: &[u8]) -> Result<String> {
        let constraints = PolicyConstraints::from_der(der)?;
        let mut fields = Vec::new();
        if let Some(n) = constraints.require_explicit_policy {
            fields.push(format!("requireExplicitPolicy:{n}"));
        }
        if let Some(n) = constraints.inhibit_policy_mapping {
            fields.push(format!("inhibitPolicyMapping:{n}"));
        }
        Ok(fields.join(","))
    }
}

/// A single skip count.
pub struct InhibitAnyPolicyGrammar;

impl ExtensionGrammar for InhibitAnyPolicyGrammar {
    const NAME: &'static str = "inhibitAnyPolicy";
    const OID: ObjectIdentifier = InhibitAnyPolicy::OID;

    fn encode_value(payload: &str, _ctx: &EncodingContext<'_>) -> Result<Vec<u8>> {
        InhibitAnyPolicy(parse_u32(Self::NAME, payload)?)
            .to_der()
            .map_err(der_error(Self::NAME))
    }

    fn render_value(der: &[u8]) -> Result<String> {
        Ok(InhibitAnyPolicy::from_der(der)?.0.to_string())
    }
}

/// Comma list of `<issuerDomainPolicy>:<subjectDomainPolicy>`.
///
/// `anyPolicy` is accepted on either side even though RFC 5280 forbids it,
/// so validators can be tested against such mappings.
pub struct PolicyMappingsGrammar;

impl ExtensionGrammar for PolicyMappingsGrammar {
    const NAME: &'static str = "policyMappings";
    const OID: ObjectIdentifier = PolicyMappings::OID;

    fn encode_value(payload: &str, _ctx: &EncodingContext<'_>) -> Result<Vec<u8>> {
        let mappings = items(payload)
            .map(|item| {
                let (issuer, subject) = item.split_once(':').ok_or_else(|| {
                    ChainKitError::extension(Self::NAME, format!("\"{item}\" is not a mapping"))
                })?;
                Ok(PolicyMapping {
                    issuer_domain_policy: parse_policy(Self::NAME, issuer.trim())?,
                    subject_domain_policy: parse_policy(Self::NAME, subject.trim())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        PolicyMappings(mappings)
            .to_der()
            .map_err(der_error(Self::NAME))
    }

    fn render_value(der: &[u8]) -> Result<String> {
        let mappings = PolicyMappings::from_der(der)?;
        Ok(mappings
            .0
            .iter()
            .map(|m| {
                format!(
                    "{}:{}",
                    render_policy(&m.issuer_domain_policy),
                    render_policy(&m.subject_domain_policy)
                )
            })
            .collect::<Vec<_>>()
            .join(","))
    }
}

/// Comma list of `DNS:`, `URI:`, `email:` and `IP:` names.
pub struct SubjectAltNameGrammar;

impl ExtensionGrammar for SubjectAltNameGrammar {
    const NAME: &'static str = "subjectAltName";
    const OID: ObjectIdentifier = SubjectAltName::OID;

    fn encode_value(payload: &str, _ctx: &EncodingContext<'_>) -> Result<Vec<u8>> {
        let names = items(payload)
            .map(|item| parse_general_name(Self::NAME, item))
            .collect::<Result<Vec<_>>>()?;
        SubjectAltName(names)
            .to_der()
            .map_err(der_error(Self::NAME))
    }

    fn render_value(der: &[u8]) -> Result<String> {
        let san = SubjectAltName::from_der(der)?;
        Ok(san
            .0
            .iter()
            .map(render_general_name)
            .collect::<Result<Vec<_>>>()?
            .join(","))
    }
}

/// Comma list of `caIssuers;URI:<uri>` and `OCSP;URI:<uri>`.
pub struct AuthorityInfoAccessGrammar;

impl ExtensionGrammar for AuthorityInfoAccessGrammar {
    const NAME: &'static str = "authorityInfoAccess";
    const OID: ObjectIdentifier = AuthorityInfoAccessSyntax::OID;

    fn encode_value(payload: &str, _ctx: &EncodingContext<'_>) -> Result<Vec<u8>> {
        let descriptions = items(payload)
            .map(|item| {
                let (method, location) = item.split_once(';').ok_or_else(|| {
                    ChainKitError::extension(Self::NAME, format!("\"{item}\" has no access method"))
                })?;
                let access_method = match method {
                    "caIssuers" => ID_AD_CA_ISSUERS,
                    "OCSP" => ID_AD_OCSP,
                    _ => {
                        return Err(ChainKitError::extension(
                            Self::NAME,
                            format!("unknown access method \"{method}\""),
                        ));
                    }
                };
                Ok(AccessDescription {
                    access_method,
                    access_location: parse_general_name(Self::NAME, location)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        AuthorityInfoAccessSyntax(descriptions)
            .to_der()
            .map_err(der_error(Self::NAME))
    }

    fn render_value(der: &[u8]) -> Result<String> {
        let aia = AuthorityInfoAccessSyntax::from_der(der)?;
        aia.0
            .iter()
            .map(|description| {
                let method = if description.access_method == ID_AD_CA_ISSUERS {
                    "caIssuers"
                } else if description.access_method == ID_AD_OCSP {
                    "OCSP"
                } else {
                    return Err(ChainKitError::DecodingError(
                        "Unsupported access method".to_string(),
                    ));
                };
                Ok(format!(
                    "{method};{}",
                    render_general_name(&description.access_location)?
                ))
            })
            .collect::<Result<Vec<_>>>()
            .map(|rendered| rendered.join(","))
    }
}

/// Comma list of `URI:<uri>`, encoded as one distribution point.
pub struct CrlDistributionPointsGrammar;

impl ExtensionGrammar for CrlDistributionPointsGrammar {
    const NAME: &'static str = "crlDistributionPoints";
    const OID: ObjectIdentifier = CrlDistributionPoints::OID;

    fn encode_value(payload: &str, _ctx: &EncodingContext<'_>) -> Result<Vec<u8>> {
        let names = items(payload)
            .map(|item| parse_general_name(Self::NAME, item))
            .collect::<Result<Vec<_>>>()?;
        let point = DistributionPoint {
            distribution_point: Some(DistributionPointName::FullName(names)),
            reasons: None,
            crl_issuer: None,
        };
        CrlDistributionPoints(vec![point])
            .to_der()
            .map_err(der_error(Self::NAME))
    }

    fn render_value(der: &[u8]) -> Result<String> {
        let points = CrlDistributionPoints::from_der(der)?;
        let mut rendered = Vec::new();
        for point in &points.0 {
            match &point.distribution_point {
                Some(DistributionPointName::FullName(names)) => {
                    for name in names {
                        rendered.push(render_general_name(name)?);
                    }
                }
                _ => {
                    return Err(ChainKitError::DecodingError(
                        "Unsupported distribution point".to_string(),
                    ));
                }
            }
        }
        Ok(rendered.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyPair;

    fn with_context<T>(f: impl FnOnce(&EncodingContext<'_>) -> T) -> T {
        let subject = KeyPair::generate_ed25519().as_spki().unwrap();
        let issuer = KeyPair::generate_ed25519().as_spki().unwrap();
        f(&EncodingContext {
            subject_key: &subject,
            issuer_key: &issuer,
        })
    }

    fn encode(name: &str, value: &str) -> Result<Extension> {
        with_context(|ctx| encode_extension(name, &ExtensionValue::parse(value), ctx))
    }

    fn round_trip(name: &str, value: &str) -> (String, ExtensionValue) {
        render_extension(&encode(name, value).unwrap())
    }

    #[test]
    fn test_inhibit_any_policy_encoding() {
        let ext = encode("inhibitAnyPolicy", "critical,1").unwrap();
        assert_eq!(ext.extn_id, InhibitAnyPolicy::OID);
        assert!(ext.critical);
        // INTEGER 1
        assert_eq!(ext.extn_value.as_bytes(), &[0x02, 0x01, 0x01]);
    }

    #[test]
    fn test_policy_values_render_verbatim() {
        for (name, value) in [
            ("inhibitAnyPolicy", "critical,1"),
            ("policyConstraints", "critical,requireExplicitPolicy:0"),
            ("policyConstraints", "requireExplicitPolicy:2,inhibitPolicyMapping:1"),
            ("certificatePolicies", "critical,anyPolicy"),
            ("certificatePolicies", "1.2.3.4,1.2.3.5"),
            ("policyMappings", "1.2.3.4:1.2.3.5,anyPolicy:1.2.3.6"),
        ] {
            let (rendered_name, rendered) = round_trip(name, value);
            assert_eq!(rendered_name, name);
            assert_eq!(rendered.to_string(), value);
        }
    }

    #[test]
    fn test_basic_constraints_is_case_insensitive() {
        let (_, rendered) = round_trip("basicConstraints", "critical,ca:true, pathlen:0");
        assert_eq!(rendered.to_string(), "critical,CA:TRUE,pathlen:0");
    }

    #[test]
    fn test_key_usage_and_extended_key_usage() {
        let (_, ku) = round_trip("keyUsage", "critical,keyCertSign,cRLSign");
        assert_eq!(ku.raw, "keyCertSign,cRLSign");

        let (_, eku) = round_trip("extendedKeyUsage", "serverAuth,clientAuth,1.2.3.9");
        assert_eq!(eku.raw, "serverAuth,clientAuth,1.2.3.9");
    }

    #[test]
    fn test_issuer_urls_round_trip() {
        let (_, aia) = round_trip(
            "authorityInfoAccess",
            "caIssuers;URI:http://url-for-aia/Root.cer",
        );
        assert_eq!(aia.raw, "caIssuers;URI:http://url-for-aia/Root.cer");

        let (_, crl) = round_trip("crlDistributionPoints", "URI:http://url-for-crl/Root.crl");
        assert_eq!(crl.raw, "URI:http://url-for-crl/Root.crl");

        let (_, san) = round_trip("subjectAltName", "DNS:example.test,IP:127.0.0.1");
        assert_eq!(san.raw, "DNS:example.test,IP:127.0.0.1");
    }

    #[test]
    fn test_key_identifiers_follow_context_keys() {
        with_context(|ctx| {
            let ski = encode_extension("subjectKeyIdentifier", &"hash".into(), ctx).unwrap();
            let aki = encode_extension("authorityKeyIdentifier", &"keyid:always".into(), ctx)
                .unwrap();

            let ski = SubjectKeyIdentifier::from_der(ski.extn_value.as_bytes()).unwrap();
            let aki = AuthorityKeyIdentifier::from_der(aki.extn_value.as_bytes()).unwrap();
            assert_eq!(ski.0.as_bytes(), key_identifier(ctx.subject_key).as_slice());
            assert_eq!(
                aki.key_identifier.unwrap().as_bytes(),
                key_identifier(ctx.issuer_key).as_slice()
            );
        });
    }

    #[test]
    fn test_payload_whitespace_is_ignored_when_encoding() {
        let ext = encode("inhibitAnyPolicy", "critical, 1").unwrap();
        assert!(ext.critical);
        assert_eq!(ext.extn_value.as_bytes(), &[0x02, 0x01, 0x01]);
    }

    #[test]
    fn test_computed_key_identifiers_render_as_hex() {
        with_context(|ctx| {
            let ski = encode_extension("subjectKeyIdentifier", &"hash".into(), ctx).unwrap();
            let (_, rendered) = render_extension(&ski);
            assert_eq!(rendered.raw, colon_hex(&key_identifier(ctx.subject_key)));

            let aki = encode_extension("authorityKeyIdentifier", &"keyid:always".into(), ctx)
                .unwrap();
            let (_, rendered) = render_extension(&aki);
            assert_eq!(
                rendered.raw,
                format!("keyid:{}", colon_hex(&key_identifier(ctx.issuer_key)))
            );
        });
    }

    #[test]
    fn test_der_escape_is_emitted_verbatim() {
        // Not a valid InhibitAnyPolicy value; passed through anyway.
        let ext = encode("inhibitAnyPolicy", "critical,DER:04:00").unwrap();
        assert_eq!(ext.extn_value.as_bytes(), &[0x04, 0x00]);

        let (name, rendered) = render_extension(&ext);
        assert_eq!(name, "inhibitAnyPolicy");
        assert_eq!(rendered.to_string(), "critical,DER:04:00");
    }

    #[test]
    fn test_der_escape_with_dotted_oid_name() {
        let ext = encode("1.2.3.4.5", "DER:0500").unwrap();
        assert_eq!(ext.extn_id.to_string(), "1.2.3.4.5");
        let (name, rendered) = render_extension(&ext);
        assert_eq!(name, "1.2.3.4.5");
        assert_eq!(rendered.raw, "DER:05:00");
    }

    #[test]
    fn test_malformed_values_are_rejected_at_encoding() {
        for (name, value) in [
            ("certificatePolicies", "not-an-oid"),
            ("inhibitAnyPolicy", "one"),
            ("policyConstraints", "requireExplicit:0"),
            ("basicConstraints", "CA:maybe"),
            ("keyUsage", "signEverything"),
            ("inhibitAnyPolicy", "DER:zz"),
            ("unknownExtension", "1"),
            ("unknownExtension", "DER:0500"),
        ] {
            assert!(
                matches!(encode(name, value), Err(ChainKitError::ExtensionValueError { .. })),
                "{name}={value} should fail"
            );
        }
    }
}
