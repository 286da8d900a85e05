use std::fmt;

use crate::error::{ChainKitError, Result};

const CRITICAL_PREFIX: &str = "critical,";

/// The value attached to an extension name: a criticality flag plus an opaque
/// payload in the extension grammar (see [`grammar`](super::grammar)).
///
/// The payload is never interpreted here, so deliberately malformed values can
/// be carried through to the encoder.
///
/// # Example
/// ```
/// use chainkit::cert::extensions::ExtensionValue;
///
/// let value = ExtensionValue::parse("critical,requireExplicitPolicy:0");
/// assert!(value.critical);
/// assert_eq!(value.raw, "requireExplicitPolicy:0");
/// assert_eq!(value.to_string(), "critical,requireExplicitPolicy:0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionValue {
    pub critical: bool,
    pub raw: String,
}

impl ExtensionValue {
    pub fn new(critical: bool, raw: impl Into<String>) -> Self {
        Self {
            critical,
            raw: raw.into(),
        }
    }

    /// Splits an optional leading `critical,` flag off `value`.
    pub fn parse(value: &str) -> Self {
        match value.strip_prefix(CRITICAL_PREFIX) {
            Some(rest) => Self::new(true, rest),
            None => Self::new(false, value),
        }
    }
}

impl From<&str> for ExtensionValue {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for ExtensionValue {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl fmt::Display for ExtensionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.critical {
            f.write_str(CRITICAL_PREFIX)?;
        }
        f.write_str(&self.raw)
    }
}

/// Ordered extensions of a certificate, keyed by extension name.
///
/// Order is significant: it is the order of the encoded `extensions` field.
/// Names may repeat when added through [`add_property`](Self::add_property),
/// which is how duplicate-extension fixtures are expressed.
///
/// Once the owning certificate is finalized the set is frozen and every
/// mutator fails with [`ChainKitError::CertificateFinalized`].
#[derive(Debug, Clone, Default)]
pub struct ExtensionSet {
    entries: Vec<(String, ExtensionValue)>,
    frozen: bool,
}

impl ExtensionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the extension `name`.
    ///
    /// Replacing keeps the position of the first entry with that name and
    /// drops any later duplicates (last write wins, position preserved). To
    /// move an extension to the end, remove it first.
    pub fn set_property(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ExtensionValue>,
    ) -> Result<()> {
        let name = name.into();
        self.ensure_mutable(&name)?;
        let value = value.into();

        match self.entries.iter().position(|(n, _)| *n == name) {
            Some(first) => {
                self.entries[first].1 = value;
                let mut index = 0;
                self.entries.retain(|(n, _)| {
                    let keep = index <= first || *n != name;
                    index += 1;
                    keep
                });
            }
            None => self.entries.push((name, value)),
        }
        Ok(())
    }

    /// Appends an entry even if `name` is already present.
    pub fn add_property(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ExtensionValue>,
    ) -> Result<()> {
        let name = name.into();
        self.ensure_mutable(&name)?;
        self.entries.push((name, value.into()));
        Ok(())
    }

    /// Removes every entry named `name`, returning the first removed value.
    pub fn remove_property(&mut self, name: &str) -> Result<Option<ExtensionValue>> {
        self.ensure_mutable(name)?;
        let removed = self
            .entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone());
        self.entries.retain(|(n, _)| n != name);
        Ok(removed)
    }

    /// The first value stored under `name`.
    pub fn get_property(&self, name: &str) -> Option<&ExtensionValue> {
        self.entries
            .iter()
            .find_map(|(n, v)| (n == name).then_some(v))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_property(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `(name, value)` pairs in encoding order.
    pub fn as_ordered_list(&self) -> &[(String, ExtensionValue)] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtensionValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }

    fn ensure_mutable(&self, name: &str) -> Result<()> {
        if self.frozen {
            return Err(ChainKitError::CertificateFinalized(format!(
                "extension \"{name}\""
            )));
        }
        Ok(())
    }
}
