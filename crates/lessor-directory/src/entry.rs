//! Parsed directory entries

use std::collections::HashMap;

use crate::field::Field;
use crate::transport::RawEntry;

/// A directory record projected onto the known [`Field`]s
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    dn: String,
    attributes: HashMap<Field, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    /// Build an entry from a raw record, dropping attributes this crate does
    /// not know about.
    pub fn from_raw(raw: RawEntry) -> Self {
        let mut entry = Self::new(raw.dn);
        for (name, values) in raw.attributes {
            match Field::parse(&name) {
                Some(field) => {
                    entry.attributes.insert(field, values);
                }
                None => {
                    tracing::warn!(dn = %entry.dn, attribute = %name, "ignoring unknown directory attribute");
                }
            }
        }
        entry
    }

    pub fn with_values(mut self, field: Field, values: Vec<String>) -> Self {
        self.attributes.insert(field, values);
        self
    }

    pub fn dn(&self) -> &str {
        &self.dn
    }

    pub fn get(&self, field: Field) -> Option<&[String]> {
        self.attributes.get(&field).map(Vec::as_slice)
    }

    /// Values of `field` joined with commas
    pub fn get_joined(&self, field: Field) -> Option<String> {
        self.get(field).map(|values| values.join(","))
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.attributes.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unknown_attributes_are_dropped() {
        let raw = RawEntry {
            dn: "CN=Jim H.. Jones,OU=Vault,DC=example,DC=com".into(),
            attributes: vec![
                ("cn".into(), vec!["Jim H.. Jones".into()]),
                ("memberOf".into(), vec!["CN=Admins".into(), "CN=Users".into()]),
                ("msExchMailboxGuid".into(), vec!["ignored".into()]),
            ],
        };

        let entry = DirectoryEntry::from_raw(raw);
        assert_eq!(entry.get(Field::CommonName), Some(&["Jim H.. Jones".to_string()][..]));
        assert_eq!(
            entry.get_joined(Field::MemberOf).as_deref(),
            Some("CN=Admins,CN=Users")
        );
        assert_eq!(entry.fields().count(), 2);
        assert_eq!(entry.get(Field::Mail), None);
    }
}
