//! Known directory attribute names

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use lessor_core::LessorError;

macro_rules! fields {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// A directory attribute this crate knows how to read and write
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Field {
            $($variant),+
        }

        impl Field {
            /// Every known field, in declaration order
            pub const ALL: &'static [Field] = &[$(Field::$variant),+];

            /// The attribute name as the directory spells it
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Field::$variant => $name),+
                }
            }
        }
    };
}

fields! {
    // Name fields
    CommonName => "cn",
    DisplayName => "displayName",
    GivenName => "givenName",
    Name => "name",
    SamAccountName => "sAMAccountName",
    Surname => "sn",
    Mail => "mail",

    AccountExpires => "accountExpires",
    BadPasswordCount => "badPwdCount",
    BadPasswordTime => "badPasswordTime",
    CodePage => "codePage",
    CountryCode => "countryCode",
    DistinguishedName => "distinguishedName",
    DomainComponent => "dc",
    DomainName => "dn",
    DsCorePropagationData => "dSCorePropagationData",
    InstanceType => "instanceType",
    LastLogoff => "lastLogoff",
    LastLogon => "lastLogon",
    LogonCount => "logonCount",
    MemberOf => "memberOf",
    ObjectCategory => "objectCategory",
    ObjectClass => "objectClass",
    // never changes
    ObjectGuid => "objectGUID",
    ObjectSid => "objectSid",
    OrganizationalUnit => "ou",
    PasswordLastSet => "pwdLastSet",
    PrimaryGroupId => "primaryGroupID",
    SamAccountType => "sAMAccountType",
    UnicodePassword => "unicodePwd",
    UpdateSequenceNumberChanged => "uSNChanged",
    UpdateSequenceNumberCreated => "uSNCreated",
    UserAccountControl => "userAccountControl",
    UserPrincipalName => "userPrincipalName",
    WhenCreated => "whenCreated",
    WhenChanged => "whenChanged",
}

/// Attribute names are case-insensitive on the wire
static BY_NAME: LazyLock<HashMap<String, Field>> = LazyLock::new(|| {
    Field::ALL
        .iter()
        .map(|field| (field.as_str().to_ascii_lowercase(), *field))
        .collect()
});

impl Field {
    /// Look up a field by attribute name, ignoring case
    pub fn parse(name: &str) -> Option<Field> {
        BY_NAME.get(&name.to_ascii_lowercase()).copied()
    }
}

impl FromStr for Field {
    type Err = LessorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::parse(s).ok_or_else(|| LessorError::NotFound(format!("no field matches {s}")))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
