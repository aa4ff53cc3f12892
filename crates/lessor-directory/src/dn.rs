//! Distinguished name and search filter rendering

use crate::field::Field;

/// Filter used when no filter components are given
pub const MATCH_ALL_FILTER: &str = "(objectClass=*)";

/// Render ordered `(field, value)` components as an RFC 4514 DN,
/// e.g. `ou=Vault,dc=example,dc=com`.
pub fn base_dn(components: &[(Field, &str)]) -> String {
    components
        .iter()
        .map(|(field, value)| format!("{}={}", field, escape_dn_value(value)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Render ordered `(field, value)` pairs as an RFC 4515 filter.
///
/// One pair becomes `(f=v)`, several become an AND of each pair.
pub fn filter(pairs: &[(Field, &str)]) -> String {
    let terms: Vec<String> = pairs
        .iter()
        .map(|(field, value)| format!("({}={})", field, escape_filter_value(value)))
        .collect();

    match terms.as_slice() {
        [] => MATCH_ALL_FILTER.to_string(),
        [single] => single.clone(),
        many => format!("(&{})", many.concat()),
    }
}

fn escape_dn_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (i, c) in value.chars().enumerate() {
        match c {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '#' if i == 0 => escaped.push_str("\\#"),
            ' ' if i == 0 || i == last => escaped.push_str("\\ "),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(c),
        }
    }
    escaped
}
