//! String-level rewriting of driver connection strings
//!
//! Two forms are recognised: URL form (`postgres://user@host/db?opt=v`) and
//! key/value form (`host=localhost user=app dbname=app`).

use url::Url;

use crate::{LessorError, Result};

const REDACTED: &str = "*****";

/// Returns true if the string is in URL form
pub fn is_url(connection_string: &str) -> bool {
    connection_string.contains("://")
}

/// Append `key=value` to a connection string unless `key` is already set.
///
/// URL form gains a query parameter (`?` or `&` as appropriate), key/value
/// form gains ` key='value'`.
pub fn append_param(connection_string: &str, key: &str, value: &str) -> String {
    if has_param(connection_string, key) {
        return connection_string.to_string();
    }

    if is_url(connection_string) {
        let separator = if connection_string.contains('?') {
            if connection_string.ends_with('?') || connection_string.ends_with('&') {
                ""
            } else {
                "&"
            }
        } else {
            "?"
        };
        format!(
            "{connection_string}{separator}{}={}",
            urlencoding::encode(key),
            urlencoding::encode(value)
        )
    } else {
        let escaped = quote_value(value);
        let trimmed = connection_string.trim_end();
        if trimmed.is_empty() {
            format!("{key}='{escaped}'")
        } else {
            format!("{trimmed} {key}='{escaped}'")
        }
    }
}

/// Check whether `key` is already present in the connection string
pub fn has_param(connection_string: &str, key: &str) -> bool {
    if is_url(connection_string) {
        match Url::parse(connection_string) {
            Ok(url) => url
                .query_pairs()
                .any(|(k, _)| k.eq_ignore_ascii_case(key)),
            Err(_) => connection_string
                .split(['?', '&'])
                .skip(1)
                .any(|pair| pair.split('=').next() == Some(key)),
        }
    } else {
        key_value_pairs(connection_string)
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(key))
    }
}

/// Replace the credentials embedded in a connection string
pub fn with_credentials(connection_string: &str, username: &str, password: &str) -> Result<String> {
    if is_url(connection_string) {
        let mut url = Url::parse(connection_string)
            .map_err(|e| LessorError::InvalidConfiguration(format!("invalid connection url: {e}")))?;
        url.set_username(username).map_err(|_| {
            LessorError::InvalidConfiguration("connection url cannot carry a username".into())
        })?;
        url.set_password(Some(password)).map_err(|_| {
            LessorError::InvalidConfiguration("connection url cannot carry a password".into())
        })?;
        Ok(url.to_string())
    } else {
        let rest: Vec<String> = key_value_pairs(connection_string)
            .into_iter()
            .filter(|(k, _)| k != "user" && k != "password")
            .map(|(k, v)| format!("{k}='{}'", quote_value(&v)))
            .collect();
        let mut out = rest.join(" ");
        out = append_param(&out, "user", username);
        Ok(append_param(&out, "password", password))
    }
}

/// Mask any password embedded in a connection string, for logging
pub fn redact(connection_string: &str) -> String {
    if is_url(connection_string) {
        match Url::parse(connection_string) {
            Ok(mut url) => {
                if url.password().is_some() {
                    let _ = url.set_password(Some(REDACTED));
                }
                url.to_string()
            }
            Err(_) => REDACTED.to_string(),
        }
    } else {
        key_value_pairs(connection_string)
            .into_iter()
            .map(|(k, v)| {
                if k == "password" {
                    format!("{k}={REDACTED}")
                } else {
                    format!("{k}={v}")
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Parse `key=value` pairs, honouring single quoted values and `\` escapes.
fn key_value_pairs(connection_string: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut chars = connection_string.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && !c.is_whitespace()) {
            key.push(c);
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.next_if_eq(&'=').is_none() {
            pairs.push((key, String::new()));
            continue;
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut value = String::new();
        if chars.next_if_eq(&'\'').is_some() {
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '\'' => break,
                    other => value.push(other),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                value.push(c);
            }
        }
        pairs.push((key, value));
    }

    pairs
}
