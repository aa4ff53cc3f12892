//! Username, password and expiration generation

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use lessor_core::secret::generate_password;

/// Timestamp format substituted for `{{expiration}}`
pub const EXPIRATION_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

pub fn format_expiration(at: DateTime<Utc>) -> String {
    at.format(EXPIRATION_FORMAT).to_string()
}

/// Build `{display}-{role}-{random}` from truncated parts, then truncate the
/// whole name to `username_length` characters.
pub fn generate_username(
    display_name: &str,
    role_name: &str,
    displayname_length: usize,
    rolename_length: usize,
    username_length: usize,
) -> String {
    let username = format!(
        "{}-{}-{}",
        truncate(display_name, displayname_length),
        truncate(role_name, rolename_length),
        Uuid::new_v4()
    );
    truncate(&username, username_length).to_string()
}

fn truncate(s: &str, len: usize) -> &str {
    match s.char_indices().nth(len) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}
