//! Random secret generation

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Prefix that satisfies the usual upper/lower/digit/symbol complexity rules
pub const PASSWORD_PREFIX: &str = "A1a-";

/// Number of random characters after [`PASSWORD_PREFIX`]
pub const PASSWORD_RANDOM_LEN: usize = 20;

/// Generate `len` random alphanumeric characters
pub fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate a password for a newly issued credential
pub fn generate_password() -> String {
    let mut password = String::with_capacity(PASSWORD_PREFIX.len() + PASSWORD_RANDOM_LEN);
    password.push_str(PASSWORD_PREFIX);
    password.push_str(&random_alphanumeric(PASSWORD_RANDOM_LEN));
    password
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_shape() {
        let password = generate_password();
        assert_eq!(password.len(), 24);
        assert!(password.starts_with("A1a-"));
        assert!(password[4..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_passwords_differ() {
        assert_ne!(generate_password(), generate_password());
    }
}
