//! Secret detection and redaction utilities.
//!
//! Connection strings routinely embed credentials, so anything that may end
//! up in a diagnostic line goes through these helpers first.

/// The redacted placeholder string.
pub const REDACTED: &str = "[REDACTED]";

/// Checks if a key/variable name likely refers to a secret.
///
/// # Examples
///
/// ```
/// use mongo_log_sink_shared::is_secret_key;
///
/// assert!(is_secret_key("MONGO_SINK_CONNECTION_STRING"));
/// assert!(is_secret_key("password"));
/// assert!(!is_secret_key("MONGO_SINK_COLLECTION_NAME"));
/// ```
pub fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_uppercase();
    [
        "PASSWORD",
        "SECRET",
        "TOKEN",
        "CREDENTIAL",
        "CONNECTION_STRING",
        "CONNECTIONSTRING",
        "API_KEY",
    ]
    .iter()
    .any(|needle| key.contains(needle))
}

/// Redacts a value if the key is likely a secret.
pub fn redact_if_secret(key: &str, value: &str) -> String {
    if is_secret_key(key) {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}

/// A secret string wrapper that redacts on Display/Debug.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SecretString(Box<str>);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<Box<str>>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying secret.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(REDACTED)
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(REDACTED)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value.into_boxed_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_connection_secrets() {
        assert!(is_secret_key("connectionString"));
        assert!(is_secret_key("MONGO_SINK_CONNECTION_STRING"));
        assert!(is_secret_key("db_password"));
        assert!(is_secret_key("ACCESS_TOKEN"));
    }

    #[test]
    fn leaves_plain_settings_alone() {
        assert!(!is_secret_key("collectionName"));
        assert!(!is_secret_key("MONGO_SINK_BATCH_POSTING_LIMIT"));
        assert_eq!(redact_if_secret("rollingInterval", "month"), "month");
    }

    #[test]
    fn secret_string_redacts_display_and_debug() {
        let secret = SecretString::new("mongodb://user:pw@localhost/logs");
        assert_eq!(secret.to_string(), REDACTED);
        assert_eq!(format!("{secret:?}"), REDACTED);
        assert_eq!(secret.expose(), "mongodb://user:pw@localhost/logs");
    }
}
