//! Redaction wrappers for personal data
//!
//! Emails and free-text notes belong to users; they must never reach a log
//! line verbatim. `Sensitive<T>` hides the value completely, `MaskedEmail`
//! keeps just enough of an address to correlate log lines.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const REDACTED: &str = "***REDACTED***";

/// Wrapper that redacts its value in Debug, Display and Serialize
///
/// # Example
///
/// ```
/// use studyhub_core_types::Sensitive;
///
/// let notes = Sensitive::new("prayed over Genesis 12");
/// assert_eq!(format!("{:?}", notes), "***REDACTED***");
/// assert_eq!(notes.expose(), &"prayed over Genesis 12");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the underlying value
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T> Serialize for Sensitive<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Sensitive<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Sensitive)
    }
}

/// Email address rendered as `a***@domain` in logs
///
/// Anything that does not look like `local@domain` is fully redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct MaskedEmail<'a>(&'a str);

impl<'a> MaskedEmail<'a> {
    pub fn new(email: &'a str) -> Self {
        Self(email)
    }
}

impl fmt::Display for MaskedEmail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                let first = local.chars().next().unwrap_or('*');
                write!(f, "{}***@{}", first, domain)
            }
            _ => f.write_str(REDACTED),
        }
    }
}

impl fmt::Debug for MaskedEmail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_debug_and_display_redaction() {
        let notes = Sensitive::new("my private reflection");
        assert_eq!(format!("{:?}", notes), REDACTED);
        assert_eq!(format!("{}", notes), REDACTED);
    }

    #[test]
    fn test_sensitive_serializes_redacted() {
        let notes = Sensitive::new(String::from("secret"));
        let json = serde_json::to_string(&notes).unwrap();
        assert_eq!(json, "\"***REDACTED***\"");
    }

    #[test]
    fn test_sensitive_expose_and_into_inner() {
        let value = Sensitive::new(String::from("kept"));
        assert_eq!(value.expose(), "kept");
        assert_eq!(value.into_inner(), "kept");
    }

    #[test]
    fn test_sensitive_deserializes_plain_value() {
        let url: Sensitive<String> = serde_json::from_str("\"postgres://u:p@h/db\"").unwrap();
        assert_eq!(url.expose(), "postgres://u:p@h/db");
        assert_eq!(url.to_string(), REDACTED);
    }

    #[test]
    fn test_masked_email_keeps_first_char_and_domain() {
        let masked = MaskedEmail::new("admin@biblestudyhub.com").to_string();
        assert_eq!(masked, "a***@biblestudyhub.com");
        assert!(!masked.contains("admin"));
    }

    #[test]
    fn test_masked_email_redacts_malformed_input() {
        assert_eq!(MaskedEmail::new("no-at-sign").to_string(), REDACTED);
        assert_eq!(MaskedEmail::new("@domain.com").to_string(), REDACTED);
        assert_eq!(MaskedEmail::new("user@").to_string(), REDACTED);
    }
}
