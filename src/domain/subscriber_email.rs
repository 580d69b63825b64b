use once_cell::sync::Lazy;
use regex::Regex;

/// Loose smoke test, not RFC 5322: something, `@`, something containing a
/// `.`. Unanchored, so it matches anywhere in the (already trimmed) input.
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern is a valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
/// A trimmed email address that passed `EMAIL_PATTERN`.
///
/// Must be instantiated with `SubscriberEmail::parse`.
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    pub fn parse(email: String) -> Result<Self, String> {
        let email = email.trim();
        match !email.is_empty() && EMAIL_PATTERN.is_match(email) {
            true => Ok(Self(email.to_string())),
            false => Err(format!("Invalid email: {email:?}")),
        }
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str { &self.0 }
}

impl std::fmt::Display for SubscriberEmail {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
