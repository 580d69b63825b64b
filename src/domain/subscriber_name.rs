/// The optional `name` field of a signup, forwarded to the provider as
/// `first_name`.
///
/// Must be instantiated with `SubscriberName::parse`, which trims surrounding
/// whitespace and rejects what is left if it is empty. The field is left
/// private, to prevent bypassing of `parse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberName(String);

impl SubscriberName {
    pub fn parse(name: String) -> Result<Self, String> {
        let name = name.trim();
        match name.is_empty() {
            false => Ok(Self(name.to_string())),
            true => Err("Empty name".to_string()),
        }
    }
}

impl AsRef<str> for SubscriberName {
    fn as_ref(&self) -> &str { &self.0 }
}
