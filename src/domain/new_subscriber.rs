use super::SubscriberEmail;
use super::SubscriberName;

/// A validated signup, ready to be forwarded to the mailing-list provider.
/// Never stored.
#[derive(Debug, Clone)]
pub struct NewSubscriber {
    pub email: SubscriberEmail,
    /// `None` when the form's name field was absent or blank
    pub name: Option<SubscriberName>,
}
