use std::time::Duration;

use reqwest::Client;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use secrecy::Secret;
use serde::Serialize;

use crate::domain::NewSubscriber;

/// Name under which operators are expected to provide the provider API key
pub const API_KEY_VAR: &str = "SENDGRID_API_KEY";

/// Client for the SendGrid Marketing Contacts API. Only the contact upsert
/// endpoint is used.
///
/// Establishing a HTTP connection is expensive, so a single `Client` (which
/// pools connections internally) is built at startup and shared by all
/// workers through `web::Data`.
pub struct MailingListClient {
    http_client: Client,
    base_url: String,
    api_key: Option<Secret<String>>,
    list_id: String,
}

/// Body of `PUT /v3/marketing/contacts`
#[derive(Serialize, Debug)]
struct UpsertContactsRequest<'a> {
    list_ids: Vec<&'a str>,
    contacts: Vec<Contact<'a>>,
}

#[derive(Serialize, Debug)]
struct Contact<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
}

impl<'a> From<&'a NewSubscriber> for Contact<'a> {
    fn from(sub: &'a NewSubscriber) -> Self {
        Self {
            email: sub.email.as_ref(),
            first_name: sub.name.as_ref().map(|n| n.as_ref()),
        }
    }
}

/// What the provider said, echoed back to the caller verbatim
#[derive(Debug)]
pub struct ProviderResponse {
    pub status: StatusCode,
    pub body: serde_json::Value,
}

#[derive(thiserror::Error, Debug)]
pub enum MailingListError {
    #[error("{} is not configured on the server.", API_KEY_VAR)]
    MissingApiKey,
    /// Network failure, timeout, non-2xx status, or an unreadable body
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

impl MailingListClient {
    pub fn new(
        base_url: String,
        api_key: Option<Secret<String>>,
        list_id: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url,
            api_key,
            list_id,
        })
    }

    pub fn is_configured(&self) -> bool { self.api_key.is_some() }

    pub fn list_id(&self) -> &str { &self.list_id }

    /// Create or update `subscriber` in the configured list. The provider keys
    /// contacts by email, so repeating the call for the same address is safe.
    ///
    /// Exactly one request is made; there are no retries.
    #[tracing::instrument(
        name = "Upserting contact with mailing-list provider",
        skip(self, subscriber),
        fields(list_id = %self.list_id)
    )]
    pub async fn upsert_contact(
        &self,
        subscriber: &NewSubscriber,
    ) -> Result<ProviderResponse, MailingListError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(MailingListError::MissingApiKey)?;

        let url = format!(
            "{}/v3/marketing/contacts",
            self.base_url.trim_end_matches('/')
        );
        let body = UpsertContactsRequest {
            list_ids: vec![self.list_id.as_str()],
            contacts: vec![Contact::from(subscriber)],
        };

        let resp = self
            .http_client
            .put(&url)
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let status = resp.status();
        let text = resp.text().await?;
        Ok(ProviderResponse {
            status,
            body: parse_body(&text),
        })
    }
}

/// Empty -> `null`, JSON -> as-is, anything else -> a JSON string
fn parse_body(text: &str) -> serde_json::Value {
    if text.trim().is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_string()))
}
