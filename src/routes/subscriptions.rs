use std::fmt::Debug;

use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpResponse;
use actix_web::ResponseError;
use anyhow::Context;
use serde::Serialize;
use serde_json::Value;

use super::error_chain_fmt;
use crate::domain::NewSubscriber;
use crate::domain::SubscriberEmail;
use crate::domain::SubscriberName;
use crate::mailing_list_client::MailingListClient;
use crate::mailing_list_client::MailingListError;

const INVALID_EMAIL: &str = "Please provide a valid email address.";
const FALLBACK_ERROR: &str = "Unexpected error subscribing user.";

/// Raw `{email, name}` from the signup form, coerced to strings. Absent and
/// `null` fields are empty strings.
#[derive(Debug, Default, PartialEq)]
pub struct SubscriptionRequest {
    email: String,
    name: String,
}

impl SubscriptionRequest {
    /// Anything that is valid JSON is accepted here; a non-object body simply
    /// has no fields.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(body)?;
        Ok(Self {
            email: coerce_field(&value, "email"),
            name: coerce_field(&value, "name"),
        })
    }
}

/// `null`/absent as empty, anything else through `form_string`, then trimmed
fn coerce_field(
    value: &Value,
    key: &str,
) -> String {
    match value.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(v) => form_string(v).trim().to_string(),
    }
}

/// String form of a JSON value as a browser would print it: arrays are joined
/// with `,` (`null` elements empty), objects become `[object Object]`, which
/// never passes email validation.
fn form_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(items) => items
            .iter()
            .map(form_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Bodies above this are rejected as unexpected errors
const MAX_BODY_BYTES: usize = 256 * 1024;

async fn read_body(payload: web::Payload) -> Result<web::Bytes, anyhow::Error> {
    payload
        .to_bytes_limited(MAX_BODY_BYTES)
        .await
        .map_err(|_| anyhow::anyhow!("Request body exceeds {MAX_BODY_BYTES} bytes"))?
        .map_err(|e| anyhow::anyhow!("Failed to read request body: {e}"))
}

impl TryFrom<SubscriptionRequest> for NewSubscriber {
    type Error = String;
    fn try_from(value: SubscriptionRequest) -> Result<Self, Self::Error> {
        let email = SubscriberEmail::parse(value.email)?;
        // a blank name is not an error, it is simply not forwarded
        let name = SubscriberName::parse(value.name).ok();
        Ok(NewSubscriber { email, name })
    }
}

#[derive(Serialize)]
struct SubscribeSuccess {
    message: &'static str,
    sgmessage: Value,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(thiserror::Error)]
pub enum SubscribeError {
    /// Operator-actionable; the provider is never called
    #[error(transparent)]
    MissingCredential(MailingListError),
    #[error("{0}")]
    ValidationError(String),
    #[error(transparent)]
    ProviderError(MailingListError),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl From<MailingListError> for SubscribeError {
    fn from(e: MailingListError) -> Self {
        match e {
            MailingListError::MissingApiKey => Self::MissingCredential(e),
            MailingListError::Request(_) => Self::ProviderError(e),
        }
    }
}

impl Debug for SubscribeError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // supersedes the default plain-text body
    fn error_response(&self) -> HttpResponse {
        let error = match self {
            // the parse error is for the logs, the client gets a fixed message
            Self::ValidationError(_) => INVALID_EMAIL.to_string(),
            // the full chain, since the outermost context alone rarely says what went wrong
            Self::UnexpectedError(e) => format!("{e:#}"),
            e => e.to_string(),
        };
        let error = match error.trim().is_empty() {
            true => FALLBACK_ERROR.to_string(),
            false => error,
        };
        HttpResponse::build(self.status_code()).json(ErrorBody { error })
    }
}

/// `POST /subscribe` (also mounted at `/api/subscribeUser`).
///
/// Validates `{email, name?}` and forwards it to the mailing-list provider
/// as a contact upsert. Nothing is stored locally.
///
/// # Request example
///
/// ```sh
///     curl -v --json '{"email": "john@foo.com", "name": "John"}' http://127.0.0.1:8000/subscribe
/// ```
///
/// The body is read here rather than through `web::Json`/`web::Bytes`, so
/// that a missing credential is reported ahead of any body problem, and so
/// that oversized or malformed bodies go through `SubscribeError` like every
/// other failure.
#[tracing::instrument(
    name = "Adding new subscriber",
    skip(payload, client),
    fields(
        subscriber_email = tracing::field::Empty,
        subscriber_name = tracing::field::Empty,
    )
)]
pub async fn subscribe(
    payload: web::Payload,
    client: web::Data<MailingListClient>,
) -> Result<HttpResponse, SubscribeError> {
    // read (up to the cap) before answering, even when the answer does not depend on it
    let body = read_body(payload).await;

    if !client.is_configured() {
        tracing::warn!("mailing-list API key missing; rejecting subscription");
        return Err(MailingListError::MissingApiKey.into());
    }

    let body = body?;
    let req = SubscriptionRequest::from_json(&body)
        .context("Failed to parse subscription request body as JSON")?;

    let new_sub: NewSubscriber = req.try_into().map_err(SubscribeError::ValidationError)?;

    let span = tracing::Span::current();
    span.record("subscriber_email", tracing::field::display(&new_sub.email));
    if let Some(name) = &new_sub.name {
        span.record("subscriber_name", name.as_ref());
    }

    let resp = client.upsert_contact(&new_sub).await.map_err(|e| {
        tracing::error!(
            error.cause_chain = ?e,
            error.message = %e,
            list_id = client.list_id(),
            "mailing-list provider rejected upsert"
        );
        SubscribeError::from(e)
    })?;

    // reqwest and actix do not share a `StatusCode` type
    let status = StatusCode::from_u16(resp.status.as_u16()).unwrap_or(StatusCode::OK);
    Ok(HttpResponse::build(status).json(SubscribeSuccess {
        message: "Successfully subscribed user",
        sgmessage: resp.body,
    }))
}
