use std::env;
use std::env::current_dir;
use std::fmt::Display;
use std::time::Duration;

use config::Config;
use config::ConfigError;
use secrecy::ExposeSecret;
use secrecy::Secret;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::mailing_list_client::MailingListClient;

/// List that new contacts are added to when neither `mailing_list.list_id` nor
/// `SENDGRID_LIST_ID` is set.
pub const DEFAULT_LIST_ID: &str = "10415e07-b319-4848-a22d-d7176b5d68bb";

/// Global configuration, loaded from `configuration/*.yaml` and the
/// environment. See `get_configuration`.
#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub mailing_list: MailingListSettings,
}

/// Server configuration
#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    /// Should be localhost on dev machine, 0.0.0.0 on prod
    pub host: String,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
}

/// Mailing-list provider (SendGrid Marketing Contacts) configuration
#[derive(Deserialize, Clone)]
pub struct MailingListSettings {
    pub base_url: String,

    /// Not required for the server to start; subscriptions fail with a
    /// configuration error until it is set.
    #[serde(default)]
    pub api_key: Option<Secret<String>>,

    #[serde(default = "default_list_id")]
    pub list_id: String,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

fn default_list_id() -> String { DEFAULT_LIST_ID.to_string() }

impl MailingListSettings {
    /// An empty key is treated the same as a missing one. Whitespace is not
    /// trimmed; a blank key is passed on and rejected by the provider.
    pub fn api_key(&self) -> Option<Secret<String>> {
        self.api_key
            .as_ref()
            .filter(|k| !k.expose_secret().is_empty())
            .cloned()
    }

    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_milliseconds) }

    pub fn client(self) -> Result<MailingListClient, reqwest::Error> {
        let timeout = self.timeout();
        let api_key = self.api_key();
        MailingListClient::new(self.base_url, api_key, self.list_id, timeout)
    }
}

pub enum Environment {
    Local,
    Production,
}

impl Display for Environment {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Environment::Local => "local",
                Environment::Production => "production",
            }
        )
    }
}

impl TryFrom<String> for Environment {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            e => Err(format!(
                "{e} is not a supported environment. Use either `local` or `production`."
            )),
        }
    }
}

/// Non-empty value of an environment variable
fn non_empty_var(key: &str) -> Option<String> { env::var(key).ok().filter(|v| !v.is_empty()) }

/// Load yaml configuration files at `<project_root>/configuration`, then
/// layer environment variables on top.
///
/// `APP_MAILING_LIST__API_KEY=...` -> `Settings.mailing_list.api_key`
///
/// The provider's conventional `SENDGRID_API_KEY` and `SENDGRID_LIST_ID`
/// variables take precedence over everything else when set.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let cfg_dir = current_dir()
        .map_err(|e| ConfigError::Message(format!("could not get current dir: {e}")))?
        .join("configuration");

    let env: Environment = env::var("APP_ENVIRONMENT")
        .unwrap_or("local".to_string())
        .try_into()
        .map_err(ConfigError::Message)?;

    let settings = Config::builder()
        .add_source(config::File::from(cfg_dir.join("base.yaml")))
        .add_source(config::File::from(cfg_dir.join(format!("{env}.yaml"))))
        .add_source(
            // env vars are -always- parsed as String, hence `serde-aux` for numbers
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .set_override_option("mailing_list.api_key", non_empty_var("SENDGRID_API_KEY"))?
        .set_override_option("mailing_list.list_id", non_empty_var("SENDGRID_LIST_ID"))?
        .build()?;

    settings.try_deserialize::<Settings>()
}
