//! Backend for the marketing site's newsletter signup form: validates an
//! email address and relays it to the mailing-list provider. Stores nothing.

pub mod configuration;
pub mod domain;
pub mod mailing_list_client;
pub mod routes;
pub mod startup;
pub mod telemetry;
