use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::web;
use actix_web::App;
use actix_web::HttpServer;
use tracing_actix_web::TracingLogger;

use crate::configuration::Settings;
use crate::mailing_list_client::MailingListClient;
use crate::routes::health_check;
use crate::routes::subscribe;

/// Wrapper for actix's `Server` with access to the bound port. Not to be
/// confused with actix's `App`!
pub struct Application {
    /// Left private; use `get_port` to access
    port: u16,
    server: Server,
}

impl Application {
    /// Bind the listener and build the provider client from `cfg`. The
    /// settings are read once here and never again; handlers only see the
    /// client.
    pub fn build(cfg: Settings) -> Result<Self, anyhow::Error> {
        // env-dependent host; port 0 gets a random port from the OS
        let addr = format!("{}:{}", cfg.application.host, cfg.application.port);
        let listener = TcpListener::bind(addr)?;
        let port = listener.local_addr()?.port();

        if cfg.mailing_list.api_key().is_none() {
            tracing::warn!("no mailing-list API key configured; subscriptions will fail");
        }
        let client = cfg.mailing_list.client()?;

        let server = run(listener, client)?;
        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 { self.port }

    /// Because this consumes `self`, this should be the final function call (or
    /// passed to `tokio::spawn`)
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> { self.server.await }
}

/// The server is not responsible for binding to an address, it only listens to
/// an already bound address.
///
/// Declares all API endpoints.
pub fn run(
    listener: TcpListener,
    client: MailingListClient,
) -> Result<Server, std::io::Error> {
    // `Data` is an `Arc`; every worker gets a clone of the same client (and
    // thus the same connection pool)
    let client = web::Data::new(client);

    // the closure is called once per worker thread
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/subscribe", web::post().to(subscribe))
            // path used by the website's signup form
            .route("/api/subscribeUser", web::post().to(subscribe))
            .app_data(client.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
