use signup_relay::configuration::get_configuration;
use signup_relay::startup::Application;
use signup_relay::telemetry::get_subscriber;
use signup_relay::telemetry::init_subscriber;

/// Initialise telemetry, load config, and start the server
#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let subscriber = get_subscriber("signup-relay", "info", std::io::stdout);
    init_subscriber(subscriber)?;

    let cfg = get_configuration()?;
    let app = Application::build(cfg)?;
    tracing::info!(port = app.get_port(), "listening");

    match app.run_until_stopped().await {
        Ok(()) => {
            tracing::info!("API exited gracefully");
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                error.cause_chain=?e,
                error.message=%e,
                "API failed"
            );
            Err(e.into())
        }
    }
}
