use std::net::TcpListener;

use reward_service::configuration::get_configuration;
use reward_service::database::get_connection_pool;
use reward_service::startup::run;
use reward_service::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

    tracing::info!("Starting reward service");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    if configuration.jwt.secret.is_empty() {
        tracing::error!("jwt.secret is empty, refusing to start");
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Missing JWT secret",
        ));
    }

    let pool = get_connection_pool(&configuration.database);
    tracing::info!(database = ?configuration.database, "Database pool configured");

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, pool, configuration)?.await
}
