use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Structured JSON logging for the service.
///
/// `RUST_LOG` wins over `default_level`. Records emitted through the `log`
/// facade (actix's `Logger`, [`crate::middleware::LoggerMiddleware`]) are
/// bridged into the same subscriber. Calling this more than once keeps the
/// first subscriber.
pub fn init_telemetry(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .json();

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("Telemetry already initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_initialisation_is_harmless() {
        init_telemetry("warn");
        init_telemetry("debug");
        tracing::info!(user_id = 1, "still logging");
    }
}
