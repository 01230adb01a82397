use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global JSON subscriber.
///
/// `RUST_LOG` overrides `default_filter`. Records emitted through the `log`
/// crate (actix's `Logger` middleware) are forwarded into tracing.
pub fn init_telemetry(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .json();

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .try_init();

    if let Err(e) = result {
        tracing::debug!(error = %e, "Telemetry already initialised");
    }
}
