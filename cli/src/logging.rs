use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding a tracing filter directive, e.g. `ask_core=debug`
pub const LOG_ENV: &str = "ASK_LOG";

/// Initializes the global tracing subscriber.
///
/// `ASK_LOG` wins over the configured level. Logs go to stderr so they never
/// interleave with answers on stdout.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}
