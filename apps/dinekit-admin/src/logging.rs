use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global subscriber. `RUST_LOG` wins over the configured level;
/// `-v` flags raise it.
pub fn init(cfg: &LoggingConfig, verbose: u8) {
    let level = match verbose {
        0 => cfg.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // A second init (tests, embedding) keeps the first subscriber.
    let res = if cfg.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = res {
        tracing::debug!(error = %e, "logging already initialized");
    }
}
