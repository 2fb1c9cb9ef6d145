// src/logging.rs

use tracing_subscriber::EnvFilter;

use crate::settings::LogFormat;

/// Install the global subscriber. `directive` is an env-filter string such as
/// `info` or `sheetrest=debug,tower_http=info`; `RUST_LOG` wins when set.
pub fn init(directive: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = result {
        eprintln!("Logging already initialised: {}", e);
    }
}
