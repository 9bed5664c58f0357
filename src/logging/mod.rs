use crate::config::{LoggingConfig, LoggingLevel, DEFAULT_LOG_DIRECTIVE};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to this
/// crate. Calling it again after a subscriber is installed is a no-op.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive_for(config.level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn directive_for(level: LoggingLevel) -> String {
    if level == LoggingLevel::Info {
        return DEFAULT_LOG_DIRECTIVE.to_string();
    }
    format!("bundlewarden={}", level.as_directive())
}
