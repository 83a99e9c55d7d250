use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogConfig, LOG_ENV};

/// Installs the global subscriber. `$COMPTOIR_LOG` wins over the configured
/// level. Calling it twice is harmless; the second call is ignored.
pub fn init(config: &LogConfig) {
  let filter = EnvFilter::try_from_env(LOG_ENV)
    .or_else(|_| EnvFilter::try_new(&config.level))
    .unwrap_or_else(|_| EnvFilter::new("info"));
  let registry = tracing_subscriber::registry().with(filter);
  let result = if config.json {
    registry
      .with(tracing_subscriber::fmt::layer().json())
      .try_init()
  } else {
    registry.with(tracing_subscriber::fmt::layer()).try_init()
  };
  if result.is_err() {
    tracing::debug!("tracing subscriber already installed");
  }
}
