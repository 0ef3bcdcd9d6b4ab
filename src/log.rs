use serde_derive::Deserialize;
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

pub const LOG_FILTER_ENV: &str = "TASKAPI_LOG";

#[derive(Deserialize)]
#[serde(default)]
pub struct Log {
    pub level: String,
    pub ansi: bool,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi: true,
        }
    }
}

/// setup log from an optional environment filter and the config file
///
/// if the environment filter is present, then the configured level is not used
pub fn setup(
    env_filter: Result<EnvFilter, tracing_subscriber::filter::FromEnvError>,
    config: &Option<Log>,
) {
    let default_log = Log::default();
    let log = config.as_ref().unwrap_or(&default_log);
    let env_filter = env_filter.unwrap_or_else(|_| EnvFilter::new(&log.level));

    let ss = Subscriber::builder()
        .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc3339())
        .with_level(true)
        .with_env_filter(env_filter)
        .with_ansi(log.ansi)
        .finish();
    tracing::subscriber::set_global_default(ss)
        .expect("setting tracing default subscriber failed");
}
