use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::net::SocketAddr;
use std::time::Duration;
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use thiserror::*;
use url::Url;

pub const CONFIG_PATH_ENV: &str = "TASKAPI_CONFIG";
pub const API_KEY_ENV: &str = "API_KEY";
pub const LOG_MESSAGE_ENV: &str = "LOG_MESSAGE";

const DEFAULT_API_KEY: &str = "secret12345";
const DEFAULT_LOG_MESSAGE: &str = "Task API";
const DEFAULT_EXTERNAL_URL: &str = "https://jsonplaceholder.typicode.com/todos";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("io error {0} when reading config")]
    IoError(#[from] std::io::Error),
    #[error("cannot open config file '{0}' : {1}")]
    OpeningError(PathBuf, std::io::Error),
    #[error("UTF8 format error when reading config")]
    Utf8Error,
    #[error("format error {0} when reading config")]
    FormatError(#[from] serde_yaml::Error),
    #[error("invalid listen address {0}")]
    AddressError(#[from] std::net::AddrParseError),
}

fn humantime_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(&s).map_err(serde::de::Error::custom)
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Listen {
    pub host: String,
    pub port: u16,
    #[serde(deserialize_with = "humantime_duration")]
    pub header_read_timeout: Duration,
    #[serde(deserialize_with = "humantime_duration")]
    pub shutdown_grace: Duration,
}

impl Default for Listen {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            header_read_timeout: Duration::from_secs(5),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

impl Listen {
    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(SocketAddr::new(self.host.parse()?, self.port))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Auth {
    pub api_key: String,
    pub log_message: String,
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            api_key: DEFAULT_API_KEY.to_string(),
            log_message: DEFAULT_LOG_MESSAGE.to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct External {
    pub url: Url,
    #[serde(deserialize_with = "humantime_duration")]
    pub timeout: Duration,
}

impl Default for External {
    fn default() -> Self {
        Self {
            url: Url::parse(DEFAULT_EXTERNAL_URL).expect("default external url is valid"),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub listen: Listen,
    pub auth: Auth,
    pub external: External,
    pub log: Option<crate::log::Log>,
}

impl Config {
    pub fn from_str(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let p = path.as_ref();
        let mut file = File::open(p).map_err(|e| ConfigError::OpeningError(p.to_owned(), e))?;
        let mut contents = vec![];
        file.read_to_end(&mut contents)?;
        let contents = String::from_utf8(contents).map_err(|_| ConfigError::Utf8Error)?;
        let config = Config::from_str(&contents)?;
        Ok(config)
    }

    /// Builds the config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Defaults, then the YAML file named by `TASKAPI_CONFIG`, then `API_KEY` and
    /// `LOG_MESSAGE`. Empty variables count as unset.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| var(key).filter(|v| !v.is_empty());

        let mut config = match lookup(CONFIG_PATH_ENV) {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(api_key) = lookup(API_KEY_ENV) {
            config.auth.api_key = api_key;
        }
        if let Some(log_message) = lookup(LOG_MESSAGE_ENV) {
            config.auth.log_message = log_message;
        }
        Ok(config)
    }
}

pub mod testdata {
    use super::Config;

    #[allow(dead_code)]
    pub fn test_config() -> Config {
        Config::from_str(
            r#"
        log:
            level: trace
            ansi: false
        listen:
            host: 127.0.0.1
            port: 0
            header_read_timeout: 5s
            shutdown_grace: 1s
        auth:
            api_key: test-key
            log_message: Task API test
        external:
            url: http://127.0.0.1:1/todos
            timeout: 2s
        "#,
        )
        .unwrap()
    }
}
