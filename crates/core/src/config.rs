use crate::model::Language;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, time::Duration};

pub const DEFAULT_ENDPOINT: &str = "https://api.mymemory.translated.net/get";
pub const DEFAULT_SETTLE_MS: u64 = 300;
pub const DEFAULT_TYPING_MS: u64 = 1500;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SOURCE_LANG: &str = "es";
pub const DEFAULT_TARGET_LANG: &str = "en";
pub const ENV_ENDPOINT: &str = "LIVE_TRANSLATOR_ENDPOINT";
pub const ENV_DATA_DIR: &str = "LIVE_TRANSLATOR_DATA_DIR";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }
        url::Url::parse(&v).map_err(|e| ConfigError::InvalidEndpoint(format!("{v}: {e}")))?;
        Ok(Self(v))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self(DEFAULT_ENDPOINT.to_owned())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Delays for the two coordinator timers.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimingConfig {
    pub settle_ms: u64,
    pub typing_ms: u64,
}

impl TimingConfig {
    pub fn new(settle_ms: u64, typing_ms: u64) -> Result<Self, ConfigError> {
        if settle_ms == 0 {
            return Err(ConfigError::ZeroDelay("settle"));
        }
        if typing_ms == 0 {
            return Err(ConfigError::ZeroDelay("typing"));
        }
        Ok(Self {
            settle_ms,
            typing_ms,
        })
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn typing(&self) -> Duration {
        Duration::from_millis(self.typing_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_ms: DEFAULT_SETTLE_MS,
            typing_ms: DEFAULT_TYPING_MS,
        }
    }
}

/// Where the key-value store lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageLocation {
    Memory,
    Dir(PathBuf),
    PlatformDefault,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub endpoint: Endpoint,
    pub timing: TimingConfig,
    pub source: Language,
    pub target: Language,
    pub storage: StorageLocation,
    pub request_timeout: Duration,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("endpoint must not be empty")]
    EmptyEndpoint,
    #[error("invalid endpoint url: {0}")]
    InvalidEndpoint(String),
    #[error("{0} delay must be > 0 ms")]
    ZeroDelay(&'static str),
    #[error("unsupported language code: {0}")]
    UnknownLanguage(String),
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_endpoint(cli_value: Option<String>, env: &impl Env) -> Result<Endpoint, ConfigError> {
    match cli_value.or_else(|| env.var(ENV_ENDPOINT)) {
        Some(v) => Endpoint::new(v),
        None => Ok(Endpoint::default()),
    }
}

pub fn resolve_optional_string(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Option<String> {
    match cli_value {
        Some(v) => Some(v),
        None => env.var(env_key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_cli_takes_precedence_over_env() {
        let env = MapEnv::default().with_var(ENV_ENDPOINT, "https://env.example/get");
        let endpoint =
            resolve_endpoint(Some("https://cli.example/get".to_owned()), &env).expect("valid");
        assert_eq!(endpoint.as_str(), "https://cli.example/get");
    }

    #[test]
    fn endpoint_env_used_when_cli_missing() {
        let env = MapEnv::default().with_var(ENV_ENDPOINT, "https://env.example/get");
        let endpoint = resolve_endpoint(None, &env).expect("valid");
        assert_eq!(endpoint.as_str(), "https://env.example/get");
    }

    #[test]
    fn endpoint_default_used_when_both_missing() {
        let endpoint = resolve_endpoint(None, &MapEnv::default()).expect("valid");
        assert_eq!(endpoint.as_str(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn endpoint_rejects_garbage() {
        assert_eq!(Endpoint::new("  "), Err(ConfigError::EmptyEndpoint));
        assert!(matches!(
            Endpoint::new("not a url"),
            Err(ConfigError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn timing_rejects_zero_delays() {
        assert_eq!(TimingConfig::new(0, 1500), Err(ConfigError::ZeroDelay("settle")));
        assert_eq!(TimingConfig::new(300, 0), Err(ConfigError::ZeroDelay("typing")));
        let t = TimingConfig::new(300, 1500).expect("nonzero");
        assert_eq!(t.settle(), Duration::from_millis(300));
        assert_eq!(t.typing(), Duration::from_millis(1500));
    }

    #[test]
    fn optional_string_falls_back_to_env() {
        let env = MapEnv::default().with_var(ENV_DATA_DIR, "/tmp/data");
        assert_eq!(
            resolve_optional_string(None, ENV_DATA_DIR, &env).as_deref(),
            Some("/tmp/data")
        );
        assert_eq!(
            resolve_optional_string(Some("/cli".into()), ENV_DATA_DIR, &env).as_deref(),
            Some("/cli")
        );
        assert_eq!(resolve_optional_string(None, ENV_DATA_DIR, &MapEnv::default()), None);
    }
}
