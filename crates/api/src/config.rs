//! Application configuration.
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! `config/default` file, then `STOCKLINK__*` environment variables
//! (e.g. `STOCKLINK__PORT=9000`).

use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;

use stocklink_reports::LocalTime;

const CONFIG_DIR: &str = "config";
const ENV_PREFIX: &str = "STOCKLINK";
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// HS256 secret shared with the login service.
    #[serde(default)]
    pub jwt_secret: Option<String>,
    /// Capacity of the realtime broadcast channel.
    pub realtime_buffer: usize,
    /// Local branch time as an offset from UTC, used for "today" and report
    /// timestamps.
    pub timezone_offset_minutes: i32,
    /// Default tracing directive when `RUST_LOG` is unset.
    pub log_level: String,
}

impl AppConfig {
    /// Load from every configured source.
    pub fn load() -> Result<Self, ConfigError> {
        defaults()?
            .add_source(File::with_name(&format!("{CONFIG_DIR}/default")).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The configured secret, or the insecure development default.
    pub fn jwt_secret(&self) -> String {
        match self.jwt_secret.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => secret.to_string(),
            _ => {
                tracing::warn!("jwt_secret not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        }
    }

    pub fn local_time(&self) -> LocalTime {
        LocalTime::from_offset_minutes(self.timezone_offset_minutes)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: None,
            realtime_buffer: 256,
            timezone_offset_minutes: -180,
            log_level: "info".to_string(),
        }
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let d = AppConfig::default();
    Config::builder()
        .set_default("host", d.host)?
        .set_default("port", i64::from(d.port))?
        .set_default("realtime_buffer", d.realtime_buffer as i64)?
        .set_default("timezone_offset_minutes", i64::from(d.timezone_offset_minutes))?
        .set_default("log_level", d.log_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(overrides: &[(&str, &str)]) -> AppConfig {
        let mut builder = defaults().unwrap();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value).unwrap();
        }
        builder.build().unwrap().try_deserialize().unwrap()
    }

    #[test]
    fn defaults_are_complete() {
        let cfg = build(&[]);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8080");
        assert_eq!(cfg.realtime_buffer, 256);
        assert_eq!(cfg.timezone_offset_minutes, -180);
        assert!(cfg.jwt_secret.is_none());
    }

    #[test]
    fn overrides_win_over_defaults() {
        let cfg = build(&[("port", "9000"), ("jwt_secret", "s3cret"), ("timezone_offset_minutes", "0")]);
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.jwt_secret(), "s3cret");
        assert_eq!(cfg.local_time(), LocalTime::default());
    }

    #[test]
    fn blank_secret_falls_back_to_dev_default() {
        let cfg = build(&[("jwt_secret", "  ")]);
        assert_eq!(cfg.jwt_secret(), DEV_JWT_SECRET);
    }
}
