use serde::Deserialize;

use crate::error::ConfigError;

/// Output format for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Gateway configuration, read from the process environment
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub app_host: String,
    #[serde(default = "default_port")]
    pub app_port: u16,
    /// HMAC secret used to verify bearer tokens
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default)]
    pub log_format: LogFormat,
    pub http_workers: Option<usize>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Config {
    /// Load `.env` if present, then read `APP_HOST`, `APP_PORT`, `JWT_SECRET`, `LOG_FORMAT`
    /// and `HTTP_WORKERS`
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>()?.validated()
    }

    /// Same as `from_env` over an explicit set of variables
    pub fn from_iter<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars)?.validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }
        if self.http_workers == Some(0) {
            return Err(ConfigError::InvalidWorkers);
        }
        Ok(self)
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.app_host.clone(), self.app_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_iter(vars(&[("JWT_SECRET", "secret")])).unwrap();

        assert_eq!(config.bind_addr(), ("0.0.0.0".to_string(), 8080));
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.http_workers, None);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_iter(vars(&[
            ("JWT_SECRET", "secret"),
            ("APP_HOST", "127.0.0.1"),
            ("APP_PORT", "9100"),
            ("LOG_FORMAT", "json"),
            ("HTTP_WORKERS", "2"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr(), ("127.0.0.1".to_string(), 9100));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.http_workers, Some(2));
    }

    #[test]
    fn test_missing_secret_rejected() {
        assert!(matches!(
            Config::from_iter(vars(&[])),
            Err(ConfigError::MissingJwtSecret)
        ));
        assert!(matches!(
            Config::from_iter(vars(&[("JWT_SECRET", "  ")])),
            Err(ConfigError::MissingJwtSecret)
        ));
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(matches!(
            Config::from_iter(vars(&[("JWT_SECRET", "secret"), ("APP_PORT", "http")])),
            Err(ConfigError::Env(_))
        ));
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            Config::from_iter(vars(&[("JWT_SECRET", "secret"), ("HTTP_WORKERS", "0")])),
            Err(ConfigError::InvalidWorkers)
        ));
    }
}
