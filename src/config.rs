//! Service configuration
//!
//! Values are layered, later sources winning:
//! 1. Built-in defaults
//! 2. TOML file (`--config`, or `insightflow.toml` in the working directory)
//! 3. `INSIGHTFLOW_*` environment variables, `__` separating sections
//!    (e.g. `INSIGHTFLOW_RATE_LIMIT__API_POINTS=200`)
//! 4. The short variables `PORT`, `JWT_SECRET` and `DATABASE_URL`

use crate::error::{InsightError, Result};
use config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Placeholder secret shipped in the defaults; refused in production
pub const DEV_JWT_SECRET: &str = "insightflow-dev-secret-change-me";

const DEFAULT_CONFIG_FILE: &str = "insightflow.toml";

/// Deployment environment, controls how much error detail clients see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunEnvironment {
    Development,
    #[default]
    Production,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: RunEnvironment,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    #[serde(deserialize_with = "deserialize_secret")]
    pub jwt_secret: SecretString,
    pub token_ttl_secs: u64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per window on `/api/auth/*`, per client IP
    pub auth_points: u32,
    /// Requests per window on the rest of `/api`, per user or client IP
    pub api_points: u32,
    pub window_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct AdminConfig {
    /// Account probed by the database self-test
    pub email: String,
}

/// Complete service configuration
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub admin: AdminConfig,
}

impl AppConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000_i64)?
            .set_default("server.environment", "production")?
            .set_default("database.path", "insightflow.db")?
            .set_default("auth.jwt_secret", DEV_JWT_SECRET)?
            .set_default("auth.token_ttl_secs", 86_400_i64)?
            .set_default("auth.bcrypt_cost", 10_i64)?
            .set_default("rate_limit.auth_points", 5_i64)?
            .set_default("rate_limit.api_points", 100_i64)?
            .set_default("rate_limit.window_secs", 60_i64)?
            .set_default("admin.email", "admin@insightflow.com")?;

        builder = match path {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                builder.add_source(File::from(path).required(true))
            }
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let config = builder
            .add_source(
                Environment::with_prefix("INSIGHTFLOW")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .set_override_option("auth.jwt_secret", std::env::var("JWT_SECRET").ok())?
            .set_override_option("database.path", std::env::var("DATABASE_URL").ok())?
            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("server.port must be non-zero"));
        }
        if self.auth.jwt_secret.expose_secret().trim().is_empty() {
            return Err(invalid("auth.jwt_secret must not be empty"));
        }
        if self.auth.token_ttl_secs == 0 {
            return Err(invalid("auth.token_ttl_secs must be non-zero"));
        }
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(invalid("auth.bcrypt_cost must be between 4 and 31"));
        }
        if self.rate_limit.auth_points == 0 || self.rate_limit.api_points == 0 {
            return Err(invalid("rate_limit points must be non-zero"));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(invalid("rate_limit.window_secs must be non-zero"));
        }

        if self.auth.jwt_secret.expose_secret() == DEV_JWT_SECRET {
            if self.server.environment == RunEnvironment::Production {
                return Err(invalid(
                    "auth.jwt_secret is still the development default; set JWT_SECRET",
                ));
            }
            warn!("Using the development JWT secret");
        }

        Ok(())
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.auth.token_ttl_secs).unwrap_or(i64::MAX))
    }

    pub fn is_development(&self) -> bool {
        self.server.environment == RunEnvironment::Development
    }
}

fn invalid(message: &str) -> InsightError {
    InsightError::Config(config::ConfigError::Message(message.to_string()))
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(SecretString::new(raw.into_boxed_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const ENV_VARS: [&str; 6] = [
        "PORT",
        "JWT_SECRET",
        "DATABASE_URL",
        "INSIGHTFLOW_SERVER__ENVIRONMENT",
        "INSIGHTFLOW_RATE_LIMIT__API_POINTS",
        "INSIGHTFLOW_AUTH__BCRYPT_COST",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_production_refuses_dev_secret() {
        clear_env();
        let err = AppConfig::load(None).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    #[serial]
    fn test_defaults_in_development() {
        clear_env();
        std::env::set_var("INSIGHTFLOW_SERVER__ENVIRONMENT", "development");

        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.server.port, 5000);
        assert!(config.is_development());
        assert_eq!(config.rate_limit.auth_points, 5);
        assert_eq!(config.rate_limit.api_points, 100);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(60));
        assert_eq!(config.auth.bcrypt_cost, 10);
        assert_eq!(config.token_ttl(), chrono::Duration::hours(24));
        assert_eq!(config.admin.email, "admin@insightflow.com");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_file_then_env_layering() {
        clear_env();
        let file = write_config(
            r#"
            [server]
            port = 8080

            [auth]
            jwt_secret = "from-file"

            [rate_limit]
            api_points = 50
            "#,
        );

        std::env::set_var("INSIGHTFLOW_RATE_LIMIT__API_POINTS", "250");
        std::env::set_var("PORT", "9090");

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.rate_limit.api_points, 250);
        assert_eq!(config.auth.jwt_secret.expose_secret(), "from-file");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_values_rejected() {
        clear_env();
        std::env::set_var("JWT_SECRET", "s3cret");
        std::env::set_var("INSIGHTFLOW_AUTH__BCRYPT_COST", "2");

        let err = AppConfig::load(None).unwrap_err();
        assert!(err.to_string().contains("bcrypt_cost"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_an_error() {
        clear_env();
        let result = AppConfig::load(Some(Path::new("/nonexistent/insightflow.toml")));
        assert!(result.is_err());
    }
}
