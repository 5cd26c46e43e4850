//! The configuration structs used to build the AppConfig, and their impls.
use std::time::Duration;

use lazy_regex::regex_captures;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::{
    postgres::{PgConnectOptions, PgSslMode},
    ConnectOptions,
};
use strum_macros::AsRefStr;

use crate::config::{ConfigError, ConfigResult};

// ###################################
// ->   STRUCTS
// ###################################
#[derive(AsRefStr, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

#[derive(Deserialize, Clone, Debug)]
pub struct AppConfig {
    pub net_config: NetConfig,
    pub store_config: StoreConfig,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NetConfig {
    pub host: [u8; 4],
    pub app_port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct StoreConfig {
    /// `postgres://{username}:{password}@{host}:{port}[/{database}][?sslmode={mode}]`
    pub url: SecretString,
    /// Overrides the database named in `url`.
    pub name: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_millis: u64,
    #[serde(default)]
    pub collections: Collections,
    /// Whether `DATABASE_URL` was present in the environment at load time.
    #[serde(skip)]
    pub url_from_env: bool,
    /// Whether `DATABASE_NAME` was present in the environment at load time.
    #[serde(skip)]
    pub name_from_env: bool,
}

/// Where each record kind is stored.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Collections {
    pub catalog: String,
    pub subscribers: String,
}

impl Default for Collections {
    fn default() -> Self {
        Collections {
            catalog: "tee".to_string(),
            subscribers: "subscriber".to_string(),
        }
    }
}

/// The parts of a store url.
#[derive(Clone, Debug)]
pub struct StoreUrl {
    pub username: String,
    pub password: SecretString,
    pub host: String,
    pub port: u16,
    pub db_name: Option<String>,
    pub require_ssl: SslRequire,
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SslRequire {
    #[default]
    Prefer,
    Require,
    Disable,
}

// ###################################
// ->   IMPLs
// ###################################
impl StoreConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_millis)
    }

    pub fn connection_options(&self) -> ConfigResult<PgConnectOptions> {
        let store_url = StoreUrl::try_from(self.url.expose_secret())?;
        let options = store_url.connection_options_without_db();

        let options = match self.name.as_deref().or(store_url.db_name.as_deref()) {
            Some(db_name) => options.database(db_name),
            None => options,
        };

        Ok(options)
    }
}

impl StoreUrl {
    pub fn connection_options_without_db(&self) -> PgConnectOptions {
        // Create new PgConnectOptions struct but don't try to use the '$HOME/.pgpass' file.
        PgConnectOptions::new_without_pgpass()
            .host(&self.host)
            .username(&self.username)
            .password(self.password.expose_secret())
            .port(self.port)
            .ssl_mode(self.require_ssl.into())
            .log_statements(tracing::log::LevelFilter::Trace)
    }
}

impl From<SslRequire> for PgSslMode {
    fn from(value: SslRequire) -> Self {
        match value {
            SslRequire::Require => PgSslMode::Require,
            SslRequire::Disable => PgSslMode::Disable,
            SslRequire::Prefer => PgSslMode::Prefer,
        }
    }
}

// ###################################
// ->   TRY FROMs
// ###################################

impl TryFrom<String> for Environment {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            _ => Err(Self::Error::StringToEnvironmentFail(value)),
        }
    }
}

impl TryFrom<&str> for StoreUrl {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        // postgres://{username}:{password}@{hostname}:{port}[/{database}][?{options}]
        let (_whole, username, password, host, port, db_name, options) = regex_captures!(
            r#"^postgres(?:ql)?:\/\/([^:]+):([^@]+)@([^:\/]+):(\d+)(?:\/([^\s\/?]*))?(\?[^\s]*)?$"#,
            value
        )
        .ok_or(Self::Error::StoreUrlParseFail)?;

        let (username, host) = (username.to_string(), host.to_string());
        let db_name = (!db_name.is_empty()).then(|| db_name.to_string());
        let password = SecretString::from(password.to_string());
        let port = port
            .parse()
            .map_err(|_| Self::Error::StoreUrlParseFail)?;

        let mut require_ssl = SslRequire::default();
        if let Some(options) = options.strip_prefix('?') {
            for option in options.split('&') {
                if let Some((id, val)) = option.split_once('=') {
                    if id == "sslmode" {
                        match val {
                            "disable" => require_ssl = SslRequire::Disable,
                            "require" => require_ssl = SslRequire::Require,
                            _ => {}
                        }
                    }
                }
            }
        }

        Ok(StoreUrl {
            username,
            password,
            host,
            port,
            db_name,
            require_ssl,
        })
    }
}

// ###################################
// ->   TESTS
// ###################################
