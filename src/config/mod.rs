//! Tries to create an `AppConfig` from config files and the environment.
//!
//! Sources are layered with `figment`, later ones win:
//! 1. `config/base.toml`
//! 2. `config/{local|production}.toml`, picked by `APP_ENVIRONMENT` (default `local`)
//! 3. `APP_`-prefixed variables, `__` separates nested keys (`APP_NET_CONFIG__APP_PORT`)
//! 4. `DATABASE_URL` and `DATABASE_NAME`
//!
//! Gets initialized with `OnceLock` so it only needs to get initialized once.

mod error;
mod types;

use std::{path::Path, sync::OnceLock};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use tracing::info;

// Re-export config structs
pub use error::{ConfigError, ConfigResult};
pub use types::{
    AppConfig, Collections, Environment, NetConfig, SslRequire, StoreConfig, StoreUrl,
};

const DATABASE_URL_VAR: &str = "DATABASE_URL";
const DATABASE_NAME_VAR: &str = "DATABASE_NAME";

/// Allocates a static `OnceLock` containing `AppConfig`.
/// This ensures configuration only gets initialized the first time we call this function.
/// Every other caller gets a &'static ref to AppConfig.
/// Panics if anything goes wrong.
pub fn get_or_init_config() -> &'static AppConfig {
    static CONFIG_INIT: OnceLock<AppConfig> = OnceLock::new();
    CONFIG_INIT.get_or_init(|| {
        info!(
            "{:<20} - Initializing the configuration",
            "get_or_init_config"
        );
        let base_path = std::env::current_dir().expect("Failed to determine the current DIR.");
        let config_dir = base_path.join("config");

        let environment: Environment = std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .try_into()
            .unwrap_or_else(|er| panic!("Fatal Error: Parsing APP_ENVIRONMENT: {er}"));

        load_config(&config_dir, &environment)
            .unwrap_or_else(|er| panic!("Fatal Error: Building config: {er}"))
    })
}

/// Builds the `AppConfig` from the files in `config_dir` and the environment.
pub fn load_config(config_dir: &Path, environment: &Environment) -> ConfigResult<AppConfig> {
    let environment_filename = format!("{}.toml", environment.as_ref().to_lowercase());

    let mut config = Figment::new()
        .merge(Toml::file(config_dir.join("base.toml")))
        .merge(Toml::file(config_dir.join(environment_filename)))
        .merge(Env::prefixed("APP_").split("__"))
        .merge(
            Env::raw()
                .only(&[DATABASE_URL_VAR, DATABASE_NAME_VAR])
                .map(|key| {
                    if key.as_str().eq_ignore_ascii_case(DATABASE_URL_VAR) {
                        "store_config.url".into()
                    } else {
                        "store_config.name".into()
                    }
                }),
        )
        .extract::<AppConfig>()?;

    config.store_config.url_from_env = Env::var(DATABASE_URL_VAR).is_some();
    config.store_config.name_from_env = Env::var(DATABASE_NAME_VAR).is_some();

    Ok(config)
}
