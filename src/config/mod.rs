//! Configuration loading.
//!
//! Values come from, in increasing priority: built-in defaults, the optional
//! `config/default.{toml,yaml,json}` file, and environment variables such as
//! `SERVER_PORT=9000` or `STORAGE_PATH=/var/lib/askroom`.

mod settings;

use config::{Config, ConfigError, Environment, File};

pub use settings::{LogSettings, PartialSettings, ServerSettings, Settings, StorageSettings};

pub fn load_config() -> Result<Settings, ConfigError> {
    // a missing .env file is fine
    let _ = dotenvy::dotenv();

    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::default().separator("_"));

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge(Settings::default()))
}
