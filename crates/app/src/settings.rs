//! Handles settings for the application. Configuration is written in
//! `settings.toml`; every value has a default so the file is optional.

use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Database,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .set_default("app.level", "info")?
            .set_default("app.currency", "EUR")?
            .set_default("database.sqlite", "./scadenza.db")?
            .build()?;

        settings.try_deserialize()
    }
}
