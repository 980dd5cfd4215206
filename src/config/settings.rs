use std::env;
use config::{Config, File, ConfigError};
use dotenv::dotenv;
use secrecy::SecretString;

use crate::config::api::ApiSettings;
use crate::models::game::DEFAULT_PERIOD_LENGTH_S;

#[derive(serde::Deserialize, Debug)]
pub struct Settings{
    pub application: ApplicationSettings,
    pub api: ApiSettings,
    #[serde(default)]
    pub session: SessionSettings,
}

#[derive(serde::Deserialize, Debug)]
pub struct ApplicationSettings{
    pub log_level: String
}

#[derive(serde::Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SessionSettings {
    /// Used when the game record carries no period length
    pub period_length_s: u32,
    /// Cadence of the console's background stat reconcile; 0 disables it
    pub reconcile_interval_s: u64,
    pub stats_page_size: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            period_length_s: DEFAULT_PERIOD_LENGTH_S,
            reconcile_interval_s: 30,
            stats_page_size: 50,
        }
    }
}

impl SessionSettings {
    pub fn effective_period_length(&self, from_game: Option<u32>) -> u32 {
        match from_game.filter(|length| *length > 0) {
            Some(length) => length,
            None if self.period_length_s > 0 => self.period_length_s,
            None => DEFAULT_PERIOD_LENGTH_S,
        }
    }
}

pub fn get_config() -> Result<Settings, ConfigError> {
    let base_path = env::current_dir()
        .map_err(|e| ConfigError::Message(format!("Failed to determine the current directory: {}", e)))?;
    let configuration_directory = base_path.join("configuration");

    dotenv().ok();

    let environment: Environment = env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(ConfigError::Message)?;

    let env_filename = format!("{}.yml", environment.as_str());
    let config = Config::builder()
        .add_source(File::from(configuration_directory.join("base.yml")))
        .add_source(File::from(configuration_directory.join(env_filename)).required(false))
        .add_source(
            config::Environment::default()
                .prefix("APP")
                .prefix_separator("__")
                .separator("__")
        )
        .build()?;

    let mut settings = config.try_deserialize::<Settings>()?;

    // Tokens are usually handed over by the login flow, not checked into config files
    if let Ok(token) = env::var("COURTSIDE_API_TOKEN") {
        settings.api.token = Some(SecretString::new(token.into_boxed_str()));
    }

    Ok(settings)
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. \
                Use either `local` or `production`.",
                other
            )),
        }
    }
}
