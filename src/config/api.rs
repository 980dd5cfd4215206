use serde::Deserialize;
use secrecy::SecretString;
use std::time::Duration;

fn default_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String, // Versioned API root, e.g. http://localhost:8080/api/v1
    #[serde(default)]
    pub token: Option<SecretString>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ApiSettings {
    pub fn new(base_url: impl Into<String>, token: Option<SecretString>) -> Self {
        Self {
            base_url: base_url.into(),
            token,
            timeout_ms: default_timeout_ms(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}
