use std::time::Duration;

use serde::Deserialize;

use crate::autofill::memory::DEFAULT_CAP;

/// Application settings, read from Rocket's figment (`Rocket.toml` and `ROCKET_*`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_session_hours")]
    pub session_hours: i64,
    #[serde(default = "default_memory_cap")]
    pub memory_cap: usize,
    /// Browsers that have written nothing for this long lose their autofill memory.
    #[serde(default = "default_device_cache_days")]
    pub device_cache_days: i64,
    #[serde(default)]
    pub chrome_path: Option<String>,
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

fn default_database_url() -> String {
    "sqlite://labcover.db?mode=rwc".to_string()
}

fn default_settle_delay_ms() -> u64 {
    300
}

fn default_session_hours() -> i64 {
    24
}

fn default_memory_cap() -> usize {
    DEFAULT_CAP
}

fn default_device_cache_days() -> i64 {
    180
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            settle_delay_ms: default_settle_delay_ms(),
            session_hours: default_session_hours(),
            memory_cap: default_memory_cap(),
            device_cache_days: default_device_cache_days(),
            chrome_path: None,
            admin_emails: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.trim().eq_ignore_ascii_case(email.trim()))
    }
}
