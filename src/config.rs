use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::core::{EngineSettings, MAX_PERIOD_SECS};
use crate::models::{RankingWeights, UserId};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub appwrite: AppwriteSettings,
    #[serde(default)]
    pub ranking: RankingSettings,
    #[serde(default)]
    pub limits: LimitSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub moderation: ModerationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Which profile backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Appwrite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            timeout_ms: default_store_timeout_ms(),
        }
    }
}

fn default_store_timeout_ms() -> u64 { 3000 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppwriteSettings {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub database_id: String,
    #[serde(default = "default_profiles_collection")]
    pub profiles_collection: String,
    pub page_size: Option<usize>,
}

fn default_profiles_collection() -> String { "profiles".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct RankingSettings {
    #[serde(default = "default_hours_weight")]
    pub hours_weight: f64,
    #[serde(default = "default_age_weight")]
    pub age_weight: f64,
    #[serde(default = "default_verified_bonus")]
    pub verified_bonus: f64,
    #[serde(default = "default_keyword_bonus")]
    pub keyword_bonus: f64,
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            hours_weight: default_hours_weight(),
            age_weight: default_age_weight(),
            verified_bonus: default_verified_bonus(),
            keyword_bonus: default_keyword_bonus(),
            keywords: default_keywords(),
        }
    }
}

impl From<&RankingSettings> for RankingWeights {
    fn from(settings: &RankingSettings) -> Self {
        Self {
            hours: settings.hours_weight,
            age: settings.age_weight,
            verified_bonus: settings.verified_bonus,
            keyword_bonus: settings.keyword_bonus,
            keywords: settings.keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

fn default_hours_weight() -> f64 { 0.5 }
fn default_age_weight() -> f64 { 0.5 }
fn default_verified_bonus() -> f64 { -20.0 }
fn default_keyword_bonus() -> f64 { -10.0 }
fn default_keywords() -> Vec<String> {
    RankingWeights::default().keywords
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitSettings {
    #[serde(default = "default_find_limit")]
    pub find_partner_limit: u32,
    #[serde(default = "default_find_period")]
    pub find_partner_period_secs: u64,
    #[serde(default = "default_daily_likes")]
    pub daily_likes: u32,
    #[serde(default = "default_like_period")]
    pub like_period_secs: u64,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            find_partner_limit: default_find_limit(),
            find_partner_period_secs: default_find_period(),
            daily_likes: default_daily_likes(),
            like_period_secs: default_like_period(),
        }
    }
}

fn default_find_limit() -> u32 { 5 }
fn default_find_period() -> u64 { 60 }
fn default_daily_likes() -> u32 { 10 }
fn default_like_period() -> u64 { 86_400 }

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_idle_secs")]
    pub idle_secs: u64,
    #[serde(default = "default_capacity")]
    pub capacity: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_secs: default_idle_secs(),
            capacity: default_capacity(),
        }
    }
}

fn default_idle_secs() -> u64 { 1800 }
fn default_capacity() -> u64 { 10_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct ModerationSettings {
    #[serde(default = "default_report_threshold")]
    pub report_threshold: usize,
    /// User ids allowed to run moderator operations
    #[serde(default)]
    pub admin_ids: Vec<String>,
    #[serde(default = "default_housekeeping_secs")]
    pub housekeeping_interval_secs: u64,
}

impl Default for ModerationSettings {
    fn default() -> Self {
        Self {
            report_threshold: default_report_threshold(),
            admin_ids: Vec::new(),
            housekeeping_interval_secs: default_housekeeping_secs(),
        }
    }
}

fn default_report_threshold() -> usize { 3 }
fn default_housekeeping_secs() -> u64 { 300 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with DUO__)
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., DUO__SERVER__PORT -> server.port
            .add_source(environment())
            .build()?
            .try_deserialize::<Self>()?
            .validated()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?
            .try_deserialize::<Self>()?
            .validated()
    }

    /// Reject limit periods the limiter cannot represent
    fn validated(self) -> Result<Self, ConfigError> {
        for (key, period) in [
            ("limits.find_partner_period_secs", self.limits.find_partner_period_secs),
            ("limits.like_period_secs", self.limits.like_period_secs),
        ] {
            if period == 0 || period > MAX_PERIOD_SECS {
                return Err(ConfigError::Message(format!(
                    "{} must be between 1 and {} seconds, got {}",
                    key, MAX_PERIOD_SECS, period
                )));
            }
        }
        Ok(self)
    }

    /// Engine tunables derived from the loaded sections
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            find_limit: self.limits.find_partner_limit,
            find_period_secs: self.limits.find_partner_period_secs,
            like_limit: self.limits.daily_likes,
            like_period_secs: self.limits.like_period_secs,
            store_timeout: Duration::from_millis(self.store.timeout_ms),
            report_threshold: self.moderation.report_threshold,
            moderators: self
                .moderation
                .admin_ids
                .iter()
                .map(|id| UserId::new(id.as_str()))
                .collect(),
            weights: RankingWeights::from(&self.ranking),
        }
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session.idle_secs)
    }

    /// Housekeeping period, never below one second
    pub fn housekeeping_interval(&self) -> Duration {
        Duration::from_secs(self.moderation.housekeeping_interval_secs.max(1))
    }
}

fn environment() -> Environment {
    Environment::with_prefix("DUO")
        .prefix_separator("__")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("moderation.admin_ids")
        .with_list_parse_key("ranking.keywords")
        .try_parsing(true)
}
