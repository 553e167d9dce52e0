use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::errors::AppError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(".")
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Config::builder()
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/default")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/local")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(
                Environment::default()
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("collector.usernames")
                    .with_list_parse_key("collector.repositories")
                    .with_list_parse_key("collector.organizations")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Rejects values the collector cannot act on. Runs after loading so a
    /// bad entry fails at startup rather than as a per-key fetch failure.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.collector.usernames.iter().any(|u| u.trim().is_empty()) {
            return Err(AppError::InvalidConfig(
                "collector.usernames contains a blank entry".to_string(),
            ));
        }
        for repo in &self.collector.repositories {
            let valid = matches!(
                repo.split_once('/'),
                Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/')
            );
            if !valid {
                return Err(AppError::InvalidConfig(format!(
                    "collector.repositories entry `{repo}` is not in owner/name form"
                )));
            }
        }
        if self.normalizer.profile_base_url.trim().is_empty() {
            return Err(AppError::InvalidConfig(
                "normalizer.profile_base_url is empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "GithubConfig::default_user_agent")]
    pub user_agent: String,
    #[serde(default = "GithubConfig::default_api_base")]
    pub api_base: String,
    #[serde(default = "GithubConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GithubConfig {
    fn default_user_agent() -> String {
        "etrace-collector/0.1".to_string()
    }

    fn default_api_base() -> String {
        "https://api.github.com/".to_string()
    }

    const fn default_timeout_secs() -> u64 {
        30
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            user_agent: Self::default_user_agent(),
            api_base: Self::default_api_base(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

/// Which timeline of a user to read events from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventScope {
    #[default]
    Public,
    All,
    Received,
    ReceivedPublic,
}

impl EventScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventScope::Public => "public",
            EventScope::All => "all",
            EventScope::Received => "received",
            EventScope::ReceivedPublic => "received_public",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    #[serde(default)]
    pub usernames: Vec<String>,
    /// Repositories as `owner/name`.
    #[serde(default)]
    pub repositories: Vec<String>,
    #[serde(default)]
    pub organizations: Vec<String>,
    #[serde(default)]
    pub event_scope: EventScope,
    #[serde(default = "CollectorConfig::default_per_page")]
    pub per_page: u32,
    #[serde(default = "CollectorConfig::default_concurrency_limit")]
    pub concurrency_limit: usize,
}

impl CollectorConfig {
    const fn default_per_page() -> u32 {
        30
    }

    const fn default_concurrency_limit() -> usize {
        3
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            usernames: Vec::new(),
            repositories: Vec::new(),
            organizations: Vec::new(),
            event_scope: EventScope::default(),
            per_page: Self::default_per_page(),
            concurrency_limit: Self::default_concurrency_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NormalizerConfig {
    /// Base used for profile, actor and repository urls synthesized for
    /// extraction-origin records.
    #[serde(default = "NormalizerConfig::default_profile_base_url")]
    pub profile_base_url: String,
}

impl NormalizerConfig {
    fn default_profile_base_url() -> String {
        "https://github.com".to_string()
    }

    pub fn profile_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.profile_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            profile_base_url: Self::default_profile_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}
