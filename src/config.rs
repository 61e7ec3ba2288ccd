use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::api::RetryPolicy;
use crate::error::{MoveMintError, Result};

/// Directory under the project root holding project-level state.
pub const PROJECT_DIR: &str = ".movemint";

/// Longest accepted `session.max_age`.
pub const MAX_SESSION_AGE: Duration = Duration::from_secs(365 * 24 * 3600);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

impl Config {
    /// Load defaults, then config files, then `MOVEMINT_*` overrides.
    pub fn load(explicit_path: Option<&Path>, root: &Path) -> Result<Self> {
        Self::load_with_env(explicit_path, root, |key| std::env::var(key).ok())
    }

    /// [`Config::load`] with a custom environment lookup.
    pub fn load_with_env<F>(explicit_path: Option<&Path>, root: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| env("MOVEMINT_CONFIG").map(PathBuf::from));

        if let Some(path) = explicit {
            match Self::load_patch(&path)? {
                Some(patch) => config.merge_patch(patch),
                None => {
                    return Err(MoveMintError::Config(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_patch(&Self::project_path(root))? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides(&env)?;
        config.validate()?;

        Ok(config)
    }

    #[must_use]
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("movemint").join("config.toml"))
    }

    #[must_use]
    pub fn project_path(root: &Path) -> PathBuf {
        root.join(PROJECT_DIR).join("config.toml")
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        match Self::global_path() {
            Some(path) => Self::load_patch(&path),
            None => Ok(None),
        }
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| MoveMintError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| MoveMintError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.api {
            self.api.merge(patch);
        }
        if let Some(patch) = patch.retry {
            self.retry.merge(patch);
        }
        if let Some(patch) = patch.session {
            self.session.merge(patch);
        }
        if let Some(patch) = patch.polling {
            self.polling.merge(patch);
        }
    }

    fn apply_env_overrides<F>(&mut self, env: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = env_string(env, "MOVEMINT_API_BASE_URL") {
            self.api.base_url = value;
        }
        if let Some(value) = env_u64(env, "MOVEMINT_API_TIMEOUT_SECS")? {
            self.api.timeout = Duration::from_secs(value);
        }
        if let Some(value) = env_u64(env, "MOVEMINT_API_UPLOAD_TIMEOUT_SECS")? {
            self.api.upload_timeout = Duration::from_secs(value);
        }
        if let Some(value) = env_string(env, "MOVEMINT_API_KEY") {
            self.api.api_key = Some(value);
        }

        if let Some(value) = env_u32(env, "MOVEMINT_RETRY_MAX_RETRIES")? {
            self.retry.max_retries = value;
        }
        if let Some(value) = env_u64(env, "MOVEMINT_RETRY_INITIAL_DELAY_MS")? {
            self.retry.initial_delay = Duration::from_millis(value);
        }
        if let Some(value) = env_u64(env, "MOVEMINT_RETRY_MAX_DELAY_MS")? {
            self.retry.max_delay = Duration::from_millis(value);
        }

        if let Some(value) = env_string(env, "MOVEMINT_SESSION_DIR") {
            self.session.storage_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = env_u64(env, "MOVEMINT_SESSION_MAX_AGE_HOURS")? {
            self.session.max_age = Duration::from_secs(value.saturating_mul(3600));
        }

        if let Some(value) = env_u64(env, "MOVEMINT_POLL_INTERVAL_MS")? {
            self.polling.interval = Duration::from_millis(value);
        }

        Ok(())
    }

    /// Reject values that would make the client misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(MoveMintError::MissingConfig("api.base_url".to_string()));
        }
        if self.api.timeout.is_zero() {
            return Err(MoveMintError::Config("api.timeout must be positive".to_string()));
        }
        if self.api.upload_timeout.is_zero() {
            return Err(MoveMintError::Config(
                "api.upload_timeout must be positive".to_string(),
            ));
        }
        if !(1.0..=10.0).contains(&self.retry.backoff_multiplier) {
            return Err(MoveMintError::Config(format!(
                "retry.backoff_multiplier must be between 1 and 10, got {}",
                self.retry.backoff_multiplier
            )));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter_factor) {
            return Err(MoveMintError::Config(format!(
                "retry.jitter_factor must be between 0 and 1, got {}",
                self.retry.jitter_factor
            )));
        }
        if self.retry.initial_delay > self.retry.max_delay {
            return Err(MoveMintError::Config(
                "retry.initial_delay must not exceed retry.max_delay".to_string(),
            ));
        }
        if self.session.max_age.is_zero() {
            return Err(MoveMintError::Config("session.max_age must be positive".to_string()));
        }
        if self.session.max_age > MAX_SESSION_AGE {
            return Err(MoveMintError::Config(
                "session.max_age must be at most 365 days".to_string(),
            ));
        }
        if self.polling.interval.is_zero() {
            return Err(MoveMintError::Config("polling.interval must be positive".to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            initial_delay: self.retry.initial_delay,
            max_delay: self.retry.max_delay,
            backoff_multiplier: self.retry.backoff_multiplier,
            jitter_factor: self.retry.jitter_factor,
        }
    }

    #[must_use]
    pub fn session_max_age(&self) -> TimeDelta {
        TimeDelta::from_std(self.session.max_age).unwrap_or(TimeDelta::MAX)
    }

    /// Where session files live: the configured directory, else the platform
    /// data directory.
    pub fn session_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.session.storage_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join("movemint").join("sessions"))
            .ok_or_else(|| MoveMintError::MissingConfig("session.storage_dir".to_string()))
    }

    /// Copy safe to print: the API key is masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.api.api_key.is_some() {
            copy.api.api_key = Some("********".to_string());
        }
        copy
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_api_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Whole-request limit for file uploads, which outlast plain JSON calls.
    #[serde(default = "default_upload_timeout", with = "humantime_serde")]
    pub upload_timeout: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Sent instead of `movemint/<version>` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

fn default_api_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_upload_timeout() -> Duration {
    Duration::from_secs(10 * 60)
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout: default_api_timeout(),
            upload_timeout: default_upload_timeout(),
            api_key: None,
            user_agent: None,
        }
    }
}

impl ApiConfig {
    fn merge(&mut self, patch: ApiPatch) {
        if let Some(value) = patch.base_url {
            self.base_url = value;
        }
        if let Some(value) = patch.timeout {
            self.timeout = value;
        }
        if let Some(value) = patch.upload_timeout {
            self.upload_timeout = value;
        }
        if let Some(value) = patch.api_key {
            self.api_key = Some(value);
        }
        if let Some(value) = patch.user_agent {
            self.user_agent = Some(value);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default, with = "humantime_serde")]
    pub initial_delay: Duration,
    #[serde(default, with = "humantime_serde")]
    pub max_delay: Duration,
    #[serde(default)]
    pub backoff_multiplier: f64,
    #[serde(default)]
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            initial_delay: policy.initial_delay,
            max_delay: policy.max_delay,
            backoff_multiplier: policy.backoff_multiplier,
            jitter_factor: policy.jitter_factor,
        }
    }
}

impl RetryConfig {
    fn merge(&mut self, patch: RetryPatch) {
        if let Some(value) = patch.max_retries {
            self.max_retries = value;
        }
        if let Some(value) = patch.initial_delay {
            self.initial_delay = value;
        }
        if let Some(value) = patch.max_delay {
            self.max_delay = value;
        }
        if let Some(value) = patch.backoff_multiplier {
            self.backoff_multiplier = value;
        }
        if let Some(value) = patch.jitter_factor {
            self.jitter_factor = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,
    #[serde(default = "default_session_max_age", with = "humantime_serde")]
    pub max_age: Duration,
}

fn default_session_max_age() -> Duration {
    Duration::from_secs(24 * 3600)
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_dir: None,
            max_age: default_session_max_age(),
        }
    }
}

impl SessionConfig {
    fn merge(&mut self, patch: SessionPatch) {
        if let Some(value) = patch.storage_dir {
            self.storage_dir = Some(value);
        }
        if let Some(value) = patch.max_age {
            self.max_age = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub interval: Duration,
    #[serde(default = "default_poll_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_poll_timeout() -> Duration {
    Duration::from_secs(600)
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            timeout: default_poll_timeout(),
        }
    }
}

impl PollingConfig {
    fn merge(&mut self, patch: PollingPatch) {
        if let Some(value) = patch.interval {
            self.interval = value;
        }
        if let Some(value) = patch.timeout {
            self.timeout = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    pub api: Option<ApiPatch>,
    pub retry: Option<RetryPatch>,
    pub session: Option<SessionPatch>,
    pub polling: Option<PollingPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ApiPatch {
    pub base_url: Option<String>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub upload_timeout: Option<Duration>,
    pub api_key: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RetryPatch {
    pub max_retries: Option<u32>,
    #[serde(default, with = "humantime_serde")]
    pub initial_delay: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub max_delay: Option<Duration>,
    pub backoff_multiplier: Option<f64>,
    pub jitter_factor: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SessionPatch {
    pub storage_dir: Option<PathBuf>,
    #[serde(default, with = "humantime_serde")]
    pub max_age: Option<Duration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PollingPatch {
    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

fn env_string<F>(env: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    env(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn env_u32<F>(env: &F, key: &str) -> Result<Option<u32>>
where
    F: Fn(&str) -> Option<String>,
{
    match env_string(env, key) {
        Some(value) => value.parse::<u32>().map(Some).map_err(|err| {
            MoveMintError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        None => Ok(None),
    }
}

fn env_u64<F>(env: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    match env_string(env, key) {
        Some(value) => value.parse::<u64>().map(Some).map_err(|err| {
            MoveMintError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        None => Ok(None),
    }
}
