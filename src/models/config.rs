//! Application configuration structures.

use std::fs;
use std::path::Path;

use chrono::{Local, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Portal URLs and navigation settings
    #[serde(default)]
    pub portal: PortalConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Polling loop and active-hours settings
    #[serde(default)]
    pub poll: PollConfig,

    /// Notification settings
    #[serde(default)]
    pub notify: NotifyConfig,

    /// On-disk state locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Credential resolution settings
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.portal.base_url.trim().is_empty() {
            return Err(AppError::config("portal.base_url is empty"));
        }
        if self.portal.history_path.trim().is_empty() {
            return Err(AppError::config("portal.history_path is empty"));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::config("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::config("http.timeout_secs must be > 0"));
        }
        if self.poll.idle_min_minutes >= self.poll.idle_max_minutes {
            return Err(AppError::config(
                "poll.idle_min_minutes must be < poll.idle_max_minutes",
            ));
        }
        if self.poll.backoff_min_secs >= self.poll.backoff_max_secs {
            return Err(AppError::config(
                "poll.backoff_min_secs must be < poll.backoff_max_secs",
            ));
        }
        self.poll.active_window()?;
        if self.notify.chat_id.trim().is_empty() {
            return Err(AppError::config("notify.chat_id is empty"));
        }
        Ok(())
    }
}

/// Portal URLs and navigation behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Landing page of the student-records portal
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Fixed path of the academic-history resource, used both as the
    /// session probe target and as the page the records are read from
    #[serde(default = "defaults::history_path")]
    pub history_path: String,

    /// Pause between login steps so server-side state can settle
    #[serde(default = "defaults::settle_ms")]
    pub settle_ms: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            history_path: defaults::history_path(),
            settle_ms: defaults::settle_ms(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Polling loop behavior: sleep bounds and the active-hours window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Start of the daily polling window, "HH:MM"
    #[serde(default = "defaults::active_start")]
    pub active_start: String,

    /// End of the daily polling window, "HH:MM" (may wrap past midnight)
    #[serde(default = "defaults::active_end")]
    pub active_end: String,

    /// Lower bound for the sleep after a successful cycle, minutes
    #[serde(default = "defaults::idle_min_minutes")]
    pub idle_min_minutes: u64,

    /// Upper bound (exclusive) for the post-success sleep, minutes
    #[serde(default = "defaults::idle_max_minutes")]
    pub idle_max_minutes: u64,

    /// Lower bound for the backoff after a failed cycle, seconds
    #[serde(default = "defaults::backoff_min_secs")]
    pub backoff_min_secs: u64,

    /// Upper bound (exclusive) for the post-failure backoff, seconds
    #[serde(default = "defaults::backoff_max_secs")]
    pub backoff_max_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            active_start: defaults::active_start(),
            active_end: defaults::active_end(),
            idle_min_minutes: defaults::idle_min_minutes(),
            idle_max_minutes: defaults::idle_max_minutes(),
            backoff_min_secs: defaults::backoff_min_secs(),
            backoff_max_secs: defaults::backoff_max_secs(),
        }
    }
}

impl PollConfig {
    /// Parse the configured active window.
    pub fn active_window(&self) -> Result<ActiveWindow> {
        let start = parse_clock(&self.active_start)?;
        let end = parse_clock(&self.active_end)?;
        if start == end {
            return Err(AppError::config(
                "poll.active_start and poll.active_end must differ",
            ));
        }
        Ok(ActiveWindow { start, end })
    }
}

fn parse_clock(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|e| AppError::config(format!("invalid clock time '{s}': {e}")))
}

/// Daily time-of-day range during which polling is permitted.
///
/// A window whose end precedes its start wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ActiveWindow {
    /// Whether the current local time falls inside the window.
    pub fn within_active_hours(&self) -> bool {
        self.contains(Local::now().time())
    }

    /// Seconds until the window next opens, from the current local time.
    pub fn seconds_until_active_hours_begin(&self) -> u64 {
        self.seconds_until_start(Local::now().time())
    }

    /// Whether `now` falls inside the window.
    pub fn contains(&self, now: NaiveTime) -> bool {
        if self.start < self.end {
            self.start <= now && now < self.end
        } else {
            now >= self.start || now < self.end
        }
    }

    /// Seconds from `now` until the next window start.
    pub fn seconds_until_start(&self, now: NaiveTime) -> u64 {
        let mut secs = (self.start - now).num_seconds();
        if secs <= 0 {
            secs += 86_400;
        }
        secs as u64
    }
}

/// Notification transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Environment variable holding the Telegram bot token
    #[serde(default = "defaults::token_env")]
    pub token_env: String,

    /// Chat to deliver notifications to
    #[serde(default)]
    pub chat_id: String,

    /// Bot API base URL (overridable for self-hosted servers)
    #[serde(default = "defaults::api_base")]
    pub api_base: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            token_env: defaults::token_env(),
            chat_id: String::new(),
            api_base: defaults::api_base(),
        }
    }
}

/// On-disk state locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Record store file (JSON)
    #[serde(default = "defaults::records_path")]
    pub records_path: String,

    /// Cookie snapshot file (JSON)
    #[serde(default = "defaults::cookies_path")]
    pub cookies_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            records_path: defaults::records_path(),
            cookies_path: defaults::cookies_path(),
        }
    }
}

/// Names of the environment variables the credentials are read from.
///
/// The secrets themselves never appear in the config file; they are
/// resolved on demand at login time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "defaults::username_env")]
    pub username_env: String,

    #[serde(default = "defaults::password_env")]
    pub password_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            username_env: defaults::username_env(),
            password_env: defaults::password_env(),
        }
    }
}

impl CredentialsConfig {
    /// Resolve the credentials from the environment.
    pub fn resolve(&self) -> Result<Credentials> {
        let read = |name: &str| {
            std::env::var(name)
                .map_err(|_| AppError::config(format!("environment variable {name} is not set")))
        };
        Ok(Credentials {
            username: read(&self.username_env)?,
            password: read(&self.password_env)?,
        })
    }
}

/// Resolved portal credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

mod defaults {
    // Portal defaults
    pub fn base_url() -> String {
        "https://studentrecords.vuw.ac.nz/".into()
    }
    pub fn history_path() -> String {
        "/pls/webprod/bwsxacdh.P_FacStuInfo".into()
    }
    pub fn settle_ms() -> u64 {
        1000
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; gradewatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Poll defaults
    pub fn active_start() -> String {
        "08:00".into()
    }
    pub fn active_end() -> String {
        "23:00".into()
    }
    pub fn idle_min_minutes() -> u64 {
        15
    }
    pub fn idle_max_minutes() -> u64 {
        30
    }
    pub fn backoff_min_secs() -> u64 {
        60
    }
    pub fn backoff_max_secs() -> u64 {
        180
    }

    // Notify defaults
    pub fn token_env() -> String {
        "GRADEWATCH_TELEGRAM_TOKEN".into()
    }
    pub fn api_base() -> String {
        "https://api.telegram.org".into()
    }

    // Storage defaults
    pub fn records_path() -> String {
        "records.json".into()
    }
    pub fn cookies_path() -> String {
        "cookies.json".into()
    }

    // Credential defaults
    pub fn username_env() -> String {
        "GRADEWATCH_USERNAME".into()
    }
    pub fn password_env() -> String {
        "GRADEWATCH_PASSWORD".into()
    }
}
