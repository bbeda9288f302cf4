use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "concierge.toml",
    "config/concierge.toml",
    "crates/config/concierge.toml",
    "../concierge.toml",
    "../config/concierge.toml",
    "../crates/config/concierge.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub responder: ResponderConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub typing: TypingConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
}

impl AppConfig {
    /// Reject values the session engine cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            !self.history.base_url.trim().is_empty(),
            "history.base_url must not be empty"
        );
        ensure!(
            self.history.request_timeout_seconds > 0,
            "history.request_timeout_seconds must be greater than zero"
        );
        ensure!(
            self.responder.match_threshold > 0.0 && self.responder.match_threshold <= 1.0,
            "responder.match_threshold must be within (0, 1], got {}",
            self.responder.match_threshold
        );
        ensure!(
            !self.responder.bot_sender_id.trim().is_empty(),
            "responder.bot_sender_id must not be empty"
        );
        ensure!(
            self.notifications.visible_ms > 0,
            "notifications.visible_ms must be greater than zero"
        );
        ensure!(self.typing.idle_ms > 0, "typing.idle_ms must be greater than zero");
        ensure!(self.channel.capacity > 0, "channel.capacity must be greater than zero");
        Ok(())
    }
}

/// REST backend serving message history and peer profiles.
///
/// ```
/// use concierge_config::HistoryConfig;
///
/// let history = HistoryConfig::default();
/// assert_eq!(history.base_url, "http://127.0.0.1:7070/api");
/// assert_eq!(history.request_timeout().as_secs(), 10);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "HistoryConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "HistoryConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl HistoryConfig {
    fn default_base_url() -> String {
        "http://127.0.0.1:7070/api".to_string()
    }

    const fn default_request_timeout() -> u64 {
        10
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderConfig {
    #[serde(default = "ResponderConfig::default_reply_delay")]
    pub reply_delay_ms: u64,
    #[serde(default = "ResponderConfig::default_match_threshold")]
    pub match_threshold: f64,
    #[serde(default = "ResponderConfig::default_bot_sender_id")]
    pub bot_sender_id: String,
    #[serde(default = "ResponderConfig::default_fallback_reply")]
    pub fallback_reply: String,
}

impl ResponderConfig {
    const fn default_reply_delay() -> u64 {
        600
    }

    const fn default_match_threshold() -> f64 {
        0.85
    }

    fn default_bot_sender_id() -> String {
        "bot".to_string()
    }

    fn default_fallback_reply() -> String {
        "Thanks for reaching out! Your query has been forwarded and will be handled within 24 hours."
            .to_string()
    }

    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            reply_delay_ms: Self::default_reply_delay(),
            match_threshold: Self::default_match_threshold(),
            bot_sender_id: Self::default_bot_sender_id(),
            fallback_reply: Self::default_fallback_reply(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "NotificationConfig::default_visible_ms")]
    pub visible_ms: u64,
}

impl NotificationConfig {
    const fn default_visible_ms() -> u64 {
        3_000
    }

    pub fn visible_for(&self) -> Duration {
        Duration::from_millis(self.visible_ms)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            visible_ms: Self::default_visible_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingConfig {
    #[serde(default = "TypingConfig::default_idle_ms")]
    pub idle_ms: u64,
}

impl TypingConfig {
    const fn default_idle_ms() -> u64 {
        1_500
    }

    pub fn idle_after(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            idle_ms: Self::default_idle_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "ChannelConfig::default_capacity")]
    pub capacity: usize,
}

impl ChannelConfig {
    const fn default_capacity() -> usize {
        100
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: Self::default_capacity(),
        }
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use concierge_config::load;
///
/// std::env::remove_var("CONCIERGE_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.history.base_url.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder()
        .set_default("history.base_url", defaults.history.base_url.clone())?
        .set_default(
            "history.request_timeout_seconds",
            saturating_i64(defaults.history.request_timeout_seconds),
        )?
        .set_default(
            "responder.reply_delay_ms",
            saturating_i64(defaults.responder.reply_delay_ms),
        )?
        .set_default("responder.match_threshold", defaults.responder.match_threshold)?
        .set_default("responder.bot_sender_id", defaults.responder.bot_sender_id.clone())?
        .set_default("responder.fallback_reply", defaults.responder.fallback_reply.clone())?
        .set_default(
            "notifications.visible_ms",
            saturating_i64(defaults.notifications.visible_ms),
        )?
        .set_default("typing.idle_ms", saturating_i64(defaults.typing.idle_ms))?
        .set_default(
            "channel.capacity",
            i64::try_from(defaults.channel.capacity).unwrap_or(i64::MAX),
        )?;

    let environment_overrides = config::Environment::with_prefix("CONCIERGE").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("CONCIERGE_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via CONCIERGE_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;
    config.validate().context("invalid configuration")?;

    debug!(?config, "loaded concierge configuration");
    Ok(config)
}
