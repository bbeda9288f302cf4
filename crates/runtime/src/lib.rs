use std::sync::Arc;

use anyhow::{Context, Result};
use concierge_chats::{
    EscalationHandler, HistoryRepository, HttpHistoryRepository, HttpProfileDirectory,
    LocalEventChannel, LoggingEscalationHandler, ProfileDirectory, SessionContext,
    SessionSettings,
};
use concierge_config::AppConfig;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing_subscriber::{fmt, EnvFilter};

    /// Install the global subscriber, honouring `RUST_LOG` and defaulting to `info`.
    ///
    /// Log lines go to stderr so they never interleave with console output.
    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Map the loaded configuration onto the engine's session tunables
pub fn session_settings(config: &AppConfig) -> SessionSettings {
    SessionSettings {
        reply_delay: config.responder.reply_delay(),
        match_threshold: config.responder.match_threshold,
        bot_sender_id: config.responder.bot_sender_id.clone(),
        fallback_reply: config.responder.fallback_reply.clone(),
        notification_ttl: config.notifications.visible_for(),
        typing_idle: config.typing.idle_after(),
    }
}

/// Collaborators shared by every chat session of the process
#[derive(Clone)]
pub struct SessionServices {
    pub channel: LocalEventChannel,
    pub history: Arc<dyn HistoryRepository>,
    pub profiles: Arc<dyn ProfileDirectory>,
    pub escalation: Arc<dyn EscalationHandler>,
    pub settings: SessionSettings,
}

impl SessionServices {
    /// Wire the REST backend from `config.history` behind an in-process channel.
    pub fn initialise(config: &AppConfig) -> Result<Self> {
        let timeout = config.history.request_timeout();

        let history = HttpHistoryRepository::new(config.history.base_url.clone(), timeout)
            .context("failed to build history client")?;
        let profiles = HttpProfileDirectory::new(config.history.base_url.clone(), timeout)
            .context("failed to build profile client")?;

        info!(
            base_url = %config.history.base_url,
            timeout_seconds = config.history.request_timeout_seconds,
            "history backend configured"
        );

        Ok(Self::new(
            config,
            Arc::new(history),
            Arc::new(profiles),
            Arc::new(LoggingEscalationHandler),
        ))
    }

    /// Wire explicit collaborators, taking channel and session tunables from `config`.
    pub fn new(
        config: &AppConfig,
        history: Arc<dyn HistoryRepository>,
        profiles: Arc<dyn ProfileDirectory>,
        escalation: Arc<dyn EscalationHandler>,
    ) -> Self {
        Self {
            channel: LocalEventChannel::new(config.channel.capacity),
            history,
            profiles,
            escalation,
            settings: session_settings(config),
        }
    }

    /// Session context over these collaborators, using the built-in FAQ table
    pub fn context(&self) -> SessionContext {
        SessionContext::new(Arc::new(self.channel.clone()), Arc::clone(&self.history))
            .with_profiles(Arc::clone(&self.profiles))
            .with_escalation(Arc::clone(&self.escalation))
            .with_settings(self.settings.clone())
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
