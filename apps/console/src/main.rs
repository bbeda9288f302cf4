use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use concierge_chats::{
    HistoryRecord, InMemoryHistoryRepository, InMemoryProfileDirectory, PeerProfile,
    PresenceState, RecordingEscalationHandler, RoomId, SessionView,
};
use concierge_config::{load as load_config, AppConfig};
use concierge_runtime::{shutdown_signal, telemetry, SessionServices};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

mod peer;

use peer::PeerDriver;

#[derive(Parser)]
#[command(name = "concierge")]
#[command(about = "Concierge chat console (in-process demo by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat over seeded in-memory history (default)
    Demo(Participants),
    /// Chat with history and profiles from the configured backend
    Connect(Participants),
}

#[derive(Args, Clone)]
struct Participants {
    /// Local user id
    #[arg(long, default_value = "tenant")]
    user: String,
    /// Remote peer id
    #[arg(long, default_value = "owner")]
    peer: String,
}

impl Default for Participants {
    fn default() -> Self {
        Self {
            user: "tenant".to_string(),
            peer: "owner".to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing().context("failed to initialise tracing")?;
    let config = load_config().context("failed to load configuration")?;

    match cli
        .command
        .unwrap_or_else(|| Commands::Demo(Participants::default()))
    {
        Commands::Demo(participants) => {
            let (services, escalations) = demo_services(&config, &participants).await;
            run_console(services, participants, Some(escalations)).await
        }
        Commands::Connect(participants) => {
            let services = SessionServices::initialise(&config)
                .context("failed to initialise session services")?;
            run_console(services, participants, None).await
        }
    }
}

/// In-memory collaborators seeded with a short conversation from yesterday
async fn demo_services(
    config: &AppConfig,
    participants: &Participants,
) -> (SessionServices, Arc<RecordingEscalationHandler>) {
    let room = RoomId::derive(&participants.user, &participants.peer);
    let yesterday = Utc::now() - chrono::Duration::hours(26);

    let history = Arc::new(InMemoryHistoryRepository::new());
    history
        .seed(
            &room,
            [
                (
                    &participants.user,
                    &participants.peer,
                    "Hello, I saw the listing for the apartment on Elm Street.",
                ),
                (
                    &participants.peer,
                    &participants.user,
                    "Thanks for your interest! Feel free to ask anything.",
                ),
            ]
            .into_iter()
            .enumerate()
            .map(|(index, (sender, receiver, body))| HistoryRecord {
                id: Some(format!("seed-{index}")),
                sender: Some(sender.clone()),
                receiver: Some(receiver.clone()),
                body: Some(body.to_string()),
                created_at: Some(yesterday + chrono::Duration::minutes(index as i64)),
                read: Some(true),
                ..HistoryRecord::default()
            }),
        )
        .await;

    let profiles = Arc::new(InMemoryProfileDirectory::new());
    profiles
        .insert(PeerProfile {
            user_id: participants.peer.clone(),
            display_name: "Property owner".to_string(),
            avatar_url: None,
        })
        .await;

    let escalations = Arc::new(RecordingEscalationHandler::new());
    let services = SessionServices::new(config, history, profiles, escalations.clone());
    (services, escalations)
}

async fn run_console(
    services: SessionServices,
    participants: Participants,
    escalations: Option<Arc<RecordingEscalationHandler>>,
) -> anyhow::Result<()> {
    info!(user = %participants.user, peer = %participants.peer, "starting interactive console");

    let context = services.context();
    let mut session = context
        .open(participants.user.clone(), participants.peer.clone())
        .await
        .context("failed to open chat session")?;
    // The other side of the conversation, driven with /peer, /typing and /notice.
    let peer = PeerDriver::new(
        services.channel.clone(),
        participants.peer.clone(),
        participants.user.clone(),
    );
    peer.join().await?;

    println!("Concierge Interactive Console");
    println!(
        "Chatting as '{}' with '{}' in room {}",
        participants.user,
        session.peer().display_name,
        session.room()
    );
    println!("Type a message, or '/help' for commands. Use Ctrl+C or '/quit' to exit");
    println!("---");

    let mut screen = Screen::default();
    screen.refresh(&session.view());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(200));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                screen.refresh(&session.view());
                continue;
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            break; // EOF
        };

        let command = line.trim();
        if command.is_empty() {
            continue;
        }

        match command {
            "/quit" | "/exit" | "/q" => {
                println!("Goodbye!");
                break;
            }
            "/help" | "/h" => print_help(),
            "/read" | "/r" => {
                let changed = session.mark_all_read();
                println!("Marked {changed} message(s) as read");
            }
            "/view" | "/v" => {
                let view = serde_json::to_string_pretty(&session.view())
                    .context("failed to render session view")?;
                println!("{view}");
            }
            "/typing" | "/t" => {
                if let Err(error) = peer.start_typing().await {
                    println!("Could not signal typing: {error:#}");
                }
            }
            "/dismiss" | "/d" => session.dismiss_error(),
            "/tickets" => match &escalations {
                Some(escalations) => {
                    let tickets = escalations.tickets();
                    if tickets.is_empty() {
                        println!("No escalations yet");
                    }
                    for ticket in tickets {
                        println!("{}", serde_json::to_string(&ticket)?);
                    }
                }
                None => println!("Escalations are logged in connect mode"),
            },
            other => {
                if let Some(text) = other.strip_prefix("/peer ") {
                    if let Err(error) = peer.say(text).await {
                        println!("Could not send as peer: {error:#}");
                    }
                } else if let Some(text) = other.strip_prefix("/notice ") {
                    if let Err(error) = peer.notice(text).await {
                        println!("Could not send notice: {error:#}");
                    }
                } else if other.starts_with('/') {
                    println!("Unknown command '{other}', type /help for a list");
                } else {
                    session.send(other).context("failed to send message")?;
                }
            }
        }

        screen.refresh(&session.view());
    }

    peer.leave().await?;
    session.close().await.context("failed to close chat session")?;

    info!("console shut down");
    Ok(())
}

fn print_help() {
    println!("Available commands:");
    println!("  <text>             - Send a message");
    println!("  /peer <text>       - Send a message as the peer");
    println!("  /typing, /t        - Let the peer start typing");
    println!("  /notice <text>     - Push a notice from the peer");
    println!("  /read, /r          - Mark all messages as read");
    println!("  /dismiss, /d       - Clear the current error");
    println!("  /view, /v          - Print the session view as JSON");
    println!("  /tickets           - List escalations (demo only)");
    println!("  /help, /h          - Show this help");
    println!("  /quit, /exit, /q   - Exit console");
}

/// Tracks what has been printed so each refresh only shows changes
#[derive(Default)]
struct Screen {
    shown: usize,
    last_day: Option<NaiveDate>,
    presence: PresenceState,
    notification: Option<String>,
    error: Option<String>,
}

impl Screen {
    fn refresh(&mut self, view: &SessionView) {
        for message in view.messages.iter().skip(self.shown) {
            let day = message.day();
            if self.last_day != Some(day) {
                println!("--- {} ---", day.format("%A, %d %B %Y"));
                self.last_day = Some(day);
            }

            let author = if message.sender_id == view.local_id {
                "you"
            } else if message.sender_id == view.peer.user_id {
                view.peer.display_name.as_str()
            } else {
                message.sender_id.as_str()
            };
            let marker = if message.read { ' ' } else { '*' };
            println!(
                "{marker}[{}] {author}: {}",
                message.created_at.format("%H:%M"),
                message.body
            );
        }
        self.shown = view.messages.len();

        if view.presence != self.presence {
            let name = &view.peer.display_name;
            if view.presence.is_online != self.presence.is_online {
                let status = if view.presence.is_online { "online" } else { "offline" };
                println!("({name} is {status})");
            }
            if view.presence.is_typing && !self.presence.is_typing {
                println!("({name} is typing...)");
            }
            self.presence = view.presence;
        }

        let notification = view.notification.as_ref().map(|notice| notice.text.clone());
        if notification != self.notification {
            if let Some(text) = &notification {
                println!("(notice) {text}");
            }
            self.notification = notification;
        }

        if view.error != self.error {
            if let Some(error) = &view.error {
                println!("(error) {error}");
            }
            self.error = view.error.clone();
        }
    }
}
