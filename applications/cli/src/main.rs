/// Shelf CLI - headless listening client for audiobook and podcast servers
use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_cli::CliConfig;
use shelf_core::{EpisodeId, LibraryItemId};
use shelf_playback::{
    ClockTransportFactory, DeviceIdentity, PlaybackSessionManager, PlayerHandler, PlayerSettings,
    PlayerSettingsStore, PlayerSettingsUpdate, PlayerSnapshot, RateStep, SessionEvent,
    SessionManagerOptions,
};
use shelf_server_client::ShelfServerClient;
use shelf_storage::{JsonFileStore, KeyValueStore};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shelf-cli")]
#[command(about = "Headless listening client for audiobook and podcast servers", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the server answers
    Ping,
    /// Print this installation's device id
    DeviceId,
    /// Show or change player settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Open a playback session and listen, syncing progress to the server
    Listen {
        /// Library item to play
        item_id: String,
        /// Podcast episode within the item
        #[arg(short, long)]
        episode: Option<String>,
        /// Start position in seconds instead of the server's
        #[arg(short, long)]
        start: Option<f64>,
        /// Stop after this many seconds
        #[arg(long, default_value_t = 60)]
        seconds: u64,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings
    Show,
    /// Change one or more settings
    Set {
        /// Show progress within the current chapter
        #[arg(long)]
        chapter_track: Option<bool>,
        /// Seconds skipped by jump forward
        #[arg(long)]
        jump_forward: Option<f64>,
        /// Seconds skipped by jump backward
        #[arg(long)]
        jump_backward: Option<f64>,
        /// Playback rate (0.5 - 3.0)
        #[arg(long)]
        rate: Option<f64>,
        /// Rate step: 0.1 or 0.05
        #[arg(long)]
        rate_step: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shelf_cli=info,shelf_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Ping => {
            ping(&config).await?;
        }
        Commands::DeviceId => {
            let store = open_store(&config)?;
            println!("{}", DeviceIdentity::new(store).device_id());
        }
        Commands::Settings { action } => {
            settings(&config, action)?;
        }
        Commands::Listen {
            item_id,
            episode,
            start,
            seconds,
        } => {
            listen(&config, &item_id, episode.as_deref(), start, seconds).await?;
        }
    }

    Ok(())
}

async fn ping(config: &CliConfig) -> anyhow::Result<()> {
    config.validate()?;
    let client = ShelfServerClient::new(config.server_config())?;

    let response = client.test_connection().await?;
    if response.success {
        println!("Server at {} is reachable", client.url().await);
        Ok(())
    } else {
        anyhow::bail!("Server at {} answered ping without success", client.url().await)
    }
}

fn settings(config: &CliConfig, action: SettingsAction) -> anyhow::Result<()> {
    let mut store = PlayerSettingsStore::load(open_store(config)?);

    match action {
        SettingsAction::Show => print_settings(&store.settings()),
        SettingsAction::Set {
            chapter_track,
            jump_forward,
            jump_backward,
            rate,
            rate_step,
        } => {
            let rate_step = rate_step
                .map(RateStep::try_from)
                .transpose()
                .map_err(anyhow::Error::msg)?;

            let settings = store.update_settings(PlayerSettingsUpdate {
                use_chapter_track: chapter_track,
                jump_forward_amount: jump_forward,
                jump_backward_amount: jump_backward,
                playback_rate: rate,
                playback_rate_increment_decrement: rate_step,
            })?;
            print_settings(&settings);
        }
    }

    Ok(())
}

async fn listen(
    config: &CliConfig,
    item_id: &str,
    episode: Option<&str>,
    start: Option<f64>,
    seconds: u64,
) -> anyhow::Result<()> {
    config.validate()?;

    let client = Arc::new(ShelfServerClient::new(config.server_config())?);
    let store = open_store(config)?;

    let manager = PlaybackSessionManager::new(
        client,
        DeviceIdentity::new(store.clone()),
        SessionManagerOptions {
            client_name: config.player.client_name.clone(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            media_player: "clock".to_string(),
            router_base_path: config.server.router_base_path.clone(),
        },
    );
    let mut events = manager.subscribe();
    let mut player = PlayerHandler::new(
        manager,
        PlayerSettingsStore::load(store),
        Arc::new(ClockTransportFactory::default()),
    );

    let item_id = LibraryItemId::from(item_id);
    let episode_id = episode.map(EpisodeId::from);
    player
        .load(&item_id, episode_id.as_ref(), start)
        .await
        .with_context(|| format!("Failed to open a session for {}", item_id))?;
    player.play()?;

    tracing::info!(%item_id, seconds, "Listening");

    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut report = tokio::time::interval(Duration::from_secs(config.player.report_interval_secs));

    loop {
        tokio::select! {
            () = &mut deadline => break,
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted");
                break;
            }
            _ = report.tick() => {
                let snapshot = player.snapshot();
                print_progress(&snapshot);
                if snapshot.is_finished() {
                    tracing::info!("Reached the end");
                    break;
                }
            }
            event = events.recv() => match event {
                Ok(SessionEvent::SyncFailed { session_id, message }) => {
                    tracing::warn!(%session_id, "Progress is not reaching the server: {}", message);
                }
                Ok(event) => tracing::debug!(?event, "Session event"),
                Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "Missed session events"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    player.close_player().await;
    Ok(())
}

fn open_store(config: &CliConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let path = config.store_path();
    let store = JsonFileStore::open(&path)
        .with_context(|| format!("Failed to open local store at {}", path.display()))?;
    Ok(Arc::new(store))
}

fn print_settings(settings: &PlayerSettings) {
    println!("Chapter track:  {}", settings.use_chapter_track);
    println!("Jump forward:   {}s", settings.jump_forward_amount);
    println!("Jump backward:  {}s", settings.jump_backward_amount);
    println!("Playback rate:  {:.2}x", settings.playback_rate);
    println!(
        "Rate step:      {}",
        settings.playback_rate_increment_decrement.amount()
    );
}

fn print_progress(snapshot: &PlayerSnapshot) {
    let (elapsed, total) = snapshot.display_progress();
    let chapter = snapshot
        .current_chapter
        .as_ref()
        .map_or("", |chapter| chapter.title.as_str());

    println!(
        "[{:?}] {} / {} {:.2}x {}",
        snapshot.state,
        format_time(elapsed),
        format_time(total),
        snapshot.playback_rate,
        chapter
    );
}

fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (hours, minutes, seconds) = (total / 3600, total / 60 % 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
