//! Goalock CLI
//!
//! Hosts the lock service on the headless platform and edits its settings.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use goalock::{
    activity::ActivityLog,
    boot::{self, BOOT_SETTLE_DELAY},
    create_shared_log_with_persistence, Color, ConfigStore, ConfigUpdate, ControlBridge,
    CoordinatorSettings, EventBus, HeadlessPlatform, LockService, MethodCall, OverlayInput,
    SwipeDirection, SystemEvent, PERMISSIONS_NOTICE, VERSION,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "goalock")]
#[command(version = VERSION)]
#[command(about = "Show your goal every time the screen turns on", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Host the lock service in the foreground
    Run {
        /// Upper bound on a single wake-lock hold, in seconds (at most 600)
        #[arg(long, default_value = "600")]
        wake_timeout: u64,
    },

    /// Enable the lock screen
    Start,

    /// Disable the lock screen
    Stop,

    /// Show settings and activity
    Status,

    /// Set the goal text
    SetGoal {
        /// Goal shown on the overlay
        text: String,
    },

    /// Set the overlay colors (#RRGGBB, #AARRGGBB or a color name)
    SetColors {
        #[arg(long)]
        background: Option<String>,

        #[arg(long)]
        text: Option<String>,
    },

    /// Show configuration
    Config,

    /// Display what the app needs from the device
    Permissions,
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { wake_timeout } => cmd_run(wake_timeout),
        Commands::Start => cmd_start(),
        Commands::Stop => cmd_stop(),
        Commands::Status => {
            cmd_status();
            Ok(())
        }
        Commands::SetGoal { text } => cmd_set_goal(&text),
        Commands::SetColors { background, text } => cmd_set_colors(background, text),
        Commands::Config => cmd_config(),
        Commands::Permissions => {
            println!("{PERMISSIONS_NOTICE}");
            Ok(())
        }
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_env("GOALOCK_LOG")
        .or_else(|_| EnvFilter::builder().parse("info"))
        .context("invalid GOALOCK_LOG filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn activity_path() -> PathBuf {
    ConfigStore::data_dir().join("activity.json")
}

fn cmd_run(wake_timeout: u64) -> Result<()> {
    println!("Goalock v{VERSION}");
    println!();

    let store = Arc::new(ConfigStore::open_default());
    let activity = create_shared_log_with_persistence(activity_path());
    let platform = Arc::new(HeadlessPlatform::new());
    let settings = CoordinatorSettings {
        wake_timeout: Duration::from_secs(wake_timeout),
        ..CoordinatorSettings::default()
    };
    let service = Arc::new(
        LockService::new(
            store.clone(),
            Arc::new(EventBus::new()),
            platform.clone(),
            activity.clone(),
        )
        .with_settings(settings),
    );
    let bridge = ControlBridge::new(service.clone(), platform.clone());

    let config = store.get();
    println!("Settings file: {:?}", ConfigStore::default_path());
    println!("  Enabled: {}", config.enabled);
    println!("  Goal: {}", config.goal_text);
    println!();
    println!("Type screen-on, screen-off, user-present, swipe-<dir>, back, status");
    println!("or a JSON method call such as {{\"method\":\"setGoalText\",\"arguments\":{{\"text\":\"...\"}}}}");
    println!("Press Ctrl+C to stop");
    println!();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create runtime")?;
    runtime.block_on(host(&bridge, &platform))?;

    println!();
    println!("Shutting down...");
    service.terminate();
    if let Err(e) = activity.save() {
        eprintln!("Warning: Could not save activity log: {e}");
    }

    println!();
    println!("{}", activity.summary());
    Ok(())
}

async fn host(bridge: &ControlBridge, platform: &HeadlessPlatform) -> Result<()> {
    let service = bridge.service();

    let (stop_tx, mut stop_rx) = tokio::sync::mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .context("Error setting Ctrl+C handler")?;

    // Starting the host is this platform's boot.
    if let Err(e) = boot::on_boot_completed(service, BOOT_SETTLE_DELAY).await {
        eprintln!("Error starting lock service: {e}");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    // Reload settings so `goalock start/stop/set-goal` can control a running host.
    let mut poll = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = stop_rx.recv() => break,
            _ = poll.tick() => sync_with_store(service),
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => handle_line(bridge, platform, &line).await,
                Ok(None) => {
                    info!("stdin closed, still running until Ctrl+C");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("Could not read stdin: {e}");
                    stdin_open = false;
                }
            },
        }
    }
    Ok(())
}

/// Apply settings written by another process.
fn sync_with_store(service: &LockService) {
    if !service.store().reload() {
        return;
    }

    let config = service.store().get();
    if config.enabled && !service.is_running() {
        println!("Lock screen enabled");
        if let Err(e) = service.start() {
            eprintln!("Error starting lock service: {e}");
        }
    } else if !config.enabled && service.is_running() {
        println!("Lock screen disabled");
        service.terminate();
    } else {
        service.update_text(&config.goal_text);
        service.update_colors(config.background_color, config.text_color);
    }
}

/// A line typed into the foreground host.
#[derive(Debug, Clone, PartialEq)]
enum HostInput {
    Event(SystemEvent),
    Overlay(OverlayInput),
    Broadcast(String),
    Call(MethodCall),
    Status,
}

impl FromStr for HostInput {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        if line.starts_with('{') {
            return serde_json::from_str(line)
                .map(HostInput::Call)
                .map_err(|e| format!("invalid method call: {e}"));
        }
        if let Some(event) = SystemEvent::from_action(line) {
            return Ok(HostInput::Event(event));
        }
        if boot::is_boot_action(line) {
            return Ok(HostInput::Broadcast(line.to_string()));
        }

        match line {
            "screen-on" => Ok(HostInput::Event(SystemEvent::ScreenOn)),
            "screen-off" => Ok(HostInput::Event(SystemEvent::ScreenOff)),
            "user-present" | "unlock" => Ok(HostInput::Event(SystemEvent::UserPresent)),
            "swipe-left" => Ok(HostInput::Overlay(OverlayInput::Swipe(SwipeDirection::Left))),
            "swipe-right" => Ok(HostInput::Overlay(OverlayInput::Swipe(SwipeDirection::Right))),
            "swipe-up" => Ok(HostInput::Overlay(OverlayInput::Swipe(SwipeDirection::Up))),
            "swipe-down" => Ok(HostInput::Overlay(OverlayInput::Swipe(SwipeDirection::Down))),
            "back" => Ok(HostInput::Overlay(OverlayInput::Back)),
            "status" => Ok(HostInput::Status),
            other => Err(format!("unknown input '{other}'")),
        }
    }
}

async fn handle_line(bridge: &ControlBridge, platform: &HeadlessPlatform, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let service = bridge.service();
    match line.parse::<HostInput>() {
        Ok(HostInput::Event(event)) => {
            if event == SystemEvent::ScreenOff {
                platform.set_interactive(false);
            }
            let delivered = service.bus().publish(event);
            info!(?event, delivered, "Published");
        }
        Ok(HostInput::Overlay(input)) => {
            if !service.overlay_input(input) {
                println!("Lock service is not running");
            }
        }
        Ok(HostInput::Broadcast(action)) => {
            if let Err(e) = boot::handle_broadcast(service, &action).await {
                eprintln!("Error handling {action}: {e}");
            }
        }
        Ok(HostInput::Call(call)) => match bridge.dispatch(&call).await {
            Ok(value) => println!("{value}"),
            Err(e) => println!("error {}: {e}", e.code()),
        },
        Ok(HostInput::Status) => {
            let status = service.status();
            println!(
                "state={} overlay_visible={} wake_held={}",
                status.state, status.overlay_visible, status.wake_held
            );
        }
        Err(e) => eprintln!("{e}"),
    }
}

fn cmd_start() -> Result<()> {
    let store = ConfigStore::open_default();
    store.set_enabled(true).context("Error saving settings")?;
    println!("Lock screen enabled. A running `goalock run` picks this up within a second.");
    Ok(())
}

fn cmd_stop() -> Result<()> {
    let store = ConfigStore::open_default();
    store.set_enabled(false).context("Error saving settings")?;
    println!("Lock screen disabled.");
    Ok(())
}

fn cmd_set_goal(text: &str) -> Result<()> {
    let store = ConfigStore::open_default();
    store
        .set(ConfigUpdate::goal_text(text))
        .context("Error saving settings")?;
    println!("Goal set to: {text}");
    Ok(())
}

fn cmd_set_colors(background: Option<String>, text: Option<String>) -> Result<()> {
    if background.is_none() && text.is_none() {
        anyhow::bail!("Nothing to set: pass --background and/or --text");
    }

    let parse = |value: Option<String>, field: &str| -> Result<Option<Color>> {
        value
            .map(|v| Color::parse(&v).with_context(|| format!("Invalid {field} color '{v}'")))
            .transpose()
    };
    let update = ConfigUpdate {
        background_color: parse(background, "background")?,
        text_color: parse(text, "text")?,
        ..ConfigUpdate::default()
    };

    let store = ConfigStore::open_default();
    store.set(update).context("Error saving settings")?;

    let config = store.get();
    println!(
        "Colors set: background {} text {}",
        config.background_color, config.text_color
    );
    Ok(())
}

fn cmd_status() {
    let config = ConfigStore::open_default().get();

    println!("Goalock Status");
    println!("==============");
    println!();
    println!(
        "Lock screen: {}",
        if config.enabled { "enabled" } else { "disabled" }
    );
    println!("  Goal: {}", config.goal_text);
    println!("  Background: {}", config.background_color);
    println!("  Text: {}", config.text_color);
    println!();

    let path = activity_path();
    if path.exists() {
        let stats = ActivityLog::with_persistence(path).stats();
        println!("Cumulative Statistics:");
        println!("  Overlays shown: {}", stats.overlays_shown);
        println!("  Dismissed by swipe: {}", stats.swipe_dismissals);
        println!("  Dismissed by unlock: {}", stats.unlock_dismissals);
        println!("  Retracted on screen off: {}", stats.screen_off_retractions);
        println!(
            "  Wake locks: {} ({} timed out)",
            stats.wake_acquisitions, stats.wake_timeouts
        );
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_config() -> Result<()> {
    let config = ConfigStore::open_default().get();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", ConfigStore::default_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
