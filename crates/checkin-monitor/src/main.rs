//! Check-in monitor - a headless operator console for one event.
//!
//! Mounts the dashboard and station registry for an event, prints the
//! console state whenever a background update lands, and accepts operator
//! commands on stdin.

mod render;

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use checkin_core::{ApiClient, CheckInConsole, Config};

use render::{render, render_session_state};

// ============================================================================
// Constants
// ============================================================================

/// How often finished background work is applied (in milliseconds)
const BACKGROUND_CHECK_MS: u64 = 200;

const HELP: &str = "\
Commands:
  scan <station> <payload>        submit a scanned QR payload
  camera-error <station> [msg]    report a camera failure at a station
  reset <station>                 clear the shown result and rescan
  add                             add a station
  toggle <station>                enable or disable a station
  remove <station>                delete a station
  refresh                         refresh the dashboard and station stats now
  status                          print the console
  quit";

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes buffered log lines when dropped.
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();
    info!("Check-in monitor starting");

    let mut config = Config::load().context("Failed to load config")?;
    let event_id = config
        .event_id(std::env::args().nth(1))
        .context("No event id: pass one as the first argument or set CHECKIN_EVENT_ID")?;

    let mut api = ApiClient::new(config.api_url())?;
    if let Some(token) = Config::api_token() {
        api.set_token(token);
    }

    if config.last_event_id.as_deref() != Some(event_id.as_str()) {
        config.last_event_id = Some(event_id.clone());
        if let Err(e) = config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    let mut console = CheckInConsole::mount(api, event_id).await;
    println!("{}", render(&console));
    println!("{}", HELP);

    let result = run(&mut console).await;
    console.teardown();

    info!("Check-in monitor shutting down");
    result
}

async fn run(console: &mut CheckInConsole) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(BACKGROUND_CHECK_MS));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if handle_command(console, line.trim()).await {
                            return Ok(());
                        }
                    }
                    // stdin closed
                    None => return Ok(()),
                }
            }
            _ = ticker.tick() => {
                if console.check_background_tasks() {
                    println!("{}", render(console));
                }
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

/// Run one operator command. Returns true when the monitor should exit.
async fn handle_command(console: &mut CheckInConsole, line: &str) -> bool {
    let mut parts = line.splitn(3, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let station = parts.next().map(str::trim).filter(|s| !s.is_empty());
    let rest = parts.next().map(str::trim);

    match (command, station) {
        ("", _) => {}
        ("quit" | "exit", _) => return true,
        ("help", _) => println!("{}", HELP),
        ("status", _) => println!("{}", render(console)),
        ("refresh", _) => {
            console.refresh_now();
            println!("Refresh requested");
        }
        ("scan", Some(station)) => match console.session_mut(station) {
            Some(session) => {
                if session.scan(rest.unwrap_or_default()) {
                    println!("[{}] verifying", station);
                } else {
                    println!("[{}] camera inactive, reset first", station);
                }
            }
            None => println!("No active station {}", station),
        },
        ("camera-error", Some(station)) => match console.session_mut(station) {
            Some(session) => {
                session.camera_error(rest);
                println!("[{}] {}", station, render_session_state(session.state()));
            }
            None => println!("No active station {}", station),
        },
        ("reset", Some(station)) => match console.session_mut(station) {
            Some(session) => {
                if !session.reset() {
                    println!("[{}] nothing to reset", station);
                }
            }
            None => println!("No active station {}", station),
        },
        ("add", _) => match console.registry_mut().add_station().await {
            Ok(station) => println!("Added {}", station.display_name()),
            Err(e) => println!("Add failed: {}", e),
        },
        ("toggle", Some(station)) => match console.registry_mut().toggle_station(station).await {
            Ok(s) => println!("{} is now {}", s.display_name(), s.status_display()),
            Err(e) => println!("Toggle failed: {}", e),
        },
        ("remove", Some(station)) => match console.registry_mut().remove_station(station).await {
            Ok(()) => println!("Removed station {}", station),
            Err(e) => println!("Remove failed: {}", e),
        },
        _ => println!("Unknown command: {}\n{}", line, HELP),
    }
    false
}
