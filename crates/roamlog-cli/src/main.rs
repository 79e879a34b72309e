//! Roamlog CLI - Command-line host for the offline-first trip sync core
//!
//! Wires the file-backed store, a TCP connectivity probe, and the HTTP
//! remote client into the trip service, and exposes every facade
//! operation plus queue inspection and manual sync.

use std::env;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Parser, Subcommand};
use roamlog_core::connectivity::TcpProbe;
use roamlog_core::models::DevicePosition;
use roamlog_core::queue::OfflineQueue;
use roamlog_core::remote::{HttpRemote, StaticToken};
use roamlog_core::storage::FileStore;
use roamlog_core::{NewTrip, QueueAction, SyncCoordinator, Trip, TripPatch, TripService};
use serde::Serialize;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "roamlog")]
#[command(about = "Offline-first travel journal from the command line")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional path to the local data directory
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new trip
    #[command(alias = "new")]
    Add {
        /// Trip title
        title: String,
        /// Destination, e.g. "Paris, France"
        destination: String,
        /// Start date (ISO or DD/MM/YYYY)
        #[arg(long, default_value = "")]
        start: String,
        /// End date (ISO or DD/MM/YYYY)
        #[arg(long, default_value = "")]
        end: String,
        /// Free-text description
        #[arg(long, default_value = "")]
        description: String,
        /// Latitude of the destination
        #[arg(long, requires = "lng")]
        lat: Option<f64>,
        /// Longitude of the destination
        #[arg(long, requires = "lat")]
        lng: Option<f64>,
    },
    /// List trips (live when online, cached otherwise)
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single trip
    Show {
        /// Trip ID
        id: String,
    },
    /// Edit an existing trip
    Edit {
        /// Trip ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        destination: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a trip
    Delete {
        /// Trip ID
        id: String,
    },
    /// Toggle a trip's favorite flag
    Favorite {
        /// Trip ID
        id: String,
    },
    /// Inspect pending offline actions
    Queue {
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Show dead-lettered actions instead
        #[arg(long)]
        dead: bool,
    },
    /// Replay queued mutations against the remote API
    Sync,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] roamlog_core::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Trip ID cannot be empty")]
    EmptyTripId,
}

type Service = TripService<FileStore, TcpProbe, HttpRemote<StaticToken>>;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(default_env_filter())
        .init();

    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.data_dir);

    match cli.command {
        Commands::Add {
            title,
            destination,
            start,
            end,
            description,
            lat,
            lng,
        } => {
            let location = match (lat, lng) {
                (Some(latitude), Some(longitude)) => Some(DevicePosition {
                    latitude,
                    longitude,
                }),
                _ => None,
            };
            let input = NewTrip {
                title,
                destination,
                start_date: start,
                end_date: end,
                description,
                location,
                ..NewTrip::default()
            };
            run_add(input, &data_dir).await?;
        }
        Commands::List { json } => run_list(json, &data_dir).await?,
        Commands::Show { id } => run_show(&normalize_trip_id(&id)?, &data_dir).await?,
        Commands::Edit {
            id,
            title,
            destination,
            start,
            end,
            description,
        } => {
            let patch = TripPatch {
                title,
                destination,
                start_date: start,
                end_date: end,
                description,
                ..TripPatch::default()
            };
            run_edit(&normalize_trip_id(&id)?, patch, &data_dir).await?;
        }
        Commands::Delete { id } => run_delete(&normalize_trip_id(&id)?, &data_dir).await?,
        Commands::Favorite { id } => run_favorite(&normalize_trip_id(&id)?, &data_dir).await?,
        Commands::Queue { json, dead } => run_queue(json, dead, &data_dir).await?,
        Commands::Sync => run_sync(&data_dir).await?,
    }

    Ok(())
}

async fn run_add(input: NewTrip, data_dir: &Path) -> Result<(), CliError> {
    let service = build_service(data_dir)?;
    let trip = service.create_trip(input).await?;

    if trip.is_local_only() {
        println!("{} (queued for sync)", trip.id.unwrap_or_default());
    } else {
        println!("{}", trip.id.unwrap_or_default());
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct TripListItem {
    id: String,
    title: String,
    destination: String,
    start_date: String,
    end_date: String,
    is_favorite: bool,
    pending_sync: bool,
}

async fn run_list(as_json: bool, data_dir: &Path) -> Result<(), CliError> {
    let service = build_service(data_dir)?;
    let trips = service.get_trips().await?;

    if as_json {
        let items = trips.iter().map(trip_to_list_item).collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if trips.is_empty() {
        println!("No trips yet.");
    } else {
        for line in format_trip_lines(&trips) {
            println!("{line}");
        }
    }

    Ok(())
}

async fn run_show(id: &str, data_dir: &Path) -> Result<(), CliError> {
    let service = build_service(data_dir)?;
    let trip = service.get_trip(id).await?;
    println!("{}", serde_json::to_string_pretty(&trip_to_list_item(&trip))?);
    Ok(())
}

async fn run_edit(id: &str, patch: TripPatch, data_dir: &Path) -> Result<(), CliError> {
    let service = build_service(data_dir)?;
    let updated = service.update_trip(id, patch).await?;
    println!("{}", updated.id.unwrap_or_default());
    Ok(())
}

async fn run_delete(id: &str, data_dir: &Path) -> Result<(), CliError> {
    let service = build_service(data_dir)?;
    service.delete_trip(id).await?;
    println!("{id}");
    Ok(())
}

async fn run_favorite(id: &str, data_dir: &Path) -> Result<(), CliError> {
    let service = build_service(data_dir)?;
    let favorites = service.toggle_favorite(id).await?;

    if favorites.iter().any(|favorite| favorite == id) {
        println!("{id} favorited");
    } else {
        println!("{id} unfavorited");
    }
    Ok(())
}

async fn run_queue(as_json: bool, dead: bool, data_dir: &Path) -> Result<(), CliError> {
    let service = build_service(data_dir)?;
    let actions = if dead {
        service.queue().dead_letters().await?
    } else {
        service.queue().list().await?
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&actions)?);
        return Ok(());
    }

    if actions.is_empty() {
        if dead {
            println!("No dead-lettered actions.");
        } else {
            println!("Queue is empty.");
        }
        return Ok(());
    }

    for line in format_action_lines(&actions) {
        println!("{line}");
    }
    Ok(())
}

async fn run_sync(data_dir: &Path) -> Result<(), CliError> {
    let config = resolve_remote_config()?;
    let store = FileStore::new(data_dir);
    let coordinator = SyncCoordinator::new(
        OfflineQueue::new(store),
        connectivity_probe(&config.api_url)?,
        remote_client(&config)?,
    );

    let report = coordinator.sync_queue().await?;
    tracing::info!(synced = report.synced, failed = report.failed, "Queue drain finished");
    if report.synced == 0 && report.failed == 0 {
        println!("Nothing to sync");
    } else {
        println!("Synced {} action(s), {} failed", report.synced, report.failed);
    }
    Ok(())
}

struct RemoteConfig {
    api_url: String,
    token: String,
}

// Both crates of the workspace log at info by default; the core's
// events (read degradation, drain results) live under `roamlog_core`.
fn default_env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("roamlog=info".parse().unwrap())
        .add_directive("roamlog_core=info".parse().unwrap())
}

fn resolve_remote_config() -> Result<RemoteConfig, CliError> {
    let api_url = env::var("ROAMLOG_API_URL")
        .map_err(|_| CliError::Config("ROAMLOG_API_URL is not set".to_string()))?;
    let token = env::var("ROAMLOG_TOKEN")
        .map_err(|_| CliError::Config("ROAMLOG_TOKEN is not set".to_string()))?;
    Ok(RemoteConfig { api_url, token })
}

fn connectivity_probe(api_url: &str) -> Result<TcpProbe, CliError> {
    TcpProbe::from_base_url(api_url).ok_or_else(|| {
        CliError::Config(format!(
            "ROAMLOG_API_URL must include http:// or https://: {api_url}"
        ))
    })
}

fn remote_client(config: &RemoteConfig) -> Result<HttpRemote<StaticToken>, CliError> {
    let tokens = StaticToken::new(config.token.clone())?;
    Ok(HttpRemote::new(config.api_url.clone(), tokens)?)
}

fn build_service(data_dir: &Path) -> Result<Service, CliError> {
    let config = resolve_remote_config()?;
    Ok(TripService::new(
        FileStore::new(data_dir),
        connectivity_probe(&config.api_url)?,
        remote_client(&config)?,
    ))
}

fn normalize_trip_id(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyTripId)
    } else {
        Ok(trimmed.to_string())
    }
}

fn trip_to_list_item(trip: &Trip) -> TripListItem {
    TripListItem {
        id: trip.id.clone().unwrap_or_default(),
        title: trip.title.clone(),
        destination: trip.destination.clone(),
        start_date: trip.start_date.clone(),
        end_date: trip.end_date.clone(),
        is_favorite: trip.is_favorite,
        pending_sync: trip.is_local_only(),
    }
}

fn format_trip_lines(trips: &[Trip]) -> Vec<String> {
    trips
        .iter()
        .map(|trip| {
            let id = trip.id.clone().unwrap_or_default();
            let dates = format_date_range(&trip.start_date, &trip.end_date);
            let mut markers = String::new();
            if trip.is_favorite {
                markers.push_str("  *");
            }
            if trip.is_local_only() {
                markers.push_str("  (pending sync)");
            }
            format!("{id:<20}  {:<24}  {:<24}  {dates}{markers}", trip.title, trip.destination)
        })
        .collect()
}

fn format_action_lines(actions: &[QueueAction]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    actions
        .iter()
        .map(|action| {
            let age = format_relative_time(action.timestamp, now_ms);
            let retries = if action.attempts > 0 {
                format!("  {} attempt(s)", action.attempts)
            } else {
                String::new()
            };
            format!(
                "{:<8} {:<24}  queued {age}{retries}",
                action.kind.to_string(),
                action.endpoint
            )
        })
        .collect()
}

fn format_date_range(start: &str, end: &str) -> String {
    match (start.is_empty(), end.is_empty()) {
        (true, true) => "undated".to_string(),
        (false, true) => format!("{start} .."),
        (true, false) => format!(".. {end}"),
        (false, false) => format!("{start} .. {end}"),
    }
}

fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else {
        format!("{}d ago", diff / day)
    }
}

fn resolve_data_dir(cli_data_dir: Option<PathBuf>) -> PathBuf {
    cli_data_dir
        .or_else(|| env::var_os("ROAMLOG_DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(default_data_dir)
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("roamlog")
}
