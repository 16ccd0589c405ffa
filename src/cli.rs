// Emogo CLI binary

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use emogo_lib::assets::LocalAssetLibrary;
use emogo_lib::capture::{self, Location};
use emogo_lib::constants::{ENV_LOG, SENTIMENT_MAX, SENTIMENT_MIN};
use emogo_lib::export::share::DirectoryShare;
use emogo_lib::fs::LocalFileSystem;
use emogo_lib::{AppConfig, ConfigOverrides, ExportOrchestrator, ExportOutcome, Record, RecordStore};

#[derive(Parser)]
#[command(name = "emogo")]
#[command(about = "Emogo - a mood diary of one-second clips", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding the record store and media library
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory for transient export archives
    #[arg(long, global = true)]
    staging_dir: Option<PathBuf>,

    /// Directory exported archives are delivered to
    #[arg(long, global = true)]
    share_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the record store and directories
    Init,

    /// Save a clip with its mood
    Capture {
        /// Video file to save
        path: PathBuf,
        /// Mood, 1 (low) to 5 (high)
        #[arg(short, long, value_parser = clap::value_parser!(i64).range(SENTIMENT_MIN..=SENTIMENT_MAX))]
        sentiment: i64,
        /// Latitude of the capture
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Longitude of the capture
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
    },

    /// List captures, most recent first
    History,

    /// Export every capture into one zip archive
    Export,
}

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = AppConfig::resolve(&ConfigOverrides {
        data_dir: cli.data_dir,
        staging_dir: cli.staging_dir,
        share_dir: cli.share_dir,
    })?;

    match cli.command {
        Commands::Init => cmd_init(&config),
        Commands::Capture { path, sentiment, lat, lon } => cmd_capture(&config, path, sentiment, lat, lon),
        Commands::History => cmd_history(&config),
        Commands::Export => cmd_export(&config),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(config: &AppConfig) -> Result<RecordStore> {
    config.ensure_dirs()?;
    let store = RecordStore::new(&config.db_path);
    store.initialize()?;
    Ok(store)
}

fn cmd_init(config: &AppConfig) -> Result<()> {
    let store = open_store(config)?;

    println!("Store ready at {}", config.db_path.display());
    println!("  Records:  {}", store.count()?);
    println!("  Library:  {}", config.library_dir.display());
    println!("  Staging:  {}", config.staging_dir.display());
    println!("  Exports:  {}", config.share_dir.display());
    Ok(())
}

fn cmd_capture(config: &AppConfig, path: PathBuf, sentiment: i64, lat: Option<f64>, lon: Option<f64>) -> Result<()> {
    let source = path
        .canonicalize()
        .map_err(|_| anyhow::anyhow!("Clip does not exist: {}", path.display()))?;

    let store = open_store(config)?;
    let library = LocalAssetLibrary::new(&config.library_dir);
    let location = match (lat, lon) {
        (Some(latitude), Some(longitude)) => Some(Location { latitude, longitude }),
        _ => None,
    };

    let clip = capture::capture_clip(&library, &store, &source, sentiment, location)?;
    println!("Saved record {} (asset {})", clip.record_id, clip.asset_id);
    Ok(())
}

fn cmd_history(config: &AppConfig) -> Result<()> {
    let store = open_store(config)?;
    let records = store.fetch_all();

    if records.is_empty() {
        println!("No records yet.");
        return Ok(());
    }

    println!("{:>5}  {:<19}  {:<7}  {:<22}  {}", "ID", "When", "Mood", "Loc", "Video");
    for record in &records {
        println!(
            "{:>5}  {:<19}  {:<7}  {:<22}  {}",
            record.id,
            local_time(&record.timestamp),
            format!("Mood: {}", record.sentiment),
            location_label(record),
            record.video_uri
        );
    }
    Ok(())
}

fn cmd_export(config: &AppConfig) -> Result<()> {
    let store = open_store(config)?;
    let library = LocalAssetLibrary::new(&config.library_dir);
    let share = DirectoryShare::new(&config.share_dir);
    let exporter = ExportOrchestrator::new(&store, &library, &LocalFileSystem, &share, &config.staging_dir);

    match exporter.export_all() {
        Ok(ExportOutcome::Shared(summary)) => {
            println!("Exported {} to {}", summary.archive_name, config.share_dir.display());
            println!("  Records:   {}", summary.records);
            println!("  Embedded:  {}", summary.embedded);
            println!("  Missing:   {}", summary.missed);
            Ok(())
        }
        Ok(ExportOutcome::Cancelled(_)) => {
            println!("Export cancelled.");
            Ok(())
        }
        Ok(ExportOutcome::AlreadyRunning) => {
            println!("An export is already running.");
            Ok(())
        }
        Err(e) => anyhow::bail!(e.user_message()),
    }
}

fn local_time(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

fn location_label(record: &Record) -> String {
    match (record.latitude, record.longitude) {
        (Some(lat), Some(lon)) => format!("Loc: {:.4}, {:.4}", lat, lon),
        _ => "Loc: -".to_string(),
    }
}
