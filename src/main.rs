use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use log::{info, warn};
use tokio::sync::mpsc;

use gnss_trip_rs::{EventLog, JsonTripStore, SessionSnapshot, TrackerConfig, TripSession};

#[derive(Parser, Debug)]
#[command(name = "gnss_trip")]
#[command(about = "Replay a recorded GNSS/sensor event log and record trips", long_about = None)]
struct Args {
    /// Path to an event log (*.json or *.json.gz)
    #[arg(long)]
    log: PathBuf,

    /// JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for trip records
    #[arg(long)]
    output_dir: Option<String>,

    /// Stationary acceleration threshold (m/s²)
    #[arg(long)]
    accel_threshold: Option<f64>,

    /// Stationary GNSS speed threshold (m/s)
    #[arg(long)]
    speed_threshold: Option<f64>,

    /// Start a trip on the first usable fix
    #[arg(long, default_value_t = false)]
    auto_start: bool,

    /// Sort events by timestamp before replaying
    #[arg(long, default_value_t = false)]
    sort: bool,

    /// Also write a GPX file for every recorded trip
    #[arg(long, default_value_t = false)]
    gpx: bool,
}

fn build_config(args: &Args) -> Result<TrackerConfig> {
    let mut config = match &args.config {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(v) = args.accel_threshold {
        config.accel_threshold = v;
    }
    if let Some(v) = args.speed_threshold {
        config.speed_threshold = v;
    }
    config.auto_start |= args.auto_start;
    config.validate()?;
    Ok(config)
}

fn save_status(dir: &Path, snapshot: &SessionSnapshot) -> Result<()> {
    let path = dir.join("live_status_final.json");
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = build_config(&args)?;

    info!("GNSS trip replay starting at {}", Utc::now().format("%H:%M:%S"));
    info!("  Log: {}", args.log.display());
    info!("  Output Dir: {}", config.output_dir);
    info!(
        "  Thresholds: accel < {} m/s², speed < {} m/s",
        config.accel_threshold, config.speed_threshold
    );

    let mut event_log = EventLog::load(&args.log)
        .with_context(|| format!("loading {}", args.log.display()))?;
    if args.sort {
        event_log = event_log.sorted();
    }
    let event_count = event_log.events.len();

    let store = JsonTripStore::open(&config.output_dir)?;
    let mut session = TripSession::new(&config, store);

    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let producer = tokio::spawn(async move {
        for event in event_log.events {
            if tx.send(event).await.is_err() {
                warn!("Session stopped before the log was fully replayed");
                break;
            }
        }
    });

    session.run(rx).await?;
    producer.await?;

    let snapshot = session.snapshot();
    let store = session.into_sink();
    save_status(store.dir(), &snapshot)?;

    let trips = store.list()?;
    if args.gpx {
        for trip in &trips {
            let path = store.export_gpx(trip.start_time)?;
            info!("GPX written to {}", path.display());
        }
    }

    println!("\n=== Replay Summary ===");
    println!("Events replayed: {}", event_count);
    println!(
        "Fixes: {}  Sensor samples: {} ({} skipped)",
        snapshot.fix_count, snapshot.sample_count, snapshot.skipped_samples
    );
    println!("Trips recorded this run: {}", snapshot.trips_completed);
    for trip in &trips {
        let (start, end) = trip.time_labels();
        println!(
            "  {} → {}  {:.2} m  {:.2} m/s  {:?}  ({} points)",
            start,
            end,
            trip.total_distance,
            trip.average_speed,
            trip.transport_mode,
            trip.point_count
        );
    }

    Ok(())
}
