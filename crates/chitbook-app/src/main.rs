// Chits league entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, stdout is for the report)
// 2. Load config, build the season, refresh statuses for today
// 3. Make sure the fixed member holds seat 8 in every match
// 4. Sync every match from the sheet snapshot
// 5. Print the report (text or --json)
// 6. With --watch: keep polling and ticking statuses until Ctrl+C

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use tracing::{error, info, warn};

use chitbook_app::config::{self, Config};
use chitbook_app::report::Report;
use chitbook_app::retry::CancelToken;
use chitbook_app::sync::{spawn_status_ticker, SharedSeason, SyncOutcome, Syncer};
use chitbook_app::transport::CsvSheetSource;
use chitbook_core::{ReconcileSummary, Season};

/// Fantasy cricket chits league: sync the sheet and print results.
#[derive(Debug, Parser)]
#[command(name = "chitbook", version)]
struct Args {
    /// CSV export of the sheet. Defaults to `snapshot_path` in sync.toml.
    snapshot: Option<PathBuf>,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Keep polling the snapshot and ticking statuses until Ctrl+C.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse first so --help and usage errors never touch the log file.
    let args = Args::parse();

    init_tracing()?;
    info!("Chitbook starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: season={}, {} members, {} matches",
        config.league.season.name,
        config.league.members.len(),
        config.schedule.len()
    );

    let mut season = config.build_season().context("failed to build season")?;
    let changed = season.refresh_statuses(Local::now().date_naive());
    let repaired = season.ensure_fixed_member_everywhere();
    info!("{} statuses set, {} fixed-member assignments repaired", changed, repaired);
    let store: SharedSeason = Arc::new(Mutex::new(season));

    let snapshot = args
        .snapshot
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.sync.snapshot_path));
    let source = CsvSheetSource::new(snapshot);
    info!("Reading sheet snapshot from {}", source.path().display());
    let syncer = Syncer::new(
        source,
        config.league.sheet,
        config.sync.retry_policy(),
        config.sync.throttle(),
    );
    let cancel = CancelToken::new();

    let summaries = sync_once(&syncer, &store, &cancel).await;
    print_report(&config, &store, summaries, args.json)?;

    if args.watch {
        watch(&config, &syncer, &store, &cancel, args.json).await?;
    }

    info!("Chitbook shut down cleanly");
    Ok(())
}

/// Sync everything. A failed fetch keeps local data and is only logged.
async fn sync_once(
    syncer: &Syncer<CsvSheetSource>,
    store: &Mutex<Season>,
    cancel: &CancelToken,
) -> Vec<ReconcileSummary> {
    match syncer.sync_all(store, cancel).await {
        Ok(SyncOutcome::Applied(summaries)) => summaries,
        Ok(SyncOutcome::Skipped(reason)) => {
            info!("Sync skipped: {:?}", reason);
            Vec::new()
        }
        Err(e) => {
            warn!("Sync failed, showing local data: {}", e);
            eprintln!("warning: sync failed ({e}); showing local data");
            Vec::new()
        }
    }
}

fn print_report(
    config: &Config,
    store: &Mutex<Season>,
    summaries: Vec<ReconcileSummary>,
    json: bool,
) -> anyhow::Result<()> {
    let report = {
        let season = store
            .lock()
            .map_err(|_| anyhow::anyhow!("season state lock poisoned"))?;
        Report::build(&config.league.season.name, &season, config.payout()).with_sync(summaries)
    };
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize report")?
        );
    } else {
        print!("{report}");
    }
    Ok(())
}

async fn watch(
    config: &Config,
    syncer: &Syncer<CsvSheetSource>,
    store: &SharedSeason,
    cancel: &CancelToken,
    json: bool,
) -> anyhow::Result<()> {
    let ticker = spawn_status_ticker(
        Arc::clone(store),
        config.sync.status_tick(),
        || Local::now().date_naive(),
        cancel.clone(),
    );

    let mut poll = tokio::time::interval(config.sync.poll_interval());
    // The first tick completes immediately and the initial sync already ran.
    poll.tick().await;
    info!("Watching snapshot every {:?}", config.sync.poll_interval());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down");
                cancel.cancel();
                break;
            }
            _ = poll.tick() => {
                let summaries = sync_once(syncer, store, cancel).await;
                if summaries.iter().any(ReconcileSummary::has_changes) {
                    print_report(config, store, summaries, json)?;
                }
            }
        }
    }

    if let Err(e) = ticker.await {
        error!("Status ticker task failed: {}", e);
    }
    Ok(())
}

/// Initialize tracing to log to a file so stdout stays clean for the report.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("chitbook.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chitbook_app=info,chitbook_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
