//! BinTracker — recycle bin size monitor.
//!
//! Thin binary entry point. All logic lives in the `bintrack-core` crate.

use anyhow::{bail, Context};
use bintrack_core::aggregate::{SizeAggregator, StaticRoots, TrashLayout, UsageSource};
use bintrack_core::model::size::{format_size, parse_size};
use bintrack_core::monitor::ThresholdMonitor;
use bintrack_core::notify::{spawn_dispatcher, LogNotifier};
use bintrack_core::reclaim::ReclaimExecutor;
use bintrack_core::settings::{
    initial_config, ConfigWatcher, JsonSettingsStore, Settings, SettingsGate, SettingsStore,
    DEFAULT_WATCH_CADENCE,
};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "bintrack",
    version,
    about = "Watch the recycle bin and alert when it grows past a threshold"
)]
struct Cli {
    /// Settings file (defaults to the per-user config directory).
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Scan these mount points instead of the fixed drives.
    #[arg(long = "root", global = true, value_name = "PATH")]
    roots: Vec<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Monitor until interrupted.
    Run,
    /// Print the current recycle bin size.
    Size,
    /// Empty the recycle bin.
    Empty {
        /// Confirm that every recycled item should be permanently deleted.
        #[arg(long)]
        yes: bool,
    },
    /// Show or edit persisted settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    Show,
    /// Restore every setting to its default.
    Reset,
    /// Alert threshold, e.g. `10GB` or `512MB`.
    SetThreshold {
        #[arg(value_name = "SIZE")]
        size: String,
    },
    /// Polling interval in seconds.
    SetInterval {
        #[arg(value_name = "SECONDS")]
        seconds: u64,
    },
    /// Suppress alerts for a while.
    Mute {
        #[arg(long, conflicts_with = "days", value_name = "N")]
        hours: Option<u32>,
        #[arg(long, value_name = "N")]
        days: Option<u32>,
    },
    Unmute,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let store: Arc<dyn SettingsStore> = match &cli.settings {
        Some(path) => Arc::new(JsonSettingsStore::new(path)),
        None => Arc::new(JsonSettingsStore::default_location()?),
    };

    match &cli.command {
        Command::Run => run(&cli, store),
        Command::Size => size(&cli),
        Command::Empty { yes } => empty(&cli, *yes),
        Command::Settings { action } => settings(store.as_ref(), action),
    }
}

fn aggregator(cli: &Cli) -> Arc<SizeAggregator> {
    if cli.roots.is_empty() {
        Arc::new(SizeAggregator::for_fixed_drives())
    } else {
        Arc::new(SizeAggregator::new(
            Arc::new(StaticRoots(cli.roots.clone())),
            TrashLayout::default(),
        ))
    }
}

fn run(cli: &Cli, store: Arc<dyn SettingsStore>) -> anyhow::Result<()> {
    tracing::info!("BinTracker starting");

    let config = initial_config(store.as_ref());
    let gate = Arc::new(SettingsGate::new(Arc::clone(&store)));
    let (monitor, crossings) = ThresholdMonitor::new(aggregator(cli), config);
    let monitor = Arc::new(monitor.with_gate(gate));

    let dispatcher =
        spawn_dispatcher(crossings, Arc::new(LogNotifier)).context("starting dispatcher")?;
    let watcher = Arc::new(ConfigWatcher::new(store, Arc::clone(&monitor)));
    let mut watch = watcher
        .spawn(DEFAULT_WATCH_CADENCE)
        .context("starting config watcher")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))
        .context("registering SIGINT")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))
        .context("registering SIGTERM")?;

    monitor.start().context("starting monitor")?;
    while !shutdown.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(200));
    }

    tracing::info!("Shutdown requested");
    watch.stop();
    monitor.stop();
    // The watcher holds the last other reference; dropping both closes the
    // crossing channel and lets the dispatcher drain.
    drop(watcher);
    drop(monitor);
    if dispatcher.join().is_err() {
        tracing::error!("Dispatcher thread panicked");
    }
    Ok(())
}

fn size(cli: &Cli) -> anyhow::Result<()> {
    let aggregator = aggregator(cli);
    let snapshot = aggregator.aggregate();
    for (root, bytes) in &snapshot.per_root_bytes {
        println!("{:<24} {}", root.display(), format_size(*bytes));
    }
    println!("{:<24} {}", "total", format_size(snapshot.total_bytes));
    Ok(())
}

fn empty(cli: &Cli, confirmed: bool) -> anyhow::Result<()> {
    if !confirmed {
        bail!("refusing to empty the recycle bin without --yes");
    }

    let executor = ReclaimExecutor::with_default_strategies(aggregator(cli));
    let report = executor.reclaim()?;
    println!(
        "Recycle bin emptied via {} ({} before)",
        report.strategy().unwrap_or("unknown"),
        format_size(report.bytes_before)
    );
    if let Some(residual) = report.residual_bytes.filter(|&b| b > 0) {
        println!("{} still reported after emptying", format_size(residual));
    }
    Ok(())
}

fn settings(store: &dyn SettingsStore, action: &SettingsAction) -> anyhow::Result<()> {
    let settings = match action {
        SettingsAction::Show => store.load()?,
        SettingsAction::Reset => store.reset_to_defaults()?,
        edit => {
            let mut settings = store.load()?;
            apply_edit(&mut settings, edit)?;
            store.save(&settings)?;
            settings
        }
    };
    print_settings(&settings);
    Ok(())
}

fn apply_edit(settings: &mut Settings, action: &SettingsAction) -> anyhow::Result<()> {
    match action {
        SettingsAction::Show | SettingsAction::Reset => {}
        SettingsAction::SetThreshold { size } => {
            settings.threshold_bytes = parse_size(size)
                .filter(|&b| b > 0)
                .with_context(|| format!("invalid size: {size}"))?;
        }
        SettingsAction::SetInterval { seconds } => {
            if *seconds == 0 {
                bail!("interval must be at least one second");
            }
            settings.poll_interval_ms = seconds.saturating_mul(1000);
        }
        SettingsAction::Mute { hours, days } => match (hours, days) {
            (_, Some(days)) => settings.mute_for_days(i64::from(*days))?,
            (Some(hours), None) => settings.mute_for_hours(i64::from(*hours))?,
            (None, None) => settings.mute_for_hours(1)?,
        },
        SettingsAction::Unmute => settings.unmute(),
    }
    Ok(())
}

fn print_settings(settings: &Settings) {
    println!("threshold:      {}", format_size(settings.threshold_bytes));
    println!(
        "interval:       {:?}",
        Duration::from_millis(settings.poll_interval_ms)
    );
    println!("notifications:  {}", settings.notifications_enabled);
    println!("mute:           {}", settings.mute_status_text(Local::now()));
}
