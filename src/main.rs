use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use boardpulse::source::save_snapshot;
use boardpulse::{
    BoardModel, CachedSource, DataSource, DayZone, FileSource, MetricEngine, ModelOptions, Period,
    Report, Settings, TrelloSource,
};

#[derive(Parser, Debug)]
#[command(name = "boardpulse")]
#[command(about = "Team productivity metrics from a Trello board")]
struct Args {
    /// Read a saved snapshot instead of calling the Trello API
    #[arg(short, long, conflicts_with = "check")]
    file: Option<PathBuf>,

    /// Reporting period: month, quarter, half-year or year
    #[arg(short, long, default_value = "month", conflicts_with_all = ["from", "to"])]
    period: Period,

    /// First day of a custom range (YYYY-MM-DD)
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,

    /// Last day of a custom range (YYYY-MM-DD)
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,

    /// Name of a list meaning "done" (repeatable; replaces the configured names)
    #[arg(long = "done-list", value_name = "NAME")]
    done_lists: Vec<String>,

    /// Name of a list meaning "in progress" (repeatable; replaces the configured names)
    #[arg(long = "doing-list", value_name = "NAME")]
    doing_lists: Vec<String>,

    /// Also fetch archived cards
    #[arg(long)]
    include_closed: bool,

    /// Export the report to a JSON file instead of printing it
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Save the fetched snapshot for later use with --file
    #[arg(long, value_name = "PATH")]
    save_snapshot: Option<PathBuf>,

    /// Check the Trello connection and exit
    #[arg(long)]
    check: bool,

    /// Re-run the report every N seconds, reusing snapshots within the cache TTL
    #[arg(short, long, value_name = "SECS")]
    watch: Option<u64>,

    /// Settings file (default: boardpulse.toml if present)
    #[arg(short, long, env = "BOARDPULSE_CONFIG")]
    config: Option<PathBuf>,
}

impl Args {
    fn period(&self) -> Period {
        match (self.from, self.to) {
            (Some(from), Some(to)) => Period::Custom { from, to },
            _ => self.period,
        }
    }
}

/// Log to stderr so reports on stdout stay clean.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "boardpulse=info,boardpulse_adapters=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = Args::parse();
    let settings = load_settings(&args)?;

    if args.check {
        let source = TrelloSource::from_settings(&settings)?;
        println!("{}", source.test_connection()?);
        return Ok(());
    }

    let inner: Box<dyn DataSource> = match &args.file {
        Some(path) => Box::new(FileSource::new(path)),
        None => Box::new(TrelloSource::from_settings(&settings)?),
    };
    let mut source = CachedSource::with_ttl(inner, settings.cache_ttl().unwrap_or(Duration::ZERO));

    match args.watch {
        None => run_report(&mut source, &settings, &args),
        Some(secs) => {
            watch(1.., Duration::from_secs(secs.max(1)), || {
                run_report(&mut source, &settings, &args)
            });
            Ok(())
        }
    }
}

/// Run `refresh` once per round, sleeping `interval` after each. A failed
/// round is logged and the next one runs on schedule. Returns the number of
/// failed rounds.
fn watch(
    rounds: impl IntoIterator<Item = u64>,
    interval: Duration,
    mut refresh: impl FnMut() -> Result<()>,
) -> usize {
    let mut failures = 0;
    for round in rounds {
        if let Err(e) = refresh() {
            failures += 1;
            error!(round, "refresh failed: {:#}", e);
        }
        std::thread::sleep(interval);
    }
    failures
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = Settings::load(args.config.as_deref())?;

    if !args.done_lists.is_empty() {
        settings.metrics.done_lists = args.done_lists.clone();
    }
    if !args.doing_lists.is_empty() {
        settings.metrics.in_progress_lists = args.doing_lists.clone();
    }
    if args.include_closed {
        settings.trello.include_closed = true;
    }

    settings.validate()?;
    Ok(settings)
}

/// Load, compute and emit one report.
fn run_report(source: &mut impl DataSource, settings: &Settings, args: &Args) -> Result<()> {
    let snapshot = source
        .load()
        .with_context(|| format!("Failed to load board from {}", source.description()))?;

    if let Some(path) = &args.save_snapshot {
        save_snapshot(&snapshot, path)?;
    }

    let now = Local::now().fixed_offset();
    let options = ModelOptions::new(settings.done_lists(), now);
    let model = BoardModel::build(&snapshot, &options)?;
    let engine = MetricEngine::new(&model).with_in_progress_lists(settings.in_progress_lists());

    let range = args.period().resolve(now.date_naive(), DayZone::Local)?;
    info!(range = %range, cards = model.cards().len(), "computing metrics");

    let report = Report::compute(&engine, &range, snapshot.fetched_at)?;

    match &args.export {
        Some(path) => {
            report.export_json(path)?;
            println!("Exported report to: {}", path.display());
        }
        None => print!("{}", report.render_text()),
    }

    Ok(())
}
