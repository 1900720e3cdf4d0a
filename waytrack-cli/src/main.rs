mod config;
mod http;
mod reports;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use waytrack_engine::{
    CheckpointSource, CityTable, Clock, CompletionRequest, CompletionWorkflow, FixedClock, Journey,
    LiveJourney, OfflineSource, ProgressEngine, RouteResolution, RouteResolver, SystemClock,
    ensure_ready,
};

use config::TrackerConfig;
use http::JourneyApi;
use reports::{ReportFormat, ReportInput, source_label, watch_line, write_report};

#[derive(Debug, Parser)]
#[command(name = "waytrack", version = "0.1.0")]
#[command(about = "Live journey tracker - progress snapshots, polling and trip completion")]
struct Args {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the journey API (omit to resolve routes locally)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Timeout for remote calls in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a progress snapshot for a journey
    Snapshot {
        /// Journey descriptor (JSON)
        #[arg(long)]
        journey: PathBuf,

        /// Evaluate at this RFC 3339 instant instead of now
        #[arg(long)]
        at: Option<String>,

        /// Output report format
        #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
        report: ReportFormat,

        /// Optional path to write the report output instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Poll a journey on an interval until it arrives
    Watch {
        /// Journey descriptor (JSON)
        #[arg(long)]
        journey: PathBuf,

        /// Seconds between polls (overrides config)
        #[arg(long)]
        interval: Option<u64>,

        /// Stop after this many polls
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Submit a trip completion once the journey is ready
    Complete {
        /// Journey descriptor (JSON)
        #[arg(long)]
        journey: PathBuf,

        /// Star rating, 1 to 5
        #[arg(long)]
        rating: u8,

        /// Optional free-text review
        #[arg(long)]
        review: Option<String>,

        /// Photo reference to attach (repeatable, up to 3)
        #[arg(long = "photo")]
        photos: Vec<String>,

        /// Check readiness at this RFC 3339 instant instead of now
        #[arg(long)]
        at: Option<String>,
    },
    /// List the bundled city coordinate table
    Cities,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = TrackerConfig::load(args.config.as_deref())?;
    let interval = match &args.command {
        Command::Watch { interval, .. } => *interval,
        _ => None,
    };
    config.apply_overrides(args.api_base.clone(), args.timeout_ms, interval)?;

    match args.command {
        Command::Snapshot {
            journey,
            at,
            report,
            output,
        } => run_snapshot(&config, &journey, at.as_deref(), report, output).await,
        Command::Watch { journey, ticks, .. } => run_watch(&config, &journey, ticks).await,
        Command::Complete {
            journey,
            rating,
            review,
            photos,
            at,
        } => {
            let request = CompletionRequest::new(rating, review, photos)?;
            run_complete(&config, &journey, &request, at.as_deref()).await
        }
        Command::Cities => list_cities(),
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn load_journey(path: &Path) -> Result<Journey> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read journey {}", path.display()))?;
    Journey::from_json(&raw).with_context(|| format!("invalid journey {}", path.display()))
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid RFC 3339 timestamp {raw:?}"))
}

fn resolver<S: CheckpointSource>(config: &TrackerConfig, source: S) -> RouteResolver<S> {
    RouteResolver::new(source).with_timeout(config.timeout())
}

async fn resolve_route(config: &TrackerConfig, journey: &Journey) -> Result<RouteResolution> {
    let resolution = if let Some(base) = &config.api_base {
        let api = JourneyApi::new(base, config.timeout())?;
        resolver(config, api)
            .resolve(journey.id(), journey.route())
            .await
    } else {
        resolver(config, OfflineSource)
            .resolve(journey.id(), journey.route())
            .await
    };
    Ok(resolution)
}

async fn start_session<C: Clock>(
    config: &TrackerConfig,
    journey: Journey,
    clock: C,
) -> Result<LiveJourney<C>> {
    let resolution = resolve_route(config, &journey).await?;
    let engine = ProgressEngine::new(config.progress_config());
    Ok(LiveJourney::new(journey, resolution, engine, clock))
}

async fn run_snapshot(
    config: &TrackerConfig,
    journey_path: &Path,
    at: Option<&str>,
    format: ReportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let journey = load_journey(journey_path)?;
    let now = match at {
        Some(raw) => parse_instant(raw)?,
        None => SystemClock.now(),
    };
    let live = start_session(config, journey, FixedClock::new(now)).await?;
    let snapshot = live.snapshot();

    let mut output_target = OutputTarget::new(output)?;
    let input = ReportInput {
        journey: live.journey(),
        source: &live.resolution().source,
        stops: live.stops(),
        snapshot: &snapshot,
    };
    write_report(output_target.writer(), format, &input)?;
    output_target.flush_inner()?;
    Ok(())
}

async fn run_watch(config: &TrackerConfig, journey_path: &Path, ticks: Option<u64>) -> Result<()> {
    let journey = load_journey(journey_path)?;
    let mut live = start_session(config, journey, SystemClock).await?;

    println!(
        "{} {} ({})",
        "📡 Watching journey".bright_cyan().bold(),
        live.journey().id(),
        source_label(&live.resolution().source)
    );

    let mut interval = tokio::time::interval(config.poll_interval());
    let mut polled = 0_u64;
    loop {
        interval.tick().await;
        let update = live.poll();
        println!("{}", watch_line(&update.snapshot));
        if update.became_ready {
            println!("{}", "✅ Journey can now be completed".green().bold());
        }
        polled += 1;
        if update.snapshot.is_finished() || ticks.is_some_and(|limit| polled >= limit) {
            break;
        }
    }
    Ok(())
}

async fn run_complete(
    config: &TrackerConfig,
    journey_path: &Path,
    request: &CompletionRequest,
    at: Option<&str>,
) -> Result<()> {
    let journey = load_journey(journey_path)?;
    let now = match at {
        Some(raw) => parse_instant(raw)?,
        None => SystemClock.now(),
    };
    let live = start_session(config, journey, FixedClock::new(now)).await?;
    let snapshot = live.snapshot();
    ensure_ready(&snapshot)?;

    let Some(base) = &config.api_base else {
        bail!("journey is ready, but no API base is configured to submit the completion");
    };
    let api = JourneyApi::new(base, config.timeout())?;
    api.submit(live.journey().id(), request).await?;
    println!(
        "✅ Completion submitted for {} ({}★)",
        live.journey().id(),
        request.rating()
    );
    Ok(())
}

fn list_cities() -> Result<()> {
    let table = CityTable::bundled();
    let mut output_target = OutputTarget::new(None)?;
    writeln!(output_target.writer(), "Known cities:")?;
    for (name, coords) in table.cities() {
        writeln!(
            output_target.writer(),
            "  {name:16} {:>9.4} {:>9.4}",
            coords.lat,
            coords.lng
        )?;
    }
    let fallback = table.default_coordinates();
    writeln!(
        output_target.writer(),
        "Unknown cities resolve to ({:.4}, {:.4})",
        fallback.lat,
        fallback.lng
    )?;
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_snapshot_with_globals() {
        let args = Args::try_parse_from([
            "waytrack",
            "snapshot",
            "--journey",
            "trip.json",
            "--report",
            "json",
            "--api-base",
            "http://localhost:8080",
        ])
        .unwrap();
        assert_eq!(args.api_base.as_deref(), Some("http://localhost:8080"));
        assert!(matches!(
            args.command,
            Command::Snapshot {
                report: ReportFormat::Json,
                ..
            }
        ));
    }

    #[test]
    fn complete_accepts_repeated_photos() {
        let args = Args::try_parse_from([
            "waytrack", "complete", "--journey", "t.json", "--rating", "4", "--photo", "a.jpg",
            "--photo", "b.jpg",
        ])
        .unwrap();
        let Command::Complete { photos, rating, .. } = args.command else {
            panic!("expected complete");
        };
        assert_eq!(rating, 4);
        assert_eq!(photos, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn instants_must_be_rfc3339() {
        let parsed = parse_instant("2024-06-01T14:15:00+06:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-06-01T08:15:00+00:00");
        assert!(parse_instant("yesterday").is_err());
    }

    #[test]
    fn resolvers_share_the_configured_timeout() {
        let mut config = TrackerConfig::default();
        config.apply_overrides(None, Some(750), None).unwrap();
        let offline = resolver(&config, OfflineSource);
        assert_eq!(offline.timeout(), std::time::Duration::from_millis(750));
    }

    #[tokio::test]
    async fn offline_resolution_covers_every_stop() {
        let journey = Journey::from_json(
            r#"{"id":"t","source":"Dhaka","destination":"Rajshahi","route":["Dhaka","Tangail","Bogra","Rajshahi"],
                "departureTime":"2024-06-01T06:00:00Z","arrivalTime":"2024-06-01T12:00:00Z"}"#,
        )
        .unwrap();
        let resolution = resolve_route(&TrackerConfig::default(), &journey)
            .await
            .unwrap();
        assert_eq!(resolution.stops.len(), 4);
        assert!(!resolution.is_remote());
    }
}
