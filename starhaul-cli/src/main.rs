mod driver;
mod report;
mod storage;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;

use driver::{RunPlan, play};
use report::{RunSummary, write_console, write_json};
use starhaul_game::{
    GameEngine, LoadReport, NarrativeSource, NoNarrator, SimSession, StaticLoader,
    TemplateNarrator,
};
use storage::FileStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NarratorKind {
    /// Keep the plain fallback lines
    Off,
    /// Dress log lines with canned captain's-log openers
    Template,
}

impl NarratorKind {
    fn build(self) -> Box<dyn NarrativeSource> {
        match self {
            Self::Off => Box::new(NoNarrator),
            Self::Template => Box::new(TemplateNarrator::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "starhaul", version)]
#[command(about = "Headless driver for the Starhaul idle game - scripted runs, saves and offline replay")]
struct Args {
    /// Seed for a new game (ignored when loading)
    #[arg(long, default_value_t = 1337)]
    seed: u64,

    /// Simulated minutes to play
    #[arg(long, default_value_t = 60)]
    minutes: u64,

    /// Scheduler step in milliseconds
    #[arg(long, default_value_t = starhaul_game::constants::TICK_INTERVAL_MS)]
    tick_ms: u64,

    /// Location ids to cycle through (comma-separated)
    #[arg(long, default_value = "1,2")]
    route: String,

    /// Autopilot modules to buy before the run; zero flies by hand
    #[arg(long, default_value_t = 0)]
    autopilot_modules: u32,

    /// Accept and deliver missions while playing
    #[arg(long)]
    missions: bool,

    /// Narrative source for log lines
    #[arg(long, value_enum, default_value_t = NarratorKind::Template)]
    narrator: NarratorKind,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Directory holding save slots
    #[arg(long, default_value = "saves")]
    save_dir: PathBuf,

    /// Slot to write when the run ends
    #[arg(long)]
    save: Option<String>,

    /// Slot to resume instead of starting a new game
    #[arg(long)]
    load: Option<String>,

    /// Simulation clock (ms) at which the run starts; defaults to now
    #[arg(long)]
    start_ms: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let route = parse_route(&args.route)?;
    let engine = GameEngine::new(StaticLoader, FileStorage::new(&args.save_dir));
    let start = args.start_ms.unwrap_or_else(wall_clock_ms);
    let (mut session, load_report) = open_session(&engine, &args, start)?;

    if args.report == ReportFormat::Console {
        announce_banner();
    }

    let plan = RunPlan {
        duration_ms: args.minutes.saturating_mul(60_000),
        tick_ms: args.tick_ms,
        route,
        autopilot_modules: args.autopilot_modules,
        take_missions: args.missions,
    };
    let mut narrator = args.narrator.build();
    let tally = play(&mut session, &plan, start, narrator.as_mut())?;
    let end = start.saturating_add(plan.duration_ms);

    let mut summary = RunSummary::collect(&session, &tally, load_report.as_ref(), start, end);
    if let Some(slot) = &args.save {
        engine.save_session(slot, &session, end)?;
        summary.saved_to = Some(slot.clone());
    }

    let mut output_target = OutputTarget::new(args.output.clone())?;
    match args.report {
        ReportFormat::Json => write_json(output_target.writer(), &summary)?,
        ReportFormat::Console => write_console(output_target.writer(), &summary)?,
    }
    output_target.flush_inner()?;
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();
}

fn announce_banner() {
    println!("{}", "🚀 Starhaul Flight Recorder".bright_cyan().bold());
    println!("{}", "===========================".cyan());
}

fn wall_clock_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

fn open_session(
    engine: &GameEngine<StaticLoader, FileStorage>,
    args: &Args,
    now: u64,
) -> Result<(SimSession, Option<LoadReport>)> {
    let Some(slot) = &args.load else {
        let session = engine
            .create_session(args.seed)
            .context("loading game content")?;
        return Ok((session, None));
    };
    let Some((session, report)) = engine.load_session(slot, now)? else {
        bail!("no save named `{slot}` in {}", args.save_dir.display());
    };
    if let Some(offline) = &report.offline_autopilot {
        log::info!(
            "offline autopilot replayed {} trips over {} ms",
            offline.trips,
            offline.simulated_ms
        );
    }
    Ok((session, Some(report)))
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn parse_route(raw: &str) -> Result<Vec<u32>> {
    let route = split_csv(raw)
        .iter()
        .map(|token| {
            token
                .parse::<u32>()
                .with_context(|| format!("route entry `{token}` is not a location id"))
        })
        .collect::<Result<Vec<_>>>()?;
    if route.is_empty() {
        bail!("route must name at least one location");
    }
    Ok(route)
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
    fn split_csv_trims_and_filters() {
        assert_eq!(split_csv(" 1, ,2,  3 "), vec!["1", "2", "3"]);
    }

    #[test]
    fn route_parsing_rejects_bad_entries() {
        assert_eq!(parse_route("1, 2,3").unwrap(), vec![1, 2, 3]);
        let err = parse_route("1,moon").unwrap_err();
        assert!(err.to_string().contains("`moon`"));
        assert!(parse_route(" , ").is_err());
    }

    #[test]
    fn defaults_fly_by_hand_for_an_hour() {
        let args = Args::try_parse_from(["starhaul"]).unwrap();
        assert_eq!(args.seed, 1337);
        assert_eq!(args.minutes, 60);
        assert_eq!(args.tick_ms, 1_000);
        assert_eq!(args.autopilot_modules, 0);
        assert_eq!(args.narrator, NarratorKind::Template);
        assert_eq!(args.report, ReportFormat::Console);
        assert!(args.load.is_none());
    }

    #[test]
    fn report_and_narrator_values_parse() {
        let args = Args::try_parse_from([
            "starhaul",
            "--report",
            "json",
            "--narrator",
            "off",
            "--autopilot-modules",
            "2",
            "--start-ms",
            "5000",
        ])
        .unwrap();
        assert_eq!(args.report, ReportFormat::Json);
        assert_eq!(args.narrator, NarratorKind::Off);
        assert_eq!(args.autopilot_modules, 2);
        assert_eq!(args.start_ms, Some(5_000));
    }

    #[test]
    fn missing_slot_is_an_error() {
        let dir = std::env::temp_dir().join("starhaul-main-missing-slot");
        let engine = GameEngine::new(StaticLoader, FileStorage::new(&dir));
        let args = Args::try_parse_from(["starhaul", "--load", "nowhere"]).unwrap();
        let err = open_session(&engine, &args, 0).err().unwrap();
        assert!(err.to_string().contains("no save named `nowhere`"));
    }
}
