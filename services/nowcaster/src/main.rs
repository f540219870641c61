//! Probabilistic precipitation nowcast runner.
//!
//! Resolves a configuration profile, reads the latest radar observations of
//! the profile's domain, runs the nowcast and writes one archive per run.

mod data_sources;

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use archive::ZarrImporter;
use chrono::{DateTime, Utc};
use clap::Parser;
use nowcast::{NowcastPipeline, RunOutcome};
use ppn_common::{parse_compact, utcnow_floored};
use ppn_config::{ConfigResolver, RunConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::data_sources::DataSources;

/// Profile, start time and output name pinned by `--test`.
const TEST_PROFILE: &str = "test";
const TEST_TIMESTAMP: &str = "201506231400";

/// Default run times are floored to this many minutes.
const RUN_INTERVAL_MINUTES: u32 = 5;

#[derive(Parser, Debug)]
#[command(name = "nowcaster")]
#[command(about = "Probabilistic precipitation nowcast runner")]
struct Args {
    /// Nowcast start time as YYYYmmddHHMM (default: now floored to 5 minutes)
    #[arg(short, long)]
    timestamp: Option<String>,

    /// Configuration profile name
    #[arg(short, long)]
    config: Option<String>,

    /// Development run with a fixed profile, timestamp and output name
    #[arg(long)]
    test: bool,

    /// Directory of additional `<name>.yaml` profiles
    #[arg(long, env = "PPN_PROFILE_DIR")]
    profile_dir: Option<PathBuf>,

    /// Data-source YAML file (default: built-in table)
    #[arg(long, env = "PPN_DATA_SOURCES")]
    data_sources: Option<PathBuf>,

    /// Output file name inside OUTPUT_PATH
    #[arg(short, long)]
    output: Option<String>,

    /// Log level, overrides LOG_LEVEL of the profile
    #[arg(long)]
    log_level: Option<String>,
}

/// Profile, start time and output name after `--test` is applied.
#[derive(Debug, PartialEq)]
struct Invocation {
    profile: Option<String>,
    start: DateTime<Utc>,
    output_name: String,
}

impl Invocation {
    fn from_args(args: &Args) -> Result<Self> {
        if args.test {
            return Ok(Self {
                profile: Some(TEST_PROFILE.to_string()),
                start: parse_compact(TEST_TIMESTAMP)?,
                output_name: archive::TEST_OUTPUT_NAME.to_string(),
            });
        }

        let start = match &args.timestamp {
            Some(ts) => parse_compact(ts).context("Invalid --timestamp")?,
            None => utcnow_floored(RUN_INTERVAL_MINUTES),
        };
        let output_name = args
            .output
            .clone()
            .unwrap_or_else(|| archive::output_file_name(start));
        Ok(Self {
            profile: args.config.clone(),
            start,
            output_name,
        })
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" | "critical" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global subscriber, writing to a dated file under
/// `LOG_FOLDER` when `WRITE_LOG` is set.
fn init_logging(config: &RunConfig, override_level: Option<&str>) -> Result<()> {
    let level = parse_level(override_level.unwrap_or(&config.log_level));
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json();

    if config.write_log {
        let folder = PathBuf::from(shellexpand::tilde(&config.log_folder).as_ref());
        fs::create_dir_all(&folder)
            .with_context(|| format!("Failed to create log folder {:?}", folder))?;
        let path = folder.join(format!("ppn-{}.log", Utc::now().format("%Y%m%d")));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {:?}", path))?;
        let subscriber = builder.with_writer(Mutex::new(file)).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn resolve_config(args: &Args, profile: Option<&str>) -> Result<RunConfig> {
    let mut resolver = ConfigResolver::new();
    if let Some(dir) = &args.profile_dir {
        resolver = resolver.with_profile_dir(dir);
    }
    resolver
        .resolve(profile)
        .with_context(|| format!("Failed to resolve profile {:?}", profile.unwrap_or("defaults")))
}

fn output_path(config: &RunConfig, name: &str) -> PathBuf {
    let dir = config.output_path.as_deref().unwrap_or(".");
    Path::new(dir).join(name)
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let invocation = Invocation::from_args(&args)?;
    let config = resolve_config(&args, invocation.profile.as_deref())?;
    init_logging(&config, args.log_level.as_deref())?;

    info!(
        profile = invocation.profile.as_deref().unwrap_or("defaults"),
        start = %invocation.start,
        domain = %config.domain,
        "Starting nowcaster"
    );

    let sources = match &args.data_sources {
        Some(path) => DataSources::load(path)?,
        None => DataSources::builtin()?,
    };
    let source = sources.get(&config.domain)?;
    let output = output_path(&config, &invocation.output_name);

    let config = Arc::new(config);
    let mut pipeline = NowcastPipeline::from_registry(config, Box::new(ZarrImporter::new(source)))
        .context("Failed to set up nowcast methods")?;

    match pipeline
        .run(invocation.start, &output)
        .context("Nowcast run failed")?
    {
        RunOutcome::Written(summary) => info!(
            path = %summary.path.display(),
            arrays = summary.arrays_written,
            bytes = summary.bytes_written,
            "Archive written"
        ),
        RunOutcome::NothingToStore => info!("Nothing was stored"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("nowcaster").chain(argv.iter().copied()))
    }

    #[test]
    fn test_test_mode_pins_run() {
        let invocation = Invocation::from_args(&args(&["--test", "--config", "esteri"])).unwrap();
        assert_eq!(invocation.profile.as_deref(), Some("test"));
        assert_eq!(invocation.start, parse_compact("201506231400").unwrap());
        assert_eq!(invocation.output_name, "00_nc_dev.zarr");
    }

    #[test]
    fn test_explicit_timestamp() {
        let invocation = Invocation::from_args(&args(&["-t", "201908231205", "-c", "esteri"])).unwrap();
        assert_eq!(invocation.profile.as_deref(), Some("esteri"));
        assert_eq!(invocation.output_name, "nc_201908231205.zarr");
    }

    #[test]
    fn test_output_name_override() {
        let invocation =
            Invocation::from_args(&args(&["--timestamp", "201908231205", "--output", "run.zarr"])).unwrap();
        assert_eq!(invocation.profile, None);
        assert_eq!(invocation.output_name, "run.zarr");
    }

    #[test]
    fn test_invalid_timestamp() {
        assert!(Invocation::from_args(&args(&["--timestamp", "2019-08-23"])).is_err());
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warning"), Level::WARN);
        assert_eq!(parse_level("bogus"), Level::INFO);
    }

    #[test]
    fn test_output_path_joins_name() {
        let mut config = ConfigResolver::new().resolve(None).unwrap();
        config.output_path = Some("/tmp/ppn".to_string());
        assert_eq!(output_path(&config, "x.zarr"), PathBuf::from("/tmp/ppn/x.zarr"));
    }
}
