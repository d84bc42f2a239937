//! fitscan command line.
//!
//! `fitscan extract` reads one description and prints the measurements found
//! in it. `fitscan search` runs a full search in-process, printing each event
//! as one JSON line on stdout; logs go to stderr.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use fitscan::stream::{Measurements, NumberLike, SinkClosed};
use fitscan::{
    EventKind, FitscanConfig, FnSink, MatchResult, MeasurementParser, SearchEvent, SearchRequest,
    Terminal, Validated, browser_for, coordinator_for,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fitscan", author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract pit-to-pit width and length from a listing description
    Extract(ExtractArgs),
    /// Search listings by measurements and stream events as JSON lines
    Search(SearchArgs),
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Description text; read from stdin when neither --text nor --file is given
    #[arg(long, conflicts_with = "file")]
    text: Option<String>,

    /// File holding the description
    #[arg(long)]
    file: Option<PathBuf>,

    /// Include candidates and the strategy that resolved each value
    #[arg(long, default_value_t = false)]
    detailed: bool,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Target pit-to-pit width (inches)
    #[arg(long)]
    p2p: Option<f64>,

    /// Target length (inches)
    #[arg(long)]
    length: Option<f64>,

    /// Tolerance applied to both dimensions (inches)
    #[arg(long)]
    tol: Option<f64>,

    /// Pit-to-pit tolerance, overrides --tol
    #[arg(long)]
    p2p_tol: Option<f64>,

    /// Length tolerance, overrides --tol
    #[arg(long)]
    length_tol: Option<f64>,

    /// Search one seller's shop instead of the global feed
    #[arg(long)]
    seller: Option<String>,

    #[arg(long)]
    max_items: Option<u32>,

    #[arg(long)]
    max_links: Option<u32>,

    #[arg(long)]
    max_scrolls: Option<u32>,

    #[arg(long)]
    gender: Option<String>,

    #[arg(long)]
    groups: Option<String>,

    /// Show the browser window where the backend supports one
    #[arg(long, default_value_t = false)]
    headful: bool,

    /// Delay between page loads (ms)
    #[arg(long)]
    slowmo: Option<u64>,

    /// Search a saved JSON catalog instead of the live marketplace
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// YAML profile with search and crawler settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save matches to a JSON file
    #[arg(long)]
    json: Option<PathBuf>,

    /// Save matches to a CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

impl SearchArgs {
    fn to_request(&self) -> SearchRequest {
        let number = |value: Option<f64>| value.map(NumberLike::Number);
        let count = |value: Option<u32>| value.map(|v| NumberLike::Number(f64::from(v)));

        SearchRequest {
            measurements: Some(Measurements {
                first: number(self.p2p),
                second: number(self.length),
            }),
            p2p_tolerance: number(self.p2p_tol.or(self.tol)),
            length_tolerance: number(self.length_tol.or(self.tol)),
            seller: self.seller.clone(),
            max_items: count(self.max_items),
            max_links: count(self.max_links),
            max_scrolls: count(self.max_scrolls),
            headless: Some(!self.headful),
            slowmo: self.slowmo.map(|ms| NumberLike::Number(ms as f64)),
            gender: self.gender.clone(),
            groups: self.groups.clone(),
            ..SearchRequest::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let quiet = matches!(&cli.command, Command::Search(args) if args.quiet);
    init_tracing(quiet);

    match cli.command {
        Command::Extract(args) => run_extract(args),
        Command::Search(args) => run_search(args),
    }
}

fn init_tracing(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run_extract(args: ExtractArgs) -> Result<()> {
    let text = match (args.text, args.file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?,
        (None, None) => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading description from stdin")?;
            buf
        }
    };

    let parser = MeasurementParser::new();
    let out = if args.detailed {
        serde_json::to_string_pretty(&parser.extract_detailed(&text))?
    } else {
        serde_json::to_string_pretty(&parser.extract(&text))?
    };
    println!("{out}");
    Ok(())
}

fn load_profile(args: &SearchArgs) -> Result<FitscanConfig> {
    let mut profile = match &args.config {
        Some(path) => FitscanConfig::from_file(path)
            .with_context(|| format!("loading profile {}", path.display()))?,
        None => FitscanConfig::default(),
    };
    if let Some(catalog) = &args.catalog {
        profile.catalog = Some(catalog.clone());
    }
    Ok(profile)
}

fn run_search(args: SearchArgs) -> Result<()> {
    let profile = load_profile(&args)?;

    let search = match args.to_request().validate(&profile.search)? {
        Validated::Search(search) => search,
        Validated::Unsupported { category, .. } => {
            tracing::warn!(category = %category, "unsupported category, nothing to search");
            println!("{}", SearchEvent::done(None).to_json()?);
            return Ok(());
        }
    };

    let browser = browser_for(&profile)?;
    let coordinator = coordinator_for(&profile, browser);

    let mut found: Vec<MatchResult> = Vec::new();
    let mut failure: Option<String> = None;
    let stdout = io::stdout();
    let outcome = {
        let mut out = stdout.lock();
        let mut sink = FnSink(|event: SearchEvent| {
            match &event.kind {
                EventKind::Match { item, .. } => found.push(item.clone()),
                EventKind::Error { message } => failure = Some(message.clone()),
                _ => {}
            }
            let line = event.to_json().map_err(|_| SinkClosed)?;
            writeln!(out, "{line}").map_err(|_| SinkClosed)
        });
        coordinator.run(search, &mut sink)
    };

    tracing::info!(
        outcome = outcome.terminal.as_str(),
        processed = outcome.processed,
        matches = outcome.matches,
        "search finished"
    );

    if let Some(path) = &args.json {
        write_json(path, &found)?;
        tracing::info!(path = %path.display(), "saved JSON");
    }
    if let Some(path) = &args.csv {
        write_csv(path, &found)?;
        tracing::info!(path = %path.display(), "saved CSV");
    }

    if outcome.terminal == Terminal::Error {
        bail!(
            "search failed: {}",
            failure.unwrap_or_else(|| "unknown error".into())
        );
    }
    Ok(())
}

fn write_json(path: &Path, matches: &[MatchResult]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, matches)?;
    writer.flush()?;
    Ok(())
}

fn write_csv(path: &Path, matches: &[MatchResult]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for item in matches {
        writer.serialize(item)?;
    }
    writer.flush()?;
    Ok(())
}
