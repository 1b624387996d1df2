//! `timeline` CLI — check, list, search and summarize story timelines.
//!
//! Every subcommand reads a JSON object of events keyed by id, the same
//! structure `TimelineManager::events_for_save` produces.
//!
//! ## Usage
//!
//! ```sh
//! # Run the conflict rules and print findings
//! timeline check -i events.json
//!
//! # Write the events back with findings attached, using a rule config
//! timeline check -i events.json -o checked.json --config rules.json
//!
//! # Chronological listing, optionally filtered
//! timeline list -i events.json --character elizabeth --type scene
//!
//! # Relevance-ranked search
//! timeline search storm -i events.json
//!
//! # Statistics as JSON
//! cat events.json | timeline stats
//! ```

use std::io::{self, Read};
use std::process;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use timeline_engine::{
    format_date, DetectorConfig, EventFilter, EventType, Severity, TimelineManager,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "timeline",
    version,
    about = "Check, list and search story timelines"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the conflict rules over every event
    Check {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Write the events, with findings attached, to this file
        #[arg(short, long)]
        output: Option<String>,
        /// JSON file toggling individual rules
        #[arg(long)]
        config: Option<String>,
        /// Exit with status 1 when active error-severity findings remain
        #[arg(long)]
        strict: bool,
    },
    /// List events in chronological order
    List {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Only events of this type (e.g. "scene", "plot-point")
        #[arg(long = "type")]
        event_type: Option<String>,
        /// Only events featuring this character id
        #[arg(long)]
        character: Option<String>,
        /// Only events carrying this tag
        #[arg(long)]
        tag: Option<String>,
    },
    /// Search titles, descriptions, locations, tags and notes
    Search {
        /// Text to look for (case-insensitive)
        query: String,
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Print timeline statistics as JSON
    Stats {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Check {
            input,
            output,
            config,
            strict,
        } => {
            let mut timeline = load_timeline(input.as_deref())?;
            if let Some(path) = config.as_deref() {
                timeline.set_config(load_config(path)?);
            }

            let findings = timeline.detect_all_conflicts();
            if findings.is_empty() {
                println!("No conflicts found");
            }
            for conflict in &findings {
                let mut flags = String::new();
                if conflict.resolved {
                    flags.push_str(" (resolved)");
                }
                if conflict.ignored_by_user {
                    flags.push_str(" (ignored)");
                }
                println!(
                    "[{}] {}: {} [{}]{}",
                    conflict.severity,
                    conflict.conflict_type,
                    conflict.message,
                    conflict.event_ids.join(", "),
                    flags
                );
            }
            if !findings.is_empty() {
                println!("{} conflict(s) found", findings.len());
            }

            if let Some(path) = output.as_deref() {
                let json = timeline
                    .to_json_pretty()
                    .context("Failed to serialize events")?;
                write_output(Some(path), &json)?;
            }

            let blocking = findings
                .iter()
                .filter(|c| c.is_active() && c.severity == Severity::Error)
                .count();
            if strict && blocking > 0 {
                process::exit(1);
            }
        }
        Commands::List {
            input,
            event_type,
            character,
            tag,
        } => {
            let timeline = load_timeline(input.as_deref())?;
            let mut filter = EventFilter::default();
            if let Some(raw) = event_type.as_deref() {
                filter.types.push(EventType::from_str(raw)?);
            }
            filter.character_ids.extend(character);
            filter.tags.extend(tag);

            let matching = timeline.filter_events(&filter);
            for event in timeline_engine::sort_events(matching) {
                println!(
                    "{:<28} {} [{}]",
                    format_date(&event.start_date),
                    event.title,
                    event.event_type
                );
            }
        }
        Commands::Search { query, input } => {
            let timeline = load_timeline(input.as_deref())?;
            let hits = timeline.search_events(&query);
            if hits.is_empty() {
                println!("No matches for '{}'", query);
            }
            for hit in hits {
                println!("{:>3}  {}", hit.relevance, hit.event.title);
            }
        }
        Commands::Stats { input } => {
            let timeline = load_timeline(input.as_deref())?;
            let stats = serde_json::to_string_pretty(&timeline.get_statistics())?;
            println!("{}", stats);
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_timeline(path: Option<&str>) -> Result<TimelineManager> {
    let json = read_input(path)?;
    let timeline = TimelineManager::from_json(&json).context("Failed to parse events JSON")?;
    info!(events = timeline.len(), "loaded timeline");
    Ok(timeline)
}

fn load_config(path: &str) -> Result<DetectorConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid rule config: {}", path))
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
