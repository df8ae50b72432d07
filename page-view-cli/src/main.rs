//! Page View Tracker CLI Application
//!
//! Replays scripted app sessions against the page-view-tracker library.
//! It uses the library as a host application would and adds:
//! - TOML scenario files (views, clock advances, lifecycle signals)
//! - A deterministic manual clock
//! - Text or JSON-lines output of every event that reaches the sink

use anyhow::Result;
use clap::Parser;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

mod config;
mod replay;

/// Page View Tracker - Replay app sessions and inspect the page view events
#[derive(Parser, Debug)]
#[command(name = "page-view-cli")]
#[command(about = "Replay scripted app sessions through the page view tracker", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the scenario file (scenario.toml)
    #[arg(short, long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Print events as JSON lines instead of text
    #[arg(long)]
    json: bool,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Page View Tracker CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using tracker library v{}", page_view_tracker::VERSION);

    match &args.script {
        Some(script) => replay_mode(script, &args)?,
        None => {
            // No arguments - show help
            println!("Page View Tracker - No scenario specified");
            println!("\nQuick Start:");
            println!("  page-view-cli --script page-view-cli/scenarios/suspend_resume.toml");
            println!("  page-view-cli --script session.toml --json");
            println!("\nUse --help for more options");
        }
    }

    Ok(())
}

/// Load a scenario, replay it and print the resulting events
fn replay_mode(script: &Path, args: &Args) -> Result<()> {
    log::info!("Loading scenario from: {:?}", script);
    let scenario = config::load_scenario(script)?;
    log::debug!("Scenario loaded: {} steps", scenario.steps.len());

    let report = replay::run(&scenario);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.json {
        for event in &report.events {
            writeln!(out, "{}", serde_json::to_string(event)?)?;
        }
        return Ok(());
    }

    if args.quiet {
        return Ok(());
    }

    writeln!(out, "═══════════════════════════════════════════════")?;
    writeln!(out, "  Page View Replay - {:?}", script)?;
    writeln!(out, "═══════════════════════════════════════════════\n")?;

    for event in &report.events {
        writeln!(
            out,
            "{}",
            replay::format_event(event, scenario.tracker.log_name_width)
        )?;
    }

    writeln!(out, "\n=== REPLAY SUMMARY ===")?;
    writeln!(out, "Steps replayed: {}", report.steps)?;
    writeln!(out, "Events sent:    {}", report.events.len())?;
    writeln!(out, "Pages cached:   {}", report.pages_cached)?;
    match report.running_page {
        Some(id) => writeln!(out, "Still running:  {}", id)?,
        None => writeln!(out, "Still running:  none")?,
    }
    if !scenario.sink_enabled {
        writeln!(out, "\nSink disabled - events were logged instead (use -v to see them)")?;
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
