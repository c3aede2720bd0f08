mod commands;
mod logging;
mod progress;

use std::process;

use anyhow::Context;
use bidsify_core::config::{self, BidsifyConfig};
use bidsify_core::engine::collect_problems;
use bidsify_core::{BidsEngine, ProgressReporter, RunOutcome, SilentReporter};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, ConvertArgs};
use dotenv::dotenv;
use progress::CliReporter;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args = Cli::parse();

    let _guard = logging::init_logger(args.quiet());

    match args.command {
        Some(Commands::Convert(convert_args)) => {
            let engine = build_engine(&convert_args);
            run_convert(&engine)?;
        }
        Some(Commands::Plan(convert_args)) => {
            let engine = build_engine(&convert_args);
            run_plan(&engine)?;
        }
        Some(Commands::PrintConfig(convert_args)) => {
            println!("Configuration: {:#?}", load_config(&convert_args));
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn load_config(args: &ConvertArgs) -> BidsifyConfig {
    match config::load_configuration(args.config.as_deref(), args.overrides()) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    }
}

fn build_engine(args: &ConvertArgs) -> BidsEngine {
    match BidsEngine::new(load_config(args)) {
        Ok(engine) => engine,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    }
}

fn run_convert(engine: &BidsEngine) -> anyhow::Result<()> {
    let config = engine.config();
    let verbose_reporter;
    let reporter: &dyn ProgressReporter = if config.verbose {
        verbose_reporter = CliReporter::new();
        &verbose_reporter
    } else {
        &SilentReporter
    };

    let outcome = engine.run(reporter).with_context(|| {
        format!(
            "BIDS conversion of {} failed",
            config.source_path.display()
        )
    })?;

    info!(
        "{} files copied from {} folders in {}",
        format!("{}", outcome.files_copied).green(),
        format!("{}", outcome.folders_processed).cyan(),
        format!("{:.2}s", outcome.duration.as_secs_f64()).green(),
    );
    print_final_report(&outcome, config.log_errors);

    Ok(())
}

fn print_final_report(outcome: &RunOutcome, log_errors: bool) {
    let destination = outcome.destination.display();

    println!("------------------------");
    match (&outcome.error_log, outcome.problems.is_empty(), log_errors) {
        (Some(error_log), _, _) => println!(
            "Finished.\nBIDSified directory output at {}\nSee {} for log of encountered errors.",
            destination,
            error_log.display().to_string().red()
        ),
        (None, false, _) => {
            print!("{}", outcome.problems);
            println!(
                "Finished.\nBIDSified directory output at {}\nSee above for list of encountered errors.",
                destination
            );
        }
        (None, true, true) => println!(
            "Finished.\nBIDSified directory output at {}\nNo conversion errors encountered, so error log file not written.",
            destination
        ),
        (None, true, false) => println!("Finished.\nBIDSified directory output at {}", destination),
    }
}

fn run_plan(engine: &BidsEngine) -> anyhow::Result<()> {
    let plans = engine.plan().context("Unable to read source tree")?;

    let mut mapped = 0;
    for plan in &plans {
        println!("{}", plan.folder.display().to_string().bold());
        for mapping in &plan.mappings {
            match &mapping.destination {
                Some(destination) => {
                    mapped += 1;
                    println!(
                        "  {} -> {}",
                        mapping.source.display(),
                        destination.display().to_string().green()
                    );
                }
                None => println!(
                    "  {} {}",
                    mapping.source.display(),
                    "(not copied)".yellow()
                ),
            }
        }
    }

    let problems = collect_problems(&plans);
    println!("------------------------");
    if !problems.is_empty() {
        print!("{}", problems);
    }
    println!(
        "{} files would be copied from {} folders, {} problems",
        format!("{}", mapped).green(),
        format!("{}", plans.len()).cyan(),
        format!("{}", problems.len()).red(),
    );

    Ok(())
}
