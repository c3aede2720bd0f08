use bidsify_core::config::ConfigOverrides;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "bidsify")]
#[command(about = "Convert scanner exports to the BIDS directory layout", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn quiet(&self) -> bool {
        match &self.command {
            Some(Commands::Convert(args) | Commands::Plan(args) | Commands::PrintConfig(args)) => {
                args.quiet
            }
            None => false,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Copy and rename files into a BIDS directory tree
    Convert(ConvertArgs),
    /// Show what convert would copy, without touching the destination
    Plan(ConvertArgs),
    /// Print configuration values
    PrintConfig(ConvertArgs),
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Path to directory of files to be BIDSified
    pub origpath: Option<String>,
    /// Path to output directory for BIDSified files
    pub destpath: Option<String>,
    /// Number of sessions each participant attended
    #[arg(long)]
    pub n_sessions: Option<u32>,
    /// Folders created inside every session directory
    #[arg(long, value_delimiter = ',')]
    pub scan_types: Option<Vec<String>>,
    /// Disable size-based name mapping (not supported)
    #[arg(long)]
    pub no_detect_size: bool,
    /// Do not append to the per-session change log
    #[arg(long)]
    pub no_log_changes: bool,
    /// Name of the change log file, without extension
    #[arg(long)]
    pub log_name: Option<String>,
    /// Print errors instead of writing bidsify_errors.log
    #[arg(long)]
    pub no_log_errors: bool,
    /// Output directory for the error log file
    #[arg(long)]
    pub errlog_path: Option<String>,
    /// Do not print progress for every file
    #[arg(short, long)]
    pub quiet: bool,
    /// Configuration file (defaults to Bidsify.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn disabled(flag: bool) -> Option<bool> {
    flag.then_some(false)
}

impl ConvertArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            source_path: self.origpath.clone(),
            destination_path: self.destpath.clone(),
            n_sessions: self.n_sessions,
            scan_types: self.scan_types.clone(),
            detect_size: disabled(self.no_detect_size),
            log_changes: disabled(self.no_log_changes),
            log_name: self.log_name.clone(),
            log_errors: disabled(self.no_log_errors),
            errlog_path: self.errlog_path.clone(),
            verbose: disabled(self.quiet),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_flags_become_overrides() {
        let cli = Cli::parse_from([
            "bidsify",
            "convert",
            "raw",
            "bids",
            "--n-sessions",
            "3",
            "--scan-types",
            "anat,func",
            "--no-log-errors",
            "--quiet",
        ]);
        let Some(Commands::Convert(args)) = cli.command else {
            panic!("expected convert");
        };
        let overrides = args.overrides();
        assert_eq!(overrides.source_path.as_deref(), Some("raw"));
        assert_eq!(overrides.n_sessions, Some(3));
        assert_eq!(
            overrides.scan_types,
            Some(vec!["anat".to_string(), "func".to_string()])
        );
        assert_eq!(overrides.log_errors, Some(false));
        assert_eq!(overrides.verbose, Some(false));
        assert_eq!(overrides.log_changes, None);
        assert_eq!(overrides.detect_size, None);
    }
}
