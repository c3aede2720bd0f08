use crate::error::Error;
use config::{Config, Environment, File as ConfigFile};
use glob::Pattern;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Expected byte count of an MPRAGE anatomical scan.
pub const ANATOMY_TARGET_SIZE: u64 = 28_836_192;
/// Resting-state functional scan midpoint.
pub const RESTING_STATE_MIDPOINT: u64 = 110_592_352;
pub const MCR_MIDPOINT: u64 = 77_414_752;
pub const SWM_MIDPOINT: u64 = 82_944_352;
/// Half-width of every functional size window (bytes).
pub const WINDOW_TOLERANCE: u64 = 2_000;

/// A byte-size window `[midpoint - tolerance, midpoint + tolerance)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SizeWindow {
    pub midpoint: u64,
    pub tolerance: u64,
}

impl SizeWindow {
    pub const fn new(midpoint: u64, tolerance: u64) -> Self {
        Self {
            midpoint,
            tolerance,
        }
    }

    fn lower(&self) -> u64 {
        self.midpoint.saturating_sub(self.tolerance)
    }

    fn upper(&self) -> u64 {
        self.midpoint.saturating_add(self.tolerance)
    }

    pub fn contains(&self, size: u64) -> bool {
        size >= self.lower() && size < self.upper()
    }

    pub fn overlaps(&self, other: &SizeWindow) -> bool {
        self.lower() < other.upper() && other.lower() < self.upper()
    }
}

/// Size fingerprints for one scanner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SizeProfile {
    pub anatomy_target: u64,
    pub resting_state: SizeWindow,
    pub mcr: SizeWindow,
    pub swm: SizeWindow,
}

impl Default for SizeProfile {
    fn default() -> Self {
        Self {
            anatomy_target: ANATOMY_TARGET_SIZE,
            resting_state: SizeWindow::new(RESTING_STATE_MIDPOINT, WINDOW_TOLERANCE),
            mcr: SizeWindow::new(MCR_MIDPOINT, WINDOW_TOLERANCE),
            swm: SizeWindow::new(SWM_MIDPOINT, WINDOW_TOLERANCE),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BidsifyConfig {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    #[serde(default = "default_n_sessions")]
    pub n_sessions: u32,
    #[serde(default = "default_scan_types")]
    pub scan_types: Vec<String>,
    #[serde(default = "default_true")]
    pub detect_size: bool,
    #[serde(default = "default_true")]
    pub log_changes: bool,
    #[serde(default = "default_log_name")]
    pub log_name: String,
    #[serde(default = "default_true")]
    pub log_errors: bool,
    /// Directory for the error log; the working directory when unset.
    #[serde(default)]
    pub errlog_path: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub verbose: bool,
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
    #[serde(default)]
    pub sizes: SizeProfile,
}

fn default_n_sessions() -> u32 {
    2
}

fn default_scan_types() -> Vec<String> {
    vec!["anat".to_string(), "func".to_string(), "log".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_log_name() -> String {
    "CHANGES".to_string()
}

fn default_ignore_patterns() -> Vec<String> {
    vec!["DONTUSE*".to_string()]
}

/// Values supplied on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub source_path: Option<String>,
    pub destination_path: Option<String>,
    pub n_sessions: Option<u32>,
    pub scan_types: Option<Vec<String>>,
    pub detect_size: Option<bool>,
    pub log_changes: Option<bool>,
    pub log_name: Option<String>,
    pub log_errors: Option<bool>,
    pub errlog_path: Option<String>,
    pub verbose: Option<bool>,
}

/// Layer defaults, `Bidsify.toml` (or `config_file`), `BIDSIFY_*` env vars and
/// command line overrides, then validate the result.
pub fn load_configuration(
    config_file: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<BidsifyConfig, Error> {
    let file_source = match config_file {
        Some(path) => ConfigFile::from(path).required(true),
        None => ConfigFile::with_name("Bidsify").required(false),
    };

    let builder = Config::builder()
        .add_source(file_source)
        .add_source(Environment::with_prefix("BIDSIFY").try_parsing(true))
        .set_override_option("source_path", overrides.source_path)?
        .set_override_option("destination_path", overrides.destination_path)?
        .set_override_option("n_sessions", overrides.n_sessions.map(i64::from))?
        .set_override_option("scan_types", overrides.scan_types)?
        .set_override_option("detect_size", overrides.detect_size)?
        .set_override_option("log_changes", overrides.log_changes)?
        .set_override_option("log_name", overrides.log_name)?
        .set_override_option("log_errors", overrides.log_errors)?
        .set_override_option("errlog_path", overrides.errlog_path)?
        .set_override_option("verbose", overrides.verbose)?
        .build()?;

    let config = builder.try_deserialize::<BidsifyConfig>()?;
    config.validate()?;
    Ok(config)
}

impl BidsifyConfig {
    pub fn new(source_path: impl Into<PathBuf>, destination_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            destination_path: destination_path.into(),
            n_sessions: default_n_sessions(),
            scan_types: default_scan_types(),
            detect_size: true,
            log_changes: true,
            log_name: default_log_name(),
            log_errors: true,
            errlog_path: None,
            verbose: true,
            ignore_patterns: default_ignore_patterns(),
            sizes: SizeProfile::default(),
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !self.detect_size {
            return Err(Error::UnsupportedDetection);
        }
        if self.n_sessions == 0 {
            return Err(Error::InvalidConfig(
                "n_sessions must be at least 1".to_string(),
            ));
        }
        if self.log_name.trim().is_empty() {
            return Err(Error::InvalidConfig("log_name must not be empty".to_string()));
        }
        if self.scan_types.is_empty() {
            return Err(Error::InvalidConfig(
                "scan_types must name at least one folder".to_string(),
            ));
        }

        let windows = [
            ("resting_state", &self.sizes.resting_state),
            ("mcr", &self.sizes.mcr),
            ("swm", &self.sizes.swm),
        ];
        for (i, (name_a, a)) in windows.iter().enumerate() {
            for (name_b, b) in &windows[i + 1..] {
                if a.overlaps(b) {
                    return Err(Error::InvalidConfig(format!(
                        "size windows {} and {} overlap",
                        name_a, name_b
                    )));
                }
            }
        }

        self.ignore_matchers()?;
        Ok(())
    }

    pub fn ignore_matchers(&self) -> Result<Vec<Pattern>, Error> {
        self.ignore_patterns
            .iter()
            .map(|glob| {
                Pattern::new(glob).map_err(|source| Error::Pattern {
                    pattern: glob.clone(),
                    source,
                })
            })
            .collect()
    }

    /// Directory the error log is written to.
    pub fn errlog_dir(&self) -> Result<PathBuf, Error> {
        match &self.errlog_path {
            Some(path) => absolute(path),
            None => Ok(env::current_dir()?),
        }
    }
}

pub(crate) fn absolute(path: &Path) -> Result<PathBuf, Error> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}
