pub mod changelog;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod naming;
pub mod problems;
pub mod progress;
pub mod scanner;

pub use classify::{ScanCategory, ScanFile, ScanRole};
pub use config::BidsifyConfig;
pub use engine::{BidsEngine, FolderPlan, PathMapping, RunOutcome};
pub use error::Error;
pub use identity::SubjectSession;
pub use problems::{ProblemCollector, ProblemRecord};
pub use progress::{ProgressReporter, SilentReporter};
