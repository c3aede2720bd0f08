use std::path::Path;

/// Trait for reporting run progress.
///
/// The CLI implements it with indicatif when verbose output is requested.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scaffold_start(&self, _subjects: usize) {}
    fn on_scaffold_complete(&self, _directories: usize, _duration_secs: f64) {}
    fn on_folder_start(&self, _folder: &Path) {}
    fn on_copy(&self, _source: &Path, _destination: &Path) {}
    fn on_change_log_written(&self, _path: &Path) {}
    fn on_error_log_written(&self, _path: &Path) {}
    fn on_run_complete(&self, _folders: usize, _files_copied: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
