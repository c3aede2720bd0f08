use bidsify_core::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Verbose CLI reporter: a spinner per phase plus one line per copied file.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn spinner(&self, message: &str) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars(TICK_CHARS));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));

        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    /// Print above the spinner so the two don't interleave.
    fn line(&self, text: String) {
        let guard = self.bar.lock().ok();
        match guard.as_ref().and_then(|bar| bar.as_ref()) {
            Some(pb) => pb.println(text),
            None => println!("{}", text),
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_scaffold_start(&self, subjects: usize) {
        self.spinner(&format!(
            "Creating BIDS directory structure for {} folders...",
            subjects
        ));
    }

    fn on_scaffold_complete(&self, directories: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Directory structure ready: {} new directories in {:.2}s",
            directories, duration_secs
        );
        self.spinner("Moving and renaming files...");
    }

    fn on_folder_start(&self, folder: &Path) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_message(format!("Processing {}", folder.display()));
            }
        }
    }

    fn on_copy(&self, source: &Path, destination: &Path) {
        self.line(format!(
            "moving {} to {} ...",
            source.display(),
            destination.display()
        ));
    }

    fn on_change_log_written(&self, path: &Path) {
        self.line(format!("wrote to log file {}", path.display()));
    }

    fn on_error_log_written(&self, _path: &Path) {
        self.line("Writing error log file".to_string());
    }

    fn on_run_complete(&self, folders: usize, files_copied: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Copied {} files from {} folders in {:.2}s",
            files_copied, folders, duration_secs
        );
    }
}
