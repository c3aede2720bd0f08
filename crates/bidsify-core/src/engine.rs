use crate::changelog;
use crate::classify::{self, ScanCategory, ScanFile, ScanRole};
use crate::config::{self, BidsifyConfig, SizeProfile};
use crate::error::Error;
use crate::identity;
use crate::naming::{self, SCAN_EXTENSION};
use crate::problems::{ProblemCollector, ProblemRecord};
use crate::progress::ProgressReporter;
use crate::scanner::{self, ScanFolder};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Source file and where it goes. `destination == None` means do not copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
}

impl PathMapping {
    pub fn new(source: impl Into<PathBuf>, destination: Option<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination,
        }
    }
}

/// Everything decided about one scan-type folder before any file is touched.
#[derive(Debug, Clone)]
pub struct FolderPlan {
    pub folder: PathBuf,
    /// `sub-<ID>`, the error report key.
    pub subject: String,
    /// Session number as the error report shows it.
    pub session: String,
    /// Session log directory, `None` when the folder was rejected outright.
    pub log_dir: Option<PathBuf>,
    pub mappings: Vec<PathMapping>,
    pub problems: Vec<ProblemRecord>,
}

impl FolderPlan {
    /// Mapped (source, destination) pairs in folder order.
    pub fn copies(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.mappings.iter().filter_map(|m| {
            m.destination
                .as_deref()
                .map(|destination| (m.source.as_path(), destination))
        })
    }
}

/// Resolve identity, classify and name every file of one scan-type folder.
///
/// A log file named like the session change log is left uncopied so it
/// cannot replace the appended history.
pub fn plan_folder(
    dest_root: &Path,
    folder: &ScanFolder,
    n_sessions: u32,
    sizes: &SizeProfile,
    log_name: &str,
) -> FolderPlan {
    let unmapped = |files: &[ScanFile]| -> Vec<PathMapping> {
        files
            .iter()
            .map(|f| PathMapping::new(f.path.clone(), None))
            .collect()
    };

    let session = match identity::resolve_session_folder(&folder.session_folder, n_sessions) {
        Ok(session) => session,
        Err(unresolved) => {
            return FolderPlan {
                folder: folder.path.clone(),
                subject: identity::subject_label(&unresolved.subject),
                session: unresolved.raw_session.clone(),
                log_dir: None,
                mappings: unmapped(&folder.files),
                problems: vec![unresolved.problem()],
            };
        }
    };

    debug!("Classifying {} as {}", folder.path.display(), session);
    let classification = classify::classify_folder(&folder.category_folder, &folder.files, sizes);
    let change_log = changelog::change_log_file_name(log_name);
    let mut problems = classification.problems;
    let mappings = classification
        .assignments
        .iter()
        .map(|assignment| {
            let original_name = assignment
                .source
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let destination = match assignment.role {
                Some(ScanRole::Log) if original_name == change_log => {
                    problems.push(ProblemRecord::new(
                        original_name.clone(),
                        format!("Not copied: would overwrite change log {}", change_log),
                    ));
                    None
                }
                Some(role) => Some(naming::destination_path(
                    dest_root,
                    &session,
                    role,
                    &original_name,
                    SCAN_EXTENSION,
                )),
                None => None,
            };
            PathMapping::new(assignment.source.clone(), destination)
        })
        .collect();

    FolderPlan {
        folder: folder.path.clone(),
        subject: session.subject_label(),
        session: session.session.to_string(),
        log_dir: classification
            .recognized
            .then(|| naming::category_dir(dest_root, &session, ScanCategory::Log)),
        mappings,
        problems,
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub destination: PathBuf,
    pub problems: ProblemCollector,
    pub folders_processed: usize,
    pub files_copied: usize,
    pub duration: Duration,
    /// Set when problems were written to an error log file.
    pub error_log: Option<PathBuf>,
}

pub struct BidsEngine {
    config: BidsifyConfig,
}

impl BidsEngine {
    /// Fails on an invalid configuration, before any filesystem access.
    pub fn new(config: BidsifyConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BidsifyConfig {
        &self.config
    }

    /// Classify every folder without creating, copying or logging anything.
    pub fn plan(&self) -> Result<Vec<FolderPlan>, Error> {
        let source = config::absolute(&self.config.source_path)?;
        let dest = config::absolute(&self.config.destination_path)?;
        let ignore = self.config.ignore_matchers()?;

        let folders = scanner::discover_scan_folders(&source, &ignore)?;
        Ok(folders
            .iter()
            .map(|folder| {
                plan_folder(
                    &dest,
                    folder,
                    self.config.n_sessions,
                    &self.config.sizes,
                    &self.config.log_name,
                )
            })
            .collect())
    }

    /// Run the full conversion:
    /// 1. Scaffold the destination tree for every subject and session
    /// 2. Classify each scan-type folder and append its change log
    /// 3. Copy mapped files
    /// 4. Write the error log if anything could not be classified
    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<RunOutcome, Error> {
        let start = Instant::now();
        let source = config::absolute(&self.config.source_path)?;
        let dest = config::absolute(&self.config.destination_path)?;
        let ignore = self.config.ignore_matchers()?;

        // Phase 1: Scaffold
        info!("Creating BIDS directory structure...");
        let scaffold_start = Instant::now();
        let session_folders = scanner::subject_folders(&source, &ignore)?;
        reporter.on_scaffold_start(session_folders.len());
        let created = scanner::scaffold_destination(
            &dest,
            &session_folders,
            self.config.n_sessions,
            &self.config.scan_types,
        )?;
        reporter.on_scaffold_complete(created, scaffold_start.elapsed().as_secs_f64());
        debug!("{} directories created under {}", created, dest.display());

        // Phase 2 + 3: Classify, log and copy
        info!("Moving and renaming files...");
        let folders = scanner::discover_scan_folders(&source, &ignore)?;
        let today = Local::now().date_naive();
        let mut problems = ProblemCollector::new();
        let mut files_copied = 0;

        for folder in &folders {
            reporter.on_folder_start(&folder.path);
            let plan = plan_folder(
                &dest,
                folder,
                self.config.n_sessions,
                &self.config.sizes,
                &self.config.log_name,
            );

            if self.config.log_changes {
                if let Some(log_dir) = &plan.log_dir {
                    let log_path =
                        changelog::append_change_log(log_dir, &self.config.log_name, &plan.mappings, today)?;
                    reporter.on_change_log_written(&log_path);
                }
            }

            for (source_file, destination) in plan.copies() {
                reporter.on_copy(source_file, destination);
                debug!("Copying {} to {}", source_file.display(), destination.display());
                if let Some(parent) = destination.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(source_file, destination)?;
                files_copied += 1;
            }

            problems.record(&plan.subject, &plan.session, plan.problems);
        }

        // Phase 4: Error log
        let mut error_log = None;
        if !problems.is_empty() && self.config.log_errors {
            let dir = self.config.errlog_dir()?;
            fs::create_dir_all(&dir)?;
            let path = problems.write_error_log(&dir)?;
            info!("Wrote error log {}", path.display());
            reporter.on_error_log_written(&path);
            error_log = Some(path);
        }

        let duration = start.elapsed();
        reporter.on_run_complete(folders.len(), files_copied, duration.as_secs_f64());

        Ok(RunOutcome {
            destination: dest,
            problems,
            folders_processed: folders.len(),
            files_copied,
            duration,
            error_log,
        })
    }
}

/// Gather the problems of dry-run plans the way a real run would.
pub fn collect_problems(plans: &[FolderPlan]) -> ProblemCollector {
    let mut problems = ProblemCollector::new();
    for plan in plans {
        problems.record(&plan.subject, &plan.session, plan.problems.iter().cloned());
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ANATOMY_TARGET_SIZE;

    fn folder(session_folder: &str, category: &str, files: &[(&str, u64)]) -> ScanFolder {
        let path = PathBuf::from("/raw").join(session_folder).join(category);
        ScanFolder {
            files: files
                .iter()
                .map(|(name, size)| ScanFile::new(path.join(name), *size))
                .collect(),
            path,
            session_folder: session_folder.to_string(),
            category_folder: category.to_string(),
        }
    }

    #[test]
    fn test_plan_maps_anatomy_and_sets_log_dir() {
        let scans = folder("0001_01", "ANATOMY", &[("scanA.dat", ANATOMY_TARGET_SIZE), ("junk.dat", 5)]);
        let plan = plan_folder(Path::new("/bids"), &scans, 2, &SizeProfile::default(), "CHANGES");

        assert_eq!(plan.subject, "sub-0001");
        assert_eq!(plan.session, "1");
        assert_eq!(plan.log_dir, Some(PathBuf::from("/bids/sub-0001/ses-1/log")));
        let copies: Vec<(&Path, &Path)> = plan.copies().collect();
        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0].0, Path::new("/raw/0001_01/ANATOMY/scanA.dat"));
        assert_eq!(
            copies[0].1,
            Path::new("/bids/sub-0001/ses-1/anat/sub-0001_ses-1_acq-MPRAGE_T1w.nii")
        );
        assert_eq!(plan.problems.len(), 1);
        assert_eq!(plan.problems[0].label, "Unmapped files");
    }

    #[test]
    fn test_plan_rejects_out_of_range_session_before_classifying() {
        let logs = folder("0001_03", "LOG", &[("notes.log", 1)]);
        let plan = plan_folder(Path::new("/bids"), &logs, 2, &SizeProfile::default(), "CHANGES");

        assert_eq!(plan.session, "3");
        assert!(plan.log_dir.is_none());
        assert_eq!(plan.copies().count(), 0);
        assert_eq!(plan.mappings.len(), 1);
        assert_eq!(
            plan.problems,
            vec![ProblemRecord::new("Session ?", "Unrecognized session number: 3")]
        );
    }

    #[test]
    fn test_log_file_named_like_change_log_is_not_copied() {
        let logs = folder("0001_01", "LOG", &[("CHANGES.log", 14), ("run.txt", 3)]);
        let plan = plan_folder(Path::new("/bids"), &logs, 2, &SizeProfile::default(), "CHANGES");

        let copies: Vec<(&Path, &Path)> = plan.copies().collect();
        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0].1, Path::new("/bids/sub-0001/ses-1/log/run.txt"));
        assert_eq!(
            plan.problems,
            vec![ProblemRecord::new(
                "CHANGES.log",
                "Not copied: would overwrite change log CHANGES.log"
            )]
        );
    }

    #[test]
    fn test_custom_change_log_name_frees_default_name() {
        let logs = folder("0001_01", "LOG", &[("CHANGES.log", 14)]);
        let plan = plan_folder(Path::new("/bids"), &logs, 2, &SizeProfile::default(), "history");
        assert_eq!(plan.copies().count(), 1);
        assert!(plan.problems.is_empty());
    }

    #[test]
    fn test_plan_for_unknown_category_has_no_log_dir() {
        let other = folder("0001_01", "DTI", &[("a.dat", 1)]);
        let plan = plan_folder(Path::new("/bids"), &other, 2, &SizeProfile::default(), "CHANGES");
        assert!(plan.log_dir.is_none());
        assert_eq!(plan.copies().count(), 0);
        assert_eq!(plan.problems[0].message, "unrecognized scan or log folder: DTI");
    }

    #[test]
    fn test_collect_problems_keys_by_subject_and_session() {
        let plans = vec![
            plan_folder(Path::new("/bids"), &folder("0002_09", "LOG", &[("a", 1)]), 2, &SizeProfile::default(), "CHANGES"),
            plan_folder(Path::new("/bids"), &folder("0002_01", "LOG", &[("a", 1)]), 2, &SizeProfile::default(), "CHANGES"),
        ];
        let problems = collect_problems(&plans);
        assert_eq!(problems.len(), 1);
        assert!(problems.get("sub-0002", "9", "Session ?").is_some());
    }

    #[test]
    fn test_engine_rejects_disabled_size_detection() {
        let mut config = BidsifyConfig::new("/raw", "/bids");
        config.detect_size = false;
        assert!(matches!(BidsEngine::new(config), Err(Error::UnsupportedDetection)));
    }
}
