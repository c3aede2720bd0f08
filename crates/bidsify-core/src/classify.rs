//! Size-based classification of the files in one scan-type folder.
//!
//! The scanner gives its exports uninformative names, so each file's byte size
//! is the only fingerprint. Classification is pure: it sees paths and sizes,
//! never the filesystem.

use crate::config::SizeProfile;
use crate::problems::ProblemRecord;
use std::fmt;
use std::path::{Path, PathBuf};

/// Source scan-type folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanCategory {
    Anatomy,
    Functional,
    Log,
}

impl ScanCategory {
    pub fn from_folder_name(name: &str) -> Option<Self> {
        match name {
            "ANATOMY" => Some(Self::Anatomy),
            "FUNCTIONAL" => Some(Self::Functional),
            "LOG" => Some(Self::Log),
            _ => None,
        }
    }

    /// Destination folder inside `sub-<ID>/ses-<N>/`.
    pub fn bids_folder(&self) -> &'static str {
        match self {
            Self::Anatomy => "anat",
            Self::Functional => "func",
            Self::Log => "log",
        }
    }
}

/// Output role a source file is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanRole {
    T1w,
    RestRun01,
    McrRun02,
    SwmRun03,
    DdRun04,
    RestRun05,
    /// Log files keep their original name.
    Log,
}

impl ScanRole {
    pub fn category(&self) -> ScanCategory {
        match self {
            Self::T1w => ScanCategory::Anatomy,
            Self::Log => ScanCategory::Log,
            _ => ScanCategory::Functional,
        }
    }

    /// BIDS entity suffix, `None` for log files.
    pub fn token(&self) -> Option<&'static str> {
        match self {
            Self::T1w => Some("acq-MPRAGE_T1w"),
            Self::RestRun01 => Some("task-rest_run-01_bold"),
            Self::McrRun02 => Some("task-mcr_run-02_bold"),
            Self::SwmRun03 => Some("task-swm_run-03_bold"),
            Self::DdRun04 => Some("task-dd_run-04_bold"),
            Self::RestRun05 => Some("task-rest_run-05_bold"),
            Self::Log => None,
        }
    }
}

impl fmt::Display for ScanRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::T1w => "T1w",
            Self::RestRun01 => "rest-run-01",
            Self::McrRun02 => "mcr-run-02",
            Self::SwmRun03 => "swm-run-03",
            Self::DdRun04 => "dd-run-04",
            Self::RestRun05 => "rest-run-05",
            Self::Log => "log",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFile {
    pub path: PathBuf,
    pub size: u64,
}

impl ScanFile {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }

    pub fn file_name(&self) -> String {
        file_name(&self.path)
    }
}

/// Role decision for one input file. `role == None` means do not copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub source: PathBuf,
    pub role: Option<ScanRole>,
}

#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// One entry per input file, in input order.
    pub assignments: Vec<Assignment>,
    pub problems: Vec<ProblemRecord>,
    /// False when the folder itself was not recognised and nothing was tried.
    pub recognized: bool,
}

impl Classification {
    pub fn role_of(&self, source: &Path) -> Option<ScanRole> {
        self.assignments
            .iter()
            .find(|a| a.source == source)
            .and_then(|a| a.role)
    }

    pub fn problem(&self, label: &str) -> Option<&ProblemRecord> {
        self.problems.iter().find(|p| p.label == label)
    }
}

/// Classify the files of a scan-type folder named `folder_name`.
///
/// `files` are listed in folder order; "last-listed" tie-breaks refer to it.
pub fn classify_folder(folder_name: &str, files: &[ScanFile], sizes: &SizeProfile) -> Classification {
    let mut roles: Vec<Option<ScanRole>> = vec![None; files.len()];
    let mut problems = Vec::new();

    let category = match ScanCategory::from_folder_name(folder_name) {
        Some(category) => category,
        None => {
            problems.push(ProblemRecord::new(
                "",
                format!("unrecognized scan or log folder: {}", folder_name),
            ));
            return Classification {
                assignments: assignments(files, roles),
                problems,
                recognized: false,
            };
        }
    };

    match category {
        ScanCategory::Anatomy => classify_anatomy(files, sizes.anatomy_target, &mut roles, &mut problems),
        ScanCategory::Functional => classify_functional(files, sizes, &mut roles, &mut problems),
        ScanCategory::Log => roles.iter_mut().for_each(|role| *role = Some(ScanRole::Log)),
    }

    let unmapped: Vec<&Path> = files
        .iter()
        .zip(&roles)
        .filter(|(_, role)| role.is_none())
        .map(|(file, _)| file.path.as_path())
        .collect();
    if !unmapped.is_empty() {
        problems.push(ProblemRecord::new(
            "Unmapped files",
            format!(
                "The following files were not moved and renamed: {}",
                format_paths(&unmapped)
            ),
        ));
    }

    Classification {
        assignments: assignments(files, roles),
        problems,
        recognized: true,
    }
}

fn assignments(files: &[ScanFile], roles: Vec<Option<ScanRole>>) -> Vec<Assignment> {
    files
        .iter()
        .zip(roles)
        .map(|(file, role)| Assignment {
            source: file.path.clone(),
            role,
        })
        .collect()
}

/// Exact size match wins; otherwise the closest size, flagged. Ties go to the
/// last-listed file in both cases.
fn classify_anatomy(
    files: &[ScanFile],
    target: u64,
    roles: &mut [Option<ScanRole>],
    problems: &mut Vec<ProblemRecord>,
) {
    if files.is_empty() {
        problems.push(ProblemRecord::new("T1w", "No anatomical scan files found"));
        return;
    }

    if let Some(exact) = files.iter().rposition(|f| f.size == target) {
        roles[exact] = Some(ScanRole::T1w);
        return;
    }

    let best_distance = files
        .iter()
        .map(|f| f.size.abs_diff(target))
        .min()
        .unwrap_or(u64::MAX);
    if let Some(closest) = files
        .iter()
        .rposition(|f| f.size.abs_diff(target) == best_distance)
    {
        let name = files[closest].file_name();
        roles[closest] = Some(ScanRole::T1w);
        problems.push(ProblemRecord::new(
            name.clone(),
            format!("No mprage of expected size. Used closest match: {}", name),
        ));
    }
}

fn classify_functional(
    files: &[ScanFile],
    sizes: &SizeProfile,
    roles: &mut [Option<ScanRole>],
    problems: &mut Vec<ProblemRecord>,
) {
    let mut rests: Vec<usize> = Vec::new();
    let mut mcrs: Vec<usize> = Vec::new();
    let mut swms: Vec<usize> = Vec::new();
    let mut leftovers: Vec<usize> = Vec::new();

    for (i, file) in files.iter().enumerate() {
        if sizes.resting_state.contains(file.size) {
            rests.push(i);
        } else if sizes.mcr.contains(file.size) {
            mcrs.push(i);
        } else if sizes.swm.contains(file.size) {
            swms.push(i);
        } else {
            leftovers.push(i);
        }
    }

    let paths_of = |indices: &[usize]| -> String {
        let paths: Vec<&Path> = indices.iter().map(|&i| files[i].path.as_path()).collect();
        format_paths(&paths)
    };

    match rests.len() {
        0 => problems.push(ProblemRecord::new(
            "Resting state",
            "No scan files matching expected size for Resting State.",
        )),
        1 => problems.push(ProblemRecord::new(
            "Resting state",
            format!(
                "Unable to determine which Resting State scan for file: {}",
                files[rests[0]].path.display()
            ),
        )),
        2 => {
            rests.sort_by(|&a, &b| files[a].path.cmp(&files[b].path));
            roles[rests[0]] = Some(ScanRole::RestRun01);
            roles[rests[1]] = Some(ScanRole::RestRun05);
        }
        _ => problems.push(ProblemRecord::new(
            "Resting state",
            format!(
                "Unable to identify Resting State 1 vs 2 from choices: {}",
                paths_of(&rests)
            ),
        )),
    }

    match mcrs.last() {
        Some(&last) => roles[last] = Some(ScanRole::McrRun02),
        None => problems.push(ProblemRecord::new(
            "MCR",
            "No scan files matching expected size for MCR",
        )),
    }

    match swms.last() {
        Some(&last) => roles[last] = Some(ScanRole::SwmRun03),
        None => problems.push(ProblemRecord::new(
            "SWM",
            "No scan files matching expected size for SWM",
        )),
    }

    if let [only] = leftovers.as_slice() {
        roles[*only] = Some(ScanRole::DdRun04);
    } else {
        problems.push(ProblemRecord::new(
            "DD",
            format!(
                "Unable to identify DD scan from choices: {}",
                paths_of(&leftovers)
            ),
        ));
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn format_paths(paths: &[&Path]) -> String {
    let listed: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    format!("[{}]", listed.join(", "))
}
