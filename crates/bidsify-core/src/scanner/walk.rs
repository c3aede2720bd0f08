use crate::classify::ScanFile;
use crate::error::Error;
use crate::identity;
use glob::Pattern;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Depth of scan files below the source root:
/// `<root>/<subject>_<session>/<CATEGORY>/<file>`.
const SCAN_FILE_DEPTH: usize = 3;

/// A scan-type folder and its visible files, in file name order.
#[derive(Debug, Clone)]
pub struct ScanFolder {
    pub path: PathBuf,
    /// `<subjectID>_<sessionNumber>`
    pub session_folder: String,
    /// `ANATOMY`, `FUNCTIONAL`, `LOG`, or anything else found on disk.
    pub category_folder: String,
    pub files: Vec<ScanFile>,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn is_ignored_dir(entry: &DirEntry, ignore_patterns: &[Pattern]) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    ignore_patterns.iter().any(|pattern| pattern.matches(&name))
}

fn walker(root: &Path) -> WalkDir {
    WalkDir::new(root).sort_by_file_name()
}

/// Collect every scan-type folder holding at least one visible file.
/// Ignored directories are pruned, not descended into.
pub fn discover_scan_folders(
    root: &Path,
    ignore_patterns: &[Pattern],
) -> Result<Vec<ScanFolder>, Error> {
    let mut by_parent: BTreeMap<PathBuf, Vec<ScanFile>> = BTreeMap::new();

    let entries = walker(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| !is_ignored_dir(entry, ignore_patterns));

    for entry in entries {
        let entry = entry?;
        if !entry.file_type().is_file() || is_hidden(&entry) {
            continue;
        }
        if entry.depth() != SCAN_FILE_DEPTH {
            warn!(
                "Skipping {}: not inside a <subject>_<session>/<scan type> folder",
                entry.path().display()
            );
            continue;
        }

        let size = entry.metadata()?.len();
        if let Some(parent) = entry.path().parent() {
            by_parent
                .entry(parent.to_path_buf())
                .or_default()
                .push(ScanFile::new(entry.path(), size));
        }
    }

    let folders = by_parent
        .into_iter()
        .map(|(path, files)| {
            let category_folder = dir_name(&path);
            let session_folder = path.parent().map(dir_name).unwrap_or_default();
            debug!("Found {} files in {}", files.len(), path.display());
            ScanFolder {
                path,
                session_folder,
                category_folder,
                files,
            }
        })
        .collect();

    Ok(folders)
}

/// Names of the subject/session folders directly under `root`.
pub fn subject_folders(root: &Path, ignore_patterns: &[Pattern]) -> Result<Vec<String>, Error> {
    let mut names = Vec::new();
    let entries = walker(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_entry(|entry| !is_ignored_dir(entry, ignore_patterns));

    for entry in entries {
        let entry = entry?;
        if entry.file_type().is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Create `sub-<ID>/ses-<N>/<scan type>` for every subject, every session in
/// `1..=n_sessions` and every scan type. Existing directories are left as is.
pub fn scaffold_destination(
    dest_root: &Path,
    session_folders: &[String],
    n_sessions: u32,
    scan_types: &[String],
) -> io::Result<usize> {
    let mut created = 0;
    for folder in session_folders {
        let subject = identity::subject_label(identity::subject_id(folder));
        for session in 1..=n_sessions {
            for scan_type in scan_types {
                let dir = dest_root
                    .join(&subject)
                    .join(format!("ses-{}", session))
                    .join(scan_type);
                if !dir.is_dir() {
                    fs::create_dir_all(&dir)?;
                    created += 1;
                }
            }
        }
    }
    Ok(created)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
