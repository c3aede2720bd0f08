use crate::engine::PathMapping;
use chrono::NaiveDate;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// `<log_name>.log`
pub fn change_log_file_name(log_name: &str) -> String {
    format!("{}.log", log_name)
}

/// Append one dated block to `<log_dir>/<log_name>.log`:
///
/// ```text
/// 2024-03-01
/// - <destination> moved from <source>
/// ```
///
/// Unmapped entries are skipped. Existing content is never truncated.
pub fn append_change_log(
    log_dir: &Path,
    log_name: &str,
    mappings: &[PathMapping],
    date: NaiveDate,
) -> io::Result<PathBuf> {
    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(change_log_file_name(log_name));

    let mut block = format!("{}\n", date.format("%Y-%m-%d"));
    for mapping in mappings {
        if let Some(destination) = &mapping.destination {
            block.push_str(&format!(
                "- {} moved from {}\n",
                destination.display(),
                mapping.source.display()
            ));
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.write_all(block.as_bytes())?;

    Ok(path)
}
