use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ERROR_LOG_FILE_NAME: &str = "bidsify_errors.log";
const ERROR_LOG_HEADER: &str = "BIDSIFY FILE CONVERSION ERRORS:";

/// A classification problem. The label is a role name, a file name, or empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemRecord {
    pub label: String,
    pub message: String,
}

impl ProblemRecord {
    pub fn new(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            message: message.into(),
        }
    }
}

/// Session report key. Numeric sessions sort by value and come before
/// unparsable ones, which sort as text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionKey(String);

impl SessionKey {
    fn number(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl Ord for SessionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.number(), other.number());
        (a.is_none(), a, &self.0).cmp(&(b.is_none(), b, &other.0))
    }
}

impl PartialOrd for SessionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

type SessionProblems = BTreeMap<SessionKey, BTreeMap<String, String>>;

/// Problems for the whole run, keyed subject -> session -> label.
///
/// Recording the same (subject, session, label) twice keeps only the later
/// message.
#[derive(Debug, Default, Clone)]
pub struct ProblemCollector {
    subjects: BTreeMap<String, SessionProblems>,
}

impl ProblemCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record<I>(&mut self, subject: &str, session: &str, problems: I)
    where
        I: IntoIterator<Item = ProblemRecord>,
    {
        let mut problems = problems.into_iter().peekable();
        if problems.peek().is_none() {
            return;
        }

        let labels = self
            .subjects
            .entry(subject.to_string())
            .or_default()
            .entry(SessionKey(session.to_string()))
            .or_default();
        for problem in problems {
            debug!(
                "Problem for {} session {}: {}: {}",
                subject, session, problem.label, problem.message
            );
            labels.insert(problem.label, problem.message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Total number of recorded (subject, session, label) entries.
    pub fn len(&self) -> usize {
        self.subjects
            .values()
            .flat_map(|sessions| sessions.values())
            .map(|labels| labels.len())
            .sum()
    }

    pub fn get(&self, subject: &str, session: &str, label: &str) -> Option<&str> {
        self.subjects
            .get(subject)
            .and_then(|sessions| sessions.get(&SessionKey(session.to_string())))
            .and_then(|labels| labels.get(label))
            .map(String::as_str)
    }

    /// Append the report to `<dir>/bidsify_errors.log` and return its path.
    pub fn write_error_log(&self, dir: &Path) -> io::Result<PathBuf> {
        let path = dir.join(ERROR_LOG_FILE_NAME);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut report = String::new();
        report.push_str(ERROR_LOG_HEADER);
        report.push('\n');
        for (subject, sessions) in &self.subjects {
            report.push('\n');
            write_subject(&mut report, subject, sessions)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        }
        file.write_all(report.as_bytes())?;

        Ok(path)
    }
}

fn write_subject(out: &mut String, subject: &str, sessions: &SessionProblems) -> fmt::Result {
    writeln!(out, "{}", subject)?;
    for (session, labels) in sessions {
        writeln!(out, "\tsession {}:", session.0)?;
        for (label, message) in labels {
            writeln!(out, "\t\t{}: {}", label, message)?;
        }
    }
    Ok(())
}

/// The hierarchy as printed to the console.
impl fmt::Display for ProblemCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for (subject, sessions) in &self.subjects {
            write_subject(&mut out, subject, sessions)?;
        }
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector() -> ProblemCollector {
        let mut problems = ProblemCollector::new();
        problems.record(
            "sub-0001",
            "1",
            vec![
                ProblemRecord::new("MCR", "No scan files matching expected size for MCR"),
                ProblemRecord::new("DD", "Unable to identify DD scan from choices: []"),
            ],
        );
        problems.record(
            "sub-0002",
            "3",
            vec![ProblemRecord::new("Session ?", "Unrecognized session number: 3")],
        );
        problems
    }

    #[test]
    fn test_empty_record_creates_no_entry() {
        let mut problems = ProblemCollector::new();
        problems.record("sub-0001", "1", Vec::new());
        assert!(problems.is_empty());
        assert_eq!(problems.to_string(), "");
    }

    #[test]
    fn test_records_are_keyed_hierarchically() {
        let problems = collector();
        assert_eq!(problems.len(), 3);
        assert_eq!(
            problems.get("sub-0002", "3", "Session ?"),
            Some("Unrecognized session number: 3")
        );
        assert!(problems.get("sub-0001", "2", "MCR").is_none());
    }

    #[test]
    fn test_other_labels_in_same_session_are_merged() {
        let mut problems = collector();
        problems.record("sub-0001", "1", vec![ProblemRecord::new("SWM", "missing")]);
        assert!(problems.get("sub-0001", "1", "MCR").is_some());
        assert_eq!(problems.get("sub-0001", "1", "SWM"), Some("missing"));
    }

    // Revisiting a session silently discards the earlier message for a label.
    #[test]
    fn test_later_problem_for_same_label_replaces_earlier() {
        let mut problems = collector();
        problems.record("sub-0001", "1", vec![ProblemRecord::new("MCR", "second visit")]);
        assert_eq!(problems.get("sub-0001", "1", "MCR"), Some("second visit"));
        assert_eq!(problems.len(), 3);
    }

    #[test]
    fn test_sessions_are_reported_in_numeric_order() {
        let mut problems = ProblemCollector::new();
        for session in ["x1", "10", "2", "1"] {
            problems.record("sub-0001", session, vec![ProblemRecord::new("Session ?", "bad")]);
        }
        let rendered = problems.to_string();
        let sessions: Vec<&str> = rendered
            .lines()
            .filter_map(|line| line.strip_prefix("\tsession "))
            .collect();
        assert_eq!(sessions, vec!["1:", "2:", "10:", "x1:"]);
        assert_eq!(problems.get("sub-0001", "10", "Session ?"), Some("bad"));
    }

    #[test]
    fn test_display_renders_indented_hierarchy() {
        let rendered = collector().to_string();
        assert_eq!(
            rendered,
            "sub-0001\n\
             \tsession 1:\n\
             \t\tDD: Unable to identify DD scan from choices: []\n\
             \t\tMCR: No scan files matching expected size for MCR\n\
             sub-0002\n\
             \tsession 3:\n\
             \t\tSession ?: Unrecognized session number: 3\n"
        );
    }

    #[test]
    fn test_error_log_is_appended_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let problems = collector();
        let path = problems.write_error_log(dir.path()).unwrap();
        problems.write_error_log(dir.path()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("BIDSIFY FILE CONVERSION ERRORS:\n\nsub-0001\n\tsession 1:\n"));
        assert_eq!(contents.matches("BIDSIFY FILE CONVERSION ERRORS:").count(), 2);
        assert!(contents.contains("\nsub-0002\n\tsession 3:\n\t\tSession ?: Unrecognized session number: 3\n"));
    }
}
