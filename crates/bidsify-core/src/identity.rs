use crate::problems::ProblemRecord;
use std::fmt;

/// Subject and session a source folder belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectSession {
    pub subject: String,
    pub session: u32,
}

impl SubjectSession {
    pub fn new(subject: impl Into<String>, session: u32) -> Self {
        Self {
            subject: subject.into(),
            session,
        }
    }

    /// `sub-<ID>`
    pub fn subject_label(&self) -> String {
        subject_label(&self.subject)
    }

    /// `ses-<N>`
    pub fn session_label(&self) -> String {
        format!("ses-{}", self.session)
    }
}

impl fmt::Display for SubjectSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.subject_label(), self.session_label())
    }
}

/// A session folder whose session number is out of range or not a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedSession {
    pub subject: String,
    pub raw_session: String,
}

impl UnresolvedSession {
    pub fn problem(&self) -> ProblemRecord {
        ProblemRecord::new(
            "Session ?",
            format!("Unrecognized session number: {}", self.raw_session),
        )
    }
}

pub fn subject_label(subject: &str) -> String {
    format!("sub-{}", subject)
}

/// Split `<subjectID>_<sessionNumber>` at the first underscore.
/// A name without an underscore is all subject and no session.
pub fn split_folder_name(name: &str) -> (&str, &str) {
    name.split_once('_').unwrap_or((name, ""))
}

pub fn subject_id(folder_name: &str) -> &str {
    split_folder_name(folder_name).0
}

pub fn resolve_session_folder(
    folder_name: &str,
    n_sessions: u32,
) -> Result<SubjectSession, UnresolvedSession> {
    let (subject, raw) = split_folder_name(folder_name);
    let stripped = raw.trim_start_matches('0');

    match stripped.parse::<u32>() {
        Ok(session) if (1..=n_sessions).contains(&session) => {
            Ok(SubjectSession::new(subject, session))
        }
        _ => {
            let shown = if stripped.is_empty() { raw } else { stripped };
            Err(UnresolvedSession {
                subject: subject.to_string(),
                raw_session: shown.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_subject_and_strips_leading_zeros() {
        let resolved = resolve_session_folder("0001_02", 2).unwrap();
        assert_eq!(resolved, SubjectSession::new("0001", 2));
        assert_eq!(resolved.subject_label(), "sub-0001");
        assert_eq!(resolved.session_label(), "ses-2");
        assert_eq!(resolved.to_string(), "sub-0001/ses-2");
    }

    #[test]
    fn test_splits_at_first_underscore_only() {
        assert_eq!(split_folder_name("ab_01_extra"), ("ab", "01_extra"));
        assert_eq!(subject_id("1234_1"), "1234");
        assert_eq!(subject_id("pilot"), "pilot");
    }

    #[test]
    fn test_session_above_limit_is_flagged() {
        let err = resolve_session_folder("0007_003", 2).unwrap_err();
        assert_eq!(err.subject, "0007");
        assert_eq!(err.raw_session, "3");
        let problem = err.problem();
        assert_eq!(problem.label, "Session ?");
        assert_eq!(problem.message, "Unrecognized session number: 3");
    }

    #[test]
    fn test_session_zero_and_garbage_are_flagged() {
        let zero = resolve_session_folder("0007_000", 2).unwrap_err();
        assert_eq!(zero.raw_session, "000");
        assert!(resolve_session_folder("0007_x1", 2).is_err());
        assert!(resolve_session_folder("0007", 2).is_err());
    }

    #[test]
    fn test_session_at_limit_is_accepted() {
        assert_eq!(resolve_session_folder("s_3", 3).unwrap().session, 3);
    }
}
