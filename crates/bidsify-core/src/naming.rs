use crate::classify::{ScanCategory, ScanRole};
use crate::identity::SubjectSession;
use std::path::{Path, PathBuf};

/// Extension written for every anatomical and functional scan.
pub const SCAN_EXTENSION: &str = "nii";

/// `<dest>/sub-<ID>/ses-<N>`
pub fn session_dir(dest_root: &Path, session: &SubjectSession) -> PathBuf {
    dest_root
        .join(session.subject_label())
        .join(session.session_label())
}

/// `<dest>/sub-<ID>/ses-<N>/<anat|func|log>`
pub fn category_dir(dest_root: &Path, session: &SubjectSession, category: ScanCategory) -> PathBuf {
    session_dir(dest_root, session).join(category.bids_folder())
}

/// Destination of a file assigned `role`.
///
/// Scans become `sub-<ID>_ses-<N>_<token>.<extension>`; log files keep
/// `original_name` verbatim.
pub fn destination_path(
    dest_root: &Path,
    session: &SubjectSession,
    role: ScanRole,
    original_name: &str,
    extension: &str,
) -> PathBuf {
    let dir = category_dir(dest_root, session, role.category());
    match role.token() {
        Some(token) => dir.join(format!(
            "{}_{}_{}.{}",
            session.subject_label(),
            session.session_label(),
            token,
            extension
        )),
        None => dir.join(original_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ses() -> SubjectSession {
        SubjectSession::new("0001", 1)
    }

    #[test]
    fn test_anatomical_name() {
        let dest = destination_path(Path::new("/bids"), &ses(), ScanRole::T1w, "scanA.dat", SCAN_EXTENSION);
        assert_eq!(
            dest,
            PathBuf::from("/bids/sub-0001/ses-1/anat/sub-0001_ses-1_acq-MPRAGE_T1w.nii")
        );
    }

    #[test]
    fn test_functional_names() {
        let session = SubjectSession::new("42", 2);
        let expected = [
            (ScanRole::RestRun01, "sub-42_ses-2_task-rest_run-01_bold.nii"),
            (ScanRole::McrRun02, "sub-42_ses-2_task-mcr_run-02_bold.nii"),
            (ScanRole::SwmRun03, "sub-42_ses-2_task-swm_run-03_bold.nii"),
            (ScanRole::DdRun04, "sub-42_ses-2_task-dd_run-04_bold.nii"),
            (ScanRole::RestRun05, "sub-42_ses-2_task-rest_run-05_bold.nii"),
        ];
        for (role, name) in expected {
            let dest = destination_path(Path::new("/bids"), &session, role, "x", SCAN_EXTENSION);
            assert_eq!(dest, Path::new("/bids/sub-42/ses-2/func").join(name));
        }
    }

    #[test]
    fn test_log_keeps_original_basename() {
        let dest = destination_path(Path::new("/bids"), &ses(), ScanRole::Log, "notes.v2.log", SCAN_EXTENSION);
        assert_eq!(dest, PathBuf::from("/bids/sub-0001/ses-1/log/notes.v2.log"));
    }
}
