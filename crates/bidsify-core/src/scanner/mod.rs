pub mod walk;

pub use walk::{discover_scan_folders, scaffold_destination, subject_folders, ScanFolder};
