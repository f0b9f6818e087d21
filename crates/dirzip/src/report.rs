use std::path::PathBuf;

use crate::error::Error;

/// Outcome of an `add_files` run.
#[derive(Debug, Default)]
pub struct AddReport {
    pub added:    usize,
    /// Only populated under `FailurePolicy::CollectAll`.
    pub failures: Vec<Error>,
}

impl AddReport {
    pub fn is_complete(&self) -> bool { self.failures.is_empty() }
}

#[derive(Clone, Debug)]
pub struct ExtractReport {
    pub archive:     PathBuf,
    pub target:      PathBuf,
    pub entry_count: usize,
    pub total_bytes: u64,
    pub entries:     Vec<ExtractedEntry>,
}

#[derive(Clone, Debug)]
pub struct ExtractedEntry {
    pub name:         String,
    pub target_path:  PathBuf,
    pub size:         u64,
    pub is_directory: bool,
    pub hash:         Option<String>,
}
