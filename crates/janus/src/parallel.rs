//! Parallel batch loading.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Workspace::load_all                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Phase 1 (Sequential):  normalize paths, intern file ids     │
//! │  Phase 2 (Parallel):    rayon::par_iter() read + parse       │
//! │  Phase 3 (Sequential):  publish generations, collect stats   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Parsing holds no workspace lock; only publication does.

use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Duration;

use crate::backend::ParseBackend;
use crate::config::CompileFlags;
use crate::error::LoadError;
use crate::loader::{Parsed, load_file};
use crate::types::FileId;

/// One file to parse in a batch.
#[derive(Debug, Clone)]
pub(crate) struct ParseJob {
    pub path: PathBuf,
    pub file: FileId,
}

/// Outcome of one job, carried back to the publishing thread.
#[derive(Debug)]
pub(crate) struct ParseResult {
    pub job: ParseJob,
    pub outcome: Result<Parsed, LoadError>,
}

/// Parse every job on the rayon pool. Results keep the order of `jobs`.
pub(crate) fn parse_batch(
    backend: &dyn ParseBackend,
    jobs: Vec<ParseJob>,
    flags: &CompileFlags,
) -> Vec<ParseResult> {
    jobs.into_par_iter()
        .map(|job| {
            let outcome = load_file(backend, &job.path, job.file, flags);
            ParseResult { job, outcome }
        })
        .collect()
}

/// Summary of a batch load.
#[derive(Debug, Default)]
pub struct LoadStats {
    /// Files that produced a new generation
    pub files_loaded: usize,
    /// Total cursors across the loaded trees
    pub cursors: usize,
    /// `Unclassified` cursors across the loaded trees
    pub classification_gaps: usize,
    /// Diagnostics across the loaded trees
    pub diagnostics: usize,
    /// Wall-clock time of the whole batch
    pub duration: Duration,
    /// Per-file failures; other files are unaffected
    pub errors: Vec<LoadError>,
}

impl LoadStats {
    /// Whether every file loaded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn record(&mut self, parsed: &Parsed) {
        self.files_loaded += 1;
        self.cursors += parsed.tree.len();
        self.classification_gaps += parsed.tree.classification_gaps();
        self.diagnostics += parsed.diagnostics.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TreeSitterBackend;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn batch_preserves_order_and_isolates_failures() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.cpp");
        fs::write(&good, "int x;").unwrap();
        let missing = dir.path().join("missing.cpp");

        let jobs = vec![
            ParseJob { path: good.clone(), file: FileId(0) },
            ParseJob { path: missing.clone(), file: FileId(1) },
            ParseJob { path: good.clone(), file: FileId(2) },
        ];
        let results = parse_batch(&TreeSitterBackend, jobs, &CompileFlags::default());

        assert_eq!(results.len(), 3);
        assert!(results[0].outcome.is_ok());
        assert!(results[1].outcome.is_err());
        assert_eq!(results[1].job.path, missing);
        assert_eq!(results[2].job.file, FileId(2));
    }
}
