//! Corpus Builder: walks an archive of downloaded submissions, parses each
//! filing, and concatenates the survivors into one holdings table.
//!
//! Per-document parse failures are counted and skipped, never fatal to the
//! batch. Documents are parsed in parallel; the merge is path-ordered so
//! the resulting table does not depend on completion order.

mod store;

pub use store::{load_table, save_table};

use crate::filing::{self, HoldingRecord, TARGET_FORM_TYPE};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Canonical leaf filename of a downloaded submission.
pub const SUBMISSION_FILENAME: &str = "full-submission.txt";

/// Progress is logged every this many parsed documents.
const PROGRESS_EVERY: usize = 50;

/// Errors raised by corpus building and table persistence.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed holdings table at line {line}: {msg}")]
    Csv { line: usize, msg: String },
}

pub type CorpusResult<T> = Result<T, CorpusError>;

/// The concatenation of all holding records across a parsed batch.
/// Produced once by the corpus builder and treated as immutable input by
/// every later stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoldingsTable {
    records: Vec<HoldingRecord>,
}

impl HoldingsTable {
    pub fn new(records: Vec<HoldingRecord>) -> Self {
        HoldingsTable { records }
    }

    pub fn records(&self) -> &[HoldingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Outcome counts for one corpus build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Documents parsed successfully.
    pub parsed: usize,
    /// Documents skipped on parse failure or wrong form type.
    pub skipped: usize,
    /// Total holding records in the resulting table.
    pub records: usize,
}

/// Batch parser for a directory tree of downloaded submissions.
pub struct CorpusBuilder {
    root: PathBuf,
    max_documents: Option<usize>,
}

impl CorpusBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CorpusBuilder {
            root: root.into(),
            max_documents: None,
        }
    }

    /// Cap the number of documents processed (attempts, not successes).
    pub fn with_max_documents(mut self, max: usize) -> Self {
        self.max_documents = Some(max);
        self
    }

    /// Walk the tree, parse every submission up to the cap, and build the
    /// concatenated holdings table.
    pub fn build(&self) -> CorpusResult<(HoldingsTable, BatchSummary)> {
        let mut paths = Vec::new();
        discover(&self.root, &mut paths)?;
        paths.sort();
        if let Some(max) = self.max_documents {
            paths.truncate(max);
        }
        info!(root = %self.root.display(), documents = paths.len(), "corpus walk complete");

        // Stateless per-document parse; merge order is fixed by the sorted
        // path list, not by completion order.
        let parses: Vec<_> = paths
            .par_iter()
            .map(|path| filing::parse_file(path))
            .collect();

        let mut summary = BatchSummary::default();
        let mut records = Vec::new();

        for (path, parsed) in paths.iter().zip(parses) {
            match parsed {
                Ok(filing) if filing.metadata.form_type == TARGET_FORM_TYPE => {
                    summary.parsed += 1;
                    debug!(
                        path = %path.display(),
                        filer = %filing.metadata.filer_id,
                        holdings = filing.holdings.len(),
                        "parsed filing"
                    );
                    records.extend(filing.holdings);
                }
                Ok(filing) => {
                    summary.skipped += 1;
                    warn!(
                        path = %path.display(),
                        form_type = %filing.metadata.form_type,
                        "skipping non-13F-HR document"
                    );
                }
                Err(err) => {
                    summary.skipped += 1;
                    warn!(path = %path.display(), error = %err, "skipping unparseable document");
                }
            }
            let seen = summary.parsed + summary.skipped;
            if seen % PROGRESS_EVERY == 0 {
                info!(parsed = summary.parsed, skipped = summary.skipped, "corpus progress");
            }
        }

        summary.records = records.len();
        info!(
            parsed = summary.parsed,
            skipped = summary.skipped,
            records = summary.records,
            "corpus build finished"
        );
        Ok((HoldingsTable::new(records), summary))
    }

    /// Build and persist in one step.
    pub fn build_and_save(&self, out: &Path) -> CorpusResult<(HoldingsTable, BatchSummary)> {
        let (table, summary) = self.build()?;
        store::save_table(out, &table)?;
        Ok((table, summary))
    }
}

/// Depth-first search for submission files under `dir`.
fn discover(dir: &Path, found: &mut Vec<PathBuf>) -> CorpusResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            discover(&path, found)?;
        } else if path.file_name().and_then(|n| n.to_str()) == Some(SUBMISSION_FILENAME) {
            found.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_submission(dir: &Path, cik: &str, body_extra: &str) -> PathBuf {
        let sub = dir.join(cik).join("0001-20-000001");
        fs::create_dir_all(&sub).unwrap();
        let doc = format!(
            "<TYPE>13F-HR\n\
             <cik>{cik}</cik>\n\
             <filingManager><name>MANAGER {cik}</name></filingManager>\n\
             <form13FFileNumber>028-00001</form13FFileNumber>\n\
             {body_extra}\
             <periodOfReport>12-31-2019</periodOfReport>\n\
             <signatureDate>02-10-2020</signatureDate>\n\
             <infoTable>\n\
             <nameOfIssuer>APPLE INC</nameOfIssuer>\n\
             <titleOfClass>COM</titleOfClass>\n\
             <cusip>037833100</cusip>\n\
             <value>100</value>\n\
             <shrsOrPrnAmt><sshPrnamt>10</sshPrnamt></shrsOrPrnAmt>\n\
             </infoTable>\n"
        );
        let path = sub.join(SUBMISSION_FILENAME);
        fs::write(&path, doc).unwrap();
        path
    }

    #[test]
    fn builds_table_from_nested_tree() {
        let dir = tempfile::tempdir().unwrap();
        write_submission(dir.path(), "0000000001", "");
        write_submission(dir.path(), "0000000002", "");

        let (table, summary) = CorpusBuilder::new(dir.path()).build().unwrap();
        assert_eq!(summary.parsed, 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(table.len(), 2);
        // Path-sorted merge: owner ids come out in directory order.
        assert_eq!(table.records()[0].owner_id, "0000000001");
        assert_eq!(table.records()[1].owner_id, "0000000002");
    }

    #[test]
    fn one_malformed_document_is_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_submission(dir.path(), "0000000001", "");
        write_submission(dir.path(), "0000000002", "");
        // Break the third document: drop its period-of-report tag.
        let bad = write_submission(dir.path(), "0000000003", "");
        let text = fs::read_to_string(&bad)
            .unwrap()
            .replace("periodOfReport", "nothing");
        fs::write(&bad, text).unwrap();

        let (table, summary) = CorpusBuilder::new(dir.path()).build().unwrap();
        assert_eq!(summary.parsed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn cap_limits_documents_processed() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            write_submission(dir.path(), &format!("000000000{i}"), "");
        }
        let (_, summary) = CorpusBuilder::new(dir.path())
            .with_max_documents(3)
            .build()
            .unwrap();
        assert_eq!(summary.parsed + summary.skipped, 3);
    }

    #[test]
    fn non_target_form_type_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_submission(dir.path(), "0000000001", "");
        let text = fs::read_to_string(&path).unwrap().replace("13F-HR", "13F-NT");
        fs::write(&path, text).unwrap();

        let (table, summary) = CorpusBuilder::new(dir.path()).build().unwrap();
        assert_eq!(summary.parsed, 0);
        assert_eq!(summary.skipped, 1);
        assert!(table.is_empty());
    }
}
