//! # History Store and Index
//!
//! Persists the per-entry artifacts under the data directory, keyed by
//! safe name:
//!
//! - `history-<safe>.json` — append-only JSON array of summaries, one per
//!   run, initialized to `[]` on first use
//! - `last-run-<safe>.json` — the raw record list of the most recent run,
//!   fully overwritten each time
//! - `index-history.json` / `index-last-run.json` — regenerated lookup
//!   tables from safe name to file name, letting the dashboard discover
//!   every tracked entry without re-parsing the configuration
//!
//! Every write goes through a temp-file-and-rename so a crashed run never
//! leaves a half-written JSON file behind. There is no cross-process
//! locking: the store assumes a single pipeline run at a time.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::drift::DependencyMetricRecord;
use crate::error::{Error, Result};
use crate::summary::Summary;

/// Where the merged-pull-request count lands in the history.
///
/// Two historical variants of the pipeline disagreed on this, so the
/// choice is explicit and configurable for compatibility with data
/// written by either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentPolicy {
    /// Attach the count to the summary appended by this run.
    AttachToCurrent,
    /// Attach the count to an existing entry dated yesterday, falling
    /// back to the current summary when no such entry exists. The current
    /// summary is appended either way.
    MergeIntoYesterday,
}

/// One row of a regenerated index file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// Safe name of the tracked entry.
    pub repository: String,
    /// Name of the artifact file within the data directory.
    pub file_name: String,
}

/// Append-only history persistence for all tracked entries.
pub struct HistoryStore {
    data_dir: PathBuf,
    policy: EnrichmentPolicy,
}

impl HistoryStore {
    /// Open a store rooted at `data_dir` with the default enrichment
    /// policy ([`EnrichmentPolicy::MergeIntoYesterday`]).
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self::with_policy(data_dir, EnrichmentPolicy::MergeIntoYesterday)
    }

    pub fn with_policy(data_dir: impl Into<PathBuf>, policy: EnrichmentPolicy) -> Self {
        Self {
            data_dir: data_dir.into(),
            policy,
        }
    }

    pub fn history_file_name(safe_name: &str) -> String {
        format!("history-{}.json", safe_name)
    }

    pub fn last_run_file_name(safe_name: &str) -> String {
        format!("last-run-{}.json", safe_name)
    }

    /// Load one entry's history, empty when the file does not exist yet.
    pub fn load_history(&self, safe_name: &str) -> Result<Vec<Summary>> {
        let path = self.data_dir.join(Self::history_file_name(safe_name));
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&path).map_err(|e| Error::Persistence {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| Error::Persistence {
            path: path.display().to_string(),
            message: format!("corrupt history file: {}", e),
        })
    }

    /// Append this run's summary, attaching the merged-pull-request count
    /// according to the configured policy, and write the history back.
    pub fn record_run(
        &self,
        safe_name: &str,
        summary: Summary,
        merged_bump_pull_requests: Option<u64>,
    ) -> Result<()> {
        let yesterday = Utc::now().date_naive() - Duration::days(1);
        self.record_run_at(safe_name, summary, merged_bump_pull_requests, yesterday)
    }

    /// [`record_run`](Self::record_run) with an explicit "yesterday", for
    /// deterministic tests.
    pub fn record_run_at(
        &self,
        safe_name: &str,
        mut summary: Summary,
        merged_bump_pull_requests: Option<u64>,
        yesterday: NaiveDate,
    ) -> Result<()> {
        let mut history = self.load_history(safe_name)?;

        match (self.policy, merged_bump_pull_requests) {
            (_, None) => {}
            (EnrichmentPolicy::AttachToCurrent, Some(count)) => {
                summary.merged_bump_pull_requests = Some(count);
            }
            (EnrichmentPolicy::MergeIntoYesterday, Some(count)) => {
                match history
                    .iter_mut()
                    .find(|entry| entry.date.date_naive() == yesterday)
                {
                    Some(entry) => entry.merged_bump_pull_requests = Some(count),
                    None => summary.merged_bump_pull_requests = Some(count),
                }
            }
        }

        history.push(summary);

        let path = self.data_dir.join(Self::history_file_name(safe_name));
        debug!("appending summary to {}", path.display());
        self.write_json(&path, &history)
    }

    /// Overwrite one entry's last-run record list.
    pub fn write_last_run(&self, safe_name: &str, records: &[DependencyMetricRecord]) -> Result<()> {
        let path = self.data_dir.join(Self::last_run_file_name(safe_name));
        self.write_json(&path, &records)
    }

    /// Regenerate both index files from the complete set of tracked safe
    /// names. Prior index contents are discarded, never patched.
    pub fn write_index(&self, safe_names: &[String]) -> Result<()> {
        let history: Vec<IndexEntry> = safe_names
            .iter()
            .map(|name| IndexEntry {
                repository: name.clone(),
                file_name: Self::history_file_name(name),
            })
            .collect();
        self.write_json(&self.data_dir.join("index-history.json"), &history)?;

        let last_run: Vec<IndexEntry> = safe_names
            .iter()
            .map(|name| IndexEntry {
                repository: name.clone(),
                file_name: Self::last_run_file_name(name),
            })
            .collect();
        self.write_json(&self.data_dir.join("index-last-run.json"), &last_run)
    }

    /// Serialize `value` to `path` via a sibling temp file and rename.
    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        fs::create_dir_all(&self.data_dir).map_err(|e| Error::Persistence {
            path: self.data_dir.display().to_string(),
            message: e.to_string(),
        })?;

        let mut file =
            tempfile::NamedTempFile::new_in(&self.data_dir).map_err(|e| Error::Persistence {
                path: path.display().to_string(),
                message: format!("cannot create temp file: {}", e),
            })?;

        let text = serde_json::to_string_pretty(value)?;
        file.write_all(text.as_bytes())
            .map_err(|e| Error::Persistence {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        file.persist(path).map_err(|e| Error::Persistence {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}
