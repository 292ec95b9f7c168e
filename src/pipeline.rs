//! # Pipeline Orchestration
//!
//! Coordinates the full drift-tracking run:
//!
//! 1. Provision one shallow clone per distinct repository URL (parallel,
//!    deduplicated)
//! 2. Detect the package manager and install dependencies for every
//!    tracked entry (parallel per entry)
//! 3. For each entry in configuration order: compute drift/pulse records,
//!    aggregate them, optionally enrich with yesterday's merged `[BUMP]`
//!    pull-request count, and persist history + last-run
//! 4. Regenerate the index files
//!
//! The concurrent phases collect per-entry errors and report the first
//! after all siblings finished; the sequential phase halts on the first
//! failure, leaving already-written history files in place. Step 3 stays
//! sequential because it serializes writes to the shared index artifacts.
//!
//! An enrichment failure is deliberately non-fatal: the base summary is
//! persisted and the failure is logged, so one bad search response never
//! loses a day of history.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use log::{info, warn};
use rayon::prelude::*;

use crate::bump::{self, GithubFetcher, PullRequestFetcher};
use crate::config::RepositoryEntry;
use crate::credentials;
use crate::drift::{DriftCalculator, LibyearCalculator};
use crate::error::{Error, Result};
use crate::install::{DefaultInstaller, Installer};
use crate::name::safe_name;
use crate::package_manager::{self, PackageManagerKind};
use crate::store::HistoryStore;
use crate::summary;
use crate::workspace::WorkspaceProvisioner;

/// The assembled drift-tracking pipeline.
pub struct Pipeline {
    provisioner: WorkspaceProvisioner,
    installer: Box<dyn Installer>,
    calculator: Box<dyn DriftCalculator>,
    fetcher: Option<Box<dyn PullRequestFetcher>>,
    store: HistoryStore,
    vars: HashMap<String, String>,
}

impl Pipeline {
    /// Assemble the default pipeline: system git, real installers, the
    /// libyear CLI, and GitHub enrichment when `GITHUB_TOKEN` is present
    /// in `vars`.
    pub fn new(data_dir: PathBuf, vars: HashMap<String, String>) -> Self {
        let fetcher: Option<Box<dyn PullRequestFetcher>> = vars
            .get("GITHUB_TOKEN")
            .map(|token| Box::new(GithubFetcher::new(token.clone())) as Box<dyn PullRequestFetcher>);

        Self {
            provisioner: WorkspaceProvisioner::new(vars.clone()),
            installer: Box::new(DefaultInstaller),
            calculator: Box::new(LibyearCalculator),
            fetcher,
            store: HistoryStore::new(data_dir),
            vars,
        }
    }

    /// Assemble a pipeline from custom components.
    ///
    /// This is primarily used for testing to inject mock operations.
    pub fn with_components(
        provisioner: WorkspaceProvisioner,
        installer: Box<dyn Installer>,
        calculator: Box<dyn DriftCalculator>,
        fetcher: Option<Box<dyn PullRequestFetcher>>,
        store: HistoryStore,
        vars: HashMap<String, String>,
    ) -> Self {
        Self {
            provisioner,
            installer,
            calculator,
            fetcher,
            store,
            vars,
        }
    }

    /// Run the full pipeline over the parsed configuration entries.
    pub fn run(&self, entries: &[RepositoryEntry]) -> Result<()> {
        if entries.is_empty() {
            info!("no tracked repositories configured");
            return Ok(());
        }

        // Phase 1: workspaces, one per distinct URL.
        let workspaces = self.provisioner.provision(entries)?;

        // Phase 2: detect + install, one task per tracked entry.
        let kinds = self.prepare_packages(entries, &workspaces)?;

        // Phase 3: compute, enrich, persist, in configuration order.
        for (entry, kind) in entries.iter().zip(kinds.iter()) {
            self.process_entry(entry, *kind, &workspaces)?;
        }

        // Phase 4: regenerate the index over every tracked entry.
        let mut safe_names: Vec<String> = Vec::new();
        for entry in entries {
            let name = safe_name(&entry.line());
            if !safe_names.contains(&name) {
                safe_names.push(name);
            }
        }
        self.store.write_index(&safe_names)?;

        info!("run complete, {} tracked entries", entries.len());
        Ok(())
    }

    /// Detect the package manager and install dependencies for every
    /// entry, in parallel. Returns one kind per entry, in entry order.
    fn prepare_packages(
        &self,
        entries: &[RepositoryEntry],
        workspaces: &HashMap<String, PathBuf>,
    ) -> Result<Vec<PackageManagerKind>> {
        let kinds: Mutex<HashMap<usize, PackageManagerKind>> = Mutex::new(HashMap::new());
        let errors: Mutex<Vec<Error>> = Mutex::new(Vec::new());

        entries.par_iter().enumerate().for_each(|(i, entry)| {
            match self.prepare_one(entry, workspaces) {
                Ok(kind) => {
                    kinds.lock().expect("kind map lock").insert(i, kind);
                }
                Err(e) => {
                    warn!("{}", e);
                    errors.lock().expect("error list lock").push(e);
                }
            }
        });

        let collected_errors = errors.into_inner().map_err(|_| Error::LockPoisoned {
            context: "package preparation errors".to_string(),
        })?;
        if let Some(first_error) = collected_errors.into_iter().next() {
            return Err(first_error);
        }

        let kinds = kinds.into_inner().map_err(|_| Error::LockPoisoned {
            context: "package manager kinds".to_string(),
        })?;
        Ok((0..entries.len())
            .map(|i| kinds[&i])
            .collect())
    }

    fn prepare_one(
        &self,
        entry: &RepositoryEntry,
        workspaces: &HashMap<String, PathBuf>,
    ) -> Result<PackageManagerKind> {
        let dir = package_dir(entry, workspaces)?;
        let kind = package_manager::detect(&dir)?;
        info!(
            "installing dependencies for {} ({})",
            entry.line(),
            kind
        );
        self.installer.install(&dir, kind)?;
        Ok(kind)
    }

    fn process_entry(
        &self,
        entry: &RepositoryEntry,
        kind: PackageManagerKind,
        workspaces: &HashMap<String, PathBuf>,
    ) -> Result<()> {
        let dir = package_dir(entry, workspaces)?;
        let records = self.calculator.calculate(&dir, kind)?;
        let summary = summary::aggregate(&records);

        let merged = self.fetch_merged_bump_count(entry);

        let name = safe_name(&entry.line());
        self.store.write_last_run(&name, &records)?;
        self.store.record_run(&name, summary, merged)?;

        info!(
            "recorded {} dependencies for {}",
            records.len(),
            entry.line()
        );
        Ok(())
    }

    /// Enrichment step. Any failure here is logged and swallowed so the
    /// base summary still gets persisted.
    fn fetch_merged_bump_count(&self, entry: &RepositoryEntry) -> Option<u64> {
        let fetcher = self.fetcher.as_ref()?;

        let clone_url = credentials::substitute(&entry.repository, &self.vars);
        let result = bump::repository_slug(&clone_url).and_then(|slug| {
            let query = bump::build_search_query(&slug, &entry.path, bump::yesterday());
            fetcher.merged_bump_count(&slug, &query)
        });

        match result {
            Ok(count) => Some(count),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }
}

fn package_dir(
    entry: &RepositoryEntry,
    workspaces: &HashMap<String, PathBuf>,
) -> Result<PathBuf> {
    let root = workspaces
        .get(&entry.repository)
        .ok_or_else(|| Error::CloneFailed {
            url: entry.repository.clone(),
            message: "no workspace was provisioned for this repository".to_string(),
        })?;
    if entry.path.is_empty() {
        Ok(root.clone())
    } else {
        Ok(root.join(&entry.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse;
    use crate::drift::DependencyMetricRecord;
    use crate::workspace::GitOperations;
    use std::path::Path;
    use std::sync::Arc;

    struct MockGit;

    impl GitOperations for MockGit {
        fn clone_shallow(&self, _url: &str, _target_dir: &Path) -> Result<()> {
            Ok(())
        }
    }

    struct MockInstaller {
        calls: Arc<Mutex<Vec<(PathBuf, PackageManagerKind)>>>,
    }

    impl Installer for MockInstaller {
        fn install(&self, dir: &Path, kind: PackageManagerKind) -> Result<()> {
            self.calls.lock().unwrap().push((dir.to_path_buf(), kind));
            Ok(())
        }
    }

    struct MockCalculator {
        records: Vec<DependencyMetricRecord>,
    }

    impl DriftCalculator for MockCalculator {
        fn calculate(
            &self,
            _dir: &Path,
            _kind: PackageManagerKind,
        ) -> Result<Vec<DependencyMetricRecord>> {
            Ok(self.records.clone())
        }
    }

    struct MockFetcher {
        count: u64,
        queries: Arc<Mutex<Vec<String>>>,
    }

    impl PullRequestFetcher for MockFetcher {
        fn merged_bump_count(&self, _repository: &str, query: &str) -> Result<u64> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.count)
        }
    }

    struct FailingFetcher;

    impl PullRequestFetcher for FailingFetcher {
        fn merged_bump_count(&self, repository: &str, _query: &str) -> Result<u64> {
            Err(Error::EnrichmentFetch {
                repository: repository.to_string(),
                message: "boom".to_string(),
            })
        }
    }

    fn records(values: &[(f64, f64)]) -> Vec<DependencyMetricRecord> {
        values
            .iter()
            .map(|(drift, pulse)| DependencyMetricRecord {
                drift: Some(*drift),
                pulse: Some(*pulse),
                extra: serde_json::Map::new(),
            })
            .collect()
    }

    fn test_pipeline(
        data_dir: &Path,
        fetcher: Option<Box<dyn PullRequestFetcher>>,
    ) -> (Pipeline, Arc<Mutex<Vec<(PathBuf, PackageManagerKind)>>>) {
        let install_calls = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::with_components(
            WorkspaceProvisioner::with_operations(Box::new(MockGit), HashMap::new()),
            Box::new(MockInstaller {
                calls: install_calls.clone(),
            }),
            Box::new(MockCalculator {
                records: records(&[(1.0, 2.0), (3.0, 1.0)]),
            }),
            fetcher,
            HistoryStore::new(data_dir),
            HashMap::new(),
        );
        (pipeline, install_calls)
    }

    #[test]
    fn test_run_shared_clone_two_histories() {
        let data_dir = tempfile::tempdir().unwrap();
        let (pipeline, install_calls) = test_pipeline(data_dir.path(), None);

        let entries = parse(
            "https://github.com/1024pix/pix.git\nhttps://github.com/1024pix/pix.git#api\n",
        );
        pipeline.run(&entries).unwrap();

        // Two entries, one shared clone, two installs (per entry).
        assert_eq!(install_calls.lock().unwrap().len(), 2);

        let store = HistoryStore::new(data_dir.path());
        let root_history = store.load_history("github-com-1024pix-pix-git").unwrap();
        let api_history = store
            .load_history("github-com-1024pix-pix-git-api")
            .unwrap();
        assert_eq!(root_history.len(), 1);
        assert_eq!(api_history.len(), 1);
        assert_eq!(root_history[0].drift, 4.0);
        assert_eq!(root_history[0].pulse, 3.0);

        // Index covers both entries.
        let text =
            std::fs::read_to_string(data_dir.path().join("index-history.json")).unwrap();
        assert!(text.contains("github-com-1024pix-pix-git"));
        assert!(text.contains("github-com-1024pix-pix-git-api"));
    }

    #[test]
    fn test_repeat_run_appends_history() {
        let data_dir = tempfile::tempdir().unwrap();
        let entries = parse("https://github.com/a/b.git\n");

        for _ in 0..3 {
            let (pipeline, _) = test_pipeline(data_dir.path(), None);
            pipeline.run(&entries).unwrap();
        }

        let store = HistoryStore::new(data_dir.path());
        assert_eq!(store.load_history("github-com-a-b-git").unwrap().len(), 3);
    }

    #[test]
    fn test_run_writes_last_run_records() {
        let data_dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = test_pipeline(data_dir.path(), None);

        pipeline
            .run(&parse("https://github.com/a/b.git\n"))
            .unwrap();

        let text =
            std::fs::read_to_string(data_dir.path().join("last-run-github-com-a-b-git.json"))
                .unwrap();
        let persisted: Vec<DependencyMetricRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(persisted.len(), 2);
    }

    #[test]
    fn test_enrichment_count_reaches_history() {
        let data_dir = tempfile::tempdir().unwrap();
        let queries = Arc::new(Mutex::new(Vec::new()));
        let (pipeline, _) = test_pipeline(
            data_dir.path(),
            Some(Box::new(MockFetcher {
                count: 7,
                queries: queries.clone(),
            })),
        );

        pipeline
            .run(&parse("https://github.com/1024pix/pix.git#api\n"))
            .unwrap();

        let queries = queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].contains("repo:1024pix/pix"));
        assert!(queries[0].contains("[BUMP] (api)"));

        let store = HistoryStore::new(data_dir.path());
        let history = store
            .load_history("github-com-1024pix-pix-git-api")
            .unwrap();
        // No prior yesterday entry: the count falls back to the new summary.
        assert_eq!(history[0].merged_bump_pull_requests, Some(7));
    }

    #[test]
    fn test_enrichment_failure_still_persists_summary() {
        let data_dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = test_pipeline(data_dir.path(), Some(Box::new(FailingFetcher)));

        pipeline
            .run(&parse("https://github.com/a/b.git\n"))
            .unwrap();

        let store = HistoryStore::new(data_dir.path());
        let history = store.load_history("github-com-a-b-git").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].merged_bump_pull_requests, None);
    }

    #[test]
    fn test_run_empty_configuration() {
        let data_dir = tempfile::tempdir().unwrap();
        let (pipeline, install_calls) = test_pipeline(data_dir.path(), None);

        pipeline.run(&[]).unwrap();
        assert!(install_calls.lock().unwrap().is_empty());
        assert!(!data_dir.path().join("index-history.json").exists());
    }
}
