//! # Tracked-Repository Configuration
//!
//! This module parses the line-oriented repository list that drives the
//! pipeline. Each non-blank, non-comment line names one tracked entry in
//! the form `repositoryURL[#subPath]`:
//!
//! ```text
//! # comment lines and blank lines are skipped
//! https://github.com/1024pix/pix.git
//! https://github.com/1024pix/pix.git#api
//! https://$GITHUB_TOKEN@github.com/org/private.git#packages/web
//! ```
//!
//! Entries keep their input order and duplicates are preserved; the same
//! repository may appear several times with different sub-paths, in which
//! case the clone is shared but metrics are computed per sub-path.
//!
//! No URL validation happens here. A malformed URL surfaces later as a
//! clone failure tagged with that URL.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// One tracked repository reference: a clone URL plus an optional
/// sub-directory within the clone to measure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryEntry {
    /// The clone URL, possibly containing `$NAME` credential placeholders.
    pub repository: String,
    /// Sub-path within the clone; empty string when the repository root is
    /// the package.
    pub path: String,
}

impl RepositoryEntry {
    /// The logical line this entry was parsed from (`url` or `url#path`),
    /// used as input to the safe-name encoder.
    pub fn line(&self) -> String {
        if self.path.is_empty() {
            self.repository.clone()
        } else {
            format!("{}#{}", self.repository, self.path)
        }
    }
}

/// Parse the full configuration text into ordered entries.
///
/// Lines that are empty after trimming, or whose trimmed form starts with
/// `#`, are skipped. Everything else goes through [`parse_line`].
pub fn parse(text: &str) -> Vec<RepositoryEntry> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(parse_line)
        .collect()
}

/// Split one configuration line on the first `#` into repository URL and
/// sub-path. The sub-path defaults to the empty string.
pub fn parse_line(line: &str) -> RepositoryEntry {
    match line.split_once('#') {
        Some((repository, path)) => RepositoryEntry {
            repository: repository.to_string(),
            path: path.to_string(),
        },
        None => RepositoryEntry {
            repository: line.to_string(),
            path: String::new(),
        },
    }
}

/// Read and parse a configuration file.
pub fn from_file(path: &Path) -> Result<Vec<RepositoryEntry>> {
    let text = fs::read_to_string(path).map_err(|e| Error::ConfigParse {
        message: format!("cannot read {}: {}", path.display(), e),
    })?;
    Ok(parse(&text))
}
