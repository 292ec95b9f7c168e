//! # Safe Name Encoding
//!
//! Derives the deterministic, filesystem-safe identifier under which a
//! tracked entry's artifacts are stored (`history-<name>.json`,
//! `last-run-<name>.json`, index rows). The encoding must stay bit-exact
//! across releases: it is the storage key for long-lived history files.

/// Characters rewritten to `-`. Covers path separators and the URL-reserved
/// characters that appear in clone URLs and `url#path` lines.
const REPLACED: [char; 5] = ['-', '/', '.', ':', '#'];

/// Encode a logical configuration line (`url` or `url#path`) into a slug.
///
/// A leading `http://` or `https://` scheme is dropped so that the two
/// schemes map to the same identifier, then every `-`, `/`, `.`, `:`, `#`
/// becomes `-`. Consecutive dashes are not collapsed.
///
/// `https://github.com/org/repo.git#api` → `github-com-org-repo-git-api`
pub fn safe_name(line: &str) -> String {
    let stripped = line
        .strip_prefix("https://")
        .or_else(|| line.strip_prefix("http://"))
        .unwrap_or(line);
    stripped.replace(REPLACED, "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_name_without_path() {
        assert_eq!(
            safe_name("https://github.com/1024pix/pix.git"),
            "github-com-1024pix-pix-git"
        );
    }

    #[test]
    fn test_safe_name_with_path() {
        assert_eq!(
            safe_name("https://github.com/1024pix/pix.git#api"),
            "github-com-1024pix-pix-git-api"
        );
    }

    #[test]
    fn test_safe_name_scheme_insensitive() {
        assert_eq!(
            safe_name("http://github.com/1024pix/pix.git#api"),
            safe_name("https://github.com/1024pix/pix.git#api")
        );
    }

    #[test]
    fn test_safe_name_keeps_consecutive_dashes() {
        // `://` after a non-leading scheme-like token yields back-to-back
        // dashes; they are preserved, not collapsed.
        assert_eq!(safe_name("git://host/repo"), "git---host-repo");
    }

    #[test]
    fn test_safe_name_distinct_for_distinct_paths() {
        let a = safe_name("https://github.com/o/r.git#api");
        let b = safe_name("https://github.com/o/r.git#web");
        assert_ne!(a, b);
    }

    #[test]
    fn test_safe_name_no_reserved_characters() {
        let name = safe_name("https://user:pw@github.com/o/r.git#pkg/sub");
        assert!(!name.contains(['/', ':', '#', '.']));
    }
}
