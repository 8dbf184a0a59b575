//! `ConfigResolver`: wildcard-pattern → newest-matching-file resolution,
//! plus loading and validating the resolved file into a `CampaignProfile`
//! (spec.md §4.7).
//!
//! Grounded on the original's `_resolve_client_config_path` (single `*`
//! wildcard, `glob` + sort-by-mtime-descending, pick the first).

use std::fs;
use std::path::{Path, PathBuf};

use fsr_domain::{CampaignProfile, ClientConfigStore, Error, Result};

/// Resolves a config-file pattern to a concrete, existing path.
pub struct ConfigResolver;

impl ConfigResolver {
    /// `pattern` may contain at most one `*` wildcard in its final path
    /// component. Without a wildcard, the literal path is returned
    /// unchanged (existence is checked at load time, not here).
    pub fn resolve(pattern: &str) -> Result<PathBuf> {
        if !pattern.contains('*') {
            return Ok(PathBuf::from(pattern));
        }

        let path = Path::new(pattern);
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
        let file_pattern = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Config(format!("invalid config pattern: {pattern}")))?;

        let (prefix, suffix) = file_pattern
            .split_once('*')
            .ok_or_else(|| Error::Config(format!("invalid config pattern: {pattern}")))?;
        if file_pattern.matches('*').count() > 1 {
            return Err(Error::Config(format!(
                "config pattern must contain exactly one '*': {pattern}"
            )));
        }

        let mut candidates: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();
        let entries = fs::read_dir(dir)
            .map_err(|e| Error::Config(format!("cannot read config directory {}: {e}", dir.display())))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::Io(e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(prefix) && name.ends_with(suffix) && name.len() >= prefix.len() + suffix.len() {
                let meta = entry.metadata().map_err(|e| Error::Io(e))?;
                let mtime = meta.modified().unwrap_or(std::time::UNIX_EPOCH);
                candidates.push((entry.path(), mtime));
            }
        }

        if candidates.is_empty() {
            return Err(Error::Config(format!("no config file matches: {pattern}")));
        }
        candidates.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(candidates.into_iter().next().unwrap().0)
    }

    /// Loads, parses, and validates the config file at `path` into a
    /// [`CampaignProfile`]. On Unix, warns (but does not fail) if the file
    /// is readable by group/other — enforcing the restrictive-permissions
    /// intent is the dispatcher's job (spec.md §9), this is a best-effort
    /// local check.
    pub fn load(path: &Path) -> Result<CampaignProfile> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(meta) = fs::metadata(path) {
                let mode = meta.permissions().mode();
                if mode & 0o077 != 0 {
                    tracing::warn!(
                        path = %path.display(),
                        mode = format!("{mode:o}"),
                        "config file is readable by group/other"
                    );
                }
            }
        }

        let raw = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read config file {}: {e}", path.display())))?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        ClientConfigStore::transform(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn literal_path_passes_through() {
        let resolved = ConfigResolver::resolve("/tmp/some_config.json").unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/some_config.json"));
    }

    #[test]
    fn wildcard_picks_newest_match() {
        let dir = tempfile::tempdir().unwrap();
        let older = dir.path().join("client_config_1.json");
        let newer = dir.path().join("client_config_2.json");
        fs::write(&older, "{}").unwrap();
        // Ensure a distinguishable mtime ordering.
        std::thread::sleep(std::time::Duration::from_millis(10));
        fs::write(&newer, "{}").unwrap();

        let pattern = dir.path().join("client_config_*.json");
        let resolved = ConfigResolver::resolve(pattern.to_str().unwrap()).unwrap();
        assert_eq!(resolved, newer);
    }

    #[test]
    fn wildcard_with_no_matches_errors() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = dir.path().join("nope_*.json");
        let err = ConfigResolver::resolve(pattern.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn load_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        let mut f = fs::File::create(&path).unwrap();
        write!(f, "not json").unwrap();
        assert!(ConfigResolver::load(&path).is_err());
    }
}
