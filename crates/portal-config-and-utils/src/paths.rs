//! Where the portal keeps its files.
//!
//! Everything lives under one directory, `~/.hospital-portal` by default.
//! `HOSPITAL_PORTAL_HOME` moves it, which keeps separate profiles (or test
//! runs) from sharing a stored session.

use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

const DIR_NAME: &str = ".hospital-portal";
const ENV_HOME: &str = "HOSPITAL_PORTAL_HOME";

/// Locations of the config file, stored session and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// Resolve the portal directory from the environment.
    pub fn new() -> CoreResult<Self> {
        Self::resolve(std::env::var_os(ENV_HOME).map(PathBuf::from), dirs::home_dir())
    }

    fn resolve(override_dir: Option<PathBuf>, home: Option<PathBuf>) -> CoreResult<Self> {
        if let Some(dir) = override_dir.filter(|d| !d.as_os_str().is_empty()) {
            return Ok(Self::with_base_dir(dir));
        }
        home.map(|h| Self::with_base_dir(h.join(DIR_NAME)))
            .ok_or(CoreError::NoHomeDir)
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// `config.json`
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// `storage.json`: the token pair and identity cache.
    pub fn storage_file(&self) -> PathBuf {
        self.base_dir.join("storage.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// JSONL written by dev builds.
    pub fn dev_log_file(&self) -> PathBuf {
        self.logs_dir().join("dev.jsonl")
    }

    /// Create the portal and log directories if missing.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_layout() {
        let paths = Paths::with_base_dir(PathBuf::from("/srv/portal"));

        assert_eq!(paths.base_dir(), Path::new("/srv/portal"));
        assert_eq!(paths.config_file(), PathBuf::from("/srv/portal/config.json"));
        assert_eq!(paths.storage_file(), PathBuf::from("/srv/portal/storage.json"));
        assert_eq!(paths.dev_log_file(), PathBuf::from("/srv/portal/logs/dev.jsonl"));
    }

    #[test]
    fn test_resolve_prefers_override() {
        let paths = Paths::resolve(
            Some(PathBuf::from("/tmp/ward-7")),
            Some(PathBuf::from("/home/nurse")),
        )
        .unwrap();
        assert_eq!(paths.base_dir(), Path::new("/tmp/ward-7"));
    }

    #[test]
    fn test_resolve_falls_back_to_home() {
        let paths = Paths::resolve(Some(PathBuf::new()), Some(PathBuf::from("/home/nurse"))).unwrap();
        assert_eq!(paths.base_dir(), Path::new("/home/nurse/.hospital-portal"));

        assert!(matches!(Paths::resolve(None, None), Err(CoreError::NoHomeDir)));
    }

    #[test]
    fn test_ensure_dirs_is_idempotent() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().join("portal"));

        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();

        assert!(paths.base_dir().is_dir());
        assert!(paths.logs_dir().is_dir());
    }
}
