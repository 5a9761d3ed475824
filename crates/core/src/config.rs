use std::path::{Path, PathBuf};
use std::time::Duration;

pub const INDEX_DIR_ENV: &str = "SMALISCOPE_INDEX_DIR";
pub const LOG_DIR_ENV: &str = "SMALISCOPE_LOG_DIR";

pub const DEFAULT_INDEX_DIR: &str = ".smaliscope/indices";
pub const DEFAULT_LOG_DIR: &str = ".smaliscope/logs";
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Engine settings. `Default` reads the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Directory holding one stub store per project.
    pub index_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Quiet period before a batch of filesystem events is applied.
    pub debounce: Duration,
    /// Write the stub store after every update.
    pub persist: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            index_dir: dir_from_env(INDEX_DIR_ENV, DEFAULT_INDEX_DIR),
            log_dir: dir_from_env(LOG_DIR_ENV, DEFAULT_LOG_DIR),
            debounce: DEFAULT_DEBOUNCE,
            persist: true,
        }
    }

    pub fn with_index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.index_dir = dir.into();
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }
}

fn dir_from_env(var: &str, default_rel: &str) -> PathBuf {
    if let Some(dir) = std::env::var_os(var).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    Path::new(&home).join(default_rel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_setters() {
        let config = EngineConfig::from_env()
            .with_index_dir("/tmp/idx")
            .with_log_dir("/tmp/logs")
            .with_debounce(Duration::from_millis(50))
            .with_persist(false);
        assert_eq!(config.index_dir, PathBuf::from("/tmp/idx"));
        assert_eq!(config.log_dir, PathBuf::from("/tmp/logs"));
        assert_eq!(config.debounce, Duration::from_millis(50));
        assert!(!config.persist);
    }

    #[test]
    fn test_default_dirs_are_absolute_or_env() {
        let config = EngineConfig::from_env();
        if std::env::var_os(INDEX_DIR_ENV).is_none() {
            assert!(config.index_dir.ends_with(DEFAULT_INDEX_DIR));
        }
        assert_eq!(config.debounce, DEFAULT_DEBOUNCE);
        assert!(config.persist);
    }
}
