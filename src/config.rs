//! Runtime configuration loaded from TOML.
//!
//! Every key is optional:
//!
//! ```toml
//! log_level = "debug"     # debug | info | warn | error
//! show_timestamp = false
//! trace = true            # log each dispatched instruction
//! dump_state = true       # log the final stack and variables
//! ```

use crate::utils::log::Level;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "stackvm.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub log_level: Level,
    pub show_timestamp: bool,
    pub trace: bool,
    pub dump_state: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Level::Info,
            show_timestamp: true,
            trace: false,
            dump_state: false,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Loads `explicit` if given, else [`DEFAULT_CONFIG_FILE`] from `dir` if it
    /// exists, else the defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let fallback = dir.join(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            Self::load(&fallback)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Per-test temp directory, removed on drop.
    struct ScratchDir(PathBuf);

    impl ScratchDir {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir()
                .join(format!("stackvm-config-{}-{name}", std::process::id()));
            let _ = fs::remove_dir_all(&dir);
            fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }

        fn path(&self) -> &Path {
            &self.0
        }
    }

    impl Drop for ScratchDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::from_toml_str("log_level = \"debug\"\ntrace = true").unwrap();
        assert_eq!(config.log_level, Level::Debug);
        assert!(config.trace);
        assert!(config.show_timestamp);
        assert!(!config.dump_state);
    }

    #[test]
    fn rejects_unknown_level_and_keys() {
        assert!(Config::from_toml_str("log_level = \"loud\"").is_err());
        assert!(Config::from_toml_str("max_steps = 10").is_err());
    }

    #[test]
    fn discover_without_file_uses_defaults() {
        let scratch = ScratchDir::new("none");
        let dir = scratch.path();
        assert_eq!(Config::discover(None, dir).unwrap(), Config::default());
    }

    #[test]
    fn discover_reads_default_file() {
        let scratch = ScratchDir::new("default");
        let dir = scratch.path();
        fs::write(dir.join(DEFAULT_CONFIG_FILE), "dump_state = true\n").unwrap();
        let config = Config::discover(None, dir).unwrap();
        assert!(config.dump_state);
    }

    #[test]
    fn explicit_path_must_exist() {
        let scratch = ScratchDir::new("explicit");
        let dir = scratch.path();
        let err = Config::discover(Some(&dir.join("missing.toml")), dir).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn parse_error_names_file() {
        let scratch = ScratchDir::new("parse");
        let dir = scratch.path();
        let path = dir.join("bad.toml");
        fs::write(&path, "trace = \"yes\"").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn scratch_dir_is_removed_on_drop() {
        let scratch = ScratchDir::new("cleanup");
        let dir = scratch.path().to_path_buf();
        fs::write(dir.join(DEFAULT_CONFIG_FILE), "trace = true\n").unwrap();
        drop(scratch);
        assert!(!dir.exists());
    }
}
