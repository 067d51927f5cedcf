use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

fn default_cli_path() -> PathBuf {
    PathBuf::from("target/release/kaspa-graffiti-cli")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

/// Startup configuration for the bridge. Everything the handlers need is
/// resolved here and passed down; nothing is read from globals at request
/// time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the wallet/graffiti CLI executable.
    #[serde(default = "default_cli_path")]
    pub cli_path: PathBuf,
    /// Directory the browser test suite is served from.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cli_path: default_cli_path(),
            static_dir: default_static_dir(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("reading config file {path}"))?;
        serde_json::from_str(&raw).context("parsing config JSON")
    }

    /// Loads the file when given, defaults otherwise.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_parsing() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
                "cli_path": "/opt/graffiti/kaspa-graffiti-cli",
                "static_dir": "/srv/graffiti-tests"
            }}"#
        )
        .unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(
            config.cli_path,
            PathBuf::from("/opt/graffiti/kaspa-graffiti-cli")
        );
        assert_eq!(config.static_dir, PathBuf::from("/srv/graffiti-tests"));
    }

    #[test]
    fn test_config_defaults_apply() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{}}").unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.cli_path, default_cli_path());
        assert_eq!(config.static_dir, default_static_dir());
    }

    #[test]
    fn test_config_missing_file() {
        let result = Config::from_file("/nonexistent/path/config.json");
        assert!(result.is_err());
    }

    #[test]
    fn test_config_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{invalid json").unwrap();

        let result = Config::from_file(file.path().to_str().unwrap());
        assert!(result.is_err());
    }
}
