//! Config file handling
//!
//! ```toml
//! [defaults]
//! options = ["--no-color", "--timeout", "5"]
//!
//! [report]
//! output_dir = "reports"
//! ```

use std::path::{Path, PathBuf};

use crate::errors::ChainprobeError;

/// Overrides the config directory, mainly for tests
pub const CONFIG_DIR_ENV: &str = "CHAINPROBE_CONFIG_DIR";

/// chainprobe configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub config_dir: PathBuf,
    /// Flags prepended to every command line
    pub default_options: Vec<String>,
    /// HTML report directory used when `--output-dir` is not given
    pub report_output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: Self::default_config_dir(),
            default_options: Vec::new(),
            report_output_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from the config file (TOML format)
    ///
    /// A missing file is not an error.
    pub fn load() -> Result<Self, ChainprobeError> {
        Self::load_from(&Self::default_config_dir())
    }

    pub fn load_from(config_dir: &Path) -> Result<Self, ChainprobeError> {
        let config_file = config_dir.join("config.toml");

        if !config_file.exists() {
            return Ok(Self {
                config_dir: config_dir.to_path_buf(),
                ..Self::default()
            });
        }

        let content = std::fs::read_to_string(&config_file)
            .map_err(|e| ChainprobeError::Config(format!("Failed to read config: {}", e)))?;

        Self::parse(&content, config_dir)
    }

    fn parse(content: &str, config_dir: &Path) -> Result<Self, ChainprobeError> {
        let toml_value: toml::Value = toml::from_str(content)
            .map_err(|e| ChainprobeError::Config(format!("Invalid config TOML: {}", e)))?;

        let default_options = toml_value
            .get("defaults")
            .and_then(|d| d.get("options"))
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        // Relative paths are taken from the working directory, like --output-dir
        let report_output_dir = toml_value
            .get("report")
            .and_then(|r| r.get("output_dir"))
            .and_then(|v| v.as_str())
            .map(PathBuf::from);

        Ok(Self {
            config_dir: config_dir.to_path_buf(),
            default_options,
            report_output_dir,
        })
    }

    /// Get the default config directory
    fn default_config_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return PathBuf::from(dir);
        }
        dirs::config_dir()
            .map(|p| p.join("chainprobe"))
            .unwrap_or_else(|| PathBuf::from(".chainprobe"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path()).unwrap();
        assert!(config.default_options.is_empty());
        assert!(config.report_output_dir.is_none());
        assert_eq!(config.config_dir, dir.path());
    }

    #[test]
    fn test_load_options_and_report_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[defaults]\noptions = [\"--no-color\", 3]\n\n[report]\noutput_dir = \"reports\"\n",
        )
        .unwrap();

        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(config.default_options, vec!["--no-color".to_string()]);
        assert_eq!(config.report_output_dir, Some(PathBuf::from("reports")));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[defaults\n").unwrap();
        assert!(matches!(Config::load_from(dir.path()), Err(ChainprobeError::Config(_))));
    }
}
