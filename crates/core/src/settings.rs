//! Harness settings
//!
//! Settings are resolved once at startup with the precedence
//! defaults < `devfeat.toml` in the feature directory < `DEVFEAT_*`
//! environment variables < CLI flags (applied by the binary).

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

/// Settings file looked up in the feature base directory
pub const SETTINGS_FILE: &str = "devfeat.toml";

/// Typed settings for a harness run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Lifecycle tool binary
    pub devcontainer_path: String,
    /// `remoteUser` of generated containers
    pub remote_user: String,
    /// Shell used to run `test.sh` inside the container
    pub shell: String,
    /// Inject the common-utilities feature into generated configs
    pub common_utils: bool,
    /// Lines of failing test output shown when not verbose
    pub output_line_limit: usize,
    /// Time budget for `up`, in seconds
    pub up_timeout_secs: u64,
    /// Time budget for `exec`, in seconds
    pub exec_timeout_secs: u64,
    /// Time budget for `down`, in seconds
    pub down_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            devcontainer_path: "devcontainer".to_string(),
            remote_user: "vscode".to_string(),
            shell: "bash".to_string(),
            common_utils: true,
            output_line_limit: 30,
            up_timeout_secs: 1800,
            exec_timeout_secs: 900,
            down_timeout_secs: 300,
        }
    }
}

impl Settings {
    /// Load settings for the feature rooted at `base`, applying the process
    /// environment on top of the settings file.
    #[instrument(level = "debug")]
    pub fn load(base: &Path) -> Result<Self, ConfigError> {
        let mut settings = Self::from_file(&base.join(SETTINGS_FILE))?;
        settings.apply_env(|key| std::env::var(key).ok())?;
        debug!("Resolved settings: {:?}", settings);
        Ok(settings)
    }

    /// Read a settings file; a missing file yields the defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parsing {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Overlay `DEVFEAT_*` variables obtained through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DEVFEAT_DEVCONTAINER_PATH") {
            self.devcontainer_path = v;
        }
        if let Some(v) = lookup("DEVFEAT_REMOTE_USER") {
            self.remote_user = v;
        }
        if let Some(v) = lookup("DEVFEAT_SHELL") {
            self.shell = v;
        }
        if let Some(v) = lookup("DEVFEAT_COMMON_UTILS") {
            self.common_utils = parse_bool("DEVFEAT_COMMON_UTILS", &v)?;
        }
        if let Some(v) = lookup("DEVFEAT_OUTPUT_LINES") {
            self.output_line_limit = parse_number("DEVFEAT_OUTPUT_LINES", &v)?;
        }
        if let Some(v) = lookup("DEVFEAT_UP_TIMEOUT") {
            self.up_timeout_secs = parse_number("DEVFEAT_UP_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("DEVFEAT_EXEC_TIMEOUT") {
            self.exec_timeout_secs = parse_number("DEVFEAT_EXEC_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("DEVFEAT_DOWN_TIMEOUT") {
            self.down_timeout_secs = parse_number("DEVFEAT_DOWN_TIMEOUT", &v)?;
        }
        Ok(())
    }

    pub fn up_timeout(&self) -> Duration {
        Duration::from_secs(self.up_timeout_secs)
    }

    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }

    pub fn down_timeout(&self) -> Duration {
        Duration::from_secs(self.down_timeout_secs)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Validation {
        message: format!("{key} must be a non-negative integer, got '{value}'"),
    })
}

/// Parse a boolean flag value (`1/0`, `true/false`, `yes/no`, `on/off`)
pub fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Validation {
            message: format!("{key} must be a boolean, got '{value}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::from_file(&tmp.path().join(SETTINGS_FILE)).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.remote_user, "vscode");
        assert_eq!(settings.output_line_limit, 30);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(SETTINGS_FILE);
        fs::write(&path, "remote_user = \"node\"\nup_timeout_secs = 60\n").unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.remote_user, "node");
        assert_eq!(settings.up_timeout(), Duration::from_secs(60));
        assert_eq!(settings.shell, "bash");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(SETTINGS_FILE);
        fs::write(&path, "remote_usr = \"node\"\n").unwrap();
        assert!(matches!(
            Settings::from_file(&path),
            Err(ConfigError::Parsing { .. })
        ));
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = [
            ("DEVFEAT_DEVCONTAINER_PATH", "/opt/devcontainer"),
            ("DEVFEAT_SHELL", "sh"),
            ("DEVFEAT_EXEC_TIMEOUT", "42"),
            ("DEVFEAT_COMMON_UTILS", "off"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(settings.devcontainer_path, "/opt/devcontainer");
        assert_eq!(settings.shell, "sh");
        assert_eq!(settings.exec_timeout_secs, 42);
        assert_eq!(settings.down_timeout_secs, 300);
        assert!(!settings.common_utils);
    }

    #[test]
    fn test_env_invalid_number() {
        let mut settings = Settings::default();
        let result = settings.apply_env(|k| (k == "DEVFEAT_UP_TIMEOUT").then(|| "soon".to_string()));
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "true").unwrap());
        assert!(parse_bool("X", "ON").unwrap());
        assert!(parse_bool("X", "1").unwrap());
        assert!(!parse_bool("X", "false").unwrap());
        assert!(!parse_bool("X", "no").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }
}
