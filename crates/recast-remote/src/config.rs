use crate::RemoteError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_BODY_BYTES: u64 = 512 * 1024;

/// Settings for [`HttpFetcher`](crate::HttpFetcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Sent as `Authorization: Bearer <token>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Branches tried in order after the requested branch returns 404.
    #[serde(default = "default_fallback_branches")]
    pub fallback_branches: Vec<String>,
    /// Responses longer than this are truncated.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: default_user_agent(),
            auth_token: None,
            fallback_branches: default_fallback_branches(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl FetchConfig {
    #[must_use]
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_owned());
        self
    }

    /// Load config from `~/.config/recast/fetch.json`, or defaults when the
    /// file does not exist.
    pub fn load_default() -> Result<Self, RemoteError> {
        let path = default_config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self, RemoteError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| RemoteError::Config(format!("invalid fetch config: {e}")))?;
        if config.timeout_secs == 0 {
            return Err(RemoteError::Config(
                "timeout_secs must be greater than zero".to_owned(),
            ));
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), RemoteError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RemoteError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

pub fn default_config_path() -> Result<PathBuf, RemoteError> {
    let home = std::env::var("HOME").map_err(|_| RemoteError::Config("HOME not set".to_owned()))?;
    Ok(PathBuf::from(home).join(".config/recast/fetch.json"))
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_body_bytes() -> u64 {
    DEFAULT_MAX_BODY_BYTES
}

fn default_user_agent() -> String {
    format!("recast/{}", env!("CARGO_PKG_VERSION"))
}

fn default_fallback_branches() -> Vec<String> {
    vec!["main".to_owned(), "master".to_owned()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/fetch.json");

        let config = FetchConfig::default().with_timeout(5).with_token("secret123");
        config.save(&path).unwrap();

        let loaded = FetchConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.auth_token.as_deref(), Some("secret123"));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fetch.json");
        std::fs::write(&path, r#"{"timeout_secs": 10}"#).unwrap();

        let loaded = FetchConfig::load(&path).unwrap();
        assert_eq!(loaded.timeout_secs, 10);
        assert_eq!(loaded.fallback_branches, vec!["main", "master"]);
        assert_eq!(loaded.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert!(loaded.user_agent.starts_with("recast/"));
    }

    #[test]
    fn unknown_field_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fetch.json");
        std::fs::write(&path, r#"{"timeout": 10}"#).unwrap();
        assert!(matches!(FetchConfig::load(&path), Err(RemoteError::Config(_))));
    }

    #[test]
    fn zero_timeout_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fetch.json");
        std::fs::write(&path, r#"{"timeout_secs": 0}"#).unwrap();
        assert!(matches!(FetchConfig::load(&path), Err(RemoteError::Config(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = FetchConfig::load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(RemoteError::Io(_))));
    }
}
