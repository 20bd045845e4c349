use anyhow::{anyhow, Context, Result};
use dialog_gateway::GatewayConfig;
use dialog_navigation::MemorySessionStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding `gateway.message_limit`.
pub const MESSAGE_LIMIT_ENV: &str = "DIALOG_MESSAGE_LIMIT";

/// Session store settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle sessions are forgotten after this many seconds
    pub ttl_secs: Option<u64>,

    /// Upper bound on concurrently kept sessions
    pub capacity: Option<usize>,
}

impl SessionConfig {
    pub fn build_store(&self) -> MemorySessionStore {
        let mut store = MemorySessionStore::new();
        if let Some(ttl) = self.ttl_secs {
            store = store.with_ttl(Duration::from_secs(ttl));
        }
        if let Some(capacity) = self.capacity {
            store = store.with_capacity(capacity);
        }
        store
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub session: SessionConfig,

    /// Users allowed into the admin panel
    pub admins: Vec<i64>,
}

impl AppConfig {
    /// Read the optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config
            .validate()
            .map_err(|err| anyhow!(err))
            .context("Invalid configuration")?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup(MESSAGE_LIMIT_ENV) {
            self.gateway.message_limit = raw
                .trim()
                .parse()
                .with_context(|| format!("{MESSAGE_LIMIT_ENV} must be a number, got {raw:?}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.session.capacity == Some(0) {
            return Err("session.capacity must be > 0".to_string());
        }
        self.gateway.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn no_file_and_no_overrides_means_defaults() {
        let mut config = AppConfig::default();
        config.apply_overrides(|_| None).unwrap();
        config.validate().unwrap();
        assert_eq!(config.session, SessionConfig::default());
        assert_eq!(config.gateway, GatewayConfig::default());
        assert!(config.admins.is_empty());
    }

    #[test]
    fn file_values_are_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            admins = [1, 2]

            [gateway]
            message_limit = 512

            [session]
            ttl_secs = 3600
            "#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.admins, vec![1, 2]);
        assert_eq!(config.gateway.message_limit, 512);
        assert_eq!(config.session.ttl_secs, Some(3600));
        assert_eq!(config.session.capacity, None);
    }

    #[test]
    fn env_override_wins_over_file() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(|name| (name == MESSAGE_LIMIT_ENV).then(|| "2000".to_string()))
            .unwrap();
        assert_eq!(config.gateway.message_limit, 2000);

        let err = config
            .apply_overrides(|_| Some("lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(MESSAGE_LIMIT_ENV));
    }

    #[test]
    fn zero_limit_fails_validation() {
        let mut config = AppConfig::default();
        config.gateway.message_limit = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.session.capacity = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn broken_toml_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "gateway = [").unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }
}
