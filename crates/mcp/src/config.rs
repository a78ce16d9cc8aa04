use anyhow::{Context, Result};
use kubelens_core::ConnectorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contents of `kubelens.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KubelensConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub kubernetes: ConnectorConfig,
}

/// Identity reported to clients on `initialize`, plus transport limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_description")]
    pub description: String,

    /// Longest request line accepted on stdin; longer lines get a parse error.
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
}

fn default_name() -> String {
    "kubelens".to_string()
}

fn default_description() -> String {
    "Read-only Kubernetes cluster introspection".to_string()
}

fn default_max_request_bytes() -> usize {
    4 * 1024 * 1024
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: default_name(),
            description: default_description(),
            max_request_bytes: default_max_request_bytes(),
        }
    }
}

impl KubelensConfig {
    /// Load the config file if it exists, otherwise use defaults.
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::info!(
                "Configuration file {} not found, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read configuration file {}", config_path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file {}", config_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = KubelensConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.name, "kubelens");
        assert_eq!(config.server.max_request_bytes, 4 * 1024 * 1024);
        assert_eq!(config.kubernetes.connect_timeout_secs, 10);
        assert_eq!(config.kubernetes.az_cli, "az");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[kubernetes]\nread_timeout_secs = 5").unwrap();

        let config = KubelensConfig::load(file.path()).unwrap();
        assert_eq!(config.kubernetes.read_timeout_secs, 5);
        assert_eq!(config.kubernetes.connect_timeout_secs, 10);
        assert_eq!(config.server.description, default_description());
    }

    #[test]
    fn test_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
name = "kubelens-staging"
description = "Staging clusters"
max_request_bytes = 65536

[kubernetes]
connect_timeout_secs = 3
read_timeout_secs = 12
az_cli = "/opt/az/bin/az"
"#
        )
        .unwrap();

        let config = KubelensConfig::load(file.path()).unwrap();
        assert_eq!(config.server.name, "kubelens-staging");
        assert_eq!(config.server.max_request_bytes, 65536);
        assert_eq!(config.kubernetes.connect_timeout_secs, 3);
        assert_eq!(config.kubernetes.az_cli, "/opt/az/bin/az");
    }

    #[test]
    fn test_invalid_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[kubernetes]\nconnect_timeout_secs = \"soon\"").unwrap();

        let err = KubelensConfig::load(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse configuration file"));
    }
}
