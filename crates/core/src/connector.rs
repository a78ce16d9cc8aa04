// Connection strategies: turn a cluster target into an authenticated API handle

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::api::{ClusterApi, KubeApi};

/// How a session reaches its cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectTarget {
    /// The caller's ambient kubeconfig / in-cluster configuration.
    LocalContext,
    /// A managed (AKS) cluster whose credentials are issued by the Azure CLI.
    ManagedCluster {
        cluster_name: String,
        resource_group: String,
        subscription_id: Option<String>,
    },
}

impl ConnectTarget {
    pub fn strategy(&self) -> ConnectStrategy {
        match self {
            Self::LocalContext => ConnectStrategy::LocalContext,
            Self::ManagedCluster { .. } => ConnectStrategy::ManagedCluster,
        }
    }
}

/// Connection strategy recorded on each session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectStrategy {
    LocalContext,
    ManagedCluster,
}

impl std::fmt::Display for ConnectStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LocalContext => write!(f, "local-context"),
            Self::ManagedCluster => write!(f, "managed-cluster"),
        }
    }
}

/// Produces API handles for connection targets.
///
/// Connectors only build the handle; the session manager probes it before use.
#[async_trait]
pub trait ClusterConnector: Send + Sync {
    async fn connect(&self, target: &ConnectTarget) -> Result<Arc<dyn ClusterApi>>;
}

/// Settings for the kube-backed connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Timeout for establishing a connection to the API server
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Timeout for reading API responses
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Azure CLI executable used for managed-cluster credentials
    #[serde(default = "default_az_cli")]
    pub az_cli: String,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_read_timeout_secs() -> u64 {
    30
}

fn default_az_cli() -> String {
    "az".to_string()
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            az_cli: default_az_cli(),
        }
    }
}

/// Connector backed by kube-rs configuration loading.
pub struct KubeConnector {
    config: ConnectorConfig,
}

impl KubeConnector {
    pub fn new(config: ConnectorConfig) -> Self {
        Self { config }
    }

    fn apply_timeouts(&self, mut config: Config) -> Config {
        config.connect_timeout = Some(Duration::from_secs(self.config.connect_timeout_secs));
        config.read_timeout = Some(Duration::from_secs(self.config.read_timeout_secs));
        config
    }

    async fn local_context_config(&self) -> Result<Config> {
        Config::infer()
            .await
            .context("Failed to infer kubeconfig for the local context")
    }

    async fn managed_cluster_config(
        &self,
        cluster_name: &str,
        resource_group: &str,
        subscription_id: Option<&str>,
    ) -> Result<Config> {
        let args = managed_cluster_credential_args(cluster_name, resource_group, subscription_id);
        tracing::info!(
            cluster = %cluster_name,
            resource_group = %resource_group,
            "Requesting managed cluster credentials via {}",
            self.config.az_cli
        );

        let output = Command::new(&self.config.az_cli)
            .args(&args)
            .output()
            .await
            .with_context(|| format!("Failed to run '{}'", self.config.az_cli))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "Credential exchange for '{}' failed ({}): {}",
                cluster_name,
                output.status,
                stderr.trim()
            ));
        }

        let yaml = String::from_utf8(output.stdout)
            .context("Credential process emitted non UTF-8 kubeconfig")?;
        let kubeconfig = Kubeconfig::from_yaml(&yaml)
            .context("Failed to parse kubeconfig returned by the credential process")?;

        Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .with_context(|| format!("Failed to build client config for '{}'", cluster_name))
    }
}

impl Default for KubeConnector {
    fn default() -> Self {
        Self::new(ConnectorConfig::default())
    }
}

#[async_trait]
impl ClusterConnector for KubeConnector {
    async fn connect(&self, target: &ConnectTarget) -> Result<Arc<dyn ClusterApi>> {
        let config = match target {
            ConnectTarget::LocalContext => self.local_context_config().await?,
            ConnectTarget::ManagedCluster {
                cluster_name,
                resource_group,
                subscription_id,
            } => {
                self.managed_cluster_config(cluster_name, resource_group, subscription_id.as_deref())
                    .await?
            }
        };

        let client = Client::try_from(self.apply_timeouts(config))
            .context("Failed to create Kubernetes client")?;
        Ok(Arc::new(KubeApi::new(client)))
    }
}

/// Arguments for `az aks get-credentials`, writing the kubeconfig to stdout.
fn managed_cluster_credential_args(
    cluster_name: &str,
    resource_group: &str,
    subscription_id: Option<&str>,
) -> Vec<String> {
    let mut args: Vec<String> = [
        "aks",
        "get-credentials",
        "--name",
        cluster_name,
        "--resource-group",
        resource_group,
        "--file",
        "-",
        "--only-show-errors",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    if let Some(subscription) = subscription_id.filter(|s| !s.is_empty()) {
        args.push("--subscription".to_string());
        args.push(subscription.to_string());
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_args_without_subscription() {
        let args = managed_cluster_credential_args("aks-prod", "rg-prod", None);
        assert_eq!(
            args,
            vec![
                "aks",
                "get-credentials",
                "--name",
                "aks-prod",
                "--resource-group",
                "rg-prod",
                "--file",
                "-",
                "--only-show-errors"
            ]
        );
    }

    #[test]
    fn test_credential_args_with_subscription() {
        let args = managed_cluster_credential_args("aks-prod", "rg-prod", Some("sub-123"));
        assert_eq!(&args[args.len() - 2..], ["--subscription", "sub-123"]);
    }

    #[test]
    fn test_credential_args_ignore_empty_subscription() {
        let args = managed_cluster_credential_args("aks-prod", "rg-prod", Some(""));
        assert!(!args.contains(&"--subscription".to_string()));
    }

    #[test]
    fn test_connector_config_defaults() {
        let config = ConnectorConfig::default();
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.read_timeout_secs, 30);
        assert_eq!(config.az_cli, "az");
    }

    #[test]
    fn test_target_strategy() {
        assert_eq!(ConnectTarget::LocalContext.strategy(), ConnectStrategy::LocalContext);
        let managed = ConnectTarget::ManagedCluster {
            cluster_name: "c".into(),
            resource_group: "rg".into(),
            subscription_id: None,
        };
        assert_eq!(managed.strategy(), ConnectStrategy::ManagedCluster);
        assert_eq!(managed.strategy().to_string(), "managed-cluster");
    }

    #[tokio::test]
    async fn test_missing_credential_cli_fails() {
        let connector = KubeConnector::new(ConnectorConfig {
            az_cli: "/nonexistent/kubelens-az".to_string(),
            ..Default::default()
        });
        let target = ConnectTarget::ManagedCluster {
            cluster_name: "aks".into(),
            resource_group: "rg".into(),
            subscription_id: None,
        };
        let err = connector.connect(&target).await.err().map(|e| e.to_string());
        assert!(err.unwrap_or_default().contains("Failed to run"));
    }
}
