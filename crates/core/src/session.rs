// Cluster session registry: cluster id -> probed, authenticated API handle

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::api::ClusterApi;
use crate::connector::{ClusterConnector, ConnectStrategy, ConnectTarget};
use crate::error::{KubeLensError, Result};

/// A live connection to one cluster.
#[derive(Clone)]
pub struct ClusterSession {
    pub cluster_id: String,
    pub strategy: ConnectStrategy,
    pub connected_at: DateTime<Utc>,
    api: Arc<dyn ClusterApi>,
}

impl ClusterSession {
    pub fn api(&self) -> Arc<dyn ClusterApi> {
        self.api.clone()
    }
}

impl std::fmt::Debug for ClusterSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterSession")
            .field("cluster_id", &self.cluster_id)
            .field("strategy", &self.strategy)
            .field("connected_at", &self.connected_at)
            .finish()
    }
}

/// Owns every cluster session for the lifetime of the process.
///
/// Sessions are only inserted after a namespace listing succeeds, so a failed
/// connect never leaves a partial entry behind.
pub struct SessionManager {
    connector: Arc<dyn ClusterConnector>,
    sessions: Arc<RwLock<HashMap<String, ClusterSession>>>,
}

impl SessionManager {
    pub fn new(connector: Arc<dyn ClusterConnector>) -> Self {
        Self {
            connector,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Connect `cluster_id` via `target`, replacing any previous session on success.
    ///
    /// Returns `false` (and logs the cause) when credentials or the liveness probe fail.
    pub async fn connect(&self, cluster_id: &str, target: &ConnectTarget) -> bool {
        let strategy = target.strategy();
        let start = std::time::Instant::now();

        let api = match self.connector.connect(target).await {
            Ok(api) => api,
            Err(e) => {
                tracing::error!(
                    cluster = %cluster_id,
                    strategy = %strategy,
                    error = %format!("{:#}", e),
                    "Failed to establish cluster connection"
                );
                return false;
            }
        };

        match api.list_namespaces().await {
            Ok(namespaces) => {
                tracing::debug!(
                    cluster = %cluster_id,
                    namespaces = namespaces.len(),
                    "Liveness probe succeeded"
                );
            }
            Err(e) => {
                tracing::error!(
                    cluster = %cluster_id,
                    strategy = %strategy,
                    error = %e,
                    "Liveness probe failed, session not registered"
                );
                return false;
            }
        }

        let session = ClusterSession {
            cluster_id: cluster_id.to_string(),
            strategy,
            connected_at: Utc::now(),
            api,
        };

        let replaced = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(cluster_id.to_string(), session).is_some()
        };

        tracing::info!(
            cluster = %cluster_id,
            strategy = %strategy,
            replaced,
            "Connected to cluster in {:?}",
            start.elapsed()
        );
        true
    }

    /// All registered cluster ids, sorted.
    pub async fn list_connected(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        let mut ids: Vec<String> = sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Look up the session for `cluster_id`.
    pub async fn session(&self, cluster_id: &str) -> Result<ClusterSession> {
        self.sessions
            .read()
            .await
            .get(cluster_id)
            .cloned()
            .ok_or_else(|| KubeLensError::ClusterNotConnected(cluster_id.to_string()))
    }

    /// Shortcut for the API handle of a registered session.
    pub async fn api(&self, cluster_id: &str) -> Result<Arc<dyn ClusterApi>> {
        Ok(self.session(cluster_id).await?.api())
    }

    pub async fn is_connected(&self, cluster_id: &str) -> bool {
        self.sessions.read().await.contains_key(cluster_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{fixtures, FakeCluster, FakeConnector};

    fn healthy_cluster() -> FakeCluster {
        FakeCluster::new().with_namespace(fixtures::namespace("default"))
    }

    #[tokio::test]
    async fn test_connect_registers_session() {
        let connector = FakeConnector::new().with_local(healthy_cluster());
        let manager = SessionManager::new(Arc::new(connector));

        assert!(manager.connect("dev", &ConnectTarget::LocalContext).await);
        assert_eq!(manager.list_connected().await, vec!["dev".to_string()]);

        let session = manager.session("dev").await.unwrap();
        assert_eq!(session.strategy, ConnectStrategy::LocalContext);
    }

    #[tokio::test]
    async fn test_connector_failure_leaves_registry_unchanged() {
        let manager = SessionManager::new(Arc::new(FakeConnector::new()));

        assert!(!manager.connect("dev", &ConnectTarget::LocalContext).await);
        assert!(manager.list_connected().await.is_empty());
        assert!(!manager.is_connected("dev").await);
    }

    #[tokio::test]
    async fn test_probe_failure_leaves_registry_unchanged() {
        let connector = FakeConnector::new().with_local(FakeCluster::unreachable("connection refused"));
        let manager = SessionManager::new(Arc::new(connector));

        assert!(!manager.connect("dev", &ConnectTarget::LocalContext).await);
        assert!(manager.list_connected().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_reconnect_keeps_previous_session() {
        let connector = FakeConnector::new().with_local(healthy_cluster());
        let manager = SessionManager::new(Arc::new(connector));
        assert!(manager.connect("prod", &ConnectTarget::LocalContext).await);

        let managed = ConnectTarget::ManagedCluster {
            cluster_name: "prod".into(),
            resource_group: "rg".into(),
            subscription_id: None,
        };
        assert!(!manager.connect("prod", &managed).await);

        let session = manager.session("prod").await.unwrap();
        assert_eq!(session.strategy, ConnectStrategy::LocalContext);
    }

    #[tokio::test]
    async fn test_reconnect_overwrites_session() {
        let connector = FakeConnector::new()
            .with_local(healthy_cluster())
            .with_managed("prod", healthy_cluster());
        let manager = SessionManager::new(Arc::new(connector));

        assert!(manager.connect("prod", &ConnectTarget::LocalContext).await);
        let managed = ConnectTarget::ManagedCluster {
            cluster_name: "prod".into(),
            resource_group: "rg".into(),
            subscription_id: Some("sub".into()),
        };
        assert!(manager.connect("prod", &managed).await);

        assert_eq!(manager.list_connected().await.len(), 1);
        let session = manager.session("prod").await.unwrap();
        assert_eq!(session.strategy, ConnectStrategy::ManagedCluster);
    }

    #[tokio::test]
    async fn test_unknown_cluster_is_not_connected() {
        let manager = SessionManager::new(Arc::new(FakeConnector::new()));
        let err = manager.api("missing").await.err().unwrap();
        assert!(matches!(err, KubeLensError::ClusterNotConnected(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_concurrent_connects_same_id() {
        let connector = FakeConnector::new().with_local(healthy_cluster());
        let manager = Arc::new(SessionManager::new(Arc::new(connector)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                manager.connect("shared", &ConnectTarget::LocalContext).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        assert_eq!(manager.list_connected().await, vec!["shared".to_string()]);
    }
}
