// Resource query engine: session lookup, pod search and per-kind listings

use std::sync::Arc;

use chrono::Utc;
use k8s_openapi::api::core::v1::Pod;
use serde::Serialize;

use crate::api::ClusterApi;
use crate::container::resolve_container;
use crate::error::{ApiError, KubeLensError, Result};
use crate::logs::{ContainerAmbiguity, LogOutcome, PodLogResult, TailLines};
use crate::projection::{
    self, ConfigMapSummary, CronJobSummary, DeploymentSummary, IngressSummary, JobSummary,
    NamespaceSummary, PersistentVolumeSummary, PodDescription, PodDetails, PodSummary,
    ResourceList, SecretSummary, ServiceSummary,
};
use crate::session::SessionManager;

/// Result of `describe_pod`. A missing pod is reported, not raised.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DescribeOutcome {
    Found(DescribedPod),
    NotFound(PodNotFoundInfo),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribedPod {
    pub found: bool,
    pub cluster_id: String,
    #[serde(flatten)]
    pub pod: PodDescription,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodNotFoundInfo {
    pub found: bool,
    pub cluster_id: String,
    pub pod_name: String,
    pub namespace: Option<String>,
    pub message: String,
    pub suggestion: String,
}

/// Read-only queries against connected clusters.
#[derive(Clone)]
pub struct QueryEngine {
    sessions: Arc<SessionManager>,
}

/// Empty namespace filters mean "all namespaces".
fn scope(namespace: Option<&str>) -> Option<&str> {
    namespace.filter(|ns| !ns.is_empty())
}

fn project<T, U>(
    cluster_id: &str,
    namespace: Option<&str>,
    items: &[T],
    f: fn(&T) -> U,
) -> ResourceList<U> {
    ResourceList::new(cluster_id, namespace, items.iter().map(f).collect())
}

impl QueryEngine {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    async fn api(&self, cluster_id: &str) -> Result<Arc<dyn ClusterApi>> {
        self.sessions.api(cluster_id).await
    }

    pub async fn list_pods(
        &self,
        cluster_id: &str,
        namespace: Option<&str>,
    ) -> Result<ResourceList<PodSummary>> {
        let ns = scope(namespace);
        let pods = self.api(cluster_id).await?.list_pods(ns).await?;
        Ok(project(cluster_id, ns, &pods, projection::pod::summarize))
    }

    pub async fn list_deployments(
        &self,
        cluster_id: &str,
        namespace: Option<&str>,
    ) -> Result<ResourceList<DeploymentSummary>> {
        let ns = scope(namespace);
        let items = self.api(cluster_id).await?.list_deployments(ns).await?;
        Ok(project(cluster_id, ns, &items, projection::workload::deployment))
    }

    pub async fn list_services(
        &self,
        cluster_id: &str,
        namespace: Option<&str>,
    ) -> Result<ResourceList<ServiceSummary>> {
        let ns = scope(namespace);
        let items = self.api(cluster_id).await?.list_services(ns).await?;
        Ok(project(cluster_id, ns, &items, projection::network::service))
    }

    pub async fn list_namespaces(&self, cluster_id: &str) -> Result<ResourceList<NamespaceSummary>> {
        let items = self.api(cluster_id).await?.list_namespaces().await?;
        Ok(project(cluster_id, None, &items, projection::namespace::namespace))
    }

    pub async fn list_config_maps(
        &self,
        cluster_id: &str,
        namespace: Option<&str>,
    ) -> Result<ResourceList<ConfigMapSummary>> {
        let ns = scope(namespace);
        let items = self.api(cluster_id).await?.list_config_maps(ns).await?;
        Ok(project(cluster_id, ns, &items, projection::config::config_map))
    }

    pub async fn list_secrets(
        &self,
        cluster_id: &str,
        namespace: Option<&str>,
    ) -> Result<ResourceList<SecretSummary>> {
        let ns = scope(namespace);
        let items = self.api(cluster_id).await?.list_secrets(ns).await?;
        Ok(project(cluster_id, ns, &items, projection::config::secret))
    }

    pub async fn list_ingresses(
        &self,
        cluster_id: &str,
        namespace: Option<&str>,
    ) -> Result<ResourceList<IngressSummary>> {
        let ns = scope(namespace);
        let items = self.api(cluster_id).await?.list_ingresses(ns).await?;
        Ok(project(cluster_id, ns, &items, projection::network::ingress))
    }

    pub async fn list_persistent_volumes(
        &self,
        cluster_id: &str,
    ) -> Result<ResourceList<PersistentVolumeSummary>> {
        let items = self.api(cluster_id).await?.list_persistent_volumes().await?;
        Ok(project(cluster_id, None, &items, projection::storage::persistent_volume))
    }

    pub async fn list_cron_jobs(
        &self,
        cluster_id: &str,
        namespace: Option<&str>,
    ) -> Result<ResourceList<CronJobSummary>> {
        let ns = scope(namespace);
        let items = self.api(cluster_id).await?.list_cron_jobs(ns).await?;
        Ok(project(cluster_id, ns, &items, projection::workload::cron_job))
    }

    pub async fn list_jobs(
        &self,
        cluster_id: &str,
        namespace: Option<&str>,
    ) -> Result<ResourceList<JobSummary>> {
        let ns = scope(namespace);
        let items = self.api(cluster_id).await?.list_jobs(ns).await?;
        Ok(project(cluster_id, ns, &items, projection::workload::job))
    }

    /// Find a pod by name.
    ///
    /// Tries the namespace hint first; a not-found there falls through to a
    /// cluster-wide listing where the first exact (case-sensitive) name match wins.
    pub async fn find_pod(
        &self,
        cluster_id: &str,
        name: &str,
        namespace_hint: Option<&str>,
    ) -> Result<Pod> {
        let api = self.api(cluster_id).await?;

        if let Some(ns) = scope(namespace_hint) {
            if let Some(pod) = api.get_pod(ns, name).await? {
                return Ok(pod);
            }
            tracing::debug!(
                cluster = %cluster_id,
                pod = %name,
                namespace = %ns,
                "Pod not in hinted namespace, searching all namespaces"
            );
        }

        api.list_pods(None)
            .await?
            .into_iter()
            .find(|p| p.metadata.name.as_deref() == Some(name))
            .ok_or_else(|| KubeLensError::PodNotFound {
                cluster_id: cluster_id.to_string(),
                name: name.to_string(),
            })
    }

    pub async fn pod_details(
        &self,
        cluster_id: &str,
        name: &str,
        namespace_hint: Option<&str>,
    ) -> Result<PodDetails> {
        let pod = self.find_pod(cluster_id, name, namespace_hint).await?;
        Ok(projection::pod::details(&pod))
    }

    /// Tail the logs of a pod, choosing the container when none (or an unknown one) is named.
    pub async fn pod_logs(
        &self,
        cluster_id: &str,
        name: &str,
        namespace_hint: Option<&str>,
        container: Option<&str>,
        tail_lines: TailLines,
    ) -> Result<LogOutcome> {
        let pod = self.find_pod(cluster_id, name, namespace_hint).await?;
        let namespace = pod.metadata.namespace.clone().unwrap_or_default();
        let containers = projection::pod::container_names(&pod);
        let init_containers = projection::pod::init_container_names(&pod);
        let resolved = resolve_container(name, &containers, &init_containers, container);

        let api = self.api(cluster_id).await?;
        match api
            .pod_logs(&namespace, name, resolved.as_deref(), tail_lines.get())
            .await
        {
            Ok(logs) => Ok(LogOutcome::Logs(PodLogResult {
                cluster_id: cluster_id.to_string(),
                pod_name: name.to_string(),
                namespace,
                container: resolved,
                tail_lines,
                logs,
                retrieved_at: Utc::now(),
            })),
            Err(ApiError::ContainerRequired(reason)) => {
                tracing::info!(
                    cluster = %cluster_id,
                    pod = %name,
                    containers = containers.len(),
                    reason = %reason,
                    "Container selection required"
                );
                Ok(LogOutcome::Ambiguous(ContainerAmbiguity::new(
                    cluster_id, name, &namespace, containers,
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Full description of a pod, or a not-found payload with a hint for the caller.
    pub async fn describe_pod(
        &self,
        cluster_id: &str,
        name: &str,
        namespace_hint: Option<&str>,
    ) -> Result<DescribeOutcome> {
        match self.find_pod(cluster_id, name, namespace_hint).await {
            Ok(pod) => Ok(DescribeOutcome::Found(DescribedPod {
                found: true,
                cluster_id: cluster_id.to_string(),
                pod: projection::pod::describe(&pod),
            })),
            Err(KubeLensError::PodNotFound { .. }) => Ok(DescribeOutcome::NotFound(PodNotFoundInfo {
                found: false,
                cluster_id: cluster_id.to_string(),
                pod_name: name.to_string(),
                namespace: scope(namespace_hint).map(String::from),
                message: format!(
                    "Pod '{}' was not found in any namespace of cluster '{}'",
                    name, cluster_id
                ),
                suggestion: "Use get_pods to list the pods that exist and check the exact name".to_string(),
            })),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::ConnectTarget;
    use crate::fake::{fixtures, FakeCluster, FakeConnector};
    use std::collections::BTreeSet;

    fn shop_cluster() -> FakeCluster {
        FakeCluster::new()
            .with_namespace(fixtures::namespace("shop"))
            .with_namespace(fixtures::namespace("ops"))
            .with_pod(fixtures::pod("shop", "web-0", &["istio-proxy", "app"]))
            .with_pod(fixtures::pod("shop", "cart-0", &["frontend", "backend"]))
            .with_pod(fixtures::pod("ops", "backup-1", &["main"]))
            .with_pod(fixtures::pod("right-ns", "lonely", &["app"]))
            .with_deployment(fixtures::deployment("shop", "web", 2, 2))
            .with_deployment(fixtures::deployment("ops", "reporter", 1, 0))
            .with_secret(fixtures::secret("shop", "db", &[("password", "s3cr3t-value")]))
            .with_secret(fixtures::secret("ops", "token", &[("token", "abc123-token")]))
            .with_logs("shop", "web-0", "app", "line 1\nline 2\nline 3")
            .with_logs("ops", "backup-1", "main", "backup done")
    }

    async fn engine_with(cluster: FakeCluster) -> QueryEngine {
        let connector = FakeConnector::new().with_local(cluster);
        let sessions = Arc::new(SessionManager::new(Arc::new(connector)));
        assert!(sessions.connect("dev", &ConnectTarget::LocalContext).await);
        QueryEngine::new(sessions)
    }

    #[tokio::test]
    async fn test_unconnected_cluster_fails() {
        let engine = engine_with(shop_cluster()).await;
        let err = engine.list_pods("prod", None).await.unwrap_err();
        assert!(matches!(err, KubeLensError::ClusterNotConnected(id) if id == "prod"));
    }

    fn multi_namespace_cluster() -> FakeCluster {
        shop_cluster()
            .with_service(fixtures::service("shop", "web", 80, 8080))
            .with_service(fixtures::service("ops", "reporter", 9090, 9090))
            .with_config_map(fixtures::config_map("shop", "web-config", &["LOG_LEVEL"]))
            .with_config_map(fixtures::config_map("ops", "backup-config", &["TARGET"]))
            .with_ingress(fixtures::ingress("shop", "web", "shop.example.com", "web", 80))
            .with_ingress(fixtures::ingress("ops", "reports", "ops.example.com", "reporter", 9090))
            .with_cron_job(fixtures::cron_job("shop", "cleanup", "*/30 * * * *"))
            .with_cron_job(fixtures::cron_job("ops", "nightly", "0 2 * * *"))
            .with_job(fixtures::job("shop", "cleanup-1", 1, 0))
            .with_job(fixtures::job("ops", "nightly-1", 0, 1))
    }

    /// `namespace/name` of every listed item, in listing order.
    fn item_keys<T: Serialize>(list: &ResourceList<T>) -> Vec<String> {
        let items = serde_json::to_value(&list.items).unwrap();
        items
            .as_array()
            .unwrap()
            .iter()
            .map(|item| {
                format!(
                    "{}/{}",
                    item["namespace"].as_str().unwrap(),
                    item["name"].as_str().unwrap()
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_list_all_is_union_of_namespaces() {
        let engine = engine_with(multi_namespace_cluster()).await;

        macro_rules! assert_union {
            ($list:ident) => {{
                let all = engine.$list("dev", Some("")).await.unwrap();
                assert_eq!(all.namespace, None);
                let all_keys = item_keys(&all);
                assert_eq!(all.count, all_keys.len());

                let mut union = Vec::new();
                for ns in ["shop", "ops", "right-ns"] {
                    let scoped = engine.$list("dev", Some(ns)).await.unwrap();
                    assert_eq!(scoped.namespace.as_deref(), Some(ns));
                    let keys = item_keys(&scoped);
                    let prefix = format!("{}/", ns);
                    assert!(keys.iter().all(|k| k.starts_with(&prefix)), "{}", stringify!($list));
                    union.extend(keys);
                }

                let distinct: BTreeSet<_> = all_keys.iter().cloned().collect();
                assert_eq!(distinct.len(), all_keys.len(), "{} has duplicates", stringify!($list));
                assert!(
                    union.len() >= 2,
                    "{} needs items in several namespaces",
                    stringify!($list)
                );
                union.sort();
                let mut all_sorted = all_keys;
                all_sorted.sort();
                assert_eq!(all_sorted, union, "{}", stringify!($list));
            }};
        }

        assert_union!(list_pods);
        assert_union!(list_deployments);
        assert_union!(list_services);
        assert_union!(list_config_maps);
        assert_union!(list_secrets);
        assert_union!(list_ingresses);
        assert_union!(list_cron_jobs);
        assert_union!(list_jobs);
    }

    #[tokio::test]
    async fn test_list_deployments_scoped() {
        let engine = engine_with(shop_cluster()).await;
        let list = engine.list_deployments("dev", Some("ops")).await.unwrap();
        assert_eq!(list.count, 1);
        assert_eq!(list.items[0].name, "reporter");
        assert_eq!(list.items[0].ready, "0/1");
    }

    #[tokio::test]
    async fn test_secrets_never_contain_values() {
        let engine = engine_with(shop_cluster()).await;
        let list = engine.list_secrets("dev", None).await.unwrap();
        assert_eq!(list.count, 2);

        let json = serde_json::to_string(&list).unwrap();
        assert!(json.contains("password"));
        assert!(!json.contains("s3cr3t-value"));
        assert!(!json.contains("abc123-token"));
    }

    #[tokio::test]
    async fn test_pod_lookup_falls_back_from_wrong_namespace() {
        let engine = engine_with(shop_cluster()).await;
        let details = engine.pod_details("dev", "lonely", Some("wrong-ns")).await.unwrap();
        assert_eq!(details.summary.namespace, "right-ns");
    }

    #[tokio::test]
    async fn test_pod_lookup_without_hint() {
        let engine = engine_with(shop_cluster()).await;
        let pod = engine.find_pod("dev", "backup-1", None).await.unwrap();
        assert_eq!(pod.metadata.namespace.as_deref(), Some("ops"));
    }

    #[tokio::test]
    async fn test_pod_lookup_is_case_sensitive() {
        let engine = engine_with(shop_cluster()).await;
        let err = engine.pod_details("dev", "WEB-0", None).await.unwrap_err();
        assert!(matches!(err, KubeLensError::PodNotFound { .. }));
    }

    #[tokio::test]
    async fn test_logs_resolve_primary_container() {
        let engine = engine_with(shop_cluster()).await;
        let outcome = engine
            .pod_logs("dev", "web-0", None, None, TailLines::new(2).unwrap())
            .await
            .unwrap();

        match outcome {
            LogOutcome::Logs(result) => {
                assert_eq!(result.container.as_deref(), Some("app"));
                assert_eq!(result.namespace, "shop");
                assert_eq!(result.logs, "line 2\nline 3");
            }
            LogOutcome::Ambiguous(a) => panic!("unexpected ambiguity: {:?}", a),
        }
    }

    #[tokio::test]
    async fn test_logs_ambiguous_container() {
        let engine = engine_with(shop_cluster()).await;
        let outcome = engine
            .pod_logs("dev", "cart-0", Some("shop"), None, TailLines::default())
            .await
            .unwrap();

        match outcome {
            LogOutcome::Ambiguous(a) => {
                assert!(a.requires_container_selection);
                assert_eq!(a.containers, vec!["frontend", "backend"]);
            }
            LogOutcome::Logs(_) => panic!("expected ambiguity"),
        }
    }

    #[tokio::test]
    async fn test_logs_explicit_container() {
        let engine = engine_with(shop_cluster()).await;
        let outcome = engine
            .pod_logs("dev", "cart-0", None, Some("Backend"), TailLines::default())
            .await
            .unwrap();
        assert!(matches!(outcome, LogOutcome::Logs(r) if r.container.as_deref() == Some("backend")));
    }

    #[tokio::test]
    async fn test_logs_from_named_init_container() {
        let cluster = shop_cluster()
            .with_pod(fixtures::pod_with_init("shop", "api-0", &["migrate"], &["app"]))
            .with_logs("shop", "api-0", "migrate", "applied 3 migrations")
            .with_logs("shop", "api-0", "app", "app line");
        let engine = engine_with(cluster).await;

        let outcome = engine
            .pod_logs("dev", "api-0", None, Some("migrate"), TailLines::default())
            .await
            .unwrap();
        match outcome {
            LogOutcome::Logs(result) => {
                assert_eq!(result.container.as_deref(), Some("migrate"));
                assert_eq!(result.logs, "applied 3 migrations");
            }
            LogOutcome::Ambiguous(a) => panic!("unexpected ambiguity: {:?}", a),
        }

        let outcome = engine
            .pod_logs("dev", "api-0", None, None, TailLines::default())
            .await
            .unwrap();
        assert!(matches!(outcome, LogOutcome::Logs(r) if r.container.as_deref() == Some("app")));
    }

    #[tokio::test]
    async fn test_logs_missing_pod_is_error() {
        let engine = engine_with(shop_cluster()).await;
        let err = engine
            .pod_logs("dev", "nope", None, None, TailLines::default())
            .await
            .unwrap_err();
        assert!(matches!(err, KubeLensError::PodNotFound { .. }));
    }

    #[tokio::test]
    async fn test_describe_missing_pod_is_payload() {
        let engine = engine_with(shop_cluster()).await;
        let outcome = engine.describe_pod("dev", "nope", Some("shop")).await.unwrap();
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["found"], false);
        assert_eq!(value["podName"], "nope");
        assert!(value["suggestion"].as_str().unwrap().contains("get_pods"));
    }

    #[tokio::test]
    async fn test_describe_found_pod() {
        let engine = engine_with(shop_cluster()).await;
        let outcome = engine.describe_pod("dev", "web-0", None).await.unwrap();
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["found"], true);
        assert_eq!(value["metadata"]["namespace"], "shop");
        assert_eq!(value["containers"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_describe_unconnected_cluster_is_error() {
        let engine = engine_with(shop_cluster()).await;
        assert!(engine.describe_pod("elsewhere", "web-0", None).await.is_err());
    }
}
