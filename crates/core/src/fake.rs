// In-memory cluster doubles for tests
//
// FakeCluster serves fixture objects through ClusterApi and, like the API server,
// refuses unqualified log requests on multi-container pods.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    ConfigMap, Namespace, PersistentVolume, Pod, Secret, Service,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::Metadata;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::api::ClusterApi;
use crate::connector::{ClusterConnector, ConnectTarget};
use crate::error::ApiError;

/// Fixture-backed cluster.
#[derive(Debug, Clone, Default)]
pub struct FakeCluster {
    failure: Option<String>,
    namespaces: Vec<Namespace>,
    pods: Vec<Pod>,
    deployments: Vec<Deployment>,
    services: Vec<Service>,
    config_maps: Vec<ConfigMap>,
    secrets: Vec<Secret>,
    ingresses: Vec<Ingress>,
    cron_jobs: Vec<CronJob>,
    jobs: Vec<Job>,
    persistent_volumes: Vec<PersistentVolume>,
    /// (namespace, pod, container) -> log text
    logs: HashMap<(String, String, String), String>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cluster whose every call fails with `message`.
    pub fn unreachable(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.namespaces.push(namespace);
        self
    }

    pub fn with_pod(mut self, pod: Pod) -> Self {
        self.pods.push(pod);
        self
    }

    pub fn with_deployment(mut self, deployment: Deployment) -> Self {
        self.deployments.push(deployment);
        self
    }

    pub fn with_service(mut self, service: Service) -> Self {
        self.services.push(service);
        self
    }

    pub fn with_config_map(mut self, config_map: ConfigMap) -> Self {
        self.config_maps.push(config_map);
        self
    }

    pub fn with_secret(mut self, secret: Secret) -> Self {
        self.secrets.push(secret);
        self
    }

    pub fn with_ingress(mut self, ingress: Ingress) -> Self {
        self.ingresses.push(ingress);
        self
    }

    pub fn with_cron_job(mut self, cron_job: CronJob) -> Self {
        self.cron_jobs.push(cron_job);
        self
    }

    pub fn with_job(mut self, job: Job) -> Self {
        self.jobs.push(job);
        self
    }

    pub fn with_persistent_volume(mut self, volume: PersistentVolume) -> Self {
        self.persistent_volumes.push(volume);
        self
    }

    pub fn with_logs(mut self, namespace: &str, pod: &str, container: &str, text: &str) -> Self {
        self.logs.insert(
            (namespace.to_string(), pod.to_string(), container.to_string()),
            text.to_string(),
        );
        self
    }

    fn check(&self) -> Result<(), ApiError> {
        match &self.failure {
            Some(message) => Err(ApiError::Request(message.clone())),
            None => Ok(()),
        }
    }

    fn scoped<K>(&self, items: &[K], namespace: Option<&str>) -> Result<Vec<K>, ApiError>
    where
        K: Metadata<Ty = ObjectMeta> + Clone,
    {
        self.check()?;
        Ok(items
            .iter()
            .filter(|item| match namespace {
                Some(ns) => item.metadata().namespace.as_deref() == Some(ns),
                None => true,
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn list_namespaces(&self) -> Result<Vec<Namespace>, ApiError> {
        self.check()?;
        Ok(self.namespaces.clone())
    }

    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<Pod>, ApiError> {
        self.scoped(&self.pods, namespace)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, ApiError> {
        self.check()?;
        Ok(self
            .pods
            .iter()
            .find(|p| {
                p.metadata.namespace.as_deref() == Some(namespace)
                    && p.metadata.name.as_deref() == Some(name)
            })
            .cloned())
    }

    async fn pod_logs(
        &self,
        namespace: &str,
        name: &str,
        container: Option<&str>,
        tail_lines: i64,
    ) -> Result<String, ApiError> {
        let pod = self
            .get_pod(namespace, name)
            .await?
            .ok_or_else(|| ApiError::Request(format!("pods \"{}\" not found", name)))?;

        let containers = crate::projection::pod::container_names(&pod);
        let init_containers = crate::projection::pod::init_container_names(&pod);

        let container = match container {
            Some(c) if containers.iter().chain(&init_containers).any(|name| name == c) => {
                c.to_string()
            }
            Some(c) => {
                return Err(ApiError::Request(format!(
                    "container {} is not valid for pod {}",
                    c, name
                )))
            }
            None if containers.len() == 1 => containers[0].clone(),
            None => {
                return Err(ApiError::ContainerRequired(format!(
                    "a container name must be specified for pod {}, choose one of: [{}]",
                    name,
                    containers.join(" ")
                )))
            }
        };

        let text = self
            .logs
            .get(&(namespace.to_string(), name.to_string(), container))
            .cloned()
            .unwrap_or_default();
        let lines: Vec<&str> = text.lines().collect();
        let keep = usize::try_from(tail_lines).unwrap_or(0).min(lines.len());
        Ok(lines[lines.len() - keep..].join("\n"))
    }

    async fn list_deployments(&self, namespace: Option<&str>) -> Result<Vec<Deployment>, ApiError> {
        self.scoped(&self.deployments, namespace)
    }

    async fn list_services(&self, namespace: Option<&str>) -> Result<Vec<Service>, ApiError> {
        self.scoped(&self.services, namespace)
    }

    async fn list_config_maps(&self, namespace: Option<&str>) -> Result<Vec<ConfigMap>, ApiError> {
        self.scoped(&self.config_maps, namespace)
    }

    async fn list_secrets(&self, namespace: Option<&str>) -> Result<Vec<Secret>, ApiError> {
        self.scoped(&self.secrets, namespace)
    }

    async fn list_ingresses(&self, namespace: Option<&str>) -> Result<Vec<Ingress>, ApiError> {
        self.scoped(&self.ingresses, namespace)
    }

    async fn list_cron_jobs(&self, namespace: Option<&str>) -> Result<Vec<CronJob>, ApiError> {
        self.scoped(&self.cron_jobs, namespace)
    }

    async fn list_jobs(&self, namespace: Option<&str>) -> Result<Vec<Job>, ApiError> {
        self.scoped(&self.jobs, namespace)
    }

    async fn list_persistent_volumes(&self) -> Result<Vec<PersistentVolume>, ApiError> {
        self.check()?;
        Ok(self.persistent_volumes.clone())
    }
}

/// Connector that hands out fake clusters.
#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    local: Option<FakeCluster>,
    managed: HashMap<String, FakeCluster>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cluster returned for [`ConnectTarget::LocalContext`].
    pub fn with_local(mut self, cluster: FakeCluster) -> Self {
        self.local = Some(cluster);
        self
    }

    /// Cluster returned for a managed target with this cluster name.
    pub fn with_managed(mut self, cluster_name: &str, cluster: FakeCluster) -> Self {
        self.managed.insert(cluster_name.to_string(), cluster);
        self
    }
}

#[async_trait]
impl ClusterConnector for FakeConnector {
    async fn connect(&self, target: &ConnectTarget) -> anyhow::Result<Arc<dyn ClusterApi>> {
        let cluster = match target {
            ConnectTarget::LocalContext => self
                .local
                .clone()
                .ok_or_else(|| anyhow!("No local kubeconfig available"))?,
            ConnectTarget::ManagedCluster { cluster_name, .. } => self
                .managed
                .get(cluster_name)
                .cloned()
                .ok_or_else(|| anyhow!("Credential exchange failed for '{}'", cluster_name))?,
        };
        Ok(Arc::new(cluster))
    }
}

/// Fixture builders producing API objects the way the API server serializes them.
pub mod fixtures {
    use super::*;
    use base64::Engine;
    use serde::de::DeserializeOwned;
    use serde_json::{json, Value};

    fn build<T: DeserializeOwned>(value: Value) -> T {
        serde_json::from_value(value).expect("fixture must match the API schema")
    }

    pub fn namespace(name: &str) -> Namespace {
        build(json!({
            "metadata": {"name": name, "labels": {"kubernetes.io/metadata.name": name}},
            "status": {"phase": "Active"}
        }))
    }

    /// A running pod whose containers are all ready.
    pub fn pod(namespace: &str, name: &str, containers: &[&str]) -> Pod {
        let specs: Vec<Value> = containers
            .iter()
            .map(|c| json!({"name": c, "image": format!("registry.local/{}:1.0", c)}))
            .collect();
        let statuses: Vec<Value> = containers
            .iter()
            .map(|c| {
                json!({
                    "name": c,
                    "image": format!("registry.local/{}:1.0", c),
                    "imageID": "",
                    "ready": true,
                    "restartCount": 0,
                    "state": {"running": {"startedAt": "2024-05-01T10:00:00Z"}}
                })
            })
            .collect();
        build(json!({
            "metadata": {
                "name": name,
                "namespace": namespace,
                "labels": {"app": name},
                "creationTimestamp": "2024-05-01T09:59:00Z"
            },
            "spec": {"containers": specs, "nodeName": "node-1"},
            "status": {
                "phase": "Running",
                "podIP": "10.0.0.12",
                "hostIP": "192.168.1.10",
                "startTime": "2024-05-01T10:00:00Z",
                "containerStatuses": statuses
            }
        }))
    }

    /// Like [`pod`], with init containers declared ahead of the regular ones.
    pub fn pod_with_init(namespace: &str, name: &str, init: &[&str], containers: &[&str]) -> Pod {
        let mut pod = pod(namespace, name, containers);
        if let Some(spec) = pod.spec.as_mut() {
            spec.init_containers = Some(
                init.iter()
                    .map(|c| build(json!({"name": c, "image": format!("registry.local/{}:1.0", c)})))
                    .collect(),
            );
        }
        pod
    }

    /// A pod with metadata only: no spec or status subrecords.
    pub fn bare_pod(namespace: &str, name: &str) -> Pod {
        build(json!({"metadata": {"name": name, "namespace": namespace}}))
    }

    pub fn deployment(namespace: &str, name: &str, replicas: i32, ready: i32) -> Deployment {
        build(json!({
            "metadata": {"name": name, "namespace": namespace, "labels": {"app": name}},
            "spec": {
                "replicas": replicas,
                "selector": {"matchLabels": {"app": name}},
                "strategy": {"type": "RollingUpdate"},
                "template": {
                    "metadata": {"labels": {"app": name}},
                    "spec": {"containers": [{"name": name, "image": format!("registry.local/{}:2.1", name)}]}
                }
            },
            "status": {
                "replicas": replicas,
                "readyReplicas": ready,
                "availableReplicas": ready,
                "updatedReplicas": replicas
            }
        }))
    }

    pub fn service(namespace: &str, name: &str, port: i32, target_port: i32) -> Service {
        build(json!({
            "metadata": {"name": name, "namespace": namespace},
            "spec": {
                "type": "ClusterIP",
                "clusterIP": "10.96.0.20",
                "selector": {"app": name},
                "ports": [{"name": "http", "port": port, "targetPort": target_port, "protocol": "TCP"}]
            }
        }))
    }

    pub fn config_map(namespace: &str, name: &str, keys: &[&str]) -> ConfigMap {
        let data: serde_json::Map<String, Value> = keys
            .iter()
            .map(|k| (k.to_string(), Value::String(format!("value-of-{}", k))))
            .collect();
        build(json!({"metadata": {"name": name, "namespace": namespace}, "data": data}))
    }

    /// A secret; `entries` values are plaintext and get base64-encoded like the API does.
    pub fn secret(namespace: &str, name: &str, entries: &[(&str, &str)]) -> Secret {
        let data: serde_json::Map<String, Value> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(base64::engine::general_purpose::STANDARD.encode(v))))
            .collect();
        build(json!({
            "metadata": {"name": name, "namespace": namespace},
            "type": "Opaque",
            "data": data
        }))
    }

    pub fn ingress(namespace: &str, name: &str, host: &str, service: &str, port: i32) -> Ingress {
        build(json!({
            "metadata": {"name": name, "namespace": namespace},
            "spec": {
                "ingressClassName": "nginx",
                "rules": [{
                    "host": host,
                    "http": {"paths": [{
                        "path": "/",
                        "pathType": "Prefix",
                        "backend": {"service": {"name": service, "port": {"number": port}}}
                    }]}
                }],
                "tls": [{"hosts": [host], "secretName": format!("{}-tls", name)}]
            },
            "status": {"loadBalancer": {"ingress": [{"ip": "20.1.2.3"}]}}
        }))
    }

    pub fn persistent_volume(name: &str, capacity: &str, claim: Option<(&str, &str)>) -> PersistentVolume {
        let claim_ref = claim.map(|(ns, n)| json!({"namespace": ns, "name": n}));
        build(json!({
            "metadata": {"name": name},
            "spec": {
                "capacity": {"storage": capacity},
                "accessModes": ["ReadWriteOnce"],
                "persistentVolumeReclaimPolicy": "Delete",
                "storageClassName": "managed-csi",
                "claimRef": claim_ref
            },
            "status": {"phase": if claim.is_some() { "Bound" } else { "Available" }}
        }))
    }

    pub fn cron_job(namespace: &str, name: &str, schedule: &str) -> CronJob {
        build(json!({
            "metadata": {"name": name, "namespace": namespace},
            "spec": {
                "schedule": schedule,
                "suspend": false,
                "jobTemplate": {"spec": {"template": {"spec": {"containers": [{"name": name, "image": "busybox"}]}}}}
            },
            "status": {"lastScheduleTime": "2024-05-01T00:00:00Z", "active": []}
        }))
    }

    pub fn job(namespace: &str, name: &str, succeeded: i32, failed: i32) -> Job {
        build(json!({
            "metadata": {"name": name, "namespace": namespace},
            "spec": {
                "completions": 1,
                "parallelism": 1,
                "template": {"spec": {"containers": [{"name": name, "image": "busybox"}], "restartPolicy": "Never"}}
            },
            "status": {
                "succeeded": succeeded,
                "failed": failed,
                "startTime": "2024-05-01T00:00:05Z"
            }
        }))
    }
}
