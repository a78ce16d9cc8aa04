// Cluster API collaborator: the list/get/log surface the query engine relies on

use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    ConfigMap, Namespace, PersistentVolume, Pod, Secret, Service,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, ListParams, LogParams};
use kube::Client;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Read-only operations against a single cluster endpoint.
///
/// `namespace: None` means "all namespaces" for every namespaced listing.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<Namespace>, ApiError>;

    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<Pod>, ApiError>;

    /// Fetch a pod, returning `None` when the API reports not-found.
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, ApiError>;

    /// Tail the logs of a pod. `container: None` lets the cluster pick, which it
    /// refuses with [`ApiError::ContainerRequired`] for multi-container pods.
    async fn pod_logs(
        &self,
        namespace: &str,
        name: &str,
        container: Option<&str>,
        tail_lines: i64,
    ) -> Result<String, ApiError>;

    async fn list_deployments(&self, namespace: Option<&str>) -> Result<Vec<Deployment>, ApiError>;

    async fn list_services(&self, namespace: Option<&str>) -> Result<Vec<Service>, ApiError>;

    async fn list_config_maps(&self, namespace: Option<&str>) -> Result<Vec<ConfigMap>, ApiError>;

    async fn list_secrets(&self, namespace: Option<&str>) -> Result<Vec<Secret>, ApiError>;

    async fn list_ingresses(&self, namespace: Option<&str>) -> Result<Vec<Ingress>, ApiError>;

    async fn list_cron_jobs(&self, namespace: Option<&str>) -> Result<Vec<CronJob>, ApiError>;

    async fn list_jobs(&self, namespace: Option<&str>) -> Result<Vec<Job>, ApiError>;

    async fn list_persistent_volumes(&self) -> Result<Vec<PersistentVolume>, ApiError>;
}

/// [`ClusterApi`] backed by a live kube client.
#[derive(Clone)]
pub struct KubeApi {
    client: Client,
}

impl KubeApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn scoped<K>(&self, namespace: Option<&str>) -> Api<K>
    where
        K: kube::Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    async fn list_scoped<K>(&self, namespace: Option<&str>) -> Result<Vec<K>, ApiError>
    where
        K: kube::Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Debug,
    {
        let start = std::time::Instant::now();
        let list = self.scoped::<K>(namespace).list(&ListParams::default()).await?;
        tracing::debug!(
            kind = %K::kind(&()),
            namespace = namespace.unwrap_or("*"),
            count = list.items.len(),
            "List call took {:?}",
            start.elapsed()
        );
        Ok(list.items)
    }
}

#[async_trait]
impl ClusterApi for KubeApi {
    async fn list_namespaces(&self) -> Result<Vec<Namespace>, ApiError> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        Ok(namespaces.list(&ListParams::default()).await?.items)
    }

    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<Pod>, ApiError> {
        self.list_scoped(namespace).await
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, ApiError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        Ok(pods.get_opt(name).await?)
    }

    async fn pod_logs(
        &self,
        namespace: &str,
        name: &str,
        container: Option<&str>,
        tail_lines: i64,
    ) -> Result<String, ApiError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            container: container.map(String::from),
            tail_lines: Some(tail_lines),
            ..Default::default()
        };
        pods.logs(name, &params)
            .await
            .map_err(ApiError::from_log_error)
    }

    async fn list_deployments(&self, namespace: Option<&str>) -> Result<Vec<Deployment>, ApiError> {
        self.list_scoped(namespace).await
    }

    async fn list_services(&self, namespace: Option<&str>) -> Result<Vec<Service>, ApiError> {
        self.list_scoped(namespace).await
    }

    async fn list_config_maps(&self, namespace: Option<&str>) -> Result<Vec<ConfigMap>, ApiError> {
        self.list_scoped(namespace).await
    }

    async fn list_secrets(&self, namespace: Option<&str>) -> Result<Vec<Secret>, ApiError> {
        self.list_scoped(namespace).await
    }

    async fn list_ingresses(&self, namespace: Option<&str>) -> Result<Vec<Ingress>, ApiError> {
        self.list_scoped(namespace).await
    }

    async fn list_cron_jobs(&self, namespace: Option<&str>) -> Result<Vec<CronJob>, ApiError> {
        self.list_scoped(namespace).await
    }

    async fn list_jobs(&self, namespace: Option<&str>) -> Result<Vec<Job>, ApiError> {
        self.list_scoped(namespace).await
    }

    async fn list_persistent_volumes(&self) -> Result<Vec<PersistentVolume>, ApiError> {
        let volumes: Api<PersistentVolume> = Api::all(self.client.clone());
        Ok(volumes.list(&ListParams::default()).await?.items)
    }
}
