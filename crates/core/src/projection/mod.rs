// Projection of raw API objects into flat, client-facing summaries
//
// Every projection is a pure function of one object. Optional subrecords that
// are missing turn into defaults (zero counts, empty collections, "Unknown").

pub mod config;
pub mod namespace;
pub mod network;
pub mod pod;
pub mod storage;
pub mod workload;

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Serialize;

pub use config::{ConfigMapSummary, SecretSummary};
pub use namespace::NamespaceSummary;
pub use network::{IngressSummary, ServiceSummary};
pub use pod::{PodDescription, PodDetails, PodSummary};
pub use storage::PersistentVolumeSummary;
pub use workload::{CronJobSummary, DeploymentSummary, JobSummary};

/// Status reported when the object carries none.
pub const UNKNOWN: &str = "Unknown";

/// Envelope returned by every list operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceList<T> {
    pub cluster_id: String,
    /// `None` means the listing spans all namespaces.
    pub namespace: Option<String>,
    pub count: usize,
    pub items: Vec<T>,
}

impl<T> ResourceList<T> {
    pub fn new(cluster_id: &str, namespace: Option<&str>, items: Vec<T>) -> Self {
        Self {
            cluster_id: cluster_id.to_string(),
            namespace: namespace.map(String::from),
            count: items.len(),
            items,
        }
    }
}

/// A status condition shared by pods, deployments and jobs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSummary {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    pub reason: Option<String>,
    pub message: Option<String>,
    pub last_transition_time: Option<String>,
}

/// Reference to the controller (or other owner) of an object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub kind: String,
    pub name: String,
    pub controller: bool,
}

/// Render an API timestamp as RFC 3339.
///
/// Goes through the type's own serializer so it does not matter which time
/// library backs it.
pub(crate) fn timestamp<T: Serialize>(time: Option<&T>) -> Option<String> {
    let value = serde_json::to_value(time?).ok()?;
    value.as_str().map(String::from)
}

pub(crate) fn name(meta: &ObjectMeta) -> String {
    meta.name.clone().unwrap_or_default()
}

pub(crate) fn namespace(meta: &ObjectMeta) -> String {
    meta.namespace.clone().unwrap_or_default()
}

pub(crate) fn labels(meta: &ObjectMeta) -> BTreeMap<String, String> {
    meta.labels.clone().unwrap_or_default()
}

pub(crate) fn created_at(meta: &ObjectMeta) -> Option<String> {
    timestamp(meta.creation_timestamp.as_ref())
}

pub(crate) fn owners(meta: &ObjectMeta) -> Vec<OwnerSummary> {
    meta.owner_references
        .iter()
        .flatten()
        .map(|o| OwnerSummary {
            kind: o.kind.clone(),
            name: o.name.clone(),
            controller: o.controller.unwrap_or(false),
        })
        .collect()
}
