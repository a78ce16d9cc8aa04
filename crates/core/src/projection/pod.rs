// Pod projections: list summary, details and full description

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, ContainerStatus, EnvVar, Pod, PodCondition, PodSpec, PodStatus, Volume,
};
use serde::Serialize;
use serde_json::Value;

use super::{
    created_at, labels, name, namespace, owners, timestamp, ConditionSummary, OwnerSummary,
    UNKNOWN,
};

/// One row of a pod listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSummary {
    pub name: String,
    pub namespace: String,
    pub status: String,
    /// `"<ready>/<total>"` containers.
    pub ready: String,
    pub restarts: i32,
    pub node: Option<String>,
    pub pod_ip: Option<String>,
    pub created_at: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub containers: Vec<String>,
}

/// A pod summary enriched with scheduling, condition and per-container state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodDetails {
    #[serde(flatten)]
    pub summary: PodSummary,
    pub host_ip: Option<String>,
    pub start_time: Option<String>,
    pub qos_class: Option<String>,
    pub conditions: Vec<ConditionSummary>,
    pub container_statuses: Vec<ContainerStatusSummary>,
    pub owner_references: Vec<OwnerSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatusSummary {
    pub name: String,
    pub image: String,
    pub ready: bool,
    pub restart_count: i32,
    pub state: ContainerStateSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStateSummary {
    /// `Running`, `Waiting`, `Terminated` or `Unknown`.
    pub state: String,
    pub reason: Option<String>,
    pub started_at: Option<String>,
    pub exit_code: Option<i32>,
}

/// Everything `describe_pod` reports about a pod.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodDescription {
    pub metadata: PodMetadata,
    pub spec: PodSpecSummary,
    pub status: PodStatusSummary,
    pub containers: Vec<ContainerDescription>,
    pub init_containers: Vec<ContainerDescription>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodMetadata {
    pub name: String,
    pub namespace: String,
    pub uid: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub created_at: Option<String>,
    pub owner_references: Vec<OwnerSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpecSummary {
    pub node_name: Option<String>,
    pub service_account: Option<String>,
    pub restart_policy: Option<String>,
    pub dns_policy: Option<String>,
    pub priority_class_name: Option<String>,
    pub node_selector: BTreeMap<String, String>,
    pub volumes: Vec<VolumeSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStatusSummary {
    pub phase: String,
    pub pod_ip: Option<String>,
    pub host_ip: Option<String>,
    pub start_time: Option<String>,
    pub qos_class: Option<String>,
    pub conditions: Vec<ConditionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSummary {
    pub name: String,
    /// Volume source field that is set, e.g. `configMap` or `persistentVolumeClaim`.
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDescription {
    pub name: String,
    pub image: Option<String>,
    pub image_pull_policy: Option<String>,
    pub command: Vec<String>,
    pub args: Vec<String>,
    pub ports: Vec<PortSummary>,
    pub env: Vec<EnvSummary>,
    pub volume_mounts: Vec<MountSummary>,
    pub requests: BTreeMap<String, String>,
    pub limits: BTreeMap<String, String>,
    pub status: Option<ContainerStatusSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortSummary {
    pub name: Option<String>,
    pub container_port: i32,
    pub protocol: String,
}

/// An environment variable. References are described, never resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvSummary {
    pub name: String,
    pub value: Option<String>,
    pub value_from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MountSummary {
    pub name: String,
    pub mount_path: String,
    pub read_only: bool,
}

/// Container names declared in the pod spec, in order.
pub fn container_names(pod: &Pod) -> Vec<String> {
    pod.spec
        .as_ref()
        .map(|s| s.containers.iter().map(|c| c.name.clone()).collect())
        .unwrap_or_default()
}

/// Init container names declared in the pod spec, in order.
pub fn init_container_names(pod: &Pod) -> Vec<String> {
    pod.spec
        .as_ref()
        .and_then(|s| s.init_containers.as_ref())
        .map(|init| init.iter().map(|c| c.name.clone()).collect())
        .unwrap_or_default()
}

pub fn summarize(pod: &Pod) -> PodSummary {
    let statuses = container_statuses(pod.status.as_ref());
    let containers = container_names(pod);
    let total = if containers.is_empty() {
        statuses.len()
    } else {
        containers.len()
    };
    let ready = statuses.iter().filter(|s| s.ready).count();

    PodSummary {
        name: name(&pod.metadata),
        namespace: namespace(&pod.metadata),
        status: phase(pod.status.as_ref()),
        ready: format!("{}/{}", ready, total),
        restarts: statuses.iter().map(|s| s.restart_count).sum(),
        node: pod.spec.as_ref().and_then(|s| s.node_name.clone()),
        pod_ip: pod.status.as_ref().and_then(|s| s.pod_ip.clone()),
        created_at: created_at(&pod.metadata),
        labels: labels(&pod.metadata),
        containers,
    }
}

pub fn details(pod: &Pod) -> PodDetails {
    let status = pod.status.as_ref();
    PodDetails {
        summary: summarize(pod),
        host_ip: status.and_then(|s| s.host_ip.clone()),
        start_time: status.and_then(|s| timestamp(s.start_time.as_ref())),
        qos_class: status.and_then(|s| s.qos_class.clone()),
        conditions: conditions(status),
        container_statuses: container_statuses(status)
            .iter()
            .map(container_status)
            .collect(),
        owner_references: owners(&pod.metadata),
    }
}

pub fn describe(pod: &Pod) -> PodDescription {
    let status = pod.status.as_ref();
    let spec = pod.spec.as_ref();
    let statuses = container_statuses(status);
    let init_statuses = status
        .and_then(|s| s.init_container_statuses.as_deref())
        .unwrap_or_default();

    PodDescription {
        metadata: PodMetadata {
            name: name(&pod.metadata),
            namespace: namespace(&pod.metadata),
            uid: pod.metadata.uid.clone(),
            labels: labels(&pod.metadata),
            annotations: pod.metadata.annotations.clone().unwrap_or_default(),
            created_at: created_at(&pod.metadata),
            owner_references: owners(&pod.metadata),
        },
        spec: spec_summary(spec),
        status: PodStatusSummary {
            phase: phase(status),
            pod_ip: status.and_then(|s| s.pod_ip.clone()),
            host_ip: status.and_then(|s| s.host_ip.clone()),
            start_time: status.and_then(|s| timestamp(s.start_time.as_ref())),
            qos_class: status.and_then(|s| s.qos_class.clone()),
            conditions: conditions(status),
        },
        containers: spec
            .map(|s| s.containers.iter().map(|c| describe_container(c, statuses)).collect())
            .unwrap_or_default(),
        init_containers: spec
            .and_then(|s| s.init_containers.as_ref())
            .map(|list| list.iter().map(|c| describe_container(c, init_statuses)).collect())
            .unwrap_or_default(),
    }
}

fn phase(status: Option<&PodStatus>) -> String {
    status
        .and_then(|s| s.phase.clone())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn container_statuses(status: Option<&PodStatus>) -> &[ContainerStatus] {
    status
        .and_then(|s| s.container_statuses.as_deref())
        .unwrap_or_default()
}

fn conditions(status: Option<&PodStatus>) -> Vec<ConditionSummary> {
    status
        .and_then(|s| s.conditions.as_ref())
        .map(|list| list.iter().map(condition).collect())
        .unwrap_or_default()
}

fn condition(c: &PodCondition) -> ConditionSummary {
    ConditionSummary {
        type_: c.type_.clone(),
        status: c.status.clone(),
        reason: c.reason.clone(),
        message: c.message.clone(),
        last_transition_time: timestamp(c.last_transition_time.as_ref()),
    }
}

fn container_status(s: &ContainerStatus) -> ContainerStatusSummary {
    let state = s.state.as_ref();
    let summary = if let Some(running) = state.and_then(|st| st.running.as_ref()) {
        ContainerStateSummary {
            state: "Running".to_string(),
            reason: None,
            started_at: timestamp(running.started_at.as_ref()),
            exit_code: None,
        }
    } else if let Some(waiting) = state.and_then(|st| st.waiting.as_ref()) {
        ContainerStateSummary {
            state: "Waiting".to_string(),
            reason: waiting.reason.clone(),
            started_at: None,
            exit_code: None,
        }
    } else if let Some(terminated) = state.and_then(|st| st.terminated.as_ref()) {
        ContainerStateSummary {
            state: "Terminated".to_string(),
            reason: terminated.reason.clone(),
            started_at: timestamp(terminated.started_at.as_ref()),
            exit_code: Some(terminated.exit_code),
        }
    } else {
        ContainerStateSummary {
            state: UNKNOWN.to_string(),
            reason: None,
            started_at: None,
            exit_code: None,
        }
    };

    ContainerStatusSummary {
        name: s.name.clone(),
        image: s.image.clone(),
        ready: s.ready,
        restart_count: s.restart_count,
        state: summary,
    }
}

fn spec_summary(spec: Option<&PodSpec>) -> PodSpecSummary {
    PodSpecSummary {
        node_name: spec.and_then(|s| s.node_name.clone()),
        service_account: spec.and_then(|s| s.service_account_name.clone()),
        restart_policy: spec.and_then(|s| s.restart_policy.clone()),
        dns_policy: spec.and_then(|s| s.dns_policy.clone()),
        priority_class_name: spec.and_then(|s| s.priority_class_name.clone()),
        node_selector: spec.and_then(|s| s.node_selector.clone()).unwrap_or_default(),
        volumes: spec
            .and_then(|s| s.volumes.as_ref())
            .map(|list| list.iter().map(volume).collect())
            .unwrap_or_default(),
    }
}

fn volume(v: &Volume) -> VolumeSummary {
    VolumeSummary {
        name: v.name.clone(),
        source: first_set_field(serde_json::to_value(v).ok(), &["name"])
            .map(|(field, _)| field)
            .unwrap_or_else(|| UNKNOWN.to_string()),
    }
}

fn describe_container(c: &Container, statuses: &[ContainerStatus]) -> ContainerDescription {
    let resources = c.resources.as_ref();
    ContainerDescription {
        name: c.name.clone(),
        image: c.image.clone(),
        image_pull_policy: c.image_pull_policy.clone(),
        command: c.command.clone().unwrap_or_default(),
        args: c.args.clone().unwrap_or_default(),
        ports: c
            .ports
            .iter()
            .flatten()
            .map(|p| PortSummary {
                name: p.name.clone(),
                container_port: p.container_port,
                protocol: p.protocol.clone().unwrap_or_else(|| "TCP".to_string()),
            })
            .collect(),
        env: c.env.iter().flatten().map(env_var).collect(),
        volume_mounts: c
            .volume_mounts
            .iter()
            .flatten()
            .map(|m| MountSummary {
                name: m.name.clone(),
                mount_path: m.mount_path.clone(),
                read_only: m.read_only.unwrap_or(false),
            })
            .collect(),
        requests: quantities(resources.and_then(|r| r.requests.as_ref())),
        limits: quantities(resources.and_then(|r| r.limits.as_ref())),
        status: statuses
            .iter()
            .find(|s| s.name == c.name)
            .map(container_status),
    }
}

fn quantities(
    map: Option<&BTreeMap<String, k8s_openapi::apimachinery::pkg::api::resource::Quantity>>,
) -> BTreeMap<String, String> {
    map.map(|m| m.iter().map(|(k, q)| (k.clone(), q.0.clone())).collect())
        .unwrap_or_default()
}

fn env_var(e: &EnvVar) -> EnvSummary {
    EnvSummary {
        name: e.name.clone(),
        value: e.value.clone(),
        value_from: e
            .value_from
            .as_ref()
            .and_then(|source| first_set_field(serde_json::to_value(source).ok(), &[]))
            .map(|(kind, reference)| describe_reference(&kind, &reference)),
    }
}

/// `secretKeyRef` → `secretKeyRef(name/key)`, `fieldRef` → `fieldRef(status.podIP)` etc.
fn describe_reference(kind: &str, reference: &Value) -> String {
    let field = |key: &str| reference.get(key).and_then(Value::as_str);
    let target = match (field("name"), field("key")) {
        (Some(name), Some(key)) => format!("{}/{}", name, key),
        _ => field("fieldPath")
            .or_else(|| field("resource"))
            .or_else(|| field("key"))
            .unwrap_or_default()
            .to_string(),
    };
    format!("{}({})", kind, target)
}

/// First non-null field of a serialized object, skipping `ignore`.
fn first_set_field(value: Option<Value>, ignore: &[&str]) -> Option<(String, Value)> {
    match value? {
        Value::Object(map) => map
            .into_iter()
            .find(|(k, v)| !ignore.contains(&k.as_str()) && !v.is_null()),
        _ => None,
    }
}
