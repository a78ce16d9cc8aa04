// Workload projections: deployments, cron jobs and jobs

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use serde::Serialize;

use super::{created_at, labels, name, namespace, timestamp, ConditionSummary, UNKNOWN};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSummary {
    pub name: String,
    pub namespace: String,
    pub replicas: i32,
    pub ready_replicas: i32,
    pub available_replicas: i32,
    pub updated_replicas: i32,
    /// `"<ready>/<desired>"`.
    pub ready: String,
    pub strategy: String,
    pub selector: BTreeMap<String, String>,
    pub images: Vec<String>,
    pub conditions: Vec<ConditionSummary>,
    pub labels: BTreeMap<String, String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJobSummary {
    pub name: String,
    pub namespace: String,
    pub schedule: String,
    pub suspend: bool,
    pub active: usize,
    pub last_schedule_time: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub name: String,
    pub namespace: String,
    /// `Complete`, `Failed`, `Running` or `Pending`.
    pub status: String,
    pub completions: i32,
    pub parallelism: i32,
    pub active: i32,
    pub succeeded: i32,
    pub failed: i32,
    pub start_time: Option<String>,
    pub completion_time: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub created_at: Option<String>,
}

pub fn deployment(d: &Deployment) -> DeploymentSummary {
    let spec = d.spec.as_ref();
    let status = d.status.as_ref();
    let replicas = spec.and_then(|s| s.replicas).unwrap_or(0);
    let ready_replicas = status.and_then(|s| s.ready_replicas).unwrap_or(0);

    DeploymentSummary {
        name: name(&d.metadata),
        namespace: namespace(&d.metadata),
        replicas,
        ready_replicas,
        available_replicas: status.and_then(|s| s.available_replicas).unwrap_or(0),
        updated_replicas: status.and_then(|s| s.updated_replicas).unwrap_or(0),
        ready: format!("{}/{}", ready_replicas, replicas),
        strategy: spec
            .and_then(|s| s.strategy.as_ref())
            .and_then(|s| s.type_.clone())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        selector: spec
            .and_then(|s| s.selector.match_labels.clone())
            .unwrap_or_default(),
        images: spec
            .and_then(|s| s.template.spec.as_ref())
            .map(|p| p.containers.iter().filter_map(|c| c.image.clone()).collect())
            .unwrap_or_default(),
        conditions: status
            .and_then(|s| s.conditions.as_ref())
            .map(|list| {
                list.iter()
                    .map(|c| ConditionSummary {
                        type_: c.type_.clone(),
                        status: c.status.clone(),
                        reason: c.reason.clone(),
                        message: c.message.clone(),
                        last_transition_time: timestamp(c.last_transition_time.as_ref()),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        labels: labels(&d.metadata),
        created_at: created_at(&d.metadata),
    }
}

pub fn cron_job(c: &CronJob) -> CronJobSummary {
    let spec = c.spec.as_ref();
    let status = c.status.as_ref();
    CronJobSummary {
        name: name(&c.metadata),
        namespace: namespace(&c.metadata),
        schedule: spec.map(|s| s.schedule.clone()).unwrap_or_default(),
        suspend: spec.and_then(|s| s.suspend).unwrap_or(false),
        active: status.and_then(|s| s.active.as_ref()).map_or(0, Vec::len),
        last_schedule_time: status.and_then(|s| timestamp(s.last_schedule_time.as_ref())),
        labels: labels(&c.metadata),
        created_at: created_at(&c.metadata),
    }
}

pub fn job(j: &Job) -> JobSummary {
    let spec = j.spec.as_ref();
    let status = j.status.as_ref();
    let completions = spec.and_then(|s| s.completions).unwrap_or(1);
    let active = status.and_then(|s| s.active).unwrap_or(0);
    let succeeded = status.and_then(|s| s.succeeded).unwrap_or(0);
    let failed = status.and_then(|s| s.failed).unwrap_or(0);

    let condition_true = |kind: &str| {
        status
            .and_then(|s| s.conditions.as_ref())
            .is_some_and(|list| list.iter().any(|c| c.type_ == kind && c.status == "True"))
    };

    let state = if condition_true("Complete") || (active == 0 && succeeded >= completions) {
        "Complete"
    } else if condition_true("Failed") {
        "Failed"
    } else if active > 0 {
        "Running"
    } else {
        "Pending"
    };

    JobSummary {
        name: name(&j.metadata),
        namespace: namespace(&j.metadata),
        status: state.to_string(),
        completions,
        parallelism: spec.and_then(|s| s.parallelism).unwrap_or(1),
        active,
        succeeded,
        failed,
        start_time: status.and_then(|s| timestamp(s.start_time.as_ref())),
        completion_time: status.and_then(|s| timestamp(s.completion_time.as_ref())),
        labels: labels(&j.metadata),
        created_at: created_at(&j.metadata),
    }
}
