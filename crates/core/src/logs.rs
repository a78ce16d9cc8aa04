// Log retrieval types: the validated tail count and the two log outcomes

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{KubeLensError, Result};

/// Number of trailing log lines to fetch, always within `MIN..=MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TailLines(i64);

impl TailLines {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 1000;
    pub const DEFAULT: i64 = 100;

    /// Validate a caller-supplied count. Out-of-range values are rejected, not clamped.
    pub fn new(lines: i64) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&lines) {
            Ok(Self(lines))
        } else {
            Err(KubeLensError::InvalidArgument(format!(
                "tailLines must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                lines
            )))
        }
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl Default for TailLines {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// Tail of a container's log.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodLogResult {
    pub cluster_id: String,
    pub pod_name: String,
    pub namespace: String,
    /// `None` when the cluster picked the container itself.
    pub container: Option<String>,
    pub tail_lines: TailLines,
    pub logs: String,
    pub retrieved_at: DateTime<Utc>,
}

/// Returned instead of logs when the pod's container cannot be chosen automatically.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerAmbiguity {
    pub cluster_id: String,
    pub pod_name: String,
    pub namespace: String,
    pub requires_container_selection: bool,
    pub containers: Vec<String>,
    pub message: String,
    pub suggestion: String,
}

impl ContainerAmbiguity {
    pub fn new(cluster_id: &str, pod_name: &str, namespace: &str, containers: Vec<String>) -> Self {
        Self {
            cluster_id: cluster_id.to_string(),
            pod_name: pod_name.to_string(),
            namespace: namespace.to_string(),
            requires_container_selection: true,
            message: format!(
                "Pod '{}' has {} containers and none is clearly the primary one",
                pod_name,
                containers.len()
            ),
            suggestion: format!(
                "Call get_pod_logs again with containerName set to one of: {}",
                containers.join(", ")
            ),
            containers,
        }
    }
}

/// Outcome of a log request. Ambiguity is a normal answer, not an error.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LogOutcome {
    Logs(PodLogResult),
    Ambiguous(ContainerAmbiguity),
}
