// Typed tool invocations parsed from tools/call params

use kubelens_core::TailLines;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::catalog::ToolKind;

/// Why a tools/call could not be turned into a [`ToolCall`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolCallError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("{0}")]
    InvalidParams(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterArgs {
    pub cluster_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterArgs {
    pub cluster_id: String,
    pub resource_group: String,
    #[serde(default)]
    pub subscription_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespacedArgs {
    pub cluster_id: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodArgs {
    pub cluster_id: String,
    pub pod_name: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPodLogArgs {
    #[serde(flatten)]
    pod: PodArgs,
    #[serde(default)]
    container_name: Option<String>,
    #[serde(default)]
    tail_lines: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodLogArgs {
    pub pod: PodArgs,
    pub container_name: Option<String>,
    pub tail_lines: TailLines,
}

/// A validated tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    ConnectLocalContext(ClusterArgs),
    ConnectManagedCluster(ManagedClusterArgs),
    GetPods(NamespacedArgs),
    GetPodDetails(PodArgs),
    GetPodLogs(PodLogArgs),
    DescribePod(PodArgs),
    GetDeployments(NamespacedArgs),
    GetServices(NamespacedArgs),
    GetNamespaces(ClusterArgs),
    GetConfigMaps(NamespacedArgs),
    GetSecrets(NamespacedArgs),
    GetIngress(NamespacedArgs),
    GetPersistentVolumes(ClusterArgs),
    GetCronJobs(NamespacedArgs),
    GetJobs(NamespacedArgs),
    ListConnectedClusters,
}

impl ToolCall {
    /// Parse and validate a call. Nothing here touches a cluster.
    pub fn parse(name: &str, arguments: Option<Value>) -> Result<Self, ToolCallError> {
        let kind =
            ToolKind::from_name(name).ok_or_else(|| ToolCallError::UnknownTool(name.to_string()))?;

        let arguments = match arguments {
            Some(Value::Object(map)) => Value::Object(map),
            Some(_) => {
                return Err(ToolCallError::InvalidParams(format!(
                    "Arguments for {} must be an object",
                    name
                )))
            }
            None => {
                return Err(ToolCallError::InvalidParams(format!(
                    "Missing arguments for {}",
                    name
                )))
            }
        };

        let call = match kind {
            ToolKind::ConnectLocalContext => Self::ConnectLocalContext(args(kind, arguments)?),
            ToolKind::ConnectManagedCluster => Self::ConnectManagedCluster(args(kind, arguments)?),
            ToolKind::GetPods => Self::GetPods(args(kind, arguments)?),
            ToolKind::GetPodDetails => Self::GetPodDetails(args(kind, arguments)?),
            ToolKind::GetPodLogs => {
                let raw: RawPodLogArgs = args(kind, arguments)?;
                let tail_lines = match raw.tail_lines {
                    Some(lines) => TailLines::new(lines)
                        .map_err(|e| ToolCallError::InvalidParams(e.to_string()))?,
                    None => TailLines::default(),
                };
                Self::GetPodLogs(PodLogArgs {
                    pod: raw.pod,
                    container_name: raw.container_name.filter(|c| !c.is_empty()),
                    tail_lines,
                })
            }
            ToolKind::DescribePod => Self::DescribePod(args(kind, arguments)?),
            ToolKind::GetDeployments => Self::GetDeployments(args(kind, arguments)?),
            ToolKind::GetServices => Self::GetServices(args(kind, arguments)?),
            ToolKind::GetNamespaces => Self::GetNamespaces(args(kind, arguments)?),
            ToolKind::GetConfigMaps => Self::GetConfigMaps(args(kind, arguments)?),
            ToolKind::GetSecrets => Self::GetSecrets(args(kind, arguments)?),
            ToolKind::GetIngress => Self::GetIngress(args(kind, arguments)?),
            ToolKind::GetPersistentVolumes => Self::GetPersistentVolumes(args(kind, arguments)?),
            ToolKind::GetCronJobs => Self::GetCronJobs(args(kind, arguments)?),
            ToolKind::GetJobs => Self::GetJobs(args(kind, arguments)?),
            ToolKind::ListConnectedClusters => Self::ListConnectedClusters,
        };

        call.check_required()?;
        Ok(call)
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            Self::ConnectLocalContext(_) => ToolKind::ConnectLocalContext,
            Self::ConnectManagedCluster(_) => ToolKind::ConnectManagedCluster,
            Self::GetPods(_) => ToolKind::GetPods,
            Self::GetPodDetails(_) => ToolKind::GetPodDetails,
            Self::GetPodLogs(_) => ToolKind::GetPodLogs,
            Self::DescribePod(_) => ToolKind::DescribePod,
            Self::GetDeployments(_) => ToolKind::GetDeployments,
            Self::GetServices(_) => ToolKind::GetServices,
            Self::GetNamespaces(_) => ToolKind::GetNamespaces,
            Self::GetConfigMaps(_) => ToolKind::GetConfigMaps,
            Self::GetSecrets(_) => ToolKind::GetSecrets,
            Self::GetIngress(_) => ToolKind::GetIngress,
            Self::GetPersistentVolumes(_) => ToolKind::GetPersistentVolumes,
            Self::GetCronJobs(_) => ToolKind::GetCronJobs,
            Self::GetJobs(_) => ToolKind::GetJobs,
            Self::ListConnectedClusters => ToolKind::ListConnectedClusters,
        }
    }

    /// Required string fields must be present and non-empty.
    fn check_required(&self) -> Result<(), ToolCallError> {
        let fields: Vec<(&str, &str)> = match self {
            Self::ConnectLocalContext(a) | Self::GetNamespaces(a) | Self::GetPersistentVolumes(a) => {
                vec![("clusterId", a.cluster_id.as_str())]
            }
            Self::ConnectManagedCluster(a) => vec![
                ("clusterId", a.cluster_id.as_str()),
                ("resourceGroup", a.resource_group.as_str()),
            ],
            Self::GetPods(a)
            | Self::GetDeployments(a)
            | Self::GetServices(a)
            | Self::GetConfigMaps(a)
            | Self::GetSecrets(a)
            | Self::GetIngress(a)
            | Self::GetCronJobs(a)
            | Self::GetJobs(a) => vec![("clusterId", a.cluster_id.as_str())],
            Self::GetPodDetails(a) | Self::DescribePod(a) => {
                vec![("clusterId", a.cluster_id.as_str()), ("podName", a.pod_name.as_str())]
            }
            Self::GetPodLogs(a) => vec![
                ("clusterId", a.pod.cluster_id.as_str()),
                ("podName", a.pod.pod_name.as_str()),
            ],
            Self::ListConnectedClusters => Vec::new(),
        };

        match fields.into_iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(ToolCallError::InvalidParams(format!(
                "{} requires a non-empty {}",
                self.kind().name(),
                field
            ))),
            None => Ok(()),
        }
    }
}

fn args<T: DeserializeOwned>(kind: ToolKind, arguments: Value) -> Result<T, ToolCallError> {
    serde_json::from_value(arguments).map_err(|e| {
        ToolCallError::InvalidParams(format!("Invalid arguments for {}: {}", kind.name(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_tool() {
        let err = ToolCall::parse("delete_pod", Some(json!({"clusterId": "dev"}))).unwrap_err();
        assert_eq!(err, ToolCallError::UnknownTool("delete_pod".into()));
        assert_eq!(err.to_string(), "Unknown tool: delete_pod");
    }

    #[test]
    fn test_unknown_tool_wins_over_missing_arguments() {
        let err = ToolCall::parse("delete_pod", None).unwrap_err();
        assert_eq!(err, ToolCallError::UnknownTool("delete_pod".into()));
    }

    #[test]
    fn test_missing_arguments() {
        let err = ToolCall::parse("get_pods", None).unwrap_err();
        assert!(matches!(err, ToolCallError::InvalidParams(_)));

        let err = ToolCall::parse("get_pods", Some(json!("dev"))).unwrap_err();
        assert!(matches!(err, ToolCallError::InvalidParams(_)));
    }

    #[test]
    fn test_missing_required_field() {
        let err = ToolCall::parse("get_pod_details", Some(json!({"clusterId": "dev"}))).unwrap_err();
        assert!(err.to_string().contains("podName"));
    }

    #[test]
    fn test_empty_required_field() {
        let err = ToolCall::parse("get_pods", Some(json!({"clusterId": "  "}))).unwrap_err();
        assert_eq!(
            err,
            ToolCallError::InvalidParams("get_pods requires a non-empty clusterId".into())
        );
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let call = ToolCall::parse(
            "get_pods",
            Some(json!({"clusterId": "dev", "namespace": "shop", "verbose": true})),
        )
        .unwrap();
        assert_eq!(
            call,
            ToolCall::GetPods(NamespacedArgs {
                cluster_id: "dev".into(),
                namespace: Some("shop".into()),
            })
        );
    }

    #[test]
    fn test_log_args_default_tail() {
        let call = ToolCall::parse("get_pod_logs", Some(json!({"clusterId": "dev", "podName": "web-0"})))
            .unwrap();
        match call {
            ToolCall::GetPodLogs(args) => {
                assert_eq!(args.tail_lines, TailLines::default());
                assert_eq!(args.container_name, None);
            }
            other => panic!("unexpected call: {:?}", other),
        }
    }

    #[test]
    fn test_log_args_tail_bounds() {
        for lines in [0, 5000] {
            let err = ToolCall::parse(
                "get_pod_logs",
                Some(json!({"clusterId": "dev", "podName": "web-0", "tailLines": lines})),
            )
            .unwrap_err();
            assert!(matches!(err, ToolCallError::InvalidParams(_)));
        }

        let err = ToolCall::parse(
            "get_pod_logs",
            Some(json!({"clusterId": "dev", "podName": "web-0", "tailLines": "lots"})),
        )
        .unwrap_err();
        assert!(matches!(err, ToolCallError::InvalidParams(_)));
    }

    #[test]
    fn test_managed_cluster_args() {
        let call = ToolCall::parse(
            "connect_managed_cluster",
            Some(json!({"clusterId": "aks-prod", "resourceGroup": "rg-prod", "subscriptionId": "sub-1"})),
        )
        .unwrap();
        assert_eq!(call.kind(), ToolKind::ConnectManagedCluster);
        assert_eq!(
            call,
            ToolCall::ConnectManagedCluster(ManagedClusterArgs {
                cluster_id: "aks-prod".into(),
                resource_group: "rg-prod".into(),
                subscription_id: Some("sub-1".into()),
            })
        );
    }

    #[test]
    fn test_list_connected_clusters_takes_no_fields() {
        assert_eq!(
            ToolCall::parse("list_connected_clusters", Some(json!({}))).unwrap(),
            ToolCall::ListConnectedClusters
        );
    }
}
