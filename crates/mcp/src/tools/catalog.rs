// The fixed tool catalog advertised by tools/list

use kubelens_core::TailLines;
use serde_json::{json, Value};

use super::schema::{json_schema_integer, json_schema_object, json_schema_string};
use crate::protocol::ToolSchema;

/// Every tool the server offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ConnectLocalContext,
    ConnectManagedCluster,
    GetPods,
    GetPodDetails,
    GetPodLogs,
    DescribePod,
    GetDeployments,
    GetServices,
    GetNamespaces,
    GetConfigMaps,
    GetSecrets,
    GetIngress,
    GetPersistentVolumes,
    GetCronJobs,
    GetJobs,
    ListConnectedClusters,
}

impl ToolKind {
    pub const ALL: [ToolKind; 16] = [
        ToolKind::ConnectLocalContext,
        ToolKind::ConnectManagedCluster,
        ToolKind::GetPods,
        ToolKind::GetPodDetails,
        ToolKind::GetPodLogs,
        ToolKind::DescribePod,
        ToolKind::GetDeployments,
        ToolKind::GetServices,
        ToolKind::GetNamespaces,
        ToolKind::GetConfigMaps,
        ToolKind::GetSecrets,
        ToolKind::GetIngress,
        ToolKind::GetPersistentVolumes,
        ToolKind::GetCronJobs,
        ToolKind::GetJobs,
        ToolKind::ListConnectedClusters,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ConnectLocalContext => "connect_local_context",
            Self::ConnectManagedCluster => "connect_managed_cluster",
            Self::GetPods => "get_pods",
            Self::GetPodDetails => "get_pod_details",
            Self::GetPodLogs => "get_pod_logs",
            Self::DescribePod => "describe_pod",
            Self::GetDeployments => "get_deployments",
            Self::GetServices => "get_services",
            Self::GetNamespaces => "get_namespaces",
            Self::GetConfigMaps => "get_configmaps",
            Self::GetSecrets => "get_secrets",
            Self::GetIngress => "get_ingress",
            Self::GetPersistentVolumes => "get_persistent_volumes",
            Self::GetCronJobs => "get_cronjobs",
            Self::GetJobs => "get_jobs",
            Self::ListConnectedClusters => "list_connected_clusters",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::ConnectLocalContext => {
                "Connect to a cluster using the local kubeconfig context and register it under clusterId"
            }
            Self::ConnectManagedCluster => {
                "Connect to an AKS cluster named clusterId by fetching credentials with the Azure CLI"
            }
            Self::GetPods => "List pods with status, readiness and restart counts",
            Self::GetPodDetails => {
                "Get detailed status of a pod by name. The namespace is optional; all namespaces are searched if needed"
            }
            Self::GetPodLogs => {
                "Get the last lines of a pod's logs. The container is chosen automatically unless containerName is given"
            }
            Self::DescribePod => {
                "Describe a pod in depth: spec, containers, ports, environment, volumes and owners"
            }
            Self::GetDeployments => "List deployments with replica counts and images",
            Self::GetServices => "List services with type, cluster IP and ports",
            Self::GetNamespaces => "List namespaces in the cluster",
            Self::GetConfigMaps => "List config maps with their key names (values are not returned)",
            Self::GetSecrets => "List secrets with their type and key names. Secret values are never returned",
            Self::GetIngress => "List ingresses with hosts, paths and backends",
            Self::GetPersistentVolumes => "List persistent volumes with capacity, status and bound claims",
            Self::GetCronJobs => "List cron jobs with schedule and last run",
            Self::GetJobs => "List jobs with completion status",
            Self::ListConnectedClusters => "List the ids of all connected clusters",
        }
    }

    pub fn input_schema(self) -> Value {
        let cluster_id = json_schema_string("Identifier of a connected cluster");
        let namespace = json_schema_string("Namespace to restrict the query to (all namespaces if omitted)");
        let pod_name = json_schema_string("Exact pod name");
        let pod_namespace = json_schema_string("Namespace of the pod, if known");

        match self {
            Self::ConnectLocalContext => json_schema_object(
                json!({"clusterId": json_schema_string("Identifier to register the cluster under")}),
                &["clusterId"],
            ),
            Self::ConnectManagedCluster => json_schema_object(
                json!({
                    "clusterId": json_schema_string("AKS cluster name, also used as the cluster identifier"),
                    "resourceGroup": json_schema_string("Azure resource group of the cluster"),
                    "subscriptionId": json_schema_string("Azure subscription (defaults to the CLI's active one)")
                }),
                &["clusterId", "resourceGroup"],
            ),
            Self::GetPodDetails | Self::DescribePod => json_schema_object(
                json!({
                    "clusterId": cluster_id,
                    "podName": pod_name,
                    "namespace": pod_namespace
                }),
                &["clusterId", "podName"],
            ),
            Self::GetPodLogs => json_schema_object(
                json!({
                    "clusterId": cluster_id,
                    "podName": pod_name,
                    "namespace": pod_namespace,
                    "containerName": json_schema_string("Container to read (chosen automatically if omitted)"),
                    "tailLines": json_schema_integer(
                        "Number of most recent lines to return",
                        TailLines::MIN,
                        TailLines::MAX,
                        TailLines::DEFAULT
                    )
                }),
                &["clusterId", "podName"],
            ),
            Self::GetNamespaces | Self::GetPersistentVolumes => {
                json_schema_object(json!({"clusterId": cluster_id}), &["clusterId"])
            }
            Self::ListConnectedClusters => json_schema_object(json!({}), &[]),
            Self::GetPods
            | Self::GetDeployments
            | Self::GetServices
            | Self::GetConfigMaps
            | Self::GetSecrets
            | Self::GetIngress
            | Self::GetCronJobs
            | Self::GetJobs => json_schema_object(
                json!({"clusterId": cluster_id, "namespace": namespace}),
                &["clusterId"],
            ),
        }
    }

    pub fn schema(self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Schemas for tools/list, in catalog order.
pub fn catalog() -> Vec<ToolSchema> {
    ToolKind::ALL.into_iter().map(ToolKind::schema).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_has_every_tool_once() {
        let tools = catalog();
        assert_eq!(tools.len(), 16);
        let names: HashSet<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.len(), 16);
    }

    #[test]
    fn test_names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("delete_pod"), None);
    }

    #[test]
    fn test_log_schema_bounds() {
        let schema = ToolKind::GetPodLogs.input_schema();
        let tail = &schema["properties"]["tailLines"];
        assert_eq!(tail["type"], "integer");
        assert_eq!(tail["minimum"], 1);
        assert_eq!(tail["maximum"], 1000);
        assert_eq!(tail["default"], 100);
        assert_eq!(schema["required"], json!(["clusterId", "podName"]));
    }

    #[test]
    fn test_managed_cluster_schema() {
        let schema = ToolKind::ConnectManagedCluster.input_schema();
        assert_eq!(schema["required"], json!(["clusterId", "resourceGroup"]));
        assert!(schema["properties"]["subscriptionId"].is_object());
    }
}
