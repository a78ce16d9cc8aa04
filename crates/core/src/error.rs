// Error types shared by the session, query and projection layers

/// Result type for cluster introspection operations.
pub type Result<T> = std::result::Result<T, KubeLensError>;

/// Substring the API server uses when a log request needs an explicit container.
const CONTAINER_REQUIRED_MARKER: &str = "container name must be specified";

/// Failures reported by a cluster API collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The pod has several containers and the cluster refused an unqualified log request.
    #[error("A container name must be specified: {0}")]
    ContainerRequired(String),

    /// Error surfaced by the kube client.
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Any other collaborator failure.
    #[error("{0}")]
    Request(String),
}

impl ApiError {
    /// Classify a kube error raised by a log request.
    pub fn from_log_error(err: kube::Error) -> Self {
        let message = err.to_string();
        if message.contains(CONTAINER_REQUIRED_MARKER) {
            Self::ContainerRequired(message)
        } else {
            Self::Kube(err)
        }
    }
}

/// Errors raised by the query engine and session manager.
#[derive(Debug, thiserror::Error)]
pub enum KubeLensError {
    /// No session is registered under the given cluster id.
    #[error("Cluster '{0}' is not connected. Call connect_local_context or connect_managed_cluster first")]
    ClusterNotConnected(String),

    /// Neither the namespace hint nor the cluster-wide scan found the pod.
    #[error("Pod '{name}' not found in cluster '{cluster_id}'")]
    PodNotFound { cluster_id: String, name: String },

    /// Caller-supplied argument failed validation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Failure from the cluster API collaborator.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl KubeLensError {
    /// Whether this error stems from caller input rather than cluster state.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_connected_message_names_cluster() {
        let err = KubeLensError::ClusterNotConnected("prod-east".into());
        assert!(err.to_string().contains("prod-east"));
        assert!(!err.is_invalid_argument());
    }

    #[test]
    fn test_pod_not_found_message() {
        let err = KubeLensError::PodNotFound {
            cluster_id: "dev".into(),
            name: "web-0".into(),
        };
        assert_eq!(err.to_string(), "Pod 'web-0' not found in cluster 'dev'");
    }

    #[test]
    fn test_api_error_is_transparent() {
        let err: KubeLensError = ApiError::Request("connection refused".into()).into();
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn test_invalid_argument_flag() {
        let err = KubeLensError::InvalidArgument("tailLines must be between 1 and 1000".into());
        assert!(err.is_invalid_argument());
    }
}
