// Core of the Kubelens read-only cluster introspection server

pub mod api;
pub mod connector;
pub mod container;
pub mod error;
pub mod logs;
pub mod projection;
pub mod query;
pub mod session;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use api::{ClusterApi, KubeApi};
pub use connector::{ClusterConnector, ConnectStrategy, ConnectTarget, ConnectorConfig, KubeConnector};
pub use error::{ApiError, KubeLensError, Result};
pub use logs::{LogOutcome, TailLines};
pub use query::{DescribeOutcome, QueryEngine};
pub use session::{ClusterSession, SessionManager};
