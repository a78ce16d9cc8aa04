pub mod call;
pub mod catalog;
mod schema;

pub use call::{
    ClusterArgs, ManagedClusterArgs, NamespacedArgs, PodArgs, PodLogArgs, ToolCall, ToolCallError,
};
pub use catalog::{catalog, ToolKind};
pub use schema::{json_schema_integer, json_schema_object, json_schema_string};
