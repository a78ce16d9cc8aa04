// MCP (Model Context Protocol) server exposing read-only Kubernetes introspection tools

pub mod codec;
pub mod config;
pub mod protocol;
pub mod server;
pub mod tools;

pub use config::{KubelensConfig, ServerSection};
pub use server::McpServer;
