// MCP server: routes JSON-RPC requests to the session manager and query engine

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use kubelens_core::{
    ClusterConnector, ConnectStrategy, ConnectTarget, KubeLensError, QueryEngine, SessionManager,
};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, info, warn};

use crate::codec::{RequestCodec, RequestFrame};
use crate::config::ServerSection;
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, ResourcesCapability, ServerCapabilities, ServerInfo,
    ToolsCapability, PROTOCOL_VERSION,
};
use crate::tools::{catalog, ToolCall, ToolCallError};

/// Payload of the connect tools. A failed connect is still a successful call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResult {
    pub cluster_id: String,
    pub connected: bool,
    pub strategy: ConnectStrategy,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedClusters {
    pub clusters: Vec<String>,
    pub count: usize,
}

impl From<KubeLensError> for JsonRpcError {
    fn from(err: KubeLensError) -> Self {
        if err.is_invalid_argument() {
            JsonRpcError::invalid_params(err.to_string())
        } else {
            JsonRpcError::internal_error(err.to_string())
        }
    }
}

impl From<ToolCallError> for JsonRpcError {
    fn from(err: ToolCallError) -> Self {
        match err {
            ToolCallError::UnknownTool(_) => JsonRpcError::internal_error(err.to_string()),
            ToolCallError::InvalidParams(message) => JsonRpcError::invalid_params(message),
        }
    }
}

pub struct McpServer {
    info: ServerInfo,
    max_request_bytes: usize,
    sessions: Arc<SessionManager>,
    queries: QueryEngine,
}

impl McpServer {
    pub fn new(server: &ServerSection, connector: Arc<dyn ClusterConnector>) -> Self {
        let sessions = Arc::new(SessionManager::new(connector));
        Self {
            info: ServerInfo {
                name: server.name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: server.description.clone(),
            },
            max_request_bytes: server.max_request_bytes,
            queries: QueryEngine::new(sessions.clone()),
            sessions,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Handle one raw line from the transport.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                warn!(error = %e, "Failed to parse request");
                Some(JsonRpcResponse::error(None, JsonRpcError::parse_error(e)))
            }
        }
    }

    /// Handle an incoming JSON-RPC request. Notifications yield no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "Handling MCP request");

        if request.is_notification() {
            debug!(method = %request.method, "Received notification");
            return None;
        }

        let id = request.id;
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(format!(
                    "Unsupported JSON-RPC version: {}",
                    request.jsonrpc
                )),
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            "resources/list" => JsonRpcResponse::success(id, serde_json::json!({"resources": []})),
            method => {
                warn!(method = %method, "Unknown method");
                JsonRpcResponse::error(id, JsonRpcError::method_not_found(method))
            }
        };
        Some(response)
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
                resources: ResourcesCapability {
                    subscribe: false,
                    list_changed: false,
                },
            },
            server_info: self.info.clone(),
        };

        info!(server = %self.info.name, "MCP session initialized");
        respond(id, &result)
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        respond(id, &ListToolsResult { tools: catalog() })
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params.map(serde_json::from_value::<CallToolParams>) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params(format!("Invalid params: {}", e)),
                )
            }
            None => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("Missing params for tools/call"),
                )
            }
        };

        let start = std::time::Instant::now();
        let outcome = match ToolCall::parse(&params.name, params.arguments) {
            Ok(call) => self.call_tool(call).await,
            Err(e) => Err(e.into()),
        };

        match outcome.and_then(|payload| {
            CallToolResult::json(&payload).map_err(|e| JsonRpcError::internal_error(e.to_string()))
        }) {
            Ok(result) => {
                debug!(tool = %params.name, "Tool call completed in {:?}", start.elapsed());
                respond(id, &result)
            }
            Err(error) => {
                warn!(tool = %params.name, code = error.code, error = %error.message, "Tool call failed");
                JsonRpcResponse::error(id, error)
            }
        }
    }

    /// Execute a parsed tool call and return its JSON payload.
    pub async fn call_tool(&self, call: ToolCall) -> Result<Value, JsonRpcError> {
        let q = &self.queries;
        match call {
            ToolCall::ConnectLocalContext(a) => {
                payload(self.connect(&a.cluster_id, ConnectTarget::LocalContext).await)
            }
            ToolCall::ConnectManagedCluster(a) => {
                let target = ConnectTarget::ManagedCluster {
                    cluster_name: a.cluster_id.clone(),
                    resource_group: a.resource_group,
                    subscription_id: a.subscription_id,
                };
                payload(self.connect(&a.cluster_id, target).await)
            }
            ToolCall::ListConnectedClusters => {
                let clusters = self.sessions.list_connected().await;
                payload(ConnectedClusters {
                    count: clusters.len(),
                    clusters,
                })
            }
            ToolCall::GetPods(a) => payload(q.list_pods(&a.cluster_id, a.namespace.as_deref()).await?),
            ToolCall::GetPodDetails(a) => payload(
                q.pod_details(&a.cluster_id, &a.pod_name, a.namespace.as_deref())
                    .await?,
            ),
            ToolCall::GetPodLogs(a) => payload(
                q.pod_logs(
                    &a.pod.cluster_id,
                    &a.pod.pod_name,
                    a.pod.namespace.as_deref(),
                    a.container_name.as_deref(),
                    a.tail_lines,
                )
                .await?,
            ),
            ToolCall::DescribePod(a) => payload(
                q.describe_pod(&a.cluster_id, &a.pod_name, a.namespace.as_deref())
                    .await?,
            ),
            ToolCall::GetDeployments(a) => {
                payload(q.list_deployments(&a.cluster_id, a.namespace.as_deref()).await?)
            }
            ToolCall::GetServices(a) => {
                payload(q.list_services(&a.cluster_id, a.namespace.as_deref()).await?)
            }
            ToolCall::GetNamespaces(a) => payload(q.list_namespaces(&a.cluster_id).await?),
            ToolCall::GetConfigMaps(a) => {
                payload(q.list_config_maps(&a.cluster_id, a.namespace.as_deref()).await?)
            }
            ToolCall::GetSecrets(a) => {
                payload(q.list_secrets(&a.cluster_id, a.namespace.as_deref()).await?)
            }
            ToolCall::GetIngress(a) => {
                payload(q.list_ingresses(&a.cluster_id, a.namespace.as_deref()).await?)
            }
            ToolCall::GetPersistentVolumes(a) => {
                payload(q.list_persistent_volumes(&a.cluster_id).await?)
            }
            ToolCall::GetCronJobs(a) => {
                payload(q.list_cron_jobs(&a.cluster_id, a.namespace.as_deref()).await?)
            }
            ToolCall::GetJobs(a) => payload(q.list_jobs(&a.cluster_id, a.namespace.as_deref()).await?),
        }
    }

    async fn connect(&self, cluster_id: &str, target: ConnectTarget) -> ConnectResult {
        let strategy = target.strategy();
        let connected = self.sessions.connect(cluster_id, &target).await;
        let message = if connected {
            format!("Connected to cluster '{}' using {}", cluster_id, strategy)
        } else {
            format!(
                "Failed to connect to cluster '{}' using {}. See server logs for the cause",
                cluster_id, strategy
            )
        };

        ConnectResult {
            cluster_id: cluster_id.to_string(),
            connected,
            strategy,
            message,
        }
    }

    /// Serve newline-delimited JSON-RPC until `reader` reaches end of input.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut requests = FramedRead::new(reader, RequestCodec::new(self.max_request_bytes));
        let mut responses = FramedWrite::new(writer, LinesCodec::new());

        while let Some(frame) = requests.next().await {
            let response = match frame.context("Failed to read request line")? {
                RequestFrame::Line(line) if line.trim().is_empty() => continue,
                RequestFrame::Line(line) => self.handle_line(&line).await,
                RequestFrame::Malformed(reason) => {
                    warn!(reason = %reason, "Discarding undecodable request line");
                    Some(JsonRpcResponse::error(None, JsonRpcError::parse_error(reason)))
                }
            };

            if let Some(response) = response {
                let json = serde_json::to_string(&response).context("Failed to encode response")?;
                responses
                    .send(json)
                    .await
                    .context("Failed to write response")?;
            }
        }

        info!("Input closed, MCP server shutting down");
        Ok(())
    }

    /// Run the MCP server over stdio.
    pub async fn serve_stdio(&self) -> Result<()> {
        info!(server = %self.info.name, "MCP server listening on stdio");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }
}

fn payload<T: Serialize>(value: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value)
        .map_err(|e| JsonRpcError::internal_error(format!("Failed to serialize result: {}", e)))
}

fn respond<T: Serialize>(id: Option<Value>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
    }
}
