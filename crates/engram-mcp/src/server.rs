//! MCP Server
//!
//! Routes JSON-RPC requests to the tool handlers.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::protocol::messages::{
    CallToolRequest, CallToolResult, InitializeRequest, InitializeResult, ListToolsResult,
    ServerCapabilities, ServerInfo, ToolDescription,
};
use crate::protocol::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_VERSION};
use crate::tools;
use engram_core::MemoryEngine;

/// MCP server over a memory engine
pub struct McpServer {
    engine: Arc<MemoryEngine>,
    initialized: bool,
}

impl McpServer {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        Self {
            engine,
            initialized: false,
        }
    }

    /// Handle one JSON-RPC request; notifications return `None`
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("handling request: {}", request.method);

        if !self.initialized
            && request.method != "initialize"
            && request.method != "notifications/initialized"
        {
            warn!("rejecting '{}': server not initialized", request.method);
            return Some(JsonRpcResponse::error(
                request.id,
                JsonRpcError::server_not_initialized(),
            ));
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params),
            "notifications/initialized" => return None,
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(request.params).await,
            "ping" => Ok(serde_json::json!({})),
            method => {
                warn!("unknown method: {}", method);
                Err(JsonRpcError::method_not_found())
            }
        };

        Some(match result {
            Ok(result) => JsonRpcResponse::success(request.id, result),
            Err(error) => JsonRpcResponse::error(request.id, error),
        })
    }

    fn handle_initialize(
        &mut self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, JsonRpcError> {
        let request: InitializeRequest = match params {
            Some(p) => serde_json::from_value(p)
                .map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => InitializeRequest::default(),
        };

        // Use the client's protocol version when it is older than ours
        let negotiated = if request.protocol_version.as_str() < MCP_VERSION {
            request.protocol_version.clone()
        } else {
            MCP_VERSION.to_string()
        };

        self.initialized = true;
        info!("session initialized with protocol version {}", negotiated);

        let result = InitializeResult {
            protocol_version: negotiated,
            server_info: ServerInfo {
                name: "engram".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some({
                    let mut map = HashMap::new();
                    map.insert("listChanged".to_string(), serde_json::json!(false));
                    map
                }),
            },
            instructions: Some(
                "Engram is a persistent memory service. Save observations with save_memory; \
                 factual knowledge is indexed semantically, significant experiences become \
                 permanent, routine ones stay in a short recency cache. Retrieve with \
                 search_intelligent (keyword + vector), search_graph (adds related memories \
                 through typed relationships), or search_concepts."
                    .to_string(),
            ),
        };

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    fn handle_tools_list(&self) -> Result<serde_json::Value, JsonRpcError> {
        let tools = vec![
            ToolDescription {
                name: "save_memory".to_string(),
                description: Some(
                    "Ingest a memory record. The pipeline classifies it, judges significance, \
                     and reports where it was stored (permanent, vector, graph, recency)."
                        .to_string(),
                ),
                input_schema: tools::save::schema(),
            },
            ToolDescription {
                name: "search_intelligent".to_string(),
                description: Some(
                    "Hybrid search: concurrent keyword and vector branches, merged and reranked."
                        .to_string(),
                ),
                input_schema: tools::search::schema(),
            },
            ToolDescription {
                name: "search_graph".to_string(),
                description: Some(
                    "Graph-augmented search: expands the seed results through typed \
                     relationships up to maxDepth hops."
                        .to_string(),
                ),
                input_schema: tools::graph::schema(),
            },
            ToolDescription {
                name: "search_concepts".to_string(),
                description: Some(
                    "Similarity search over analyzer concepts, ordered by similarity."
                        .to_string(),
                ),
                input_schema: tools::concepts::schema(),
            },
            ToolDescription {
                name: "recall_category".to_string(),
                description: Some(
                    "Newest permanent records of one category.".to_string(),
                ),
                input_schema: tools::recall::schema(),
            },
            ToolDescription {
                name: "recent_memories".to_string(),
                description: Some(
                    "Newest permanent records plus the current recency cache.".to_string(),
                ),
                input_schema: tools::recent::schema(),
            },
            ToolDescription {
                name: "memory_stats".to_string(),
                description: Some(
                    "Record counts per category, graph metrics, recency usage.".to_string(),
                ),
                input_schema: tools::stats::schema(),
            },
            ToolDescription {
                name: "batch_analyze".to_string(),
                description: Some(
                    "Queue stored records for background re-analysis; poll with job_status."
                        .to_string(),
                ),
                input_schema: tools::jobs::batch_schema(),
            },
            ToolDescription {
                name: "job_status".to_string(),
                description: Some(
                    "Progress and results of a batch_analyze job.".to_string(),
                ),
                input_schema: tools::jobs::status_schema(),
            },
        ];

        serde_json::to_value(ListToolsResult { tools })
            .map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    async fn handle_tools_call(
        &self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, JsonRpcError> {
        let request: CallToolRequest = match params {
            Some(p) => serde_json::from_value(p)
                .map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => return Err(JsonRpcError::invalid_params("missing params")),
        };

        let outcome = match request.name.as_str() {
            "save_memory" => tools::save::execute(&self.engine, request.arguments).await,
            "search_intelligent" => tools::search::execute(&self.engine, request.arguments).await,
            "search_graph" => tools::graph::execute(&self.engine, request.arguments).await,
            "search_concepts" => tools::concepts::execute(&self.engine, request.arguments).await,
            "recall_category" => tools::recall::execute(&self.engine, request.arguments).await,
            "recent_memories" => tools::recent::execute(&self.engine, request.arguments).await,
            "memory_stats" => tools::stats::execute(&self.engine, request.arguments).await,
            "batch_analyze" => tools::jobs::execute_batch(&self.engine, request.arguments).await,
            "job_status" => tools::jobs::execute_status(&self.engine, request.arguments).await,
            name => {
                return Err(JsonRpcError::invalid_params(&format!(
                    "unknown tool: {name}"
                )))
            }
        };

        let result = match outcome {
            Ok(payload) => CallToolResult::success(&payload),
            Err(message) => CallToolResult::failure(&message),
        };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
