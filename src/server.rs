use crate::error::{ErrorKind, VaultError};
use crate::tools::{all_tools, AppContext, Tool};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Serialize, Deserialize, Debug)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    pub id: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    fn failure(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
            id,
        }
    }
}

pub struct Registry {
    tools: HashMap<&'static str, Box<dyn Tool>>,
}

impl Registry {
    pub fn new(tools: Vec<Box<dyn Tool>>) -> Self {
        Self {
            tools: tools.into_iter().map(|t| (t.name(), t)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn list(&self) -> Vec<Value> {
        let mut names: Vec<_> = self.tools.keys().copied().collect();
        names.sort_unstable();
        names
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| {
                json!({
                    "name": t.name(),
                    "description": t.description(),
                    "inputSchema": t.schema()
                })
            })
            .collect()
    }
}

pub async fn run(ctx: AppContext) -> Result<()> {
    let registry = Registry::new(all_tools());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    info!(tools = registry.len(), "MCP Server Ready. Waiting for JSON-RPC requests on stdin...");

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        debug!("Received request: {}", line);

        let req: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                error!("Failed to parse JSON-RPC request: {}", e);
                continue;
            }
        };

        // Notifications carry no id and get no response.
        if req.id.is_none() {
            debug!(method = %req.method, "notification received");
            continue;
        }

        let response = handle_request(&req, &ctx, &registry).await;

        let mut response_str = serde_json::to_string(&response)?;
        response_str.push('\n');
        stdout.write_all(response_str.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}

/// JSON-RPC error code for a failed tool call.
pub fn error_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<VaultError>().map(VaultError::kind) {
        Some(ErrorKind::Input) => -32602,
        _ => -32603,
    }
}

pub async fn handle_request(
    req: &JsonRpcRequest,
    ctx: &AppContext,
    registry: &Registry,
) -> JsonRpcResponse {
    let id = req.id.clone();
    match req.method.as_str() {
        "initialize" => JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        ),
        "tools/list" => JsonRpcResponse::success(id, json!({ "tools": registry.list() })),
        "tools/call" => {
            let Some(params) = &req.params else {
                return JsonRpcResponse::failure(id, -32602, "Missing params".into());
            };
            let Some(tool_name) = params.get("name").and_then(|v| v.as_str()) else {
                return JsonRpcResponse::failure(id, -32602, "Missing 'name' parameter".into());
            };
            let Some(tool) = registry.get(tool_name) else {
                return JsonRpcResponse::failure(id, -32601, format!("Tool not found: {}", tool_name));
            };

            let args = params.get("arguments").cloned().unwrap_or(json!({}));
            match tool.call(ctx, args).await {
                // Standard MCP 'content' for compatibility, plus 'data' for agents.
                Ok(result) => JsonRpcResponse::success(
                    id,
                    json!({
                        "content": [{
                            "type": "text",
                            "text": serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string())
                        }],
                        "data": result
                    }),
                ),
                Err(e) => {
                    error!(tool = tool_name, "tool execution failed: {:#}", e);
                    JsonRpcResponse::failure(
                        id,
                        error_code(&e),
                        format!("Tool execution failed: {:#}", e),
                    )
                }
            }
        }
        _ => JsonRpcResponse::failure(id, -32601, "Method not found".into()),
    }
}
