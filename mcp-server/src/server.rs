//! Stdio JSON-RPC loop.
//!
//! Reads newline-delimited JSON-RPC 2.0 messages from stdin, dispatches
//! them, and writes responses to stdout. Logging goes to stderr; stdout
//! carries only the protocol. Requests without an id are notifications
//! and get no response.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use crate::tools::{ToolContext, ToolError, catalogue};

/// MCP protocol revision this server speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const ERR_PARSE: i64 = -32700;
pub const ERR_METHOD_NOT_FOUND: i64 = -32601;
pub const ERR_INVALID_PARAMS: i64 = -32602;
pub const ERR_INTERNAL: i64 = -32603;

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

fn ok(id: Value, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: Some(result),
        error: None,
    }
}

fn err(id: Value, code: i64, message: String) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(RpcError { code, message }),
    }
}

/// Serve the MCP protocol over stdin/stdout until EOF.
pub async fn serve(ctx: Arc<ToolContext>) -> std::io::Result<()> {
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut writer = tokio::io::stdout();
    let mut line = String::new();

    info!("workboard MCP server ready on stdio");
    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            break; // EOF: client went away
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(response) = dispatch_message(&ctx, trimmed).await {
            // An unserializable response must not put garbage on the wire;
            // drop it and let the client time the request out.
            match serde_json::to_vec(&response) {
                Ok(mut bytes) => {
                    bytes.push(b'\n');
                    writer.write_all(&bytes).await?;
                    writer.flush().await?;
                }
                Err(e) => error!(error = %e, "dropping unserializable response"),
            }
        }
    }
    info!("stdin closed, shutting down");
    Ok(())
}

/// Parse and dispatch one message. `None` means no response is due
/// (notification).
async fn dispatch_message(ctx: &ToolContext, raw: &str) -> Option<Value> {
    let request: JsonRpcRequest = match serde_json::from_str(raw) {
        Ok(req) => req,
        Err(e) => {
            let response = err(Value::Null, ERR_PARSE, format!("invalid JSON-RPC: {e}"));
            return serde_json::to_value(response).ok();
        }
    };

    debug!(method = %request.method, "request");
    let id = request.id?; // notifications carry no id and get no response
    let response = dispatch_method(ctx, &request.method, request.params, id).await;
    serde_json::to_value(response).ok()
}

async fn dispatch_method(
    ctx: &ToolContext,
    method: &str,
    params: Option<Value>,
    id: Value,
) -> JsonRpcResponse {
    match method {
        "initialize" => ok(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {}},
                "serverInfo": {
                    "name": "workboard-mcp-server",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        ),
        "ping" => ok(id, json!({})),
        "tools/list" => ok(id, json!({"tools": catalogue()})),
        "tools/call" => {
            let params = params.unwrap_or(Value::Null);
            let name = params
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if name.is_empty() {
                return err(id, ERR_INVALID_PARAMS, "missing tool name".to_string());
            }
            let args = params.get("arguments").cloned().unwrap_or(json!({}));
            match ctx.call(&name, args).await {
                Ok(result) => ok(id, result),
                Err(ToolError::UnknownTool(name)) => {
                    err(id, ERR_METHOD_NOT_FOUND, format!("unknown tool: {name}"))
                }
                Err(ToolError::InvalidParams(message)) => {
                    err(id, ERR_INVALID_PARAMS, format!("invalid arguments: {message}"))
                }
            }
        }
        other => err(id, ERR_METHOD_NOT_FOUND, format!("unknown method: {other}")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::config::ServerConfig;
    use workboard_core::testing::{MockBackend, work_item};

    fn context() -> ToolContext {
        let backend = MockBackend::new().with_work_item(work_item(1, "Task", vec![]));
        let config = ServerConfig {
            org_url: "https://dev.example.com/org".to_string(),
            project: "Proj".to_string(),
            token: "token".to_string(),
            blocked_types: vec![],
            max_file_bytes: 1024,
            max_depth_ceiling: 5,
        };
        ToolContext::new(Arc::new(backend), &config)
    }

    #[tokio::test]
    async fn initialize_reports_tool_capability() {
        let ctx = context();
        let response = dispatch_message(
            &ctx,
            &json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}).to_string(),
        )
        .await
        .expect("response");
        assert_eq!(response["result"]["protocolVersion"], json!(PROTOCOL_VERSION));
        assert!(response["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn tools_list_returns_catalogue() {
        let ctx = context();
        let response = dispatch_message(
            &ctx,
            &json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}).to_string(),
        )
        .await
        .expect("response");
        assert_eq!(response["result"]["tools"].as_array().expect("tools").len(), 6);
    }

    #[tokio::test]
    async fn tools_call_round_trips() {
        let ctx = context();
        let request = json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {"name": "get_work_item", "arguments": {"id": 1}}
        });
        let response = dispatch_message(&ctx, &request.to_string())
            .await
            .expect("response");
        assert_eq!(response["result"]["isError"], json!(false));
    }

    #[tokio::test]
    async fn notification_gets_no_response() {
        let ctx = context();
        let note = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        assert!(dispatch_message(&ctx, &note.to_string()).await.is_none());
    }

    #[tokio::test]
    async fn unknown_method_is_rejected() {
        let ctx = context();
        let response = dispatch_message(
            &ctx,
            &json!({"jsonrpc": "2.0", "id": 4, "method": "resources/list"}).to_string(),
        )
        .await
        .expect("response");
        assert_eq!(response["error"]["code"], json!(ERR_METHOD_NOT_FOUND));
    }

    #[tokio::test]
    async fn malformed_json_is_a_parse_error() {
        let ctx = context();
        let response = dispatch_message(&ctx, "{not json").await.expect("response");
        assert_eq!(response["error"]["code"], json!(ERR_PARSE));
    }
}
