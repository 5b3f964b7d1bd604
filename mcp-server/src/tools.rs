//! Tool catalogue and dispatch.
//!
//! Six read-only tools, one per core entry point. Core failures surface
//! in-band as tool results with `isError: true` and a `CODE: message`
//! text; only protocol-level problems (unknown tool, bad params) become
//! JSON-RPC errors.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use workboard_core::{
    BackendClient, CommitAggregator, FileGuard, HierarchyWalker, PolicyGate, WorkboardError,
};

use crate::config::ServerConfig;

/// Protocol-level dispatch failures; everything else is in-band.
#[derive(Debug, PartialEq, Eq)]
pub enum ToolError {
    UnknownTool(String),
    InvalidParams(String),
}

/// Shared state behind every tool call: the backend client, the policy
/// gate (block-set captured once at startup), and the read-side limits.
pub struct ToolContext {
    backend: Arc<dyn BackendClient>,
    gate: PolicyGate,
    project: String,
    max_file_bytes: u64,
    max_depth_ceiling: u32,
}

impl ToolContext {
    pub fn new(backend: Arc<dyn BackendClient>, config: &ServerConfig) -> Self {
        Self {
            backend,
            gate: PolicyGate::new(&config.blocked_types),
            project: config.project.clone(),
            max_file_bytes: config.max_file_bytes,
            max_depth_ceiling: config.max_depth_ceiling,
        }
    }

    /// Dispatch a `tools/call` by name. Returns the MCP tool result object.
    pub async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let outcome = match name {
            "get_work_item" => {
                let params: WorkItemParams = parse(args)?;
                self.get_work_item(params).await
            }
            "get_child_work_items" => {
                let params: ChildrenParams = parse(args)?;
                self.get_child_work_items(params).await
            }
            "get_work_item_tree" => {
                let params: TreeParams = parse(args)?;
                self.get_work_item_tree(params).await
            }
            "get_all_commits" => {
                let params: WorkItemParams = parse(args)?;
                self.get_all_commits(params).await
            }
            "get_file_content" => {
                let params: FileParams = parse(args)?;
                self.get_file_content(params).await
            }
            "get_file_from_pull_request" => {
                let params: PrFileParams = parse(args)?;
                self.get_file_from_pull_request(params).await
            }
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };

        Ok(render(name, outcome))
    }

    async fn get_work_item(&self, params: WorkItemParams) -> Result<Value, WorkboardError> {
        let item = self
            .gate
            .fetch_validated(self.backend.as_ref(), params.id)
            .await?;
        to_json(&item)
    }

    async fn get_child_work_items(&self, params: ChildrenParams) -> Result<Value, WorkboardError> {
        let walker = HierarchyWalker::new(self.backend.as_ref(), &self.gate);
        let children = walker
            .walk_children(params.id, self.clamp_depth(params.max_depth))
            .await?;
        to_json(&children)
    }

    async fn get_work_item_tree(&self, params: TreeParams) -> Result<Value, WorkboardError> {
        let walker = HierarchyWalker::new(self.backend.as_ref(), &self.gate);
        let tree = walker
            .build_tree(params.id, self.clamp_depth(params.max_depth))
            .await?;
        to_json(&tree)
    }

    async fn get_all_commits(&self, params: WorkItemParams) -> Result<Value, WorkboardError> {
        let aggregator = CommitAggregator::new(self.backend.as_ref(), &self.gate);
        let commits = aggregator.all_commits(params.id).await?;
        to_json(&commits)
    }

    async fn get_file_content(&self, params: FileParams) -> Result<Value, WorkboardError> {
        let guard = FileGuard::new(self.backend.as_ref(), &self.project, self.max_file_bytes);
        let file = guard
            .file_content(&params.repository, &params.path, &params.branch)
            .await?;
        to_json(&file)
    }

    async fn get_file_from_pull_request(
        &self,
        params: PrFileParams,
    ) -> Result<Value, WorkboardError> {
        let guard = FileGuard::new(self.backend.as_ref(), &self.project, self.max_file_bytes);
        let file = guard
            .file_from_pull_request(&params.repository, params.pull_request_id, &params.path)
            .await?;
        to_json(&file)
    }

    fn clamp_depth(&self, requested: u32) -> u32 {
        requested.min(self.max_depth_ceiling)
    }
}

fn parse<T: for<'de> Deserialize<'de>>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, WorkboardError> {
    serde_json::to_value(value)
        .map_err(|e| WorkboardError::backend_with_source("serializing tool result", e))
}

/// Render a core outcome as an MCP tool result. Failures carry the error
/// category code and message, never raw backend detail or blocked fields.
fn render(tool: &str, outcome: Result<Value, WorkboardError>) -> Value {
    match outcome {
        Ok(payload) => {
            let text =
                serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
            json!({
                "content": [{"type": "text", "text": text}],
                "isError": false,
            })
        }
        Err(err) => {
            warn!(tool, code = err.category().as_str(), error = %err, "tool call failed");
            json!({
                "content": [{
                    "type": "text",
                    "text": format!("{}: {err}", err.category().as_str()),
                }],
                "isError": true,
            })
        }
    }
}

#[derive(Debug, Deserialize)]
struct WorkItemParams {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct ChildrenParams {
    id: u64,
    #[serde(default = "default_children_depth")]
    max_depth: u32,
}

fn default_children_depth() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct TreeParams {
    id: u64,
    #[serde(default = "default_tree_depth")]
    max_depth: u32,
}

fn default_tree_depth() -> u32 {
    3
}

#[derive(Debug, Deserialize)]
struct FileParams {
    repository: String,
    path: String,
    #[serde(default = "default_branch")]
    branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

#[derive(Debug, Deserialize)]
struct PrFileParams {
    repository: String,
    pull_request_id: u64,
    path: String,
}

/// Machine-readable tool descriptors for `tools/list`.
pub fn catalogue() -> Vec<Value> {
    vec![
        json!({
            "name": "get_work_item",
            "description": "Fetch a single work item by id, subject to the policy gate.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "id": {"type": "integer", "description": "Work item id"}
                },
                "required": ["id"]
            }
        }),
        json!({
            "name": "get_child_work_items",
            "description": "Flat list of descendant work items, depth-first, bounded by max_depth.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "id": {"type": "integer", "description": "Parent work item id"},
                    "max_depth": {"type": "integer", "description": "Levels to descend (default 1)"}
                },
                "required": ["id"]
            }
        }),
        json!({
            "name": "get_work_item_tree",
            "description": "Hierarchy tree rooted at a work item, bounded by max_depth.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "id": {"type": "integer", "description": "Root work item id"},
                    "max_depth": {"type": "integer", "description": "Levels to descend (default 3)"}
                },
                "required": ["id"]
            }
        }),
        json!({
            "name": "get_all_commits",
            "description": "All commits linked to a work item, directly or through pull requests, deduplicated and newest first.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "id": {"type": "integer", "description": "Work item id"}
                },
                "required": ["id"]
            }
        }),
        json!({
            "name": "get_file_content",
            "description": "Read a file from a repository at a branch, subject to the size ceiling.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "repository": {"type": "string", "description": "Repository name, project/name path, or GUID"},
                    "path": {"type": "string", "description": "File path within the repository"},
                    "branch": {"type": "string", "description": "Branch name (default main)"}
                },
                "required": ["repository", "path"]
            }
        }),
        json!({
            "name": "get_file_from_pull_request",
            "description": "Read a file from a pull request's source branch.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "repository": {"type": "string", "description": "Repository name, project/name path, or GUID"},
                    "pull_request_id": {"type": "integer", "description": "Pull request id"},
                    "path": {"type": "string", "description": "File path within the repository"}
                },
                "required": ["repository", "pull_request_id", "path"]
            }
        }),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use workboard_core::testing::{MockBackend, child_relation, work_item};

    fn config() -> ServerConfig {
        ServerConfig {
            org_url: "https://dev.example.com/org".to_string(),
            project: "Proj".to_string(),
            token: "token".to_string(),
            blocked_types: vec!["Secret".to_string()],
            max_file_bytes: 1024,
            max_depth_ceiling: 3,
        }
    }

    fn context(backend: MockBackend) -> ToolContext {
        ToolContext::new(Arc::new(backend), &config())
    }

    #[tokio::test]
    async fn get_work_item_returns_item_payload() {
        let ctx = context(MockBackend::new().with_work_item(work_item(5, "Task", vec![])));
        let result = ctx
            .call("get_work_item", json!({"id": 5}))
            .await
            .expect("call");
        assert_eq!(result["isError"], json!(false));
        let text = result["content"][0]["text"].as_str().expect("text");
        let payload: Value = serde_json::from_str(text).expect("payload json");
        assert_eq!(payload["id"], json!(5));
    }

    #[tokio::test]
    async fn blocked_item_renders_in_band_error_without_fields() {
        let ctx = context(MockBackend::new().with_work_item(work_item(5, "Secret", vec![])));
        let result = ctx
            .call("get_work_item", json!({"id": 5}))
            .await
            .expect("call");
        assert_eq!(result["isError"], json!(true));
        let text = result["content"][0]["text"].as_str().expect("text");
        assert!(text.starts_with("POLICY_BLOCKED:"));
        assert!(!text.contains("Item 5"), "blocked title must not leak");
    }

    #[tokio::test]
    async fn depth_is_clamped_to_the_ceiling() {
        // Chain 1 -> 2 -> 3 -> 4 -> 5; ceiling is 3, request asks for 10.
        let backend = MockBackend::new()
            .with_work_item(work_item(1, "Epic", vec![child_relation(2)]))
            .with_work_item(work_item(2, "Feature", vec![child_relation(3)]))
            .with_work_item(work_item(3, "Task", vec![child_relation(4)]))
            .with_work_item(work_item(4, "Task", vec![child_relation(5)]))
            .with_work_item(work_item(5, "Task", vec![]));
        let ctx = context(backend);
        let result = ctx
            .call("get_child_work_items", json!({"id": 1, "max_depth": 10}))
            .await
            .expect("call");
        let text = result["content"][0]["text"].as_str().expect("text");
        let payload: Value = serde_json::from_str(text).expect("payload json");
        let ids: Vec<u64> = payload
            .as_array()
            .expect("array")
            .iter()
            .map(|i| i["id"].as_u64().expect("id"))
            .collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn unknown_tool_is_a_protocol_error() {
        let ctx = context(MockBackend::new());
        let err = ctx
            .call("drop_database", json!({}))
            .await
            .expect_err("unknown");
        assert_eq!(err, ToolError::UnknownTool("drop_database".to_string()));
    }

    #[tokio::test]
    async fn missing_required_param_is_invalid_params() {
        let ctx = context(MockBackend::new());
        let err = ctx.call("get_work_item", json!({})).await.expect_err("bad");
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }

    #[test]
    fn catalogue_lists_all_six_tools() {
        let tools = catalogue();
        let names: Vec<&str> = tools
            .iter()
            .map(|t| t["name"].as_str().expect("name"))
            .collect();
        assert_eq!(
            names,
            vec![
                "get_work_item",
                "get_child_work_items",
                "get_work_item_tree",
                "get_all_commits",
                "get_file_content",
                "get_file_from_pull_request",
            ]
        );
    }
}
