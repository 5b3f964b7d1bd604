//! Stdio MCP server exposing policy-gated, read-only views over a
//! work-tracking and source-control backend.
//!
//! The heavy lifting (policy gate, hierarchy traversal, commit
//! aggregation, file guard) lives in `workboard-core`; this crate is the
//! plumbing around it: environment configuration, the tool catalogue, and
//! the newline-delimited JSON-RPC loop on stdin/stdout.

pub mod config;
pub mod server;
pub mod tools;

pub use config::{ConfigError, ServerConfig};
pub use server::{PROTOCOL_VERSION, serve};
pub use tools::{ToolContext, catalogue};
