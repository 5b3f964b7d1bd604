//! Policy-gated traversal and aggregation engine over a read-only
//! work-tracking and source-control backend.
//!
//! ## Architecture
//!
//! - [`policy::PolicyGate`] decides allow/block per record before any of
//!   its fields are observable; every fetch used by traversal goes through
//!   it.
//! - [`resolver`] normalizes bare / scoped / GUID repository references.
//! - [`backend::BackendClient`] is the seam to the backend; the REST
//!   implementation lives in `workboard-backend-client`.
//! - [`hierarchy::HierarchyWalker`] walks parent/child edges to a bounded
//!   depth with per-branch failure isolation.
//! - [`commits::CommitAggregator`] merges commits reachable via direct and
//!   pull-request artifact links, concurrently scanned.
//! - [`files::FileGuard`] enforces the byte-size ceiling before any file
//!   content is materialized.
//!
//! The core owns no persistent state; everything is constructed fresh per
//! call from backend responses. The only shared configuration is the
//! gate's block-set, write-once at construction.

pub mod backend;
pub mod commits;
pub mod error;
pub mod files;
pub mod hierarchy;
pub mod models;
pub mod policy;
pub mod resolver;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use backend::BackendClient;
pub use commits::CommitAggregator;
pub use error::{ErrorCategory, Result, WorkboardError};
pub use files::FileGuard;
pub use hierarchy::HierarchyWalker;
pub use models::{
    CommitRecord, FileContent, FileMetadata, HierarchyNode, PullRequest, Relation, RelationKind,
    WorkItem,
};
pub use policy::PolicyGate;
pub use resolver::{RepoRef, resolve_repository};
