//! Backend client seam.
//!
//! The core never talks HTTP directly; it consumes this trait and treats
//! every method as a single fallible call. The REST implementation lives in
//! `workboard-backend-client`; tests use [`crate::testing::MockBackend`].

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CommitRecord, FileMetadata, PullRequest, WorkItem};

/// Read-only access to the work-tracking and source-control backend.
///
/// Implementations map transport failures onto the core error taxonomy:
/// missing ids/paths become `NotFound`, rejected credentials become `Auth`,
/// anything else is wrapped as `Backend` with the message preserved.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Fetch a single work item with its relations expanded.
    async fn fetch_work_item(&self, id: u64) -> Result<WorkItem>;

    /// Fetch one commit by repository and full content hash.
    async fn fetch_commit(&self, repository: &str, commit_id: &str) -> Result<CommitRecord>;

    /// Fetch all commits belonging to a pull request.
    async fn fetch_pull_request_commits(
        &self,
        repository: &str,
        pull_request_id: u64,
    ) -> Result<Vec<CommitRecord>>;

    /// Fetch a pull request.
    async fn fetch_pull_request(
        &self,
        repository: &str,
        pull_request_id: u64,
    ) -> Result<PullRequest>;

    /// Fetch file metadata for a path at a branch, without content.
    async fn fetch_file_metadata(
        &self,
        repository: &str,
        path: &str,
        branch: &str,
    ) -> Result<FileMetadata>;

    /// Fetch file content as text for a path at a branch.
    async fn fetch_file_content(
        &self,
        repository: &str,
        path: &str,
        branch: &str,
    ) -> Result<String>;
}
