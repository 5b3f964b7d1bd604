//! File guard: size-ceiling-enforced file reads.
//!
//! Metadata is fetched before content; a file whose declared size exceeds
//! the ceiling fails with `FileTooLarge` and no content fetch is issued.
//! The check is a precondition, not a post-hoc truncation.

use tracing::debug;

use crate::backend::BackendClient;
use crate::error::{Result, WorkboardError};
use crate::models::FileContent;
use crate::resolver::resolve_repository;

/// Ref-namespace prefix stripped from pull-request source branches.
const REF_HEADS_PREFIX: &str = "refs/heads/";

/// Fetches file content subject to a byte-size ceiling.
pub struct FileGuard<'a> {
    backend: &'a dyn BackendClient,
    /// Project used to scope bare repository names.
    project: &'a str,
    /// Maximum declared file size, in bytes.
    max_file_bytes: u64,
}

impl<'a> FileGuard<'a> {
    pub fn new(backend: &'a dyn BackendClient, project: &'a str, max_file_bytes: u64) -> Self {
        Self {
            backend,
            project,
            max_file_bytes,
        }
    }

    /// Fetch a file's content at a branch, enforcing the size ceiling
    /// against the declared metadata size before any content is read.
    ///
    /// The reported size falls back to the content length when the backend
    /// did not declare one.
    pub async fn file_content(
        &self,
        repository_id: &str,
        file_path: &str,
        branch: &str,
    ) -> Result<FileContent> {
        let repository = resolve_repository(repository_id, self.project);
        let path = normalize_path(file_path);

        let metadata = self
            .backend
            .fetch_file_metadata(&repository, &path, branch)
            .await?;
        if let Some(size) = metadata.size
            && size > self.max_file_bytes
        {
            return Err(WorkboardError::FileTooLarge {
                path,
                size,
                limit: self.max_file_bytes,
            });
        }

        debug!(%repository, %path, branch, "fetching file content");
        let content = self
            .backend
            .fetch_file_content(&repository, &path, branch)
            .await?;
        let size = metadata.size.unwrap_or(content.len() as u64);
        Ok(FileContent {
            path,
            content,
            size,
        })
    }

    /// Fetch a file's content from a pull request's source branch.
    ///
    /// Resolves the PR, strips the `refs/heads/` prefix from its source
    /// ref, and delegates to [`Self::file_content`]. A PR with no
    /// resolvable source branch fails with `NotFound`.
    pub async fn file_from_pull_request(
        &self,
        repository_id: &str,
        pull_request_id: u64,
        file_path: &str,
    ) -> Result<FileContent> {
        let repository = resolve_repository(repository_id, self.project);
        let pr = self
            .backend
            .fetch_pull_request(&repository, pull_request_id)
            .await?;

        let source = pr
            .source_ref
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                WorkboardError::not_found(format!(
                    "pull request {pull_request_id} has no source branch"
                ))
            })?;
        let branch = source.strip_prefix(REF_HEADS_PREFIX).unwrap_or(source);

        self.file_content(repository_id, file_path, branch).await
    }
}

/// Normalize a file path to a leading-separator form.
fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
