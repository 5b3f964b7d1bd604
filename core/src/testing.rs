//! In-memory backend double for tests.
//!
//! Keeps fixtures in plain maps and counts calls per method so tests can
//! assert not only on results but on which fetches were (or were not)
//! issued, e.g. the file guard's no-content-fetch precondition.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;

use crate::backend::BackendClient;
use crate::error::{Result, WorkboardError};
use crate::models::{CommitRecord, FileMetadata, PullRequest, Relation, WorkItem};

/// Per-method call counters.
#[derive(Debug, Default)]
pub struct CallCounts {
    pub work_items: AtomicUsize,
    pub commits: AtomicUsize,
    pub pull_request_commits: AtomicUsize,
    pub pull_requests: AtomicUsize,
    pub file_metadata: AtomicUsize,
    pub file_content: AtomicUsize,
}

/// Fixture-backed [`BackendClient`] implementation.
#[derive(Default)]
pub struct MockBackend {
    work_items: HashMap<u64, WorkItem>,
    commits: HashMap<String, CommitRecord>,
    pull_requests: HashMap<u64, PullRequest>,
    pull_request_commits: HashMap<u64, Vec<CommitRecord>>,
    /// Files keyed by `(path, branch)`; lookups miss on the wrong branch.
    files: HashMap<(String, String), (Option<u64>, String)>,
    /// Work item ids whose fetch fails with a backend error.
    failing_work_items: HashSet<u64>,
    /// Commit ids whose fetch fails with a backend error.
    failing_commits: HashSet<String>,
    pub calls: CallCounts,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_work_item(mut self, item: WorkItem) -> Self {
        self.work_items.insert(item.id, item);
        self
    }

    pub fn with_commit(mut self, commit: CommitRecord) -> Self {
        self.commits.insert(commit.commit_id.clone(), commit);
        self
    }

    pub fn with_pull_request(mut self, pr: PullRequest) -> Self {
        self.pull_requests.insert(pr.id, pr);
        self
    }

    pub fn with_pull_request_commits(mut self, id: u64, commits: Vec<CommitRecord>) -> Self {
        self.pull_request_commits.insert(id, commits);
        self
    }

    /// Register a file on the `main` branch.
    pub fn with_file(self, path: &str, size: Option<u64>, content: &str) -> Self {
        self.with_file_at(path, "main", size, content)
    }

    /// Register a file on a specific branch.
    pub fn with_file_at(
        mut self,
        path: &str,
        branch: &str,
        size: Option<u64>,
        content: &str,
    ) -> Self {
        self.files.insert(
            (path.to_string(), branch.to_string()),
            (size, content.to_string()),
        );
        self
    }

    /// Make `fetch_work_item(id)` fail with a backend error.
    pub fn failing_work_item(mut self, id: u64) -> Self {
        self.failing_work_items.insert(id);
        self
    }

    /// Make `fetch_commit` for this id fail with a backend error.
    pub fn failing_commit(mut self, commit_id: &str) -> Self {
        self.failing_commits.insert(commit_id.to_string());
        self
    }
}

#[async_trait]
impl BackendClient for MockBackend {
    async fn fetch_work_item(&self, id: u64) -> Result<WorkItem> {
        self.calls.work_items.fetch_add(1, Ordering::SeqCst);
        if self.failing_work_items.contains(&id) {
            return Err(WorkboardError::backend(format!(
                "injected failure for work item {id}"
            )));
        }
        self.work_items
            .get(&id)
            .cloned()
            .ok_or_else(|| WorkboardError::not_found(format!("work item {id}")))
    }

    async fn fetch_commit(&self, _repository: &str, commit_id: &str) -> Result<CommitRecord> {
        self.calls.commits.fetch_add(1, Ordering::SeqCst);
        if self.failing_commits.contains(commit_id) {
            return Err(WorkboardError::backend(format!(
                "injected failure for commit {commit_id}"
            )));
        }
        self.commits
            .get(commit_id)
            .cloned()
            .ok_or_else(|| WorkboardError::not_found(format!("commit {commit_id}")))
    }

    async fn fetch_pull_request_commits(
        &self,
        _repository: &str,
        pull_request_id: u64,
    ) -> Result<Vec<CommitRecord>> {
        self.calls.pull_request_commits.fetch_add(1, Ordering::SeqCst);
        self.pull_request_commits
            .get(&pull_request_id)
            .cloned()
            .ok_or_else(|| WorkboardError::not_found(format!("pull request {pull_request_id}")))
    }

    async fn fetch_pull_request(
        &self,
        _repository: &str,
        pull_request_id: u64,
    ) -> Result<PullRequest> {
        self.calls.pull_requests.fetch_add(1, Ordering::SeqCst);
        self.pull_requests
            .get(&pull_request_id)
            .cloned()
            .ok_or_else(|| WorkboardError::not_found(format!("pull request {pull_request_id}")))
    }

    async fn fetch_file_metadata(
        &self,
        _repository: &str,
        path: &str,
        branch: &str,
    ) -> Result<FileMetadata> {
        self.calls.file_metadata.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(&(path.to_string(), branch.to_string()))
            .map(|(size, _)| FileMetadata {
                path: path.to_string(),
                size: *size,
            })
            .ok_or_else(|| WorkboardError::not_found(format!("file {path} at {branch}")))
    }

    async fn fetch_file_content(
        &self,
        _repository: &str,
        path: &str,
        branch: &str,
    ) -> Result<String> {
        self.calls.file_content.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(&(path.to_string(), branch.to_string()))
            .map(|(_, content)| content.clone())
            .ok_or_else(|| WorkboardError::not_found(format!("file {path} at {branch}")))
    }
}

/// Build a work item with a title field and the given relations.
pub fn work_item(id: u64, category: &str, relations: Vec<Relation>) -> WorkItem {
    let mut fields = serde_json::Map::new();
    fields.insert(
        crate::models::fields::TITLE.to_string(),
        json!(format!("Item {id}")),
    );
    fields.insert(crate::models::fields::STATE.to_string(), json!("Active"));
    WorkItem {
        id,
        category: category.to_string(),
        fields,
        relations,
    }
}

/// Build a hierarchy-child relation pointing at a work item id.
pub fn child_relation(child_id: u64) -> Relation {
    Relation::new(
        crate::models::HIERARCHY_FORWARD_REL,
        format!("https://dev.example.com/org/_apis/wit/workItems/{child_id}"),
    )
}

/// Build a commit artifact relation for `repo` and `sha`.
pub fn commit_relation(repo: &str, sha: &str) -> Relation {
    Relation::new(
        crate::models::ARTIFACT_LINK_REL,
        format!("vstfs:///Git/Commit/proj%2F{repo}%2F{sha}"),
    )
}

/// Build a pull-request artifact relation.
pub fn pull_request_relation(repo: &str, pr_id: u64) -> Relation {
    Relation::new(
        crate::models::ARTIFACT_LINK_REL,
        format!("vstfs:///Git/PullRequestId/proj%2F{repo}%2F{pr_id}"),
    )
}

/// Build a commit record with a fixed-width hash derived from `n`.
pub fn commit(n: u8, date: chrono::DateTime<chrono::Utc>) -> CommitRecord {
    CommitRecord {
        commit_id: commit_sha(n),
        author: format!("Author {n}"),
        author_email: format!("author{n}@example.com"),
        date,
        message: format!("commit {n}"),
        repository: "repo".to_string(),
        url: None,
    }
}

/// A deterministic 40-hex hash for test fixtures.
pub fn commit_sha(n: u8) -> String {
    format!("{n:02x}").repeat(20)
}
