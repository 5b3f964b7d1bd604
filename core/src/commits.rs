//! Commit aggregation across two independent link kinds.
//!
//! A work item can reach commits two ways: direct commit artifact links and
//! pull-request artifact links (every commit belonging to the PR counts).
//! The two scans are independent reads and run concurrently; their results
//! are concatenated direct-first, deduplicated by commit id, and sorted by
//! date descending. Any single relation's failure is logged and dropped,
//! never aborting the aggregation.

use std::collections::HashSet;

use tracing::warn;

use crate::backend::BackendClient;
use crate::error::Result;
use crate::models::{CommitArtifact, CommitRecord, PullRequestArtifact, RelationKind, WorkItem};
use crate::policy::PolicyGate;

/// Aggregates and deduplicates commits reachable from one work item.
pub struct CommitAggregator<'a> {
    backend: &'a dyn BackendClient,
    gate: &'a PolicyGate,
}

impl<'a> CommitAggregator<'a> {
    pub fn new(backend: &'a dyn BackendClient, gate: &'a PolicyGate) -> Self {
        Self { backend, gate }
    }

    /// All commits reachable from `work_item_id`, deduplicated by commit id
    /// (first occurrence wins, direct links take precedence) and ordered by
    /// date descending. Ties keep relative discovery order.
    pub async fn all_commits(&self, work_item_id: u64) -> Result<Vec<CommitRecord>> {
        let item = self.gate.fetch_validated(self.backend, work_item_id).await?;
        let (direct_refs, pr_refs) = partition_artifacts(&item);

        // The two scans are independent reads; run them concurrently and
        // join both before deduplicating.
        let (direct, via_prs) = tokio::join!(
            self.fetch_direct(&direct_refs),
            self.fetch_via_pull_requests(&pr_refs),
        );

        let mut merged = direct;
        merged.extend(via_prs);

        let mut seen = HashSet::new();
        merged.retain(|c| seen.insert(c.commit_id.clone()));
        // Stable sort: equal dates keep discovery order.
        merged.sort_by_key(|c| std::cmp::Reverse(c.date));
        Ok(merged)
    }

    /// Fetch each directly linked commit; failures are dropped per relation.
    async fn fetch_direct(&self, artifacts: &[CommitArtifact]) -> Vec<CommitRecord> {
        let mut commits = Vec::new();
        for artifact in artifacts {
            match self
                .backend
                .fetch_commit(&artifact.repository, &artifact.commit_id)
                .await
            {
                Ok(commit) => commits.push(commit),
                Err(err) => warn!(
                    commit_id = %artifact.commit_id,
                    repository = %artifact.repository,
                    error = %err,
                    "skipping unfetchable linked commit"
                ),
            }
        }
        commits
    }

    /// Fetch and flatten the commits of each linked pull request; failures
    /// are dropped per relation.
    async fn fetch_via_pull_requests(&self, artifacts: &[PullRequestArtifact]) -> Vec<CommitRecord> {
        let mut commits = Vec::new();
        for artifact in artifacts {
            match self
                .backend
                .fetch_pull_request_commits(&artifact.repository, artifact.pull_request_id)
                .await
            {
                Ok(batch) => commits.extend(batch),
                Err(err) => warn!(
                    pull_request_id = artifact.pull_request_id,
                    repository = %artifact.repository,
                    error = %err,
                    "skipping unfetchable pull request commits"
                ),
            }
        }
        commits
    }
}

/// Partition a work item's relations into parsed commit and PR artifacts,
/// in relation order. Unparsable references are skipped silently.
fn partition_artifacts(item: &WorkItem) -> (Vec<CommitArtifact>, Vec<PullRequestArtifact>) {
    let mut direct = Vec::new();
    let mut prs = Vec::new();
    for relation in &item.relations {
        match relation.kind {
            RelationKind::CommitArtifact => {
                if let Some(artifact) = relation.commit_artifact() {
                    direct.push(artifact);
                }
            }
            RelationKind::PullRequestArtifact => {
                if let Some(artifact) = relation.pull_request_artifact() {
                    prs.push(artifact);
                }
            }
            RelationKind::HierarchyChild | RelationKind::Other => {}
        }
    }
    (direct, prs)
}
