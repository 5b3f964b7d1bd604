//! Data model for work items, relations, commits, and files.
//!
//! Everything here is constructed fresh per call from backend responses and
//! discarded at the end of the call; the core owns no persistent store.
//! Relation targets arrive as URN-like strings; the parse helpers return
//! `Option` so callers can skip unparsable references without treating them
//! as errors.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Relation attribute marking a parent-to-child hierarchy edge.
pub const HIERARCHY_FORWARD_REL: &str = "System.LinkTypes.Hierarchy-Forward";

/// Relation attribute marking an artifact link (commit or pull request).
pub const ARTIFACT_LINK_REL: &str = "ArtifactLink";

/// URN prefix of a direct commit artifact link.
const COMMIT_URN_PREFIX: &str = "vstfs:///Git/Commit/";

/// URN prefix of a pull-request artifact link.
const PULL_REQUEST_URN_PREFIX: &str = "vstfs:///Git/PullRequestId/";

/// Full content hash: exactly 40 hex characters.
static COMMIT_HASH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new("^[0-9a-fA-F]{40}$").expect("static pattern is valid")
});

/// Reserved work-item field keys the core knows about. All other fields are
/// opaque and passed through untouched.
pub mod fields {
    pub const TITLE: &str = "System.Title";
    pub const STATE: &str = "System.State";
    pub const WORK_ITEM_TYPE: &str = "System.WorkItemType";
    pub const CREATED_DATE: &str = "System.CreatedDate";
    pub const CHANGED_DATE: &str = "System.ChangedDate";
    pub const AREA_PATH: &str = "System.AreaPath";
    pub const ITERATION_PATH: &str = "System.IterationPath";
    pub const TAGS: &str = "System.Tags";
}

/// The kind of a typed edge out of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Parent-to-child hierarchy edge
    HierarchyChild,
    /// Direct commit artifact link
    CommitArtifact,
    /// Pull-request artifact link
    PullRequestArtifact,
    /// Anything else; ignored by traversal and aggregation
    Other,
}

impl RelationKind {
    /// Classify a backend relation from its `rel` attribute and target URL.
    ///
    /// Artifact links share one `rel` value; the URN substring tells the two
    /// kinds apart.
    pub fn classify(rel: &str, url: &str) -> Self {
        if rel == HIERARCHY_FORWARD_REL {
            Self::HierarchyChild
        } else if rel == ARTIFACT_LINK_REL && url.contains("Git/Commit") {
            Self::CommitArtifact
        } else if rel == ARTIFACT_LINK_REL && url.contains("Git/PullRequestId") {
            Self::PullRequestArtifact
        } else {
            Self::Other
        }
    }
}

/// A typed edge from a work item to another entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub kind: RelationKind,
    /// Opaque target reference as returned by the backend.
    pub url: String,
}

/// A `(repository, commit)` pair parsed from a commit artifact URN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitArtifact {
    pub repository: String,
    /// Canonical lowercase hex.
    pub commit_id: String,
}

/// A `(repository, pull request)` pair parsed from a PR artifact URN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestArtifact {
    pub repository: String,
    pub pull_request_id: u64,
}

impl Relation {
    /// Build a relation from the backend's raw `rel` attribute and URL.
    pub fn new(rel: &str, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            kind: RelationKind::classify(rel, &url),
            url,
        }
    }

    /// Parse the trailing integer id from a hierarchy-child reference.
    ///
    /// References that do not end in an integer yield `None`; traversal
    /// skips them silently.
    pub fn child_work_item_id(&self) -> Option<u64> {
        self.url
            .trim_end_matches('/')
            .rsplit('/')
            .next()?
            .parse()
            .ok()
    }

    /// Parse `(repository, commit hash)` out of a commit artifact URN of the
    /// form `vstfs:///Git/Commit/{project}%2F{repository}%2F{hash}`.
    ///
    /// The hash must be exactly 40 hex characters; anything else is not a
    /// commit reference.
    pub fn commit_artifact(&self) -> Option<CommitArtifact> {
        let (repository, commit_id) = split_artifact_urn(&self.url, COMMIT_URN_PREFIX)?;
        if !COMMIT_HASH_PATTERN.is_match(&commit_id) {
            return None;
        }
        Some(CommitArtifact {
            repository,
            commit_id: commit_id.to_ascii_lowercase(),
        })
    }

    /// Parse `(repository, pull request id)` out of a PR artifact URN of the
    /// form `vstfs:///Git/PullRequestId/{project}%2F{repository}%2F{id}`.
    pub fn pull_request_artifact(&self) -> Option<PullRequestArtifact> {
        let (repository, id) = split_artifact_urn(&self.url, PULL_REQUEST_URN_PREFIX)?;
        Some(PullRequestArtifact {
            repository,
            pull_request_id: id.parse().ok()?,
        })
    }
}

/// Split a `{prefix}{project}%2F{repository}%2F{tail}` URN into
/// `(repository, tail)`. The project segment is carried by the URN but the
/// backend scopes commit lookups by repository alone.
fn split_artifact_urn(url: &str, prefix: &str) -> Option<(String, String)> {
    let rest = url.strip_prefix(prefix)?;
    let decoded = urlencoding::decode(rest).ok()?;
    let mut parts = decoded.split('/');
    let _project = parts.next()?;
    let repository = parts.next()?;
    let tail = parts.next()?;
    if repository.is_empty() || tail.is_empty() || parts.next().is_some() {
        return None;
    }
    Some((repository.to_string(), tail.to_string()))
}

/// A work item: identity, category (work-item type), an opaque field
/// mapping, and its typed relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: u64,
    /// Work-item type, e.g. "Task" or "Bug". Matched case-insensitively
    /// against the block-set.
    pub category: String,
    /// Field-name to value mapping; opaque to the core except for the
    /// reserved keys in [`fields`].
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl WorkItem {
    /// Convenience accessor for the reserved title field.
    pub fn title(&self) -> Option<&str> {
        self.fields.get(fields::TITLE).and_then(Value::as_str)
    }
}

/// A single commit reachable from a work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Content hash, canonical lowercase hex. Dedup key within one
    /// aggregation result.
    pub commit_id: String,
    pub author: String,
    pub author_email: String,
    pub date: DateTime<Utc>,
    pub message: String,
    /// Repository the commit was fetched from.
    pub repository: String,
    pub url: Option<String>,
}

/// A pull request, reduced to what the file guard and aggregator need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub title: String,
    pub status: String,
    /// Source branch as a full ref, e.g. `refs/heads/topic`.
    pub source_ref: Option<String>,
    pub target_ref: Option<String>,
}

/// File metadata as reported by the backend before content is fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub path: String,
    /// Declared size in bytes; absent when the backend does not report one.
    pub size: Option<u64>,
}

/// Materialized file content plus its resolved size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileContent {
    pub path: String,
    pub content: String,
    pub size: u64,
}

/// A work item positioned in a hierarchy tree.
///
/// `depth` is 0 at the root and equals the number of hierarchy-child edges
/// traversed from the root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyNode {
    pub item: WorkItem,
    pub depth: u32,
    pub children: Vec<HierarchyNode>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn classify_hierarchy_forward() {
        let kind = RelationKind::classify(
            HIERARCHY_FORWARD_REL,
            "https://dev.example.com/org/_apis/wit/workItems/42",
        );
        assert_eq!(kind, RelationKind::HierarchyChild);
    }

    #[test]
    fn classify_artifact_links_by_urn_substring() {
        let commit = RelationKind::classify(
            ARTIFACT_LINK_REL,
            "vstfs:///Git/Commit/proj%2Frepo%2Faaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
        );
        assert_eq!(commit, RelationKind::CommitArtifact);

        let pr = RelationKind::classify(ARTIFACT_LINK_REL, "vstfs:///Git/PullRequestId/proj%2Frepo%2F17");
        assert_eq!(pr, RelationKind::PullRequestArtifact);

        let other = RelationKind::classify("AttachedFile", "vstfs:///Git/Commit/x");
        assert_eq!(other, RelationKind::Other);
    }

    #[test]
    fn child_id_is_trailing_integer() {
        let rel = Relation::new(
            HIERARCHY_FORWARD_REL,
            "https://dev.example.com/org/_apis/wit/workItems/105",
        );
        assert_eq!(rel.child_work_item_id(), Some(105));

        let bad = Relation::new(HIERARCHY_FORWARD_REL, "https://dev.example.com/not-an-id");
        assert_eq!(bad.child_work_item_id(), None);
    }

    #[test]
    fn commit_artifact_requires_40_hex_hash() {
        let sha = "A1B2C3D4E5F6A1B2C3D4E5F6A1B2C3D4E5F6A1B2";
        let rel = Relation::new(ARTIFACT_LINK_REL, format!("vstfs:///Git/Commit/proj%2Frepo%2F{sha}"));
        let artifact = rel.commit_artifact().map(|a| (a.repository, a.commit_id));
        assert_eq!(
            artifact,
            Some(("repo".to_string(), sha.to_ascii_lowercase()))
        );

        let short = Relation::new(ARTIFACT_LINK_REL, "vstfs:///Git/Commit/proj%2Frepo%2Fabc123");
        assert_eq!(short.commit_artifact(), None);
    }

    #[test]
    fn pull_request_artifact_parses_id() {
        let rel = Relation::new(
            ARTIFACT_LINK_REL,
            "vstfs:///Git/PullRequestId/proj%2Frepo%2F321",
        );
        let artifact = rel.pull_request_artifact();
        assert_eq!(
            artifact,
            Some(PullRequestArtifact {
                repository: "repo".to_string(),
                pull_request_id: 321,
            })
        );

        let bad = Relation::new(
            ARTIFACT_LINK_REL,
            "vstfs:///Git/PullRequestId/proj%2Frepo%2Fnot-a-number",
        );
        assert_eq!(bad.pull_request_artifact(), None);
    }

    #[test]
    fn malformed_urn_is_skipped_not_an_error() {
        let missing_parts = Relation::new(ARTIFACT_LINK_REL, "vstfs:///Git/Commit/only-one-part");
        assert_eq!(missing_parts.commit_artifact(), None);
    }
}
