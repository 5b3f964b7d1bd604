//! REST implementation of the core's `BackendClient` seam.
//!
//! Talks to an Azure-DevOps-style REST surface (`{org}/{project}/_apis`,
//! api-version 7.1). The personal access token is opaque to us: it is
//! base64-encoded into a basic-auth header at construction and handed to
//! every request. Status codes map onto the core taxonomy: 404 becomes
//! `NotFound`, 401/403 become `Auth`, and 203 is treated as `Auth` too
//! because the backend answers bad credentials with a login page instead
//! of a status error.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use workboard_core::error::{Result, WorkboardError};
use workboard_core::models::{
    CommitRecord, FileMetadata, PullRequest, Relation, WorkItem, fields,
};
use workboard_core::BackendClient;

/// REST API version sent with every request.
const API_VERSION: &str = "7.1";

/// Read-only REST client for the work-tracking backend.
pub struct RestBackend {
    client: reqwest::Client,
    /// Organization base URL without a trailing slash.
    base_url: String,
    /// Default project for repository references that carry no scope.
    project: String,
}

impl RestBackend {
    /// Build a client for `org_url` authenticating with a personal access
    /// token. The token is used as the password of an empty-username basic
    /// credential, which is how the backend expects PATs.
    pub fn new(
        org_url: impl Into<String>,
        project: impl Into<String>,
        token: &str,
    ) -> Result<Self> {
        let encoded = BASE64.encode(format!(":{token}"));
        let mut auth = HeaderValue::from_str(&format!("Basic {encoded}"))
            .map_err(|e| WorkboardError::auth(format!("token is not header-safe: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| WorkboardError::backend_with_source("building HTTP client", e))?;
        Ok(Self::with_client(client, org_url, project))
    }

    /// Build from an existing `reqwest` client. The client must already
    /// carry the authorization header; useful for tests.
    pub fn with_client(
        client: reqwest::Client,
        org_url: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        let base_url = org_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            project: project.into(),
        }
    }

    /// `{base}/{project}/_apis/git/repositories/{name}` with the repository
    /// reference split into scope and name. References without a scope
    /// (GUIDs) are looked up under the default project.
    fn repository_base(&self, repository: &str) -> String {
        let (project, name) = match repository.split_once('/') {
            Some((project, name)) => (project, name),
            None => (self.project.as_str(), repository),
        };
        format!(
            "{}/{}/_apis/git/repositories/{}",
            self.base_url,
            urlencoding::encode(project),
            urlencoding::encode(name)
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<T> {
        let response = self.send(url, query, what).await?;
        response
            .json()
            .await
            .map_err(|e| WorkboardError::backend_with_source(format!("decoding {what}"), e))
    }

    async fn send(
        &self,
        url: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<reqwest::Response> {
        debug!(url, what, "backend request");
        let response = self
            .client
            .get(url)
            .query(query)
            .query(&[("api-version", API_VERSION)])
            .send()
            .await
            .map_err(|e| WorkboardError::backend_with_source(format!("requesting {what}"), e))?;

        match response.status() {
            StatusCode::OK => Ok(response),
            StatusCode::NOT_FOUND => Err(WorkboardError::not_found(what.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(WorkboardError::auth(
                "credential rejected by backend".to_string(),
            )),
            // Bad PATs come back as a 203 with an HTML sign-in page.
            StatusCode::NON_AUTHORITATIVE_INFORMATION => Err(WorkboardError::auth(
                "backend answered with a sign-in challenge; check the access token".to_string(),
            )),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(WorkboardError::backend(format!(
                    "{what}: HTTP {status}: {}",
                    body.chars().take(200).collect::<String>()
                )))
            }
        }
    }
}

#[async_trait]
impl BackendClient for RestBackend {
    async fn fetch_work_item(&self, id: u64) -> Result<WorkItem> {
        let url = format!(
            "{}/{}/_apis/wit/workitems/{id}",
            self.base_url,
            urlencoding::encode(&self.project)
        );
        let wire: WireWorkItem = self
            .get_json(&url, &[("$expand", "relations")], &format!("work item {id}"))
            .await?;
        Ok(wire.into_work_item())
    }

    async fn fetch_commit(&self, repository: &str, commit_id: &str) -> Result<CommitRecord> {
        let url = format!("{}/commits/{commit_id}", self.repository_base(repository));
        let wire: WireCommit = self
            .get_json(&url, &[], &format!("commit {commit_id}"))
            .await?;
        Ok(wire.into_commit(repository))
    }

    async fn fetch_pull_request_commits(
        &self,
        repository: &str,
        pull_request_id: u64,
    ) -> Result<Vec<CommitRecord>> {
        let url = format!(
            "{}/pullRequests/{pull_request_id}/commits",
            self.repository_base(repository)
        );
        let wire: WireList<WireCommit> = self
            .get_json(
                &url,
                &[],
                &format!("commits of pull request {pull_request_id}"),
            )
            .await?;
        Ok(wire
            .value
            .into_iter()
            .map(|c| c.into_commit(repository))
            .collect())
    }

    async fn fetch_pull_request(
        &self,
        repository: &str,
        pull_request_id: u64,
    ) -> Result<PullRequest> {
        let url = format!(
            "{}/pullrequests/{pull_request_id}",
            self.repository_base(repository)
        );
        let wire: WirePullRequest = self
            .get_json(&url, &[], &format!("pull request {pull_request_id}"))
            .await?;
        Ok(wire.into_pull_request())
    }

    async fn fetch_file_metadata(
        &self,
        repository: &str,
        path: &str,
        branch: &str,
    ) -> Result<FileMetadata> {
        let url = format!("{}/items", self.repository_base(repository));
        let wire: WireItemMetadata = self
            .get_json(
                &url,
                &[
                    ("path", path),
                    ("versionDescriptor.version", branch),
                    ("$format", "json"),
                ],
                &format!("file {path} at {branch}"),
            )
            .await?;
        Ok(FileMetadata {
            path: wire.path.unwrap_or_else(|| path.to_string()),
            size: wire.size,
        })
    }

    async fn fetch_file_content(
        &self,
        repository: &str,
        path: &str,
        branch: &str,
    ) -> Result<String> {
        let url = format!("{}/items", self.repository_base(repository));
        let response = self
            .send(
                &url,
                &[
                    ("path", path),
                    ("versionDescriptor.version", branch),
                    ("includeContent", "true"),
                    ("$format", "text"),
                ],
                &format!("content of {path} at {branch}"),
            )
            .await?;
        response
            .text()
            .await
            .map_err(|e| WorkboardError::backend_with_source(format!("reading {path}"), e))
    }
}

// ─── Wire shapes ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WireWorkItem {
    id: u64,
    #[serde(default)]
    fields: Map<String, Value>,
    #[serde(default)]
    relations: Vec<WireRelation>,
}

#[derive(Debug, Deserialize)]
struct WireRelation {
    rel: String,
    url: String,
}

impl WireWorkItem {
    fn into_work_item(self) -> WorkItem {
        let category = self
            .fields
            .get(fields::WORK_ITEM_TYPE)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        WorkItem {
            id: self.id,
            category,
            fields: self.fields,
            relations: self
                .relations
                .into_iter()
                .map(|r| Relation::new(&r.rel, r.url))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCommit {
    commit_id: String,
    #[serde(default)]
    author: Option<WireSignature>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    remote_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireSignature {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    date: Option<DateTime<Utc>>,
}

impl WireCommit {
    fn into_commit(self, repository: &str) -> CommitRecord {
        let author = self.author.unwrap_or(WireSignature {
            name: None,
            email: None,
            date: None,
        });
        CommitRecord {
            commit_id: self.commit_id.to_ascii_lowercase(),
            author: author.name.unwrap_or_default(),
            author_email: author.email.unwrap_or_default(),
            date: author.date.unwrap_or(DateTime::UNIX_EPOCH),
            message: self.comment.unwrap_or_default(),
            repository: repository.to_string(),
            url: self.remote_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireList<T> {
    // A path default keeps the derive from requiring `T: Default`.
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePullRequest {
    pull_request_id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    source_ref_name: Option<String>,
    #[serde(default)]
    target_ref_name: Option<String>,
}

impl WirePullRequest {
    fn into_pull_request(self) -> PullRequest {
        PullRequest {
            id: self.pull_request_id,
            title: self.title.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            source_ref: self.source_ref_name,
            target_ref: self.target_ref_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireItemMetadata {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    size: Option<u64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use workboard_core::models::RelationKind;

    #[test]
    fn work_item_category_comes_from_reserved_field() {
        let wire: WireWorkItem = serde_json::from_value(json!({
            "id": 12,
            "fields": {
                "System.WorkItemType": "Bug",
                "System.Title": "Crash on save"
            },
            "relations": [
                {
                    "rel": "System.LinkTypes.Hierarchy-Forward",
                    "url": "https://dev.example.com/org/_apis/wit/workItems/13"
                }
            ]
        }))
        .expect("deserialize");
        let item = wire.into_work_item();
        assert_eq!(item.id, 12);
        assert_eq!(item.category, "Bug");
        assert_eq!(item.relations.len(), 1);
        assert_eq!(item.relations[0].kind, RelationKind::HierarchyChild);
    }

    #[test]
    fn commit_hash_is_normalized_to_lowercase() {
        let wire: WireCommit = serde_json::from_value(json!({
            "commitId": "A1B2C3D4E5F6A1B2C3D4E5F6A1B2C3D4E5F6A1B2",
            "author": {
                "name": "Dev",
                "email": "dev@example.com",
                "date": "2024-03-10T12:00:00Z"
            },
            "comment": "fix"
        }))
        .expect("deserialize");
        let commit = wire.into_commit("repo");
        assert_eq!(
            commit.commit_id,
            "a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e5f6a1b2"
        );
        assert_eq!(commit.repository, "repo");
    }

    #[test]
    fn missing_author_defaults_are_explicit() {
        let wire: WireCommit = serde_json::from_value(json!({
            "commitId": "a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e5f6a1b2"
        }))
        .expect("deserialize");
        let commit = wire.into_commit("repo");
        assert_eq!(commit.author, "");
        assert_eq!(commit.date, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn repository_base_splits_scoped_references() {
        let backend = RestBackend::with_client(
            reqwest::Client::new(),
            "https://dev.example.com/org/",
            "Default",
        );
        assert_eq!(
            backend.repository_base("Proj/My Repo"),
            "https://dev.example.com/org/Proj/_apis/git/repositories/My%20Repo"
        );
        assert_eq!(
            backend.repository_base("a1b2c3d4-e5f6-7890-abcd-ef1234567890"),
            "https://dev.example.com/org/Default/_apis/git/repositories/a1b2c3d4-e5f6-7890-abcd-ef1234567890"
        );
    }
}
