//! Policy gate: block/allow decisions per work item.
//!
//! The block-set is captured once at construction and read-only afterwards;
//! concurrent readers need no lock. Callers must run the gate before
//! transforming or exposing a record, including every record discovered
//! mid-traversal, not only the root.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::backend::BackendClient;
use crate::error::{Result, WorkboardError};
use crate::models::WorkItem;

/// Decides allow/block for a single work item given its declared category.
#[derive(Debug, Clone)]
pub struct PolicyGate {
    /// Lowercased, trimmed category names. Membership is checked against
    /// the lowercased record category.
    blocked: HashSet<String>,
}

impl PolicyGate {
    /// Build a gate from the configured block-set. Entries are normalized
    /// once here; empty entries are dropped.
    pub fn new<I, S>(blocked: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let blocked = blocked
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { blocked }
    }

    /// Whether a category is in the block-set (case-insensitive).
    pub fn is_blocked(&self, category: &str) -> bool {
        self.blocked.contains(&category.trim().to_lowercase())
    }

    /// Validate a fetched work item against the block-set.
    ///
    /// A record missing its id, category, or field mapping fails with
    /// `MalformedRecord`; that is a backend contract violation, never a
    /// policy decision. A blocked record fails with `PolicyBlocked`
    /// carrying only the id and category. Every decision is audited.
    pub fn validate(&self, item: &WorkItem) -> Result<()> {
        if item.id == 0 {
            return Err(WorkboardError::malformed("work item has no id"));
        }
        if item.category.trim().is_empty() {
            return Err(WorkboardError::malformed(format!(
                "work item {} has no type",
                item.id
            )));
        }
        if item.fields.is_empty() {
            return Err(WorkboardError::malformed(format!(
                "work item {} has no fields",
                item.id
            )));
        }

        if self.is_blocked(&item.category) {
            info!(
                work_item_id = item.id,
                category = %item.category,
                decision = "block",
                "policy gate decision"
            );
            return Err(WorkboardError::PolicyBlocked {
                id: item.id,
                category: item.category.clone(),
            });
        }

        info!(
            work_item_id = item.id,
            category = %item.category,
            decision = "allow",
            "policy gate decision"
        );
        Ok(())
    }

    /// Fetch a work item and run it through the gate before returning it.
    ///
    /// This is the only fetch path traversal and aggregation use; a record
    /// is never observable to callers unless the gate allowed it.
    pub async fn fetch_validated(&self, backend: &dyn BackendClient, id: u64) -> Result<WorkItem> {
        debug!(work_item_id = id, "fetching work item");
        let item = backend.fetch_work_item(id).await?;
        self.validate(&item)?;
        Ok(item)
    }
}
