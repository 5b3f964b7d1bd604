//! Hierarchy walker: bounded recursive traversal over parent/child edges.
//!
//! Traversal is strictly sequential and depth-first: one child's full
//! subtree completes before the next sibling's fetch begins, which bounds
//! backend load. Failure isolation is per branch: a child that fails to
//! fetch or is policy-blocked loses its subtree only; siblings are still
//! attempted. The root's own failure propagates to the caller.
//!
//! The depth bound is the contract; a per-traversal visited set additionally
//! guards against a cyclic backend graph recursing forever inside the bound.

use std::collections::HashSet;

use futures::future::BoxFuture;
use tracing::warn;

use crate::backend::BackendClient;
use crate::error::Result;
use crate::models::{HierarchyNode, RelationKind, WorkItem};
use crate::policy::PolicyGate;

/// Walks hierarchy-child relations to an operator-bounded depth.
pub struct HierarchyWalker<'a> {
    backend: &'a dyn BackendClient,
    gate: &'a PolicyGate,
}

impl<'a> HierarchyWalker<'a> {
    pub fn new(backend: &'a dyn BackendClient, gate: &'a PolicyGate) -> Self {
        Self { backend, gate }
    }

    /// Flat pre-order sequence of descendants of `parent_id`.
    ///
    /// The parent itself is fetched and gated but not emitted; its failure
    /// propagates. `max_depth == 0` yields no children at all. Emission
    /// order follows relation order as returned by the backend.
    pub async fn walk_children(&self, parent_id: u64, max_depth: u32) -> Result<Vec<WorkItem>> {
        let parent = self.gate.fetch_validated(self.backend, parent_id).await?;
        let mut visited = HashSet::from([parent_id]);
        let mut out = Vec::new();
        self.descend(&parent, 0, max_depth, &mut visited, &mut out)
            .await;
        Ok(out)
    }

    /// Tree view rooted at `root_id`, with `depth` 0 at the root.
    ///
    /// The root is always fetched and gated regardless of `max_depth`.
    pub async fn build_tree(&self, root_id: u64, max_depth: u32) -> Result<HierarchyNode> {
        let root = self.gate.fetch_validated(self.backend, root_id).await?;
        let mut visited = HashSet::from([root_id]);
        let children = self.descend_nodes(&root, 0, max_depth, &mut visited).await;
        Ok(HierarchyNode {
            item: root,
            depth: 0,
            children,
        })
    }

    /// Recursive flat collection. Infallible: every per-child failure is
    /// logged and its subtree skipped.
    fn descend<'b>(
        &'b self,
        parent: &'b WorkItem,
        depth: u32,
        max_depth: u32,
        visited: &'b mut HashSet<u64>,
        out: &'b mut Vec<WorkItem>,
    ) -> BoxFuture<'b, ()> {
        Box::pin(async move {
            if depth >= max_depth {
                return;
            }
            for child_id in child_ids(parent) {
                if !visited.insert(child_id) {
                    warn!(
                        work_item_id = child_id,
                        "hierarchy cycle detected, skipping already-visited work item"
                    );
                    continue;
                }
                match self.gate.fetch_validated(self.backend, child_id).await {
                    Ok(child) => {
                        out.push(child.clone());
                        self.descend(&child, depth + 1, max_depth, visited, out)
                            .await;
                    }
                    Err(err) => {
                        warn!(
                            work_item_id = child_id,
                            error = %err,
                            "skipping child subtree"
                        );
                    }
                }
            }
        })
    }

    /// Recursive tree collection; same isolation rules as [`Self::descend`].
    fn descend_nodes<'b>(
        &'b self,
        parent: &'b WorkItem,
        parent_depth: u32,
        max_depth: u32,
        visited: &'b mut HashSet<u64>,
    ) -> BoxFuture<'b, Vec<HierarchyNode>> {
        Box::pin(async move {
            let mut nodes = Vec::new();
            if parent_depth >= max_depth {
                return nodes;
            }
            for child_id in child_ids(parent) {
                if !visited.insert(child_id) {
                    warn!(
                        work_item_id = child_id,
                        "hierarchy cycle detected, skipping already-visited work item"
                    );
                    continue;
                }
                match self.gate.fetch_validated(self.backend, child_id).await {
                    Ok(child) => {
                        let children = self
                            .descend_nodes(&child, parent_depth + 1, max_depth, visited)
                            .await;
                        nodes.push(HierarchyNode {
                            item: child,
                            depth: parent_depth + 1,
                            children,
                        });
                    }
                    Err(err) => {
                        warn!(
                            work_item_id = child_id,
                            error = %err,
                            "skipping child subtree"
                        );
                    }
                }
            }
            nodes
        })
    }
}

/// Parsed child ids from a parent's hierarchy-child relations, in relation
/// order. References that do not parse as an id are skipped silently.
fn child_ids(parent: &WorkItem) -> Vec<u64> {
    parent
        .relations
        .iter()
        .filter(|r| r.kind == RelationKind::HierarchyChild)
        .filter_map(|r| r.child_work_item_id())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::Ordering;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::{ErrorCategory, WorkboardError};
    use crate::models::Relation;
    use crate::testing::{MockBackend, child_relation, work_item};

    fn gate() -> PolicyGate {
        PolicyGate::new(["secret"])
    }

    /// root(1) -> 2, 3; 2 -> 4; 4 -> 5  (depth 3 under root)
    fn deep_backend() -> MockBackend {
        MockBackend::new()
            .with_work_item(work_item(
                1,
                "Epic",
                vec![child_relation(2), child_relation(3)],
            ))
            .with_work_item(work_item(2, "Feature", vec![child_relation(4)]))
            .with_work_item(work_item(3, "Feature", vec![]))
            .with_work_item(work_item(4, "Task", vec![child_relation(5)]))
            .with_work_item(work_item(5, "Task", vec![]))
    }

    #[tokio::test]
    async fn max_depth_zero_yields_no_children_but_gates_root() {
        let backend = deep_backend();
        let gate = gate();
        let walker = HierarchyWalker::new(&backend, &gate);

        let children = walker.walk_children(1, 0).await.expect("walk");
        assert!(children.is_empty());
        // The root itself was still fetched (and gated).
        assert_eq!(backend.calls.work_items.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn walk_children_is_preorder_and_depth_bounded() {
        let backend = deep_backend();
        let gate = gate();
        let walker = HierarchyWalker::new(&backend, &gate);

        let children = walker.walk_children(1, 2).await.expect("walk");
        let ids: Vec<u64> = children.iter().map(|c| c.id).collect();
        // 2's subtree completes (to depth 2) before sibling 3.
        assert_eq!(ids, vec![2, 4, 3]);
    }

    #[tokio::test]
    async fn build_tree_depths_match_distance_from_root() {
        let backend = deep_backend();
        let gate = gate();
        let walker = HierarchyWalker::new(&backend, &gate);

        let tree = walker.build_tree(1, 2).await.expect("tree");
        assert_eq!(tree.item.id, 1);
        assert_eq!(tree.depth, 0);
        assert_eq!(tree.children.len(), 2);

        let feature = &tree.children[0];
        assert_eq!((feature.item.id, feature.depth), (2, 1));
        let task = &feature.children[0];
        assert_eq!((task.item.id, task.depth), (4, 2));
        // Grandchildren at depth 2 are included, great-grandchildren are not.
        assert!(task.children.is_empty());
    }

    #[tokio::test]
    async fn failing_child_loses_only_its_subtree() {
        let backend = deep_backend().failing_work_item(2);
        let gate = gate();
        let walker = HierarchyWalker::new(&backend, &gate);

        let children = walker.walk_children(1, 3).await.expect("walk");
        let ids: Vec<u64> = children.iter().map(|c| c.id).collect();
        // 2 and its descendants are gone; sibling 3 is still attempted.
        assert_eq!(ids, vec![3]);
    }

    #[tokio::test]
    async fn blocked_child_is_skipped_like_a_failure() {
        let backend = MockBackend::new()
            .with_work_item(work_item(
                1,
                "Epic",
                vec![child_relation(2), child_relation(3)],
            ))
            .with_work_item(work_item(2, "Secret", vec![child_relation(4)]))
            .with_work_item(work_item(3, "Task", vec![]))
            .with_work_item(work_item(4, "Task", vec![]));
        let gate = gate();
        let walker = HierarchyWalker::new(&backend, &gate);

        let children = walker.walk_children(1, 3).await.expect("walk");
        let ids: Vec<u64> = children.iter().map(|c| c.id).collect();
        // The blocked item and everything under it stay hidden.
        assert_eq!(ids, vec![3]);
    }

    #[tokio::test]
    async fn blocked_root_propagates() {
        let backend = MockBackend::new().with_work_item(work_item(7, "Secret", vec![]));
        let gate = gate();
        let walker = HierarchyWalker::new(&backend, &gate);

        let err = walker.walk_children(7, 2).await.expect_err("blocked");
        assert_eq!(err.category(), ErrorCategory::PolicyBlocked);
    }

    #[tokio::test]
    async fn missing_root_propagates_not_found() {
        let backend = MockBackend::new();
        let gate = gate();
        let walker = HierarchyWalker::new(&backend, &gate);

        let err = walker.walk_children(99, 2).await.expect_err("missing");
        assert!(matches!(err, WorkboardError::NotFound { .. }));
    }

    #[tokio::test]
    async fn unparsable_child_reference_is_skipped_silently() {
        let backend = MockBackend::new()
            .with_work_item(work_item(
                1,
                "Epic",
                vec![
                    Relation::new(
                        crate::models::HIERARCHY_FORWARD_REL,
                        "https://dev.example.com/org/_apis/wit/workItems/garbage",
                    ),
                    child_relation(3),
                ],
            ))
            .with_work_item(work_item(3, "Task", vec![]));
        let gate = gate();
        let walker = HierarchyWalker::new(&backend, &gate);

        let children = walker.walk_children(1, 1).await.expect("walk");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, 3);
    }

    #[tokio::test]
    async fn cycle_is_cut_by_visited_set() {
        // 1 -> 2 -> 1, with a generous depth bound.
        let backend = MockBackend::new()
            .with_work_item(work_item(1, "Epic", vec![child_relation(2)]))
            .with_work_item(work_item(2, "Feature", vec![child_relation(1)]));
        let gate = gate();
        let walker = HierarchyWalker::new(&backend, &gate);

        let children = walker.walk_children(1, 10).await.expect("walk");
        let ids: Vec<u64> = children.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[tokio::test]
    async fn no_child_relations_yields_empty_not_error() {
        let backend = MockBackend::new().with_work_item(work_item(1, "Task", vec![]));
        let gate = gate();
        let walker = HierarchyWalker::new(&backend, &gate);

        let children = walker.walk_children(1, 5).await.expect("walk");
        assert!(children.is_empty());
    }
}
