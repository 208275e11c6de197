//! A static content subtree.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracktest_core::traits::{ComponentModel, ContentSubtree};

/// A fixed subtree of components bound to one page.
///
/// Content is assembled once with the builder methods; only the
/// awaiting-children flag can change afterwards.
pub struct StaticSubtree {
    id: String,
    page_id: String,
    is_fully_populated: AtomicBool,
    components: Vec<Arc<dyn ComponentModel>>,
    ancestor_ids: Vec<String>,
}

impl StaticSubtree {
    pub fn new(id: impl Into<String>, page_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            page_id: page_id.into(),
            is_fully_populated: AtomicBool::new(true),
            components: Vec::new(),
            ancestor_ids: Vec::new(),
        }
    }

    pub fn with_component(mut self, component: Arc<dyn ComponentModel>) -> Self {
        self.components.push(component);
        self
    }

    /// Register an intermediate model id (block, article) so containment
    /// queries against it succeed.
    pub fn with_ancestor(mut self, model_id: impl Into<String>) -> Self {
        self.ancestor_ids.push(model_id.into());
        self
    }

    /// Flag that children are still being added and completion is not yet
    /// meaningful.
    pub fn set_awaiting_children(&self, awaiting: bool) {
        self.is_fully_populated.store(!awaiting, Ordering::Relaxed);
    }
}

impl ContentSubtree for StaticSubtree {
    fn id(&self) -> &str {
        &self.id
    }

    fn page_id(&self) -> &str {
        &self.page_id
    }

    fn components(&self) -> Vec<Arc<dyn ComponentModel>> {
        self.components.clone()
    }

    fn is_fully_populated(&self) -> bool {
        self.is_fully_populated.load(Ordering::Relaxed)
    }

    fn contains(&self, model_id: &str) -> bool {
        self.id == model_id
            || self.ancestor_ids.iter().any(|id| id == model_id)
            || self.components.iter().any(|c| c.id() == model_id)
    }
}
