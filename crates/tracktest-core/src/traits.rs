//! Collaborator traits the engine is driven through.
//!
//! The content tree, navigation, persistence and settle signalling all
//! belong to the host; the engine only ever sees them through these
//! interfaces.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::reset::ResetStrength;

/// A content leaf beneath a test's subtree.
///
/// Questions expose real scores; presentational components fall back to
/// the zero defaults and only participate in completion and reset.
pub trait ComponentModel: Send + Sync {
    fn id(&self) -> &str;

    fn is_available(&self) -> bool {
        true
    }

    fn is_question(&self) -> bool;

    fn is_interaction_complete(&self) -> bool;

    fn min_score(&self) -> f64 {
        0.0
    }

    fn max_score(&self) -> f64 {
        0.0
    }

    fn score(&self) -> f64 {
        0.0
    }

    fn is_correct(&self) -> bool {
        false
    }

    /// Stable reference identifying this question instance across
    /// sessions, when the host assigns one.
    fn tracking_ref(&self) -> Option<String> {
        None
    }

    fn reset(&self, strength: ResetStrength, force: bool);

    /// Re-render after a settings change.
    fn refresh(&self) {}

    fn apply_question_settings(&self, _settings: &QuestionSettings) {}
}

/// Display settings pushed into every question owned by a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSettings {
    pub can_show_feedback: bool,
    pub can_show_marking: bool,
    pub can_show_model_answer: bool,
    /// The owning test.
    pub test_id: String,
}

/// The content subtree one test is bound to.
pub trait ContentSubtree: Send + Sync {
    /// The model the test is attached to.
    fn id(&self) -> &str;

    /// The page containing that model.
    fn page_id(&self) -> &str;

    /// Every component beneath the subtree, in document order.
    fn components(&self) -> Vec<Arc<dyn ComponentModel>>;

    /// False while the subtree is still awaiting children, in which case
    /// completion is not yet meaningful.
    fn is_fully_populated(&self) -> bool;

    /// Whether the given model id lies within this subtree.
    fn contains(&self, model_id: &str) -> bool;
}

/// Generic key/value persistence supplied by the host.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
}

/// What kind of content a navigation event landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Page,
    Menu,
}

/// A navigation event.
#[derive(Debug, Clone)]
pub struct Location {
    pub kind: ContentKind,
    pub model_id: String,
}

impl Location {
    pub fn page(model_id: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Page,
            model_id: model_id.into(),
        }
    }

    pub fn menu(model_id: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Menu,
            model_id: model_id.into(),
        }
    }
}

/// Navigation operations and the current location.
pub trait Router: Send + Sync {
    fn current_location_id(&self) -> Option<String>;

    /// Reload the view at the given model, replacing history.
    fn reload(&self, model_id: &str);

    /// Scroll/navigate to the given model.
    fn navigate_to(&self, model_id: &str);
}

/// The completion settle barrier.
///
/// Completion flags ripple through the content tree after a reset; this
/// resolves once they have stabilized. It is the single suspension point
/// in the engine.
#[async_trait]
pub trait SettleBarrier: Send + Sync {
    async fn until_completion_settled(&self);
}

/// Everything the engine borrows from the host, bundled for construction.
#[derive(Clone)]
pub struct HostContext {
    pub store: Arc<dyn StateStore>,
    pub router: Arc<dyn Router>,
    pub barrier: Arc<dyn SettleBarrier>,
    pub observer: Arc<dyn crate::events::TestObserver>,
}
