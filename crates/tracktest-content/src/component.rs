//! Scriptable content components.
//!
//! These stand in for a host content runtime: a simulation answers the
//! questions directly and the engine sees them through the
//! [`ComponentModel`] trait. Call and reset counts are recorded so tests
//! can assert how the engine drove them.

use std::sync::Mutex;

use tracktest_core::reset::ResetStrength;
use tracktest_core::traits::{ComponentModel, QuestionSettings};

#[derive(Debug, Default)]
struct QuestionState {
    score: f64,
    is_correct: bool,
    is_complete: bool,
    settings: Option<QuestionSettings>,
    resets: Vec<ResetStrength>,
    refresh_count: u32,
}

/// A question component whose answers are scripted by the caller.
pub struct ScriptedQuestion {
    id: String,
    min_score: f64,
    max_score: f64,
    tracking_ref: Option<String>,
    state: Mutex<QuestionState>,
}

impl ScriptedQuestion {
    pub fn new(id: impl Into<String>, max_score: f64) -> Self {
        Self {
            id: id.into(),
            min_score: 0.0,
            max_score,
            tracking_ref: None,
            state: Mutex::new(QuestionState::default()),
        }
    }

    /// Allow a negative floor, for question types that deduct marks.
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    /// Attach a stable cross-session reference.
    pub fn with_tracking_ref(mut self, tracking_ref: impl Into<String>) -> Self {
        self.tracking_ref = Some(tracking_ref.into());
        self
    }

    /// Record an answer and mark the interaction complete.
    pub fn answer(&self, score: f64, is_correct: bool) {
        let mut state = self.state.lock().unwrap();
        state.score = score;
        state.is_correct = is_correct;
        state.is_complete = true;
    }

    /// Reset strengths received, oldest first.
    pub fn resets(&self) -> Vec<ResetStrength> {
        self.state.lock().unwrap().resets.clone()
    }

    /// The most recently applied display settings.
    pub fn settings(&self) -> Option<QuestionSettings> {
        self.state.lock().unwrap().settings.clone()
    }

    pub fn refresh_count(&self) -> u32 {
        self.state.lock().unwrap().refresh_count
    }
}

impl ComponentModel for ScriptedQuestion {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_question(&self) -> bool {
        true
    }

    fn is_interaction_complete(&self) -> bool {
        self.state.lock().unwrap().is_complete
    }

    fn min_score(&self) -> f64 {
        self.min_score
    }

    fn max_score(&self) -> f64 {
        self.max_score
    }

    fn score(&self) -> f64 {
        self.state.lock().unwrap().score
    }

    fn is_correct(&self) -> bool {
        self.state.lock().unwrap().is_correct
    }

    fn tracking_ref(&self) -> Option<String> {
        self.tracking_ref.clone()
    }

    fn reset(&self, strength: ResetStrength, _force: bool) {
        let mut state = self.state.lock().unwrap();
        state.resets.push(strength);
        state.is_complete = false;
        if strength == ResetStrength::Hard {
            state.score = 0.0;
            state.is_correct = false;
        }
    }

    fn refresh(&self) {
        self.state.lock().unwrap().refresh_count += 1;
    }

    fn apply_question_settings(&self, settings: &QuestionSettings) {
        self.state.lock().unwrap().settings = Some(settings.clone());
    }
}

#[derive(Debug, Default)]
struct PresentationState {
    is_complete: bool,
    resets: Vec<ResetStrength>,
}

/// A non-scoring presentational component.
///
/// Participates in completion and reset only; the score accessors stay at
/// their zero defaults.
pub struct ScriptedPresentation {
    id: String,
    state: Mutex<PresentationState>,
}

impl ScriptedPresentation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(PresentationState::default()),
        }
    }

    /// Mark the component viewed.
    pub fn view(&self) {
        self.state.lock().unwrap().is_complete = true;
    }

    pub fn resets(&self) -> Vec<ResetStrength> {
        self.state.lock().unwrap().resets.clone()
    }
}

impl ComponentModel for ScriptedPresentation {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_question(&self) -> bool {
        false
    }

    fn is_interaction_complete(&self) -> bool {
        self.state.lock().unwrap().is_complete
    }

    fn reset(&self, strength: ResetStrength, _force: bool) {
        let mut state = self.state.lock().unwrap();
        state.resets.push(strength);
        state.is_complete = false;
    }
}
