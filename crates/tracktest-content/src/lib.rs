//! tracktest-content — in-memory collaborators for driving the engine.
//!
//! Scriptable question and presentation components, a static content
//! subtree, and host doubles (router, settle barrier, recording observer)
//! for simulations and tests that need no real content runtime.

pub mod component;
pub mod host;
pub mod subtree;
