//! tracktest-store — state store backends.
//!
//! Implementations of the engine's key/value persistence interface: an
//! in-memory map for tests and ephemeral runs, and a JSON file for state
//! that survives process restarts.

pub mod file;
pub mod memory;
