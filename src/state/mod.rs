// src/state/mod.rs

//! Durable per-component deployment state.

pub mod store;

pub use store::{ComponentState, DEFAULT_STATE_PATH, StateStore};
