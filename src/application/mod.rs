//! Application layer: the workflow orchestrator and the financing engine.
//!
//! The orchestrator owns the storage and notifier ports and serializes
//! concurrent transitions per listing through the store's compare-and-set,
//! never through locks.

pub mod financing;
pub mod orchestrator;
