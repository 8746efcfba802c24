//! Batch surface over the coordinator.

pub mod csv;
