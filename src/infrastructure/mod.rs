//! Adapters implementing the domain ports.

pub mod authorization;
pub mod diagnostics;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod rpc;
