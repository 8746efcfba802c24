//! Application layer containing the key registration orchestration.
//!
//! This module defines the `PixKeyRegistrationCoordinator`, the entry point for
//! claiming pix keys. It reconciles the remote key directory with the local
//! mirror through the ports declared in `domain::ports`, without a shared
//! transaction between the two.

pub mod coordinator;
