//! Domain types and the ports the registration flow talks to.

pub mod account;
pub mod pix_key;
pub mod ports;
