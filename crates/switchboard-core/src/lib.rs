//! switchboard-core — shared types, wire format, errors, and configuration.
//! All other Switchboard crates depend on this one.

pub mod config;
pub mod error;
pub mod wire;

pub use error::SwitchboardError;
pub use wire::{ClientParams, MessageToClients};
