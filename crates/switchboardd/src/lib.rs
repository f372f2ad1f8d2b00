//! switchboardd — one Switchboard peer: the directory or a regular client.

pub mod cli;
pub mod node;

pub use node::{Node, Role};
