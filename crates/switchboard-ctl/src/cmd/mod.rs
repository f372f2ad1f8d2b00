//! CLI command modules.

pub mod clients;
pub mod http;
pub mod messages;
pub mod status;
