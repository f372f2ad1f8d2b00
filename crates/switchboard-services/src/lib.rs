//! switchboard-services — peer registry, directory access, message relay,
//! and the inbound message store.

pub mod directory;
pub mod http;
pub mod inbox;
pub mod registry;
pub mod relay;

pub use directory::{DirectoryClient, PeerDirectory};
pub use inbox::Inbox;
pub use registry::{Peer, PeerRegistry};
pub use relay::{Delivered, DeliveryOutcome, DeliveryReport, Relay, RelayOptions};
