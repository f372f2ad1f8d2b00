//! Peer status command.

use anyhow::Result;
use switchboard_core::wire::{StatusResponse, paths};

use super::http::{base_url, get_json};

pub async fn cmd_status(host: &str, port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}{}", base_url(host, port), paths::STATUS)).await?;

    println!("═══════════════════════════════════════");
    println!("  Switchboard Peer Status");
    println!("═══════════════════════════════════════");
    println!("  Name           : {}", resp.name);
    println!("  Id             : {}", resp.id);
    println!("  Role           : {}", resp.role);
    println!("  Port           : {}", resp.http_port);
    if let Some(n) = resp.registered_peers {
        println!("  Registered     : {}", n);
    }
    println!("  Inbox messages : {}", resp.inbox_messages);

    Ok(())
}
