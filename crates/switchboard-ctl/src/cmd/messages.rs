//! Messaging commands.

use anyhow::{Result, bail};
use switchboard_core::wire::{DeliveryReportJson, InboxResponse, paths};
use switchboard_core::{ClientParams, MessageToClients};

use super::clients::fetch_clients;
use super::http::{base_url, get_json, post_json_body};

/// Ask the peer at `peer_url` to relay `text` to `ids`.
async fn relay_via(peer_url: &str, msg: &MessageToClients) -> Result<DeliveryReportJson> {
    post_json_body(&format!("{}{}?report=true", peer_url, paths::MESSAGE), msg).await
}

fn print_report(report: &DeliveryReportJson) {
    println!(
        "Delivered to {} of {} targets.",
        report.delivered,
        report.delivered + report.failed
    );
    for o in &report.outcomes {
        match &o.error {
            None => println!("  ✓ {}", o.id),
            Some(e) => println!("  ✗ {} [{}] {}", o.id, o.status, e),
        }
    }
}

pub async fn cmd_send(host: &str, from_port: u16, ids: Vec<String>, text: String) -> Result<()> {
    let msg = MessageToClients { ids, text };
    let report = relay_via(&base_url(host, from_port), &msg).await?;
    print_report(&report);
    Ok(())
}

pub async fn cmd_inbox(host: &str, port: u16) -> Result<()> {
    let resp: InboxResponse = get_json(&format!("{}{}", base_url(host, port), paths::INBOX)).await?;

    if resp.messages.is_empty() {
        println!("Inbox is empty.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Inbox ({} messages)", resp.messages.len());
    println!("═══════════════════════════════════════");

    for m in &resp.messages {
        println!("  ┌─ {} [{}]", &m.msg_id[..16.min(m.msg_id.len())], m.received_at);
        println!("  │  from : {}", m.from.as_deref().unwrap_or("-"));
        println!("  └─ {}", m.text);
    }

    Ok(())
}

/// The greeting the first client sends the second.
pub fn hello_message(clients: &[ClientParams]) -> Result<(&ClientParams, MessageToClients)> {
    let [first, second, ..] = clients else {
        bail!("need at least 2 connected clients, found {}", clients.len());
    };
    let msg = MessageToClients {
        ids: vec![second.id.clone()],
        text: format!(
            "hello client {}! This is a message from client {}",
            second.name, first.name
        ),
    };
    Ok((first, msg))
}

/// Fetch connected clients and send the first client's greeting to the
/// second, relayed by the first.
pub async fn cmd_hello(directory: &str) -> Result<()> {
    let clients = fetch_clients(directory).await?;
    let (sender, msg) = hello_message(&clients)?;

    println!("{} → {}: {}", sender.name, msg.ids[0], msg.text);
    let report = relay_via(&base_url(sender.host_or_default(), sender.http_port), &msg).await?;
    print_report(&report);

    if report.delivered == 0 {
        bail!("message was not delivered");
    }
    Ok(())
}
