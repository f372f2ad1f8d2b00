//! Directory commands: list connected clients, wait for registrations.

use std::time::Duration;

use anyhow::{Result, bail};
use switchboard_core::ClientParams;
use switchboard_core::wire::paths;

use super::http::get_json;

const WAIT_POLL: Duration = Duration::from_millis(100);

pub async fn fetch_clients(directory: &str) -> Result<Vec<ClientParams>> {
    get_json(&format!("{}{}", directory, paths::CONNECTED)).await
}

pub async fn cmd_clients(directory: &str) -> Result<()> {
    let clients = fetch_clients(directory).await?;

    if clients.is_empty() {
        println!("No clients connected.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Connected Clients ({})", clients.len());
    println!("═══════════════════════════════════════");

    for c in &clients {
        println!("  ┌─ {}", c.name);
        println!("  │  id   : {}", c.id);
        println!("  └─ addr : {}:{}", c.host_or_default(), c.http_port);
    }

    Ok(())
}

/// Block until the directory lists at least `count` clients.
pub async fn cmd_wait(directory: &str, count: usize, timeout: Duration) -> Result<()> {
    let waited = tokio::time::timeout(timeout, async {
        loop {
            // The directory may not be up yet; keep polling.
            if let Ok(clients) = fetch_clients(directory).await {
                if clients.len() >= count {
                    return clients.len();
                }
            }
            tokio::time::sleep(WAIT_POLL).await;
        }
    })
    .await;

    match waited {
        Ok(n) => {
            println!("{} clients connected.", n);
            Ok(())
        }
        Err(_) => bail!(
            "timed out after {}s waiting for {} clients at {}",
            timeout.as_secs(),
            count,
            directory
        ),
    }
}
