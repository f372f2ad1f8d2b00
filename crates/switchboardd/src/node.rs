//! Peer lifecycle: bind, serve, register with the directory, deregister.

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use switchboard_api::{ApiState, NodeInfo};
use switchboard_core::config::SwitchboardConfig;
use switchboard_core::wire::{ClientParams, DEFAULT_HOST};
use switchboard_services::{DirectoryClient, Inbox, PeerDirectory, PeerRegistry, Relay, RelayOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Owns the registry on the well-known port.
    Directory,
    /// Registers with the directory and relays through it.
    Peer,
}

impl Role {
    /// The peer listening on the directory's port is the directory.
    pub fn for_config(config: &SwitchboardConfig) -> Self {
        if config.node.listen_port(config.directory.port) == config.directory.port {
            Role::Directory
        } else {
            Role::Peer
        }
    }
}

/// A running peer.
pub struct Node {
    id: String,
    name: String,
    port: u16,
    role: Role,
    directory: PeerDirectory,
    inbox: Inbox,
    shutdown_tx: broadcast::Sender<()>,
    server: JoinHandle<Result<()>>,
}

impl Node {
    /// Bind the configured port and start.
    pub async fn start(config: &SwitchboardConfig, role: Role) -> Result<Self> {
        let port = config.node.listen_port(config.directory.port);
        let listener = switchboard_api::bind(&config.node.host, port).await?;
        Self::start_on(listener, config, role).await
    }

    /// Start serving on an already-bound listener.
    ///
    /// A `Peer` returns only after the directory has acknowledged its
    /// registration, so callers can rely on it being listed.
    pub async fn start_on(listener: TcpListener, config: &SwitchboardConfig, role: Role) -> Result<Self> {
        let port = listener.local_addr()?.port();
        let id = config.node.resolved_id();
        let name = config.node.resolved_name(port);

        let directory = match role {
            Role::Directory => PeerDirectory::Local(PeerRegistry::new()),
            Role::Peer => PeerDirectory::Remote(DirectoryClient::new(config.directory.base_url())),
        };
        let relay = Relay::new(directory.clone(), RelayOptions::from(&config.relay));
        let inbox = Inbox::new();

        let state = ApiState {
            node: NodeInfo {
                id: id.clone(),
                name: name.clone(),
                http_port: port,
            },
            directory: directory.clone(),
            relay,
            inbox: inbox.clone(),
            send_deadline: config.relay.send_deadline(),
        };

        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let mut shutdown_rx = shutdown_tx.subscribe();
        let server = tokio::spawn(switchboard_api::serve(state, listener, async move {
            let _ = shutdown_rx.recv().await;
        }));

        let node = Self {
            id,
            name,
            port,
            role,
            directory,
            inbox,
            shutdown_tx,
            server,
        };
        tracing::info!(id = %node.id, name = %node.name, port, role = ?role, "peer started");

        if let PeerDirectory::Remote(client) = &node.directory {
            let params = ClientParams {
                id: node.id.clone(),
                http_port: port,
                name: node.name.clone(),
                host: advertised_host(&config.node.host),
            };
            let registered = client
                .register_until_acknowledged(
                    &params,
                    config.directory.register_attempts,
                    std::time::Duration::from_millis(config.directory.register_backoff_ms),
                )
                .await;
            match registered {
                Ok(ack) => tracing::info!(
                    directory = %client.base_url(),
                    replaced = ack.replaced,
                    "registered with directory"
                ),
                Err(e) => {
                    let directory = client.base_url().to_string();
                    let _ = node.shutdown_tx.send(());
                    let _ = node.server.await;
                    return Err(e).with_context(|| format!("registration with {directory} failed"));
                }
            }
        }

        Ok(node)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    /// The registry, when this node is the directory.
    pub fn registry(&self) -> Option<&PeerRegistry> {
        match &self.directory {
            PeerDirectory::Local(registry) => Some(registry),
            PeerDirectory::Remote(_) => None,
        }
    }

    /// Serve until Ctrl-C, then stop. Returns early if the API task dies.
    pub async fn run_until_ctrl_c(mut self) -> Result<()> {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                tracing::info!("shutdown signal received");
            }
            exited = &mut self.server => {
                return exited.context("API task panicked")?;
            }
        }
        self.stop().await
    }

    /// Deregister from the directory (best effort) and stop serving.
    pub async fn stop(self) -> Result<()> {
        if let PeerDirectory::Remote(client) = &self.directory {
            match client.deregister(&self.id).await {
                Ok(ack) => tracing::info!(removed = ack.removed, "deregistered from directory"),
                Err(e) => tracing::warn!(error = %e, "failed to deregister from directory"),
            }
        }
        let _ = self.shutdown_tx.send(());
        self.server.await.context("API task panicked")??;
        tracing::info!(id = %self.id, "peer stopped");
        Ok(())
    }
}

/// Loopback and wildcard hosts are left for the directory to fill in from
/// the caller's address.
fn advertised_host(host: &str) -> Option<String> {
    match host {
        "" | DEFAULT_HOST | "0.0.0.0" | "::" => None,
        other => Some(other.to_string()),
    }
}
