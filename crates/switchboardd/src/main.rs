//! switchboardd — Switchboard peer daemon.

use anyhow::Result;

use switchboard_core::config::SwitchboardConfig;
use switchboardd::{cli, Node, Role};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if matches!(args.first().map(String::as_str), Some("-h" | "--help")) {
        println!("{}", cli::usage());
        return Ok(());
    }

    let mut config = SwitchboardConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        SwitchboardConfig::default()
    });
    cli::apply_args(&mut config, &args)?;

    let role = Role::for_config(&config);
    tracing::info!(
        role = ?role,
        directory = %config.directory.base_url(),
        "switchboardd starting"
    );

    let node = Node::start(&config, role).await?;
    node.run_until_ctrl_c().await
}
