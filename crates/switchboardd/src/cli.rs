//! Command-line overrides for the daemon.
//!
//! `switchboardd [port] [--index <n>] [--name <name>] [--id <id>]
//!               [--host <host>] [--directory <host:port>]`
//!
//! A bare port is the listen port, as the launcher passes it.

use anyhow::{bail, Context, Result};

use switchboard_core::config::SwitchboardConfig;

pub fn usage() -> &'static str {
    "Usage: switchboardd [port] [--index <n>] [--name <name>] [--id <id>] \
     [--host <host>] [--directory <host:port>]"
}

/// Apply command-line arguments on top of `config`.
pub fn apply_args(config: &mut SwitchboardConfig, args: &[String]) -> Result<()> {
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--index" => {
                config.node.index = next_value(args, &mut i, "--index")?
                    .parse()
                    .context("--index must be a number")?;
            }
            "--name" => config.node.name = next_value(args, &mut i, "--name")?.to_string(),
            "--id" => config.node.id = next_value(args, &mut i, "--id")?.to_string(),
            "--host" => config.node.host = next_value(args, &mut i, "--host")?.to_string(),
            "--directory" => {
                let v = next_value(args, &mut i, "--directory")?;
                let (host, port) = v
                    .rsplit_once(':')
                    .with_context(|| format!("--directory expects host:port, got {v}"))?;
                config.directory.host = host.to_string();
                config.directory.port = port.parse().context("--directory port must be a number")?;
            }
            other if other.starts_with("--") => bail!("unknown option {other}"),
            port => {
                config.node.http_port = port
                    .parse()
                    .with_context(|| format!("port must be a number, got {port}"))?;
            }
        }
        i += 1;
    }
    Ok(())
}

fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .with_context(|| format!("{flag} requires a value"))
}
