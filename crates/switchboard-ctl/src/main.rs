//! switchboard-ctl — command-line interface for Switchboard peers.

mod cmd;

use std::time::Duration;

use anyhow::{Context, Result};
use switchboard_core::wire::{DEFAULT_DIRECTORY_PORT, DEFAULT_HOST};

use cmd::http::base_url;

const DEFAULT_WAIT_SECS: u64 = 10;

fn print_usage() {
    println!("Usage: switchboard-ctl [--host <host>] [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  clients                        List clients connected to the directory");
    println!("  wait <count> [--timeout <s>]   Wait until <count> clients are connected");
    println!("  send <port> <id>... -- <text>  Relay <text> through the peer on <port>");
    println!("  inbox <port>                   Show messages received by the peer on <port>");
    println!("  status [port]                  Show peer status (default: the directory)");
    println!("  hello                          First client greets the second");
    println!();
    println!("Options:");
    println!("  --host <host>   Peer host (default: {})", DEFAULT_HOST);
    println!("  --port <port>   Directory port (default: {})", DEFAULT_DIRECTORY_PORT);
}

fn parse_port(s: &str) -> Result<u16> {
    s.parse().with_context(|| format!("invalid port: {}", s))
}

/// Options shared by every command, plus the command words left over.
#[derive(Debug)]
struct GlobalArgs {
    host: String,
    port: u16,
    timeout: Duration,
    command: Vec<String>,
}

/// Split global options from the command. Everything from the first bare
/// `--` on is message text and is passed through untouched.
fn parse_global(args: &[String]) -> Result<GlobalArgs> {
    let mut global = GlobalArgs {
        host: DEFAULT_HOST.to_string(),
        port: DEFAULT_DIRECTORY_PORT,
        timeout: Duration::from_secs(DEFAULT_WAIT_SECS),
        command: Vec::new(),
    };
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--" => {
                global.command.extend_from_slice(&args[i..]);
                break;
            }
            "--port" => {
                i += 1;
                global.port = parse_port(args.get(i).context("--port requires a value")?)?;
            }
            "--host" => {
                i += 1;
                global.host = args.get(i).context("--host requires a value")?.clone();
            }
            "--timeout" => {
                i += 1;
                let secs: u64 = args
                    .get(i)
                    .context("--timeout requires a value")?
                    .parse()
                    .context("--timeout must be a number of seconds")?;
                global.timeout = Duration::from_secs(secs);
            }
            other => global.command.push(other.to_string()),
        }
        i += 1;
    }
    Ok(global)
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let GlobalArgs {
        host,
        port,
        timeout,
        command,
    } = parse_global(&args)?;
    let remaining: Vec<&str> = command.iter().map(String::as_str).collect();

    let directory = base_url(&host, port);

    match remaining.as_slice() {
        ["clients"] | [] => cmd::clients::cmd_clients(&directory).await,
        ["wait", count] => {
            let count: usize = count.parse().context("count must be a number")?;
            cmd::clients::cmd_wait(&directory, count, timeout).await
        }
        ["send", from, rest @ ..] => {
            let split = rest
                .iter()
                .position(|a| *a == "--")
                .context("send needs `--` before the message text")?;
            let ids: Vec<String> = rest[..split].iter().map(|s| s.to_string()).collect();
            let text = rest[split + 1..].join(" ");
            cmd::messages::cmd_send(&host, parse_port(from)?, ids, text).await
        }
        ["inbox", p] => cmd::messages::cmd_inbox(&host, parse_port(p)?).await,
        ["status"] => cmd::status::cmd_status(&host, port).await,
        ["status", p] => cmd::status::cmd_status(&host, parse_port(p)?).await,
        ["hello"] => cmd::messages::cmd_hello(&directory).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
