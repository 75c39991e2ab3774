//! Thin CLI front-end over the connection manager core.
//!
//! Wires configuration and logging together and drives the library's
//! upstream operations directly; the REST façade itself is out of scope
//! (see spec §1) and lives in a separate service.

use std::collections::HashMap;

use clap::{Parser, Subcommand};
use connection_core::{Config, Connection};
use futures_util::StreamExt;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "connectiond", version, about = "Connection manager core CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List instances across the fleet, or on one node.
    Instances {
        #[arg(long)]
        node: Option<String>,
    },
    /// Report health and slot usage for every configured node.
    Nodes,
    /// Start a new instance on a node.
    Start {
        app: String,
        slug_uri: String,
        node: String,
        #[arg(long)]
        slots: Option<u32>,
        #[arg(long = "env", value_parser = parse_env_kv)]
        env: Vec<(String, String)>,
    },
    /// Stop an instance by id.
    Stop { id: String },
    /// Stream or fetch an instance's logs.
    Logs {
        id: String,
        #[arg(long)]
        follow: bool,
    },
}

fn parse_env_kv(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "connectiond=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    info!(nodes = config.docker_nodes.len(), "configuration loaded");

    let conn = Connection::new(config)?;

    match cli.command {
        Command::Instances { node } => {
            let instances = conn.get_instances(node.as_deref()).await;
            for instance in instances {
                println!(
                    "{}\t{}\t{}\t{}:{}",
                    instance.id, instance.app, instance.node, instance.node, instance.port
                );
            }
        }
        Command::Nodes => {
            let statuses = conn.get_nodes().await;
            for status in statuses {
                println!(
                    "{}\t{:?}\tused={} free={} total={}",
                    status.id, status.state, status.slots.used, status.slots.free, status.slots.total
                );
            }
        }
        Command::Start { app, slug_uri, node, slots, env } => {
            let env: HashMap<String, String> = env.into_iter().collect();
            match conn
                .start_instance(&app, &slug_uri, &node, None, Some(env), slots, None)
                .await
            {
                Ok(instance) => println!("started {} on {}:{}", instance.id, instance.node, instance.port),
                Err(e) => {
                    error!(error = %e, "start_instance failed");
                    std::process::exit(1);
                }
            }
        }
        Command::Stop { id } => {
            if conn.stop_instance(&id).await {
                println!("stopped {id}");
            } else {
                println!("no such instance: {id}");
                std::process::exit(1);
            }
        }
        Command::Logs { id, follow } => {
            let mut stream = conn.get_logs(&id, follow).await?;
            while let Some(record) = stream.next().await {
                print!("{}", record.msg);
            }
        }
    }

    Ok(())
}
