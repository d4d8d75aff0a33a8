//! Command-line client for Courier.

mod api_client;
mod poller;

use anyhow::{Context, Result};
use api_client::{
    ApiClient, FileResponse, PeerResponse, ReceivedFileResponse, RegisterPeerRequest,
    SendFileRequest,
};
use clap::{Args, Parser, Subcommand};
use courier_core::checksum::ChecksumAlgorithm;
use poller::PresencePoller;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "LAN file-transfer client for Courier")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ApiArgs {
    /// Coordination server URL
    #[arg(
        long,
        env = "COURIER_SERVER",
        default_value = "http://127.0.0.1:5000"
    )]
    server: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Register this peer with the coordination server
    Register {
        /// Peer name, unique on the LAN
        name: String,
        /// Address other peers reach us at
        #[arg(short, long)]
        address: String,
        /// Port our transfer listener runs on
        #[arg(short, long)]
        port: u32,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Unregister a peer (marks it offline, history is kept)
    Unregister {
        /// Peer name
        name: String,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// List peers known to the server
    Peers {
        /// Include offline and stale peers
        #[arg(long, default_value_t = false)]
        all: bool,
        /// Exclude this peer name from the listing (usually your own)
        #[arg(long)]
        exclude: Option<String>,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Show one peer's registration
    Resolve {
        /// Peer name
        name: String,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Send a file to one or more peers
    Send {
        /// Path to the file to send
        file: PathBuf,
        /// Sending peer name (must be registered)
        #[arg(long)]
        from: String,
        /// Recipient peer names, or "*" for every online peer
        #[arg(long = "to", value_delimiter = ',', required = true)]
        recipients: Vec<String>,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// List files a peer has sent
    Sent {
        /// Peer name
        name: String,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// List files addressed to a peer
    Received {
        /// Peer name
        name: String,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Show one file record with its per-recipient deliveries
    Show {
        /// File ID
        file_id: String,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Stay registered and print the online peer list as it changes
    Watch {
        /// Peer name to register as
        name: String,
        /// Address other peers reach us at
        #[arg(short, long)]
        address: String,
        /// Port our transfer listener runs on
        #[arg(short, long)]
        port: u32,
        /// Seconds between presence polls
        #[arg(long, default_value_t = 30)]
        interval: u64,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Server version and registry counts
    Status {
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Check server health
    Health {
        #[command(flatten)]
        api: ApiArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let Cli { command } = Cli::parse();

    match command {
        Commands::Register {
            name,
            address,
            port,
            api,
        } => handle_register(&name, &address, port, &api).await,
        Commands::Unregister { name, api } => handle_unregister(&name, &api).await,
        Commands::Peers { all, exclude, api } => handle_peers(all, exclude.as_deref(), &api).await,
        Commands::Resolve { name, api } => handle_resolve(&name, &api).await,
        Commands::Send {
            file,
            from,
            recipients,
            api,
        } => handle_send(&file, &from, recipients, &api).await,
        Commands::Sent { name, api } => handle_sent(&name, &api).await,
        Commands::Received { name, api } => handle_received(&name, &api).await,
        Commands::Show { file_id, api } => handle_show(&file_id, &api).await,
        Commands::Watch {
            name,
            address,
            port,
            interval,
            api,
        } => handle_watch(&name, &address, port, interval, &api).await,
        Commands::Status { api } => handle_status(&api).await,
        Commands::Health { api } => handle_health(&api).await,
    }
}

async fn handle_register(name: &str, address: &str, port: u32, api: &ApiArgs) -> Result<()> {
    let client = ApiClient::new(&api.server)?;
    let peer = client
        .register_peer(&RegisterPeerRequest {
            name: name.to_string(),
            address: address.to_string(),
            port,
        })
        .await?;
    println!(
        "Registered {} at {}:{} (since {})",
        peer.name, peer.address, peer.port, peer.created_at
    );
    Ok(())
}

async fn handle_unregister(name: &str, api: &ApiArgs) -> Result<()> {
    let client = ApiClient::new(&api.server)?;
    client.unregister_peer(name).await?;
    println!("Unregistered {name}");
    Ok(())
}

async fn handle_peers(all: bool, exclude: Option<&str>, api: &ApiArgs) -> Result<()> {
    let client = ApiClient::new(&api.server)?;
    let peers = if all {
        client.list_peers().await?
    } else {
        client.list_online_peers(exclude).await?
    };

    if peers.is_empty() {
        println!("No peers.");
        return Ok(());
    }
    for peer in &peers {
        print_peer(peer);
    }
    Ok(())
}

async fn handle_resolve(name: &str, api: &ApiArgs) -> Result<()> {
    let client = ApiClient::new(&api.server)?;
    let peer = client.get_peer(name).await?;
    print_peer(&peer);
    println!("  Registered: {}", peer.created_at);
    Ok(())
}

async fn handle_send(
    file: &std::path::Path,
    from: &str,
    recipients: Vec<String>,
    api: &ApiArgs,
) -> Result<()> {
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .context("file path has no usable filename")?
        .to_string();
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let checksum = ChecksumAlgorithm::Sha256.compute(&data);

    let client = ApiClient::new(&api.server)?;
    let outcome = client
        .send_file(&SendFileRequest {
            filename,
            filesize: data.len() as u64,
            checksum: checksum.to_string(),
            owner: from.to_string(),
            recipients,
        })
        .await?;

    println!("File {} ({})", outcome.file_id, outcome.permission);
    for recipient in &outcome.delivered {
        println!("  delivered  {recipient}");
    }
    for failure in &outcome.failed {
        println!("  failed     {} ({})", failure.recipient, failure.reason);
    }
    if outcome.full_success {
        println!("All deliveries succeeded.");
    } else {
        println!(
            "{} of {} deliveries failed.",
            outcome.failed.len(),
            outcome.failed.len() + outcome.delivered.len()
        );
    }
    Ok(())
}

async fn handle_sent(name: &str, api: &ApiArgs) -> Result<()> {
    let client = ApiClient::new(&api.server)?;
    let files = client.list_sent_files(name).await?;
    if files.is_empty() {
        println!("No sent files.");
        return Ok(());
    }
    for file in &files {
        print_file(file);
    }
    Ok(())
}

async fn handle_received(name: &str, api: &ApiArgs) -> Result<()> {
    let client = ApiClient::new(&api.server)?;
    let files = client.list_received_files(name).await?;
    if files.is_empty() {
        println!("No received files.");
        return Ok(());
    }
    for file in &files {
        print_received_file(file);
    }
    Ok(())
}

async fn handle_show(file_id: &str, api: &ApiArgs) -> Result<()> {
    let client = ApiClient::new(&api.server)?;
    let file = client.get_file(file_id).await?;
    print_file(&file);
    for delivery in &file.deliveries {
        match &delivery.reason {
            Some(reason) => println!("    {} {} ({})", delivery.status, delivery.recipient, reason),
            None => println!("    {} {}", delivery.status, delivery.recipient),
        }
    }
    Ok(())
}

async fn handle_watch(
    name: &str,
    address: &str,
    port: u32,
    interval: u64,
    api: &ApiArgs,
) -> Result<()> {
    let client = ApiClient::new(&api.server)?;
    let registration = RegisterPeerRequest {
        name: name.to_string(),
        address: address.to_string(),
        port,
    };
    let mut poller = PresencePoller::spawn(client, registration, Duration::from_secs(interval));
    println!("Watching as {name}; Ctrl-C to stop.");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = poller.changed() => {
                if changed.is_err() {
                    break;
                }
                let peers = poller.current();
                if peers.is_empty() {
                    println!("No other peers online.");
                } else {
                    println!("Online peers:");
                    for peer in &peers {
                        print_peer(peer);
                    }
                }
            }
        }
    }

    poller.stop().await;
    Ok(())
}

async fn handle_status(api: &ApiArgs) -> Result<()> {
    let client = ApiClient::new(&api.server)?;
    let status = client.status().await?;
    println!("Server version: {}", status.version);
    println!("  Peers known:  {}", status.peers_total);
    println!("  Peers online: {}", status.peers_online);
    Ok(())
}

async fn handle_health(api: &ApiArgs) -> Result<()> {
    let client = ApiClient::new(&api.server)?;
    let health = client.health().await?;
    println!("Server is {}", health.status);
    Ok(())
}

fn print_peer(peer: &PeerResponse) {
    println!(
        "  {:<20} {}:{} [{}] last seen {}",
        peer.name, peer.address, peer.port, peer.status, peer.last_seen
    );
}

fn print_file(file: &FileResponse) {
    println!(
        "  {} {} ({} bytes, {}, {}) from {}",
        file.file_id, file.filename, file.filesize, file.permission, file.state, file.owner
    );
}

fn print_received_file(file: &ReceivedFileResponse) {
    match &file.reason {
        Some(reason) => println!(
            "  {} {} ({} bytes) from {} - {} ({})",
            file.file_id, file.filename, file.filesize, file.owner, file.status, reason
        ),
        None => println!(
            "  {} {} ({} bytes) from {} - {}",
            file.file_id, file.filename, file.filesize, file.owner, file.status
        ),
    }
}
