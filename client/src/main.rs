use clap::{Parser, Subcommand};
use client::{LoginOutcome, ProbeClient};
use log::info;
use shared::packets::Intent;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Protocol probe for the hollow server", long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:25565")]
    server: SocketAddr,

    /// Send a PROXY v1 line claiming this source address first
    #[arg(long)]
    proxy_source: Option<SocketAddr>,

    /// Protocol version to announce in the handshake
    #[arg(long, default_value_t = shared::PROTOCOL_VERSION)]
    protocol: i32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the server list status and measure ping
    Status,
    /// Log in and record frames for a while
    Join {
        /// Name to log in with
        #[arg(short = 'u', long, default_value = "Steve")]
        username: String,

        /// Seconds to stay connected after login
        #[arg(short = 'd', long, default_value = "5")]
        duration: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Connecting to: {}", args.server);
    let mut client = ProbeClient::connect(args.server).await?;
    if let Some(source) = args.proxy_source {
        client.send_proxy_header(source, args.server).await?;
    }

    match args.command {
        Command::Status => {
            client
                .handshake(args.protocol, args.server, Intent::Status)
                .await?;
            let document = client.status().await?;
            let (_, rtt) = client.ping(rand::random()).await?;

            println!("{}", serde_json::to_string_pretty(&document)?);
            println!("ping: {:.1?}", rtt);
        }
        Command::Join { username, duration } => {
            client
                .handshake(args.protocol, args.server, Intent::Login)
                .await?;
            match client.login(&username).await? {
                LoginOutcome::Success { uuid, username } => {
                    println!("logged in as {} ({})", username, uuid);
                    let recording = client.record(Duration::from_secs(duration)).await?;
                    for frame in &recording.frames {
                        println!("0x{:02X} {} bytes", frame.id, frame.body.len());
                    }
                    println!(
                        "{} frames, {} keep-alives{}",
                        recording.frames.len(),
                        recording.keep_alives(),
                        if recording.closed { ", closed by server" } else { "" }
                    );
                }
                LoginOutcome::Disconnected { reason } => {
                    println!("kicked: {}", reason);
                }
            }
        }
    }

    Ok(())
}
