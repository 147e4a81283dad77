use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::network::Server;
use std::net::SocketAddr;
use std::sync::Arc;

/// Main-method of the application.
/// Parses command-line arguments, then runs the server until it fails or Ctrl+C is pressed.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about = "An empty Minecraft server")]
    struct Args {
        /// Address to listen on
        #[clap(long, default_value = "0.0.0.0:25565")]
        bind: SocketAddr,
        /// Expect a PROXY v1 line at the start of every connection
        #[clap(long)]
        proxy: bool,
        /// Max players; zero or less means unlimited
        #[clap(long, default_value_t = 0, allow_negative_numbers = true)]
        max: i32,
        /// Server list description
        #[clap(long, default_value = "An empty Minecraft Server")]
        motd: String,
        /// Chat message sent after spawning
        #[clap(long, default_value = "Welcome to minecraft empty server")]
        welcome: String,
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig {
        bind_addr: args.bind,
        proxy_protocol: args.proxy,
        max_players: args.max,
        motd: args.motd,
        welcome: args.welcome,
    };

    let server = Arc::new(Server::new(config));
    let mut server_handle = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.run().await })
    };

    // Handle shutdown gracefully
    tokio::select! {
        result = &mut server_handle => {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("Server failed: {}", e);
                    return Err(e.into());
                }
                Err(e) => error!("Server task panicked: {}", e),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            server.shutdown();
            server_handle.await??;
        }
    }

    Ok(())
}
