use clap::Parser;
use log::info;
use place_server::access_list::AccessMode;
use place_server::config::ServerConfig;
use place_server::network::Server;
use place_shared::{COOLDOWN_MS, DEFAULT_MAX_CLIENTS, DEFAULT_PORT};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Side length of the square board
    #[arg(short, long)]
    dim: u32,

    /// Maximum number of concurrent sessions
    #[arg(short, long, default_value_t = DEFAULT_MAX_CLIENTS)]
    max_clients: usize,

    /// File with one IP address per line
    #[arg(short, long)]
    access_list: Option<PathBuf>,

    /// Whether listed addresses are the only ones allowed, or the ones refused
    #[arg(long, value_enum, default_value = "deny")]
    access_mode: AccessMode,

    /// Milliseconds between accepted change requests per session (0 disables)
    #[arg(long, default_value_t = COOLDOWN_MS)]
    cooldown_ms: u64,

    /// Change requests a session may send back to back
    #[arg(long, default_value = "3")]
    burst: u32,

    /// Seconds a new connection has to log in
    #[arg(long, default_value = "10")]
    handshake_timeout_secs: u64,

    /// Seconds a single write to a client may take
    #[arg(long, default_value = "5")]
    write_timeout_secs: u64,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            dim: self.dim,
            max_clients: self.max_clients,
            access_list: self.access_list,
            access_mode: self.access_mode,
            cooldown: Duration::from_millis(self.cooldown_ms),
            burst: self.burst,
            handshake_timeout: Duration::from_secs(self.handshake_timeout_secs),
            write_timeout: Duration::from_secs(self.write_timeout_secs),
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let server = Server::bind(args.into_config()).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
