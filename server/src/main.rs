use clap::{Parser, ValueEnum};
use log::{error, info};
use server::{IdentityPolicy, Server, ServerConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IdentityArg {
    /// Accept whatever identity an UPDATE names
    Trust,
    /// Drop UPDATEs for any identity but the sender's own
    BindToSender,
}

impl From<IdentityArg> for IdentityPolicy {
    fn from(arg: IdentityArg) -> Self {
        match arg {
            IdentityArg::Trust => IdentityPolicy::Trust,
            IdentityArg::BindToSender => IdentityPolicy::BindToSender,
        }
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value_t = shared::DEFAULT_PORT)]
    port: u16,
    /// Maximum number of concurrent clients
    #[clap(short, long, default_value_t = shared::MAX_CLIENTS)]
    max_clients: usize,
    /// Disconnect clients announcing frames larger than this many bytes
    #[clap(long)]
    max_frame_len: Option<usize>,
    /// How the identity inside an UPDATE is treated
    #[clap(long, value_enum, default_value = "trust")]
    identity_policy: IdentityArg,
    /// Do not send a client's own UPDATEs back to it
    #[clap(long)]
    no_echo: bool,
    /// Frames queued per client before broadcasts to it are dropped
    #[clap(long, default_value = "1024")]
    outbound_queue: usize,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            max_clients: args.max_clients,
            max_frame_len: args.max_frame_len,
            identity_policy: args.identity_policy.into(),
            echo_updates: !args.no_echo,
            outbound_queue: args.outbound_queue,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    info!("Server initializing...");

    let server = Server::bind(args.into()).await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C, shutting down gracefully...");
        })
        .await?;

    Ok(())
}
