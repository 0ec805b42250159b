use clap::Parser;
use client::bot::Bot;
use client::RelayClient;
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:3000")]
    server: String,

    /// Updates sent per second
    #[arg(short = 'r', long, default_value = "10")]
    rate: u32,

    /// Largest move per update along each axis
    #[arg(long, default_value = "0.5", value_parser = parse_step)]
    step: f32,

    /// Leave after this many seconds instead of running until disconnected
    #[arg(short = 'd', long)]
    duration: Option<u64>,
}

fn parse_step(value: &str) -> Result<f32, String> {
    let step: f32 = value.parse().map_err(|e| format!("{}", e))?;
    if step.is_finite() && step >= 0.0 {
        Ok(step)
    } else {
        Err(format!("step must be a non-negative number, got {}", value))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    info!("Starting bot...");
    info!("Connecting to: {}", args.server);

    let client = RelayClient::connect(args.server.as_str()).await?;
    let mut bot = Bot::new(client, args.step);

    bot.run(args.rate, args.duration.map(Duration::from_secs))
        .await?;

    info!("Bot finished with {} peers visible", bot.world().peer_count());
    Ok(())
}
