use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use notepai_ai::{AiService, OpenAiConfig, OpenAiProvider};

#[derive(Parser)]
#[command(name = "notepai-server")]
#[command(about = "Serve the notepai writing endpoints over HTTP", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "NOTEPAI_ADDR", default_value = "127.0.0.1:3000")]
    addr: SocketAddr,

    /// Chat model to use instead of the default
    #[arg(long, env = "NOTEPAI_MODEL")]
    model: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "NOTEPAI_LOG", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = cli.log_level.to_lowercase();
    let filter = EnvFilter::try_new(format!(
        "notepai_server={level},notepai_ai={level},tower_http={level}"
    ))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let provider = OpenAiProvider::new(OpenAiConfig::from_env(cli.model))?;
    debug!(model = provider.model(), "notepai-server v{} starting", env!("CARGO_PKG_VERSION"));

    notepai_server::serve(cli.addr, Arc::new(AiService::new(provider))).await
}
