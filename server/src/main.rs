use clap::Parser;
use log::info;
use server::config::Config;
use server::network::Server;
use server::ServerContext;
use std::sync::Arc;

/// Parses the command line, builds the shared state and serves until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    let ctx = Arc::new(ServerContext::from_config(config)?);
    let server = Server::bind(ctx).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    server.shutdown().await;
    Ok(())
}
