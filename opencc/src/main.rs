use std::net::SocketAddr;

use clap::Parser;
use config::Config;
use tokio_util::sync::CancellationToken;

mod args;

use args::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;
    config.validate().map_err(|err| anyhow::anyhow!(err))?;

    let listen_address = config
        .server
        .listen_address
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], args.port)));

    let shutdown_signal = CancellationToken::new();
    let shutdown_handle = shutdown_signal.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("received ctrl-c, shutting down");
            shutdown_handle.cancel();
        }
    });

    server::serve(server::ServeConfig {
        listen_address,
        config,
        shutdown_signal,
        log_filter: args.log_filter,
        version: format!("{} ({})", env!("CARGO_PKG_VERSION"), args.env),
        bound_addr_sender: None,
    })
    .await
}
