use anyhow::{Context, Result};
use log::info;
use ndp::conn::{Interface, NDPConnection};
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use crate::config::Config;

mod cli;
mod command;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let interface = match cli.interface.as_deref().or(config.interface.as_deref()) {
        Some(name) => Interface::find_by_name(name)?,
        None => Interface::find_usable()?,
    };

    let (conn, addr) = NDPConnection::open(&interface, &cli.address)
        .with_context(|| format!("failed to open NDP connection on {}", interface.name))?;
    info!("interface: {}, link-layer address: {}, IPv6 address: {addr}",
        interface.name,
        interface
            .mac_addr
            .map(|mac| mac.to_string())
            .unwrap_or_else(|| "none".to_string()),
    );

    // シグナルでの中断を各操作に伝播させる
    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });
    }

    command::run(
        token,
        conn,
        &interface,
        cli.operation,
        cli.target,
        cli.prefix,
        &config,
    )
    .await
}
