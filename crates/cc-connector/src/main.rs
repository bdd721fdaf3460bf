use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use cc_config::ConnectorConfig;
use cc_connector::Connector;
use cc_rpc_client::{ReceivingChainClient, SendingChainClient};
use cc_store::ConnectorStore;

fn read_config<P: AsRef<Path>>(path: P) -> Result<ConnectorConfig> {
    let content = std::fs::read(&path)
        .with_context(|| format!("read config file from {}", path.as_ref().to_string_lossy()))?;
    let config = toml::from_slice(&content).with_context(|| "parse config file")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./connector.toml".to_string());
    let config = read_config(&config_path)?;
    config.validate()?;

    let store = ConnectorStore::open(&config.store_path).with_context(|| "open store")?;
    let sending = Arc::new(SendingChainClient::connect(&config.sending_chain_ws_url).await?);
    let receiving = Arc::new(
        ReceivingChainClient::connect(
            config.receiving_chain_ipc_path.as_deref(),
            config.receiving_chain_ws_url.as_deref(),
        )
        .await?,
    );

    let (mut connector, shutdown) = Connector::load(&config, store, sending, receiving).await?;
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        log::info!("shutting down");
        shutdown.shutdown();
    });
    connector.run().await
}
