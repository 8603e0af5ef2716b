use dotenv::dotenv;
use logarithm_vault_mcp::{
    config::Config,
    ethereum::EthereumClient,
    server,
    subgraph::{GraphQlTransport, SubgraphClient},
    tools::AppContext,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Logarithm Vault MCP Server...");

    let config = Config::from_env()?;
    info!(
        chain_id = config.chain_id,
        vaults = config.vault_addresses.len(),
        "configuration loaded"
    );
    if config.meta_vault_address.is_none() {
        warn!("META_VAULT_ADDRESS not set; meta vault tools will fail");
    }

    let chain = Arc::new(EthereumClient::new(&config.rpc_url));
    let subgraph = config
        .subgraph_url
        .clone()
        .map(|url| Arc::new(SubgraphClient::new(url)) as Arc<dyn GraphQlTransport>);

    server::run(AppContext {
        config,
        chain,
        subgraph,
    })
    .await?;

    Ok(())
}
