use crate::error::Result;
use alloy::{
    primitives::{Address, Bytes},
    providers::{Provider, ProviderBuilder},
    rpc::types::eth::TransactionRequest,
};
use tracing::debug;
use url::Url;

/// Read-only access to the chain. Everything the engine needs from a node
/// goes through this trait so tests can answer with canned payloads.
#[async_trait::async_trait]
pub trait ChainReader: Send + Sync {
    /// `eth_call` against the latest block.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;

    /// `eth_getTransactionCount` for nonce lookup.
    async fn transaction_count(&self, address: Address) -> Result<u64>;
}

#[derive(Clone)]
pub struct EthereumClient {
    pub provider: alloy::providers::RootProvider<
        alloy::transports::http::Http<alloy::transports::http::Client>,
    >,
}

impl EthereumClient {
    pub fn new(rpc_url: &Url) -> Self {
        let provider = ProviderBuilder::new().on_http(rpc_url.clone());
        Self { provider }
    }
}

#[async_trait::async_trait]
impl ChainReader for EthereumClient {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        debug!(%to, bytes = data.len(), "eth_call");
        let tx_req = TransactionRequest::default().to(to).input(data.into());
        Ok(self.provider.call(&tx_req).await?)
    }

    async fn transaction_count(&self, address: Address) -> Result<u64> {
        Ok(self.provider.get_transaction_count(address).await?)
    }
}
