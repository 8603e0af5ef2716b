use crate::engine::{validate_address, validate_address_list};
use alloy::primitives::Address;
use anyhow::Context;
use std::env;
use url::Url;

/// Arbitrum One, the only chain the vault tools read from.
pub const DEFAULT_CHAIN_ID: u64 = 42161;

pub const DEFAULT_RPC_URL: &str = "https://arb1.arbitrum.io/rpc";

pub const DEFAULT_MULTICALL_ADDRESS: &str = "0x842eC2c7D803033Edf55E478F461FC547Bc54EB2";

pub const DEFAULT_LOGARITHM_VAULTS: [&str; 2] = [
    "0xe5fc579f20C2dbffd78a92ddD124871a35519659",
    "0x79f76E343807eA194789D114e61bE6676e6BBeDA",
];

#[derive(Clone, Debug)]
pub struct Config {
    pub rpc_url: Url,
    pub chain_id: u64,
    pub multicall_address: Address,
    pub vault_addresses: Vec<Address>,
    pub meta_vault_address: Option<Address>,
    pub subgraph_url: Option<Url>,
    pub subgraph_api_key: Option<String>,
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let rpc_url = match (optional("ARBITRUM_RPC_URL"), optional("ALCHEMY_KEY")) {
            (Some(url), _) => url,
            (None, Some(key)) => format!("https://arb-mainnet.g.alchemy.com/v2/{key}"),
            (None, None) => DEFAULT_RPC_URL.to_string(),
        };
        let rpc_url = Url::parse(&rpc_url).context("ARBITRUM_RPC_URL is not a valid URL")?;

        let chain_id = match optional("CHAIN_ID") {
            Some(id) => id.parse().context("CHAIN_ID must be an integer")?,
            None => DEFAULT_CHAIN_ID,
        };

        let multicall_address = validate_address(
            &optional("MULTICALL_ADDRESS").unwrap_or_else(|| DEFAULT_MULTICALL_ADDRESS.into()),
        )
        .context("MULTICALL_ADDRESS")?;

        let vault_addresses = match optional("LOGARITHM_VAULT_ADDRESSES") {
            Some(list) => {
                let entries: Vec<&str> = list.split(',').map(str::trim).collect();
                validate_address_list(&entries).context("LOGARITHM_VAULT_ADDRESSES")?
            }
            None => validate_address_list(&DEFAULT_LOGARITHM_VAULTS[..])?,
        };
        if vault_addresses.is_empty() {
            anyhow::bail!("LOGARITHM_VAULT_ADDRESSES must list at least one vault");
        }

        let meta_vault_address = optional("META_VAULT_ADDRESS")
            .map(|a| validate_address(&a))
            .transpose()
            .context("META_VAULT_ADDRESS")?;

        let subgraph_url = optional("SUBGRAPH_URL")
            .map(|u| Url::parse(&u))
            .transpose()
            .context("SUBGRAPH_URL is not a valid URL")?;

        Ok(Self {
            rpc_url,
            chain_id,
            multicall_address,
            vault_addresses,
            meta_vault_address,
            subgraph_url,
            subgraph_api_key: optional("SUBGRAPH_API_KEY"),
        })
    }
}
