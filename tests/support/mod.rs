#![allow(dead_code)]

use alloy::{
    dyn_abi::DynSolValue,
    json_abi::JsonAbi,
    primitives::{address, Address, Bytes, B256, U256},
    sol_types::SolCall,
};
use async_trait::async_trait;
use logarithm_vault_mcp::{
    config::Config,
    engine::{encoder, function_selector, load_abi, multicall::abi},
    error::{Result, VaultError},
    ethereum::ChainReader,
    subgraph::GraphQlTransport,
    tools::AppContext,
};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use url::Url;

pub const MULTICALL: Address = address!("842eC2c7D803033Edf55E478F461FC547Bc54EB2");
pub const VAULT_A: Address = address!("e5fc579f20C2dbffd78a92ddD124871a35519659");
pub const VAULT_B: Address = address!("79f76E343807eA194789D114e61bE6676e6BBeDA");
pub const META_VAULT: Address = address!("1111111111111111111111111111111111111111");
pub const DEPOSITOR: Address = address!("d8dA6BF26964aF9D7eEd9e03E53415D37aA96045");

#[derive(Clone, Default)]
pub struct VaultState {
    pub name: String,
    pub symbol: String,
    pub total_supply: U256,
    pub total_assets: U256,
    pub entry_cost: U256,
    pub exit_cost: U256,
    pub idle_assets: U256,
    pub total_pending_withdraw: U256,
    pub max_deposit: U256,
    pub balances: HashMap<Address, U256>,
    /// Functions that revert when called.
    pub reverting: Vec<&'static str>,
}

impl VaultState {
    pub fn new(name: &str, symbol: &str, total_supply: u64, total_assets: u64) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            total_supply: U256::from(total_supply),
            total_assets: U256::from(total_assets),
            entry_cost: U256::from(1_500_000_000_000_000u64),
            exit_cost: U256::from(2_000_000_000_000_000u64),
            idle_assets: U256::from(250_000u64),
            total_pending_withdraw: U256::from(10_000u64),
            max_deposit: U256::MAX,
            ..Default::default()
        }
    }
}

#[derive(Clone, Default)]
pub struct MetaState {
    pub total_supply: U256,
    pub total_assets: U256,
    pub decimals: u8,
    pub allocated_assets: U256,
    pub allocated_vaults: Vec<Address>,
    pub claimable_vaults: Vec<Address>,
    pub requested_assets: U256,
    pub claimable_assets: U256,
    pub idle_assets: U256,
    pub withdraw_keys: HashMap<Address, Vec<B256>>,
}

/// Answers `eth_call` the way the deployed contracts would.
pub struct MockChain {
    pub block_number: u64,
    pub vaults: HashMap<Address, VaultState>,
    pub meta: MetaState,
    pub nonce: u64,
    pub unreachable: bool,
    pub truncate_results: bool,
    pub batches: Mutex<Vec<usize>>,
    pub direct_calls: AtomicUsize,
    vault_abi: JsonAbi,
    meta_abi: JsonAbi,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            block_number: 123_456,
            vaults: HashMap::new(),
            meta: MetaState::default(),
            nonce: 7,
            unreachable: false,
            truncate_results: false,
            batches: Mutex::new(Vec::new()),
            direct_calls: AtomicUsize::new(0),
            vault_abi: load_abi(encoder::LOGARITHM_VAULT_ABI).unwrap(),
            meta_abi: load_abi(encoder::META_VAULT_ABI).unwrap(),
        }
    }
}

fn uint(value: U256) -> Vec<u8> {
    DynSolValue::Uint(value, 256).abi_encode()
}

fn addresses(list: &[Address]) -> Vec<u8> {
    DynSolValue::Array(list.iter().copied().map(DynSolValue::Address).collect()).abi_encode()
}

fn address_arg(payload: &[u8]) -> Address {
    Address::from_slice(&payload[16..36])
}

impl MockChain {
    pub fn with_vaults(vaults: Vec<(Address, VaultState)>) -> Self {
        Self {
            vaults: vaults.into_iter().collect(),
            ..Default::default()
        }
    }

    fn function_name(abi: &JsonAbi, payload: &[u8], names: &[&'static str]) -> Option<&'static str> {
        let selector = payload.get(..4)?;
        names
            .iter()
            .copied()
            .find(|name| {
                function_selector(abi, name)
                    .map(|s| s[..] == *selector)
                    .unwrap_or(false)
            })
    }

    /// `None` means the sub-call reverted.
    fn answer(&self, target: Address, payload: &[u8]) -> Option<Vec<u8>> {
        if target == META_VAULT {
            return self.answer_meta(payload);
        }
        let vault = self.vaults.get(&target)?;
        let name = Self::function_name(
            &self.vault_abi,
            payload,
            &[
                "name",
                "symbol",
                "totalSupply",
                "totalAssets",
                "entryCost",
                "exitCost",
                "idleAssets",
                "totalPendingWithdraw",
                "maxDeposit",
                "balanceOf",
            ],
        )?;
        if vault.reverting.contains(&name) {
            return None;
        }
        Some(match name {
            "name" => DynSolValue::String(vault.name.clone()).abi_encode(),
            "symbol" => DynSolValue::String(vault.symbol.clone()).abi_encode(),
            "totalSupply" => uint(vault.total_supply),
            "totalAssets" => uint(vault.total_assets),
            "entryCost" => uint(vault.entry_cost),
            "exitCost" => uint(vault.exit_cost),
            "idleAssets" => uint(vault.idle_assets),
            "totalPendingWithdraw" => uint(vault.total_pending_withdraw),
            "maxDeposit" => uint(vault.max_deposit),
            "balanceOf" => uint(
                vault
                    .balances
                    .get(&address_arg(payload))
                    .copied()
                    .unwrap_or_default(),
            ),
            _ => return None,
        })
    }

    fn answer_meta(&self, payload: &[u8]) -> Option<Vec<u8>> {
        let meta = &self.meta;
        let name = Self::function_name(
            &self.meta_abi,
            payload,
            &[
                "totalSupply",
                "totalAssets",
                "decimals",
                "allocatedAssets",
                "allocatedVaults",
                "allocationClaimableAssets",
                "allocationWithdrawKeys",
                "claimableVaults",
                "idleAssets",
            ],
        )?;
        Some(match name {
            "totalSupply" => uint(meta.total_supply),
            "totalAssets" => uint(meta.total_assets),
            "decimals" => uint(U256::from(meta.decimals)),
            "allocatedAssets" => uint(meta.allocated_assets),
            "allocatedVaults" => addresses(&meta.allocated_vaults),
            "claimableVaults" => addresses(&meta.claimable_vaults),
            "idleAssets" => uint(meta.idle_assets),
            "allocationClaimableAssets" => DynSolValue::Tuple(vec![
                DynSolValue::Uint(meta.requested_assets, 256),
                DynSolValue::Uint(meta.claimable_assets, 256),
            ])
            .abi_encode_params(),
            "allocationWithdrawKeys" => {
                let keys = meta
                    .withdraw_keys
                    .get(&address_arg(payload))
                    .cloned()
                    .unwrap_or_default();
                DynSolValue::Array(
                    keys.into_iter()
                        .map(|k| DynSolValue::FixedBytes(k, 32))
                        .collect(),
                )
                .abi_encode()
            }
            _ => return None,
        })
    }

    fn answer_multicall(&self, data: &[u8]) -> Result<Bytes> {
        let request = abi::tryBlockAndAggregateCall::abi_decode(data, true)
            .map_err(|e| VaultError::Rpc(format!("bad multicall payload: {e}")))?;
        self.batches.lock().unwrap().push(request.calls.len());

        let mut results = Vec::with_capacity(request.calls.len());
        for call in &request.calls {
            match self.answer(call.target, &call.callData) {
                Some(data) => results.push(DynSolValue::Tuple(vec![
                    DynSolValue::Bool(true),
                    DynSolValue::Bytes(data),
                ])),
                None if request.requireSuccess => {
                    return Err(VaultError::Rpc("execution reverted: Multicall2 aggregate: call failed".into()))
                }
                None => results.push(DynSolValue::Tuple(vec![
                    DynSolValue::Bool(false),
                    DynSolValue::Bytes(Vec::new()),
                ])),
            }
        }
        if self.truncate_results {
            results.pop();
        }

        Ok(DynSolValue::Tuple(vec![
            DynSolValue::Uint(U256::from(self.block_number), 256),
            DynSolValue::FixedBytes(B256::ZERO, 32),
            DynSolValue::Array(results),
        ])
        .abi_encode_params()
        .into())
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        if self.unreachable {
            return Err(VaultError::Connection("connection refused".into()));
        }
        if to == MULTICALL {
            return self.answer_multicall(&data);
        }
        self.direct_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(to, &data)
            .map(Bytes::from)
            .ok_or_else(|| VaultError::Rpc("execution reverted".into()))
    }

    async fn transaction_count(&self, _address: Address) -> Result<u64> {
        Ok(self.nonce)
    }
}

/// Replays a canned GraphQL response and records what was sent.
#[derive(Default)]
pub struct MockSubgraph {
    pub response: Value,
    pub requests: Mutex<Vec<(String, Value)>>,
}

impl MockSubgraph {
    pub fn new(response: Value) -> Self {
        Self {
            response,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GraphQlTransport for MockSubgraph {
    async fn post(&self, api_key: &str, body: &Value) -> Result<Value> {
        self.requests
            .lock()
            .unwrap()
            .push((api_key.to_string(), body.clone()));
        Ok(self.response.clone())
    }
}

pub fn test_config() -> Config {
    Config {
        rpc_url: Url::parse("http://localhost:8545").unwrap(),
        chain_id: 42161,
        multicall_address: MULTICALL,
        vault_addresses: vec![VAULT_A, VAULT_B],
        meta_vault_address: Some(META_VAULT),
        subgraph_url: Some(Url::parse("http://localhost:8000/subgraph").unwrap()),
        subgraph_api_key: Some("test-key".into()),
    }
}

pub fn test_context(chain: MockChain, subgraph: Option<MockSubgraph>) -> AppContext {
    AppContext {
        config: test_config(),
        chain: Arc::new(chain),
        subgraph: subgraph.map(|s| Arc::new(s) as Arc<dyn GraphQlTransport>),
    }
}
