use crate::engine::{
    decode::decode_unsigned_int, decode_output, encode_call, execute_batch, load_abi,
    parse_amount_list, validate_address, validate_address_list, CallSpec,
};
use crate::error::{Result, VaultError};
use crate::ethereum::ChainReader;
use crate::transaction::UnsignedTransaction;
use alloy::{
    dyn_abi::DynSolValue,
    json_abi::JsonAbi,
    primitives::{Address, U256},
};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimableAssets {
    pub requested_assets: String,
    pub claimable_assets: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationAction {
    Allocate,
    RedeemAllocations,
    WithdrawAllocations,
}

impl AllocationAction {
    fn function(&self) -> &'static str {
        match self {
            Self::Allocate => "allocate",
            Self::RedeemAllocations => "redeemAllocations",
            Self::WithdrawAllocations => "withdrawAllocations",
        }
    }

    /// Name of the per-target amount list for this action.
    pub fn amount_label(&self) -> &'static str {
        match self {
            Self::RedeemAllocations => "shares",
            Self::Allocate | Self::WithdrawAllocations => "assets",
        }
    }
}

/// Handle on the meta vault contract that allocates across logarithm vaults.
pub struct MetaVault<'a> {
    chain: &'a dyn ChainReader,
    address: Address,
    multicall: Address,
    chain_id: u64,
    abi: JsonAbi,
}

impl<'a> MetaVault<'a> {
    pub fn new(
        chain: &'a dyn ChainReader,
        address: Address,
        multicall: Address,
        chain_id: u64,
    ) -> Result<Self> {
        Ok(Self {
            chain,
            address,
            multicall,
            chain_id,
            abi: load_abi(crate::engine::encoder::META_VAULT_ABI)?,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    async fn read(&self, function: &str, args: &[DynSolValue]) -> Result<Vec<DynSolValue>> {
        let payload = encode_call(&self.abi, function, args)?;
        let data = self.chain.call(self.address, payload).await?;
        decode_output(&self.abi, function, &data)
    }

    async fn read_single(&self, function: &str, args: &[DynSolValue]) -> Result<DynSolValue> {
        self.read(function, args)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| VaultError::Decode(format!("{function} returned no values")))
    }

    async fn read_uint(&self, function: &str) -> Result<U256> {
        let value = self.read_single(function, &[]).await?;
        as_uint(function, &value)
    }

    async fn read_addresses(&self, function: &str) -> Result<Vec<Address>> {
        match self.read_single(function, &[]).await? {
            DynSolValue::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_address()
                        .ok_or_else(|| VaultError::Decode(format!("{function}: expected address")))
                })
                .collect(),
            _ => Err(VaultError::Decode(format!("{function}: expected address[]"))),
        }
    }

    pub async fn allocated_assets(&self) -> Result<String> {
        Ok(self.read_uint("allocatedAssets").await?.to_string())
    }

    pub async fn allocated_vaults(&self) -> Result<Vec<Address>> {
        self.read_addresses("allocatedVaults").await
    }

    pub async fn allocation_claimable_assets(&self) -> Result<ClaimableAssets> {
        let function = "allocationClaimableAssets";
        let values = self.read(function, &[]).await?;
        match values.as_slice() {
            [requested, claimable] => Ok(ClaimableAssets {
                requested_assets: as_uint(function, requested)?.to_string(),
                claimable_assets: as_uint(function, claimable)?.to_string(),
            }),
            _ => Err(VaultError::Decode(format!(
                "{function}: expected 2 values, got {}",
                values.len()
            ))),
        }
    }

    pub async fn allocation_withdraw_keys(&self, logarithm_vault: &str) -> Result<Vec<String>> {
        let vault = validate_address(logarithm_vault)?;
        let function = "allocationWithdrawKeys";
        match self
            .read_single(function, &[DynSolValue::Address(vault)])
            .await?
        {
            DynSolValue::Array(items) => items
                .iter()
                .map(|item| match item {
                    DynSolValue::FixedBytes(word, 32) => Ok(format!("0x{}", hex::encode(word))),
                    _ => Err(VaultError::Decode(format!("{function}: expected bytes32"))),
                })
                .collect(),
            _ => Err(VaultError::Decode(format!("{function}: expected bytes32[]"))),
        }
    }

    pub async fn claimable_vaults(&self) -> Result<Vec<Address>> {
        self.read_addresses("claimableVaults").await
    }

    pub async fn idle_assets(&self) -> Result<String> {
        Ok(self.read_uint("idleAssets").await?.to_string())
    }

    /// `totalAssets * 10^decimals / totalSupply`, or `0` for an empty vault.
    /// The three reads share one block.
    pub async fn share_price(&self) -> Result<String> {
        let calls = ["totalSupply", "totalAssets", "decimals"]
            .into_iter()
            .map(|function| Ok(CallSpec::new(self.address, encode_call(&self.abi, function, &[])?)))
            .collect::<Result<Vec<_>>>()?;

        let batch = execute_batch(self.chain, self.multicall, &calls, true).await?;
        let words = batch
            .results
            .iter()
            .map(|r| decode_unsigned_int(&r.return_data))
            .collect::<Result<Vec<_>>>()?;
        let &[total_supply, total_assets, decimals] = words.as_slice() else {
            return Err(VaultError::Decode("share price batch is incomplete".into()));
        };

        if total_supply.is_zero() {
            return Ok("0".to_string());
        }
        let decimals = u8::try_from(decimals)
            .map_err(|_| VaultError::Decode(format!("decimals {decimals} out of range")))?;
        let scaled = U256::from(10u64)
            .checked_pow(U256::from(decimals))
            .and_then(|unit| total_assets.checked_mul(unit))
            .ok_or_else(|| VaultError::Decode("share price overflows uint256".into()))?;
        Ok((scaled / total_supply).to_string())
    }

    /// Builds the unsigned payload for an allocate/redeem/withdraw call across
    /// `targets`, one amount per target.
    pub async fn prepare_allocation_transaction<S: AsRef<str>>(
        &self,
        action: AllocationAction,
        from: &str,
        targets: &[S],
        amounts: &[S],
    ) -> Result<UnsignedTransaction> {
        if targets.len() != amounts.len() {
            return Err(VaultError::InvalidParameter(format!(
                "targets and {} lists must be the same length ({} vs {})",
                action.amount_label(),
                targets.len(),
                amounts.len()
            )));
        }
        if targets.is_empty() {
            return Err(VaultError::InvalidParameter("targets must not be empty".into()));
        }

        let from = validate_address(from)?;
        let targets = validate_address_list(targets)?;
        let amounts = parse_amount_list(amounts)?;

        let data = encode_call(
            &self.abi,
            action.function(),
            &[
                DynSolValue::Array(targets.into_iter().map(DynSolValue::Address).collect()),
                DynSolValue::Array(
                    amounts
                        .into_iter()
                        .map(|amount| DynSolValue::Uint(amount, 256))
                        .collect(),
                ),
            ],
        )?;

        let nonce = self.chain.transaction_count(from).await?;
        info!(function = action.function(), %from, nonce, "prepared unsigned transaction");

        Ok(UnsignedTransaction::new(self.address, from, data, nonce, self.chain_id))
    }
}

fn as_uint(function: &str, value: &DynSolValue) -> Result<U256> {
    value
        .as_uint()
        .map(|(v, _)| v)
        .ok_or_else(|| VaultError::Decode(format!("{function}: expected uint")))
}
