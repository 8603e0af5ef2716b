use crate::engine::{
    decode::{self, DecodeKind, DecodedField, NormalizedAmount, DISPLAY_DECIMALS, SZABO_SCALE, WEI_SCALE},
    encode_call, execute_batch, load_abi, validate_address, BatchCursor, CallResult, CallSpec,
};
use crate::error::{Result, VaultError};
use crate::ethereum::ChainReader;
use alloy::{
    dyn_abi::DynSolValue,
    json_abi::JsonAbi,
    primitives::{Address, U256},
};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultField {
    Name,
    Symbol,
    TotalSupply,
    TotalAssets,
    EntryCostRate,
    ExitCostRate,
    IdleAssets,
    TotalPendingWithdraw,
    MaxDeposit,
    ShareBalance,
}

impl VaultField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Symbol => "symbol",
            Self::TotalSupply => "totalSupply",
            Self::TotalAssets => "totalAssets",
            Self::EntryCostRate => "entryCostRate",
            Self::ExitCostRate => "exitCostRate",
            Self::IdleAssets => "idleAssets",
            Self::TotalPendingWithdraw => "totalPendingWithdraw",
            Self::MaxDeposit => "maxDeposit",
            Self::ShareBalance => "shareBalance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSource {
    None,
    Depositor,
}

/// One slot of the per-vault read group.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: VaultField,
    pub function: &'static str,
    pub args: ArgSource,
    pub kind: DecodeKind,
    /// Implied decimals of the raw integer, `None` for non-numeric fields.
    pub scale: Option<u8>,
}

const fn field(
    field: VaultField,
    function: &'static str,
    args: ArgSource,
    kind: DecodeKind,
    scale: Option<u8>,
) -> FieldSpec {
    FieldSpec {
        field,
        function,
        args,
        kind,
        scale,
    }
}

pub const BASE_FIELDS: [FieldSpec; 8] = [
    field(VaultField::Name, "name", ArgSource::None, DecodeKind::String, None),
    field(VaultField::Symbol, "symbol", ArgSource::None, DecodeKind::String, None),
    field(VaultField::TotalSupply, "totalSupply", ArgSource::None, DecodeKind::UnsignedInteger, Some(SZABO_SCALE)),
    field(VaultField::TotalAssets, "totalAssets", ArgSource::None, DecodeKind::UnsignedInteger, Some(SZABO_SCALE)),
    field(VaultField::EntryCostRate, "entryCost", ArgSource::None, DecodeKind::UnsignedInteger, Some(WEI_SCALE)),
    field(VaultField::ExitCostRate, "exitCost", ArgSource::None, DecodeKind::UnsignedInteger, Some(WEI_SCALE)),
    field(VaultField::IdleAssets, "idleAssets", ArgSource::None, DecodeKind::UnsignedInteger, Some(SZABO_SCALE)),
    field(VaultField::TotalPendingWithdraw, "totalPendingWithdraw", ArgSource::None, DecodeKind::UnsignedInteger, Some(SZABO_SCALE)),
];

pub const DEPOSITOR_FIELDS: [FieldSpec; 2] = [
    field(VaultField::MaxDeposit, "maxDeposit", ArgSource::Depositor, DecodeKind::UnsignedInteger, Some(SZABO_SCALE)),
    field(VaultField::ShareBalance, "balanceOf", ArgSource::Depositor, DecodeKind::UnsignedInteger, Some(SZABO_SCALE)),
];

/// Field layout for one query. Every vault gets the same list, so the list
/// length is the batch stride.
pub fn field_layout(with_depositor: bool) -> Vec<FieldSpec> {
    let mut fields = BASE_FIELDS.to_vec();
    if with_depositor {
        fields.extend_from_slice(&DEPOSITOR_FIELDS);
    }
    fields
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VaultRecord {
    #[serde(serialize_with = "crate::engine::serialize_checksummed")]
    pub address: Address,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub total_supply: Option<NormalizedAmount>,
    pub total_assets: Option<NormalizedAmount>,
    pub share_price: Option<NormalizedAmount>,
    pub entry_cost_rate: Option<NormalizedAmount>,
    pub exit_cost_rate: Option<NormalizedAmount>,
    pub idle_assets: Option<NormalizedAmount>,
    pub total_pending_withdraw: Option<NormalizedAmount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_deposit: Option<NormalizedAmount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_balance: Option<NormalizedAmount>,
    /// Fields whose sub-call reverted inside the batch.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_fields: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultInfoReport {
    pub chain_id: u64,
    pub block_number: u64,
    pub vaults: Vec<VaultRecord>,
}

/// Builds the ordered call list: `fields.len()` calls per vault, vault by vault.
pub fn build_calls(
    abi: &JsonAbi,
    vaults: &[Address],
    fields: &[FieldSpec],
    depositor: Option<Address>,
) -> Result<Vec<CallSpec>> {
    let mut calls = Vec::with_capacity(vaults.len() * fields.len());
    for vault in vaults {
        for spec in fields {
            let args = match spec.args {
                ArgSource::None => Vec::new(),
                ArgSource::Depositor => {
                    let depositor = depositor.ok_or_else(|| {
                        VaultError::InvalidParameter(format!(
                            "{} requires a depositor address",
                            spec.field.as_str()
                        ))
                    })?;
                    vec![DynSolValue::Address(depositor)]
                }
            };
            calls.push(CallSpec::new(*vault, encode_call(abi, spec.function, &args)?));
        }
    }
    Ok(calls)
}

#[derive(Default)]
struct RecordBuilder {
    name: Option<String>,
    symbol: Option<String>,
    total_supply: Option<(U256, NormalizedAmount)>,
    total_assets: Option<(U256, NormalizedAmount)>,
    entry_cost_rate: Option<NormalizedAmount>,
    exit_cost_rate: Option<NormalizedAmount>,
    idle_assets: Option<NormalizedAmount>,
    total_pending_withdraw: Option<NormalizedAmount>,
    max_deposit: Option<NormalizedAmount>,
    share_balance: Option<NormalizedAmount>,
    failed_fields: Vec<&'static str>,
}

impl RecordBuilder {
    fn set_text(&mut self, field: VaultField, value: String) -> Result<()> {
        match field {
            VaultField::Name => self.name = Some(value),
            VaultField::Symbol => self.symbol = Some(value),
            other => return Err(mismatch(other, "string")),
        }
        Ok(())
    }

    fn set_amount(&mut self, field: VaultField, raw: U256, amount: NormalizedAmount) -> Result<()> {
        match field {
            VaultField::TotalSupply => self.total_supply = Some((raw, amount)),
            VaultField::TotalAssets => self.total_assets = Some((raw, amount)),
            VaultField::EntryCostRate => self.entry_cost_rate = Some(amount),
            VaultField::ExitCostRate => self.exit_cost_rate = Some(amount),
            VaultField::IdleAssets => self.idle_assets = Some(amount),
            VaultField::TotalPendingWithdraw => self.total_pending_withdraw = Some(amount),
            VaultField::MaxDeposit => self.max_deposit = Some(amount),
            VaultField::ShareBalance => self.share_balance = Some(amount),
            other => return Err(mismatch(other, "amount")),
        }
        Ok(())
    }

    fn build(self, address: Address) -> Result<VaultRecord> {
        // Both sides share the same scale, so the raw ratio is the share price.
        let share_price = match (self.total_assets, self.total_supply) {
            (Some((assets, _)), Some((supply, _))) => {
                decode::ratio(assets, supply, DISPLAY_DECIMALS)?
            }
            _ => None,
        };

        Ok(VaultRecord {
            address,
            name: self.name,
            symbol: self.symbol,
            total_supply: self.total_supply.map(|(_, a)| a),
            total_assets: self.total_assets.map(|(_, a)| a),
            share_price,
            entry_cost_rate: self.entry_cost_rate,
            exit_cost_rate: self.exit_cost_rate,
            idle_assets: self.idle_assets,
            total_pending_withdraw: self.total_pending_withdraw,
            max_deposit: self.max_deposit,
            share_balance: self.share_balance,
            failed_fields: self.failed_fields,
        })
    }
}

fn mismatch(field: VaultField, expected: &str) -> VaultError {
    VaultError::Decode(format!("field {} cannot hold {expected}", field.as_str()))
}

/// Decodes one vault's result group against `fields`, slot by slot.
pub fn decode_vault(address: Address, fields: &[FieldSpec], group: &[CallResult]) -> Result<VaultRecord> {
    if group.len() != fields.len() {
        return Err(VaultError::Decode(format!(
            "vault {address}: {} results for {} fields",
            group.len(),
            fields.len()
        )));
    }

    let mut builder = RecordBuilder::default();
    for (spec, result) in fields.iter().zip(group) {
        if !result.success {
            warn!(vault = %address, field = spec.field.as_str(), "sub-call reverted");
            builder.failed_fields.push(spec.field.as_str());
            continue;
        }

        let decoded = decode::decode(spec.kind, &result.return_data).map_err(|e| {
            VaultError::Decode(format!("vault {address} field {}: {e}", spec.field.as_str()))
        })?;
        match (decoded, spec.scale) {
            (DecodedField::String(text), _) => builder.set_text(spec.field, text)?,
            (DecodedField::UnsignedInteger(raw), Some(scale)) => {
                let amount = decode::normalize(raw, scale, DISPLAY_DECIMALS)?;
                builder.set_amount(spec.field, raw, amount)?;
            }
            (DecodedField::UnsignedInteger(_), None) | (DecodedField::Bool(_), _) => {
                return Err(mismatch(spec.field, "this value"));
            }
        }
    }

    builder.build(address)
}

/// Reads every configured vault (plus depositor-specific fields when given)
/// in a single multicall and decodes one record per vault, in input order.
/// Every failure, including a malformed depositor, comes back as `VaultQuery`.
pub async fn get_all_vault_info(
    chain: &dyn ChainReader,
    chain_id: u64,
    multicall: Address,
    vaults: &[Address],
    depositor: Option<&str>,
) -> Result<VaultInfoReport> {
    query(chain, chain_id, multicall, vaults, depositor)
        .await
        .map_err(VaultError::vault_query)
}

async fn query(
    chain: &dyn ChainReader,
    chain_id: u64,
    multicall: Address,
    vaults: &[Address],
    depositor: Option<&str>,
) -> Result<VaultInfoReport> {
    let depositor = depositor.map(validate_address).transpose()?;
    let abi = load_abi(crate::engine::encoder::LOGARITHM_VAULT_ABI)?;
    let fields = field_layout(depositor.is_some());
    let calls = build_calls(&abi, vaults, &fields, depositor)?;

    let batch = execute_batch(chain, multicall, &calls, false).await?;

    let mut cursor = BatchCursor::new(&batch.results, fields.len(), vaults.len())?;
    let mut records = Vec::with_capacity(vaults.len());
    for vault in vaults {
        records.push(decode_vault(*vault, &fields, cursor.next_group()?)?);
    }

    info!(
        vaults = records.len(),
        block_number = batch.block_number,
        "vault info aggregated"
    );

    Ok(VaultInfoReport {
        chain_id,
        block_number: batch.block_number,
        vaults: records,
    })
}
