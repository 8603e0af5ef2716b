use super::{required_str, required_str_list, AppContext, Tool};
use crate::engine::to_checksummed;
use crate::meta_vault::{AllocationAction, MetaVault};
use alloy::primitives::Address;
use anyhow::{anyhow, Result};
use serde_json::{json, Value};

fn meta_vault(ctx: &AppContext) -> Result<MetaVault<'_>> {
    let address = ctx
        .config
        .meta_vault_address
        .ok_or_else(|| anyhow!("META_VAULT_ADDRESS is not configured"))?;
    Ok(MetaVault::new(
        ctx.chain.as_ref(),
        address,
        ctx.config.multicall_address,
        ctx.config.chain_id,
    )?)
}

fn checksummed(addresses: &[Address]) -> Vec<String> {
    addresses.iter().map(to_checksummed).collect()
}

/// Read-only meta vault queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaVaultRead {
    AllocatedAssets,
    AllocatedVaults,
    AllocationClaimableAssets,
    AllocationWithdrawKeys,
    ClaimableVaults,
    IdleAssets,
    SharePrice,
}

impl MetaVaultRead {
    pub const ALL: [MetaVaultRead; 7] = [
        Self::AllocatedAssets,
        Self::AllocatedVaults,
        Self::AllocationClaimableAssets,
        Self::AllocationWithdrawKeys,
        Self::ClaimableVaults,
        Self::IdleAssets,
        Self::SharePrice,
    ];
}

#[async_trait::async_trait]
impl Tool for MetaVaultRead {
    fn name(&self) -> &'static str {
        match self {
            Self::AllocatedAssets => "get_allocated_assets",
            Self::AllocatedVaults => "get_allocated_vaults",
            Self::AllocationClaimableAssets => "get_allocation_claimable_assets",
            Self::AllocationWithdrawKeys => "get_allocation_withdraw_keys",
            Self::ClaimableVaults => "get_claimable_vaults",
            Self::IdleAssets => "get_idle_assets",
            Self::SharePrice => "get_share_price",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::AllocatedAssets => {
                "Get the total assets the meta vault has allocated across logarithm vaults (raw units)."
            }
            Self::AllocatedVaults => "Get the logarithm vaults that currently hold allocations.",
            Self::AllocationClaimableAssets => {
                "Get the requested and claimable asset amounts from logarithm vault withdrawals."
            }
            Self::AllocationWithdrawKeys => {
                "Get the pending withdraw keys of the meta vault for one logarithm vault."
            }
            Self::ClaimableVaults => "Get the logarithm vaults that have claimable assets.",
            Self::IdleAssets => "Get the meta vault's idle (unallocated) assets (raw units).",
            Self::SharePrice => {
                "Get the meta vault share price as totalAssets * 10^decimals / totalSupply."
            }
        }
    }

    fn schema(&self) -> Value {
        match self {
            Self::AllocationWithdrawKeys => json!({
                "type": "object",
                "properties": {
                    "logarithm_vault_address": {
                        "type": "string",
                        "description": "Address of the logarithm vault"
                    }
                },
                "required": ["logarithm_vault_address"]
            }),
            _ => json!({ "type": "object", "properties": {} }),
        }
    }

    async fn call(&self, ctx: &AppContext, args: Value) -> Result<Value> {
        let vault = meta_vault(ctx)?;
        let value = match self {
            Self::AllocatedAssets => json!({ "allocatedAssets": vault.allocated_assets().await? }),
            Self::AllocatedVaults => {
                json!({ "allocatedVaults": checksummed(&vault.allocated_vaults().await?) })
            }
            Self::AllocationClaimableAssets => {
                serde_json::to_value(vault.allocation_claimable_assets().await?)?
            }
            Self::AllocationWithdrawKeys => {
                let target = required_str(&args, "logarithm_vault_address")?;
                json!({ "withdrawKeys": vault.allocation_withdraw_keys(target).await? })
            }
            Self::ClaimableVaults => {
                json!({ "claimableVaults": checksummed(&vault.claimable_vaults().await?) })
            }
            Self::IdleAssets => json!({ "idleAssets": vault.idle_assets().await? }),
            Self::SharePrice => json!({ "sharePrice": vault.share_price().await? }),
        };
        Ok(value)
    }
}

/// Builds unsigned allocate/redeem/withdraw transactions for the caller to sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepareAllocationTool {
    pub action: AllocationAction,
}

impl PrepareAllocationTool {
    pub const ALL: [PrepareAllocationTool; 3] = [
        Self {
            action: AllocationAction::Allocate,
        },
        Self {
            action: AllocationAction::RedeemAllocations,
        },
        Self {
            action: AllocationAction::WithdrawAllocations,
        },
    ];
}

#[async_trait::async_trait]
impl Tool for PrepareAllocationTool {
    fn name(&self) -> &'static str {
        match self.action {
            AllocationAction::Allocate => "prepare_allocate_transaction",
            AllocationAction::RedeemAllocations => "prepare_redeem_allocations_transaction",
            AllocationAction::WithdrawAllocations => "prepare_withdraw_allocations_transaction",
        }
    }

    fn description(&self) -> &'static str {
        match self.action {
            AllocationAction::Allocate => {
                "Prepare an unsigned transaction allocating assets to multiple logarithm vaults."
            }
            AllocationAction::RedeemAllocations => {
                "Prepare an unsigned transaction redeeming shares from multiple logarithm vaults."
            }
            AllocationAction::WithdrawAllocations => {
                "Prepare an unsigned transaction withdrawing assets from multiple logarithm vaults."
            }
        }
    }

    fn schema(&self) -> Value {
        let amounts = self.action.amount_label();
        json!({
            "type": "object",
            "properties": {
                "from_address": {
                    "type": "string",
                    "description": "Address that will send the transaction"
                },
                "targets": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Logarithm vault addresses"
                },
                amounts: {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Amounts in base units, one per target (strings preserve precision)"
                }
            },
            "required": ["from_address", "targets", amounts]
        })
    }

    async fn call(&self, ctx: &AppContext, args: Value) -> Result<Value> {
        let from = required_str(&args, "from_address")?;
        let targets = required_str_list(&args, "targets")?;
        let amounts = required_str_list(&args, self.action.amount_label())?;

        let tx = meta_vault(ctx)?
            .prepare_allocation_transaction(self.action, from, &targets, &amounts)
            .await?;
        Ok(serde_json::to_value(tx)?)
    }
}
