use super::{optional_str, AppContext, Tool};
use crate::vault_info::get_all_vault_info;
use anyhow::Result;
use serde_json::{json, Value};

pub struct GetAllVaultInfoTool;

#[async_trait::async_trait]
impl Tool for GetAllVaultInfoTool {
    fn name(&self) -> &'static str {
        "get_all_logarithm_vault_info"
    }

    fn description(&self) -> &'static str {
        "Returns all available Logarithm vaults with their name, symbol, supply, assets, share price, cost rates and pending withdrawals. If a depositor is given, also returns its max deposit and share balance."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "depositor": {
                    "type": "string",
                    "description": "Optional depositor address for max deposit and share balance"
                }
            }
        })
    }

    async fn call(&self, ctx: &AppContext, args: Value) -> Result<Value> {
        let depositor = optional_str(&args, "depositor");

        let report = get_all_vault_info(
            ctx.chain.as_ref(),
            ctx.config.chain_id,
            ctx.config.multicall_address,
            &ctx.config.vault_addresses,
            depositor,
        )
        .await?;

        Ok(serde_json::to_value(report)?)
    }
}
