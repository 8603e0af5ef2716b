use super::{required_int, required_str_list, AppContext, Tool};
use crate::subgraph::fetch_price_history;
use anyhow::{anyhow, Result};
use serde_json::{json, Value};

pub struct GetSharePriceHistoryTool;

#[async_trait::async_trait]
impl Tool for GetSharePriceHistoryTool {
    fn name(&self) -> &'static str {
        "get_share_price_history"
    }

    fn description(&self) -> &'static str {
        "Get the daily share price history of Logarithm vaults, newest first."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "vault_addresses": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Vault addresses to fetch history for"
                },
                "length": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 365,
                    "description": "Number of most recent daily points to fetch"
                }
            },
            "required": ["vault_addresses", "length"]
        })
    }

    async fn call(&self, ctx: &AppContext, args: Value) -> Result<Value> {
        let vaults = required_str_list(&args, "vault_addresses")?;
        let length = required_int(&args, "length")?;

        let transport = ctx
            .subgraph
            .as_ref()
            .ok_or_else(|| anyhow!("SUBGRAPH_URL is not configured"))?;
        let api_key = ctx
            .config
            .subgraph_api_key
            .as_deref()
            .ok_or_else(|| anyhow!("SUBGRAPH_API_KEY is not configured"))?;

        let history = fetch_price_history(transport.as_ref(), &vaults, length, api_key).await?;
        Ok(serde_json::to_value(history)?)
    }
}
