pub mod history;
pub mod meta_vault;
pub mod vault_info;

use crate::config::Config;
use crate::error::VaultError;
use crate::ethereum::ChainReader;
use crate::subgraph::GraphQlTransport;
use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;

/// Everything a tool call needs. Built once at startup, read-only afterwards.
#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub chain: Arc<dyn ChainReader>,
    pub subgraph: Option<Arc<dyn GraphQlTransport>>,
}

#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn schema(&self) -> Value;
    async fn call(&self, ctx: &AppContext, args: Value) -> Result<Value>;
}

/// Every tool the server exposes.
pub fn all_tools() -> Vec<Box<dyn Tool>> {
    let mut tools: Vec<Box<dyn Tool>> = vec![
        Box::new(vault_info::GetAllVaultInfoTool),
        Box::new(history::GetSharePriceHistoryTool),
    ];
    tools.extend(
        meta_vault::MetaVaultRead::ALL
            .into_iter()
            .map(|read| Box::new(read) as Box<dyn Tool>),
    );
    tools.extend(
        meta_vault::PrepareAllocationTool::ALL
            .into_iter()
            .map(|prepare| Box::new(prepare) as Box<dyn Tool>),
    );
    tools
}

pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> crate::error::Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| VaultError::InvalidParameter(format!("missing string argument {key}")))
}

pub(crate) fn required_int(args: &Value, key: &str) -> crate::error::Result<i64> {
    args.get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| VaultError::InvalidParameter(format!("missing integer argument {key}")))
}

pub(crate) fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Accepts either a JSON array of strings or numbers.
pub(crate) fn required_str_list(args: &Value, key: &str) -> crate::error::Result<Vec<String>> {
    let items = args.get(key).and_then(Value::as_array).ok_or_else(|| {
        VaultError::InvalidParameter(format!("missing argument {key} (expected an array)"))
    })?;
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) if n.is_u64() => Ok(n.to_string()),
            other => Err(VaultError::InvalidParameter(format!(
                "{key} contains unsupported value {other}"
            ))),
        })
        .collect()
}
