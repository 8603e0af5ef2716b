use crate::engine::validate_address_list;
use crate::error::{Result, VaultError};
use alloy::primitives::Address;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use std::str::FromStr;
use tracing::{debug, info};
use url::Url;

pub const MIN_LENGTH_DAYS: u32 = 1;
pub const MAX_LENGTH_DAYS: u32 = 365;

pub const DAILY_SHARE_PRICE_QUERY: &str = r#"
query DailyPriceHistory($vault_addresses: [Bytes!], $length: Int!) {
  vaultStats_collection(
    interval: day
    orderBy: timestamp
    orderDirection: desc
    first: $length
    where: {
        vault_: {
            address_in: $vault_addresses
        }
    }
  ) {
    timestamp
    pricePerShare
    vault {
      address
      name
    }
  }
}
"#;

/// Posts a GraphQL body to the indexing service.
#[async_trait::async_trait]
pub trait GraphQlTransport: Send + Sync {
    async fn post(&self, api_key: &str, body: &Value) -> Result<Value>;
}

#[derive(Clone)]
pub struct SubgraphClient {
    http: reqwest::Client,
    url: Url,
}

impl SubgraphClient {
    pub fn new(url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait::async_trait]
impl GraphQlTransport for SubgraphClient {
    async fn post(&self, api_key: &str, body: &Value) -> Result<Value> {
        let response = self
            .http
            .post(self.url.clone())
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| VaultError::RemoteQuery(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(VaultError::RemoteQuery(format!("HTTP {status}: {text}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| VaultError::RemoteQuery(format!("malformed JSON response: {e}")))
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistoryEntry {
    pub timestamp_seconds: u64,
    pub price_per_share: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VaultPriceHistory {
    #[serde(serialize_with = "crate::engine::serialize_checksummed")]
    pub address: Address,
    pub name: Option<String>,
    /// `None` when the index does not know the vault at all; newest first otherwise.
    pub price_history: Option<Vec<PriceHistoryEntry>>,
}

/// Per-vault histories in order of first appearance in the response, followed
/// by requested vaults the index returned nothing for.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PriceHistoryResult {
    pub vaults: Vec<VaultPriceHistory>,
}

impl PriceHistoryResult {
    pub fn get(&self, address: &Address) -> Option<&VaultPriceHistory> {
        self.vaults.iter().find(|v| &v.address == address)
    }
}

pub fn validate_length(length_days: i64) -> Result<u32> {
    u32::try_from(length_days)
        .ok()
        .filter(|days| (MIN_LENGTH_DAYS..=MAX_LENGTH_DAYS).contains(days))
        .ok_or_else(|| {
            VaultError::InvalidParameter(format!(
                "length must be between {MIN_LENGTH_DAYS} and {MAX_LENGTH_DAYS} days, got {length_days}"
            ))
        })
}

pub fn build_query(vaults: &[Address], length_days: u32) -> Value {
    let addresses: Vec<String> = vaults
        .iter()
        .map(|a| a.to_checksum(None).to_lowercase())
        .collect();
    json!({
        "query": DAILY_SHARE_PRICE_QUERY,
        "variables": {
            "vault_addresses": addresses,
            "length": length_days,
        }
    })
}

/// Fetches the most recent `length_days` daily share prices for `vaults`.
/// Inputs are validated before anything is sent.
pub async fn fetch_price_history<S: AsRef<str>>(
    transport: &dyn GraphQlTransport,
    vault_addresses: &[S],
    length_days: i64,
    api_key: &str,
) -> Result<PriceHistoryResult> {
    let length_days = validate_length(length_days)?;
    let vaults = validate_address_list(vault_addresses)?;
    if vaults.is_empty() {
        return Err(VaultError::InvalidParameter(
            "at least one vault address is required".into(),
        ));
    }

    let body = build_query(&vaults, length_days);
    debug!(vaults = vaults.len(), length_days, "querying share price history");
    let response = transport.post(api_key, &body).await?;

    let result = process_response(&response, &vaults)?;
    info!(vaults = result.vaults.len(), "share price history fetched");
    Ok(result)
}

fn field<'a>(value: &'a Value, key: &str) -> Result<&'a Value> {
    value
        .get(key)
        .ok_or_else(|| VaultError::RemoteQuery(format!("response entry is missing {key}")))
}

fn as_text(value: &Value, key: &str) -> Result<String> {
    match field(value, key)? {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(VaultError::RemoteQuery(format!("{key} has unexpected value {other}"))),
    }
}

/// Groups the flat `vaultStats_collection` rows by vault and orders each
/// history newest first. Timestamps arrive in microseconds.
pub fn process_response(response: &Value, requested: &[Address]) -> Result<PriceHistoryResult> {
    match response.get("errors") {
        None | Some(Value::Null) => {}
        Some(Value::Array(errors)) if errors.is_empty() => {}
        Some(errors) => return Err(VaultError::RemoteQuery(format!("GraphQL errors: {errors}"))),
    }

    let entries = response
        .get("data")
        .and_then(|d| d.get("vaultStats_collection"))
        .and_then(Value::as_array)
        .filter(|rows| !rows.is_empty())
        .ok_or_else(|| VaultError::NoData("no data found for the specified vaults".into()))?;

    let mut vaults: Vec<VaultPriceHistory> = Vec::new();
    for entry in entries {
        let vault = field(entry, "vault")?;
        let raw_address = as_text(vault, "address")?;
        let address = crate::engine::validate_address(&raw_address)
            .map_err(|_| VaultError::RemoteQuery(format!("bad vault address {raw_address}")))?;
        let name = vault.get("name").and_then(Value::as_str).map(str::to_string);

        let raw_timestamp = as_text(entry, "timestamp")?;
        let micros = raw_timestamp
            .parse::<u64>()
            .map_err(|_| VaultError::RemoteQuery(format!("bad timestamp {raw_timestamp}")))?;
        let raw_price = as_text(entry, "pricePerShare")?;
        let price_per_share = Decimal::from_str(&raw_price)
            .map_err(|_| VaultError::RemoteQuery(format!("bad pricePerShare {raw_price}")))?;

        let point = PriceHistoryEntry {
            timestamp_seconds: micros / 1_000_000,
            price_per_share,
        };

        match vaults.iter_mut().find(|v| v.address == address) {
            Some(existing) => existing.price_history.get_or_insert_with(Vec::new).push(point),
            None => vaults.push(VaultPriceHistory {
                address,
                name,
                price_history: Some(vec![point]),
            }),
        }
    }

    if !requested.is_empty() && !vaults.iter().any(|v| requested.contains(&v.address)) {
        return Err(VaultError::NoData(
            "none of the requested vaults have price history".into(),
        ));
    }

    for history in vaults.iter_mut().filter_map(|v| v.price_history.as_mut()) {
        history.sort_by(|a, b| b.timestamp_seconds.cmp(&a.timestamp_seconds));
    }

    for address in requested {
        if !vaults.iter().any(|v| &v.address == address) {
            vaults.push(VaultPriceHistory {
                address: *address,
                name: None,
                price_history: None,
            });
        }
    }

    Ok(PriceHistoryResult { vaults })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_bounds_are_inclusive() {
        assert_eq!(validate_length(1).unwrap(), 1);
        assert_eq!(validate_length(365).unwrap(), 365);
        for bad in [0, -3, 366, 400] {
            assert!(matches!(
                validate_length(bad),
                Err(VaultError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn query_uses_lowercase_addresses() {
        let vault = crate::engine::validate_address("0xe5fc579f20C2dbffd78a92ddD124871a35519659")
            .unwrap();
        let body = build_query(&[vault], 30);
        assert_eq!(
            body["variables"]["vault_addresses"][0],
            "0xe5fc579f20c2dbffd78a92ddd124871a35519659"
        );
        assert_eq!(body["variables"]["length"], 30);
    }

    #[test]
    fn graphql_errors_are_remote_failures() {
        let response = json!({ "errors": [{ "message": "rate limited" }] });
        let err = process_response(&response, &[]).unwrap_err();
        assert!(matches!(err, VaultError::RemoteQuery(ref m) if m.contains("rate limited")));
    }

    #[test]
    fn null_or_empty_errors_do_not_fail_the_query() {
        let vault = "0xe5fc579f20c2dbffd78a92ddd124871a35519659";
        let row = json!({
            "timestamp": "86400000000",
            "pricePerShare": "1.01",
            "vault": { "address": vault, "name": "A" }
        });
        for errors in [Value::Null, json!([])] {
            let response = json!({ "errors": errors, "data": { "vaultStats_collection": [row.clone()] } });
            let result = process_response(&response, &[]).unwrap();
            assert_eq!(result.vaults[0].price_history.as_ref().unwrap()[0].timestamp_seconds, 86_400);
        }
    }

    #[test]
    fn addresses_serialize_checksummed() {
        let response = json!({ "data": { "vaultStats_collection": [{
            "timestamp": "1000000",
            "pricePerShare": "1",
            "vault": { "address": "0xe5fc579f20c2dbffd78a92ddd124871a35519659", "name": "A" }
        }] } });
        let result = process_response(&response, &[]).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["vaults"][0]["address"], "0xe5fc579f20C2dbffd78a92ddD124871a35519659");
    }

    #[test]
    fn empty_collection_is_no_data() {
        let response = json!({ "data": { "vaultStats_collection": [] } });
        assert!(matches!(
            process_response(&response, &[]),
            Err(VaultError::NoData(_))
        ));
    }
}
