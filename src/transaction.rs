use crate::engine::serialize_checksummed;
use alloy::primitives::{Address, Bytes, U256};
use serde::{Serialize, Serializer};

/// A payload field the signer may fill in itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoOr<T> {
    Auto,
    Value(T),
}

impl<T: Serialize> Serialize for AutoOr<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_str("AUTO"),
            Self::Value(value) => value.serialize(serializer),
        }
    }
}

/// Wei as a JSON integer, or a decimal string once it no longer fits `u64`.
fn serialize_wei<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    match u64::try_from(*value) {
        Ok(small) => serializer.serialize_u64(small),
        Err(_) => serializer.collect_str(value),
    }
}

/// Transaction payload handed back to the caller for signing. Never signed here.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransaction {
    #[serde(serialize_with = "serialize_checksummed")]
    pub to: Address,
    #[serde(serialize_with = "serialize_checksummed")]
    pub from: Address,
    pub data: Bytes,
    #[serde(serialize_with = "serialize_wei")]
    pub value: U256,
    pub gas: AutoOr<u64>,
    pub gas_price: AutoOr<u128>,
    pub nonce: AutoOr<u64>,
    pub chain_id: u64,
}

impl UnsignedTransaction {
    pub fn new(to: Address, from: Address, data: Bytes, nonce: u64, chain_id: u64) -> Self {
        Self {
            to,
            from,
            data,
            value: U256::ZERO,
            gas: AutoOr::Auto,
            gas_price: AutoOr::Auto,
            nonce: AutoOr::Value(nonce),
            chain_id,
        }
    }
}
