use crate::error::{Result, VaultError};
use alloy::primitives::{Address, U256};
use serde::Serializer;
use std::str::FromStr;

/// Parses a 20-byte hex address and returns it in canonical form.
///
/// All-lowercase and all-uppercase inputs carry no checksum and are accepted
/// as-is. Mixed-case inputs must match their EIP-55 checksum.
pub fn validate_address(input: &str) -> Result<Address> {
    let trimmed = input.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(VaultError::InvalidAddress(input.to_string()));
    }

    let address =
        Address::from_str(hex_part).map_err(|_| VaultError::InvalidAddress(input.to_string()))?;

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        let checksummed = address.to_checksum(None);
        if checksummed[2..] != *hex_part {
            return Err(VaultError::InvalidAddress(format!(
                "{input} (checksum mismatch)"
            )));
        }
    }

    Ok(address)
}

pub fn validate_address_list<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<Address>> {
    inputs
        .iter()
        .map(|input| validate_address(input.as_ref()))
        .collect()
}

/// Parses a non-negative base-10 integer amount without any float round trip.
pub fn parse_amount(input: &str) -> Result<U256> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(VaultError::InvalidAmount("empty amount".into()));
    }
    if trimmed.starts_with('-') {
        return Err(VaultError::InvalidAmount(format!(
            "{input} (negative amounts are not allowed)"
        )));
    }
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(VaultError::InvalidAmount(input.to_string()));
    }

    U256::from_str_radix(digits, 10)
        .map_err(|_| VaultError::InvalidAmount(format!("{input} (exceeds uint256)")))
}

/// EIP-55 form, used wherever an address leaves the crate.
pub fn to_checksummed(address: &Address) -> String {
    address.to_checksum(None)
}

/// `serialize_with` target for `Address` fields.
pub fn serialize_checksummed<S: Serializer>(
    address: &Address,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_checksummed(address))
}

pub fn parse_amount_list<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<U256>> {
    inputs
        .iter()
        .map(|input| parse_amount(input.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VAULT: &str = "0xe5fc579f20C2dbffd78a92ddD124871a35519659";

    #[test]
    fn checksum_is_independent_of_input_casing() {
        let lower = validate_address(&VAULT.to_lowercase()).unwrap();
        let upper = validate_address(&format!("0x{}", VAULT[2..].to_uppercase())).unwrap();
        let mixed = validate_address(VAULT).unwrap();
        assert_eq!(lower, mixed);
        assert_eq!(upper, mixed);
        assert_eq!(mixed.to_checksum(None), VAULT);
    }

    #[test]
    fn serialized_addresses_carry_the_checksum() {
        #[derive(serde::Serialize)]
        struct Holder {
            #[serde(serialize_with = "serialize_checksummed")]
            vault: Address,
        }
        let vault = validate_address(&VAULT.to_lowercase()).unwrap();
        let json = serde_json::to_value(Holder { vault }).unwrap();
        assert_eq!(json["vault"], VAULT);
    }

    #[test]
    fn validation_is_idempotent() {
        let once = validate_address(&VAULT.to_lowercase()).unwrap();
        let twice = validate_address(&once.to_string()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn rejects_bad_checksum_length_and_charset() {
        let broken = VAULT.replace("C2d", "c2D");
        assert!(matches!(
            validate_address(&broken),
            Err(VaultError::InvalidAddress(_))
        ));
        assert!(validate_address("0x1234").is_err());
        assert!(validate_address("0xzzfc579f20c2dbffd78a92ddd124871a35519659").is_err());
        assert!(validate_address("").is_err());
    }

    #[test]
    fn list_fails_on_first_invalid_entry() {
        let err = validate_address_list(&[VAULT, "nope", "also-bad"]).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn amounts_keep_full_precision() {
        let big = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        assert_eq!(parse_amount(big).unwrap(), U256::MAX);
        assert_eq!(
            parse_amount("1000000000000000000000001").unwrap().to_string(),
            "1000000000000000000000001"
        );
    }

    #[test]
    fn rejects_negative_and_non_numeric_amounts() {
        for bad in ["-1", "1.5", "abc", "", "0x10", "1e18"] {
            assert!(
                matches!(parse_amount(bad), Err(VaultError::InvalidAmount(_))),
                "{bad} should be rejected"
            );
        }
        let overflow = format!("{}0", U256::MAX);
        assert!(parse_amount(&overflow).is_err());
    }
}
