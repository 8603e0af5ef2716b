use crate::error::{Result, VaultError};
use alloy::primitives::{U256, U512};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::{fmt, str::FromStr};

/// 18 implied decimals (cost rates).
pub const WEI_SCALE: u8 = 18;
/// 6 implied decimals (supply, assets, shares).
pub const SZABO_SCALE: u8 = 6;
pub const DISPLAY_DECIMALS: u8 = 6;

// 10^77 is the largest power of ten below 2^256.
const MAX_EXPONENT: u8 = 77;

const WORD: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeKind {
    String,
    UnsignedInteger,
    Bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedField {
    String(String),
    UnsignedInteger(U256),
    Bool(bool),
}

pub fn decode(kind: DecodeKind, data: &[u8]) -> Result<DecodedField> {
    Ok(match kind {
        DecodeKind::String => DecodedField::String(decode_string(data)?),
        DecodeKind::UnsignedInteger => DecodedField::UnsignedInteger(decode_unsigned_int(data)?),
        DecodeKind::Bool => DecodedField::Bool(decode_bool(data)?),
    })
}

fn word_at(data: &[u8], offset: usize) -> Result<U256> {
    let end = offset
        .checked_add(WORD)
        .ok_or_else(|| VaultError::Decode("word offset overflow".into()))?;
    let word = data.get(offset..end).ok_or_else(|| {
        VaultError::Decode(format!(
            "need {end} bytes to read word at offset {offset}, got {}",
            data.len()
        ))
    })?;
    Ok(U256::from_be_slice(word))
}

fn to_index(value: U256, what: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| VaultError::Decode(format!("{what} {value} is out of range")))
}

/// Decodes an ABI-encoded `string` return value: a head word holding the
/// offset of the tail, then a length word and the bytes themselves.
pub fn decode_string(data: &[u8]) -> Result<String> {
    let offset = to_index(word_at(data, 0)?, "string offset")?;
    let length = to_index(word_at(data, offset)?, "string length")?;
    let start = offset + WORD;
    let bytes = start
        .checked_add(length)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| {
            VaultError::Decode(format!(
                "string length {length} exceeds the {} bytes available",
                data.len().saturating_sub(start)
            ))
        })?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

pub fn decode_unsigned_int(data: &[u8]) -> Result<U256> {
    word_at(data, 0)
}

pub fn decode_bool(data: &[u8]) -> Result<bool> {
    Ok(!word_at(data, 0)?.is_zero())
}

/// A non-negative fixed-point quantity: `mantissa / 10^decimals`.
///
/// Kept as an integer mantissa so values wider than `Decimal` (for instance a
/// `maxDeposit` of `type(uint256).max`) survive intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalizedAmount {
    mantissa: U256,
    decimals: u8,
}

impl NormalizedAmount {
    pub fn mantissa(&self) -> U256 {
        self.mantissa
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// `None` when the value does not fit the 96-bit `Decimal` mantissa.
    pub fn to_decimal(&self) -> Option<Decimal> {
        Decimal::from_str(&self.to_string()).ok()
    }
}

impl fmt::Display for NormalizedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.to_string();
        let decimals = usize::from(self.decimals);
        if decimals == 0 {
            return f.write_str(&digits);
        }
        let padded = format!("{digits:0>width$}", width = decimals + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
        write!(f, "{int_part}.{frac_part}")
    }
}

impl Serialize for NormalizedAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn pow10(exponent: u8) -> U512 {
    U512::from(10u64).pow(U512::from(exponent))
}

fn check_exponent(exponent: u8, what: &str) -> Result<()> {
    if exponent > MAX_EXPONENT {
        return Err(VaultError::InvalidParameter(format!(
            "{what} {exponent} exceeds {MAX_EXPONENT}"
        )));
    }
    Ok(())
}

/// Integer division rounding half to even.
fn div_round_half_even(numerator: U512, denominator: U512) -> U512 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    let twice = remainder << 1;
    if twice > denominator || (twice == denominator && quotient.bit(0)) {
        quotient + U512::from(1u64)
    } else {
        quotient
    }
}

fn narrow(value: U512) -> Result<U256> {
    let limbs = value.as_limbs();
    if limbs[4..].iter().any(|limb| *limb != 0) {
        return Err(VaultError::Decode(format!(
            "normalized value {value} exceeds uint256"
        )));
    }
    Ok(U256::from_limbs_slice(&limbs[..4]))
}

/// Rescales `raw / 10^scale_exponent` to `output_decimals` places, rounding
/// half to even.
pub fn normalize(raw: U256, scale_exponent: u8, output_decimals: u8) -> Result<NormalizedAmount> {
    check_exponent(scale_exponent, "scale exponent")?;
    check_exponent(output_decimals, "output decimals")?;

    let raw = U512::from(raw);
    let mantissa = if scale_exponent >= output_decimals {
        div_round_half_even(raw, pow10(scale_exponent - output_decimals))
    } else {
        raw * pow10(output_decimals - scale_exponent)
    };

    Ok(NormalizedAmount {
        mantissa: narrow(mantissa)?,
        decimals: output_decimals,
    })
}

/// `numerator / denominator` to `output_decimals` places, or `None` when
/// the denominator is zero.
pub fn ratio(
    numerator: U256,
    denominator: U256,
    output_decimals: u8,
) -> Result<Option<NormalizedAmount>> {
    check_exponent(output_decimals, "output decimals")?;
    if denominator.is_zero() {
        return Ok(None);
    }
    let scaled = U512::from(numerator) * pow10(output_decimals);
    let mantissa = div_round_half_even(scaled, U512::from(denominator));
    Ok(Some(NormalizedAmount {
        mantissa: narrow(mantissa)?,
        decimals: output_decimals,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::dyn_abi::DynSolValue;

    #[test]
    fn decodes_abi_encoded_string() {
        let data = DynSolValue::String("Logarithm USDC".into()).abi_encode();
        assert_eq!(decode_string(&data).unwrap(), "Logarithm USDC");
        assert_eq!(decode_string(&DynSolValue::String(String::new()).abi_encode()).unwrap(), "");
    }

    #[test]
    fn string_length_past_end_is_an_error() {
        let mut data = DynSolValue::String("abc".into()).abi_encode();
        data[63] = 200;
        assert!(matches!(decode_string(&data), Err(VaultError::Decode(_))));
        assert!(decode_string(&[]).is_err());
    }

    #[test]
    fn decodes_words() {
        let data = DynSolValue::Uint(U256::from(1_050_000u64), 256).abi_encode();
        assert_eq!(decode_unsigned_int(&data).unwrap(), U256::from(1_050_000u64));
        assert!(decode_bool(&DynSolValue::Bool(true).abi_encode()).unwrap());
        assert!(!decode_bool(&[0u8; 32]).unwrap());
        assert!(decode_unsigned_int(&[1, 2, 3]).is_err());
    }

    #[test]
    fn normalizes_szabo_and_wei_scale() {
        let supply = normalize(U256::from(1_234_567u64), SZABO_SCALE, DISPLAY_DECIMALS).unwrap();
        assert_eq!(supply.to_string(), "1.234567");

        // 0.0015 ether as a cost rate
        let rate = normalize(U256::from(1_500_000_000_000_000u64), WEI_SCALE, DISPLAY_DECIMALS)
            .unwrap();
        assert_eq!(rate.to_string(), "0.001500");
    }

    #[test]
    fn rounds_half_to_even() {
        // 0.0000005 -> 0.000000, 0.0000015 -> 0.000002, 0.0000025 -> 0.000002
        let cases = [
            (500_000_000_000u64, "0.000000"),
            (1_500_000_000_000, "0.000002"),
            (2_500_000_000_000, "0.000002"),
            (2_500_000_000_001, "0.000003"),
        ];
        for (raw, expected) in cases {
            let value = normalize(U256::from(raw), WEI_SCALE, DISPLAY_DECIMALS).unwrap();
            assert_eq!(value.to_string(), expected, "raw {raw}");
        }
    }

    #[test]
    fn szabo_round_trip_is_exact() {
        for raw in [0u64, 1, 999_999, 1_000_000, 123_456_789_012] {
            let value = normalize(U256::from(raw), SZABO_SCALE, DISPLAY_DECIMALS).unwrap();
            assert_eq!(value.mantissa(), U256::from(raw));
        }
    }

    #[test]
    fn max_uint_survives_normalization() {
        let value = normalize(U256::MAX, SZABO_SCALE, DISPLAY_DECIMALS).unwrap();
        assert_eq!(value.mantissa(), U256::MAX);
        assert!(value.to_decimal().is_none());
    }

    #[test]
    fn ratio_guards_zero_denominator() {
        assert_eq!(ratio(U256::from(5u64), U256::ZERO, 6).unwrap(), None);
        let price = ratio(U256::from(1_050_000u64), U256::from(1_000_000u64), 6)
            .unwrap()
            .unwrap();
        assert_eq!(price.to_string(), "1.050000");
    }

    #[test]
    fn serializes_as_fixed_point_string() {
        let value = normalize(U256::from(42u64), SZABO_SCALE, DISPLAY_DECIMALS).unwrap();
        assert_eq!(serde_json::to_string(&value).unwrap(), "\"0.000042\"");
    }
}
