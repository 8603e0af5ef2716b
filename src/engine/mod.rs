//! Batched contract-query engine: validation, ABI encoding, multicall
//! execution and result decoding.

pub mod decode;
pub mod encoder;
pub mod multicall;
pub mod validate;

pub use decode::{DecodeKind, DecodedField, NormalizedAmount};
pub use encoder::{decode_output, encode_call, function_selector, load_abi, CallSpec};
pub use multicall::{execute_batch, BatchCursor, BatchExecutionResult, CallResult};
pub use validate::{
    parse_amount, parse_amount_list, serialize_checksummed, to_checksummed, validate_address,
    validate_address_list,
};
