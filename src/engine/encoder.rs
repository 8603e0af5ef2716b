use crate::error::{Result, VaultError};
use alloy::{
    dyn_abi::{DynSolType, DynSolValue},
    json_abi::{Function, JsonAbi, Param},
    primitives::{keccak256, Address, Bytes},
};

pub const LOGARITHM_VAULT_ABI: &str = include_str!("../../abis/LogarithmVault.abi.json");
pub const META_VAULT_ABI: &str = include_str!("../../abis/MetaVault.abi.json");

/// A single contract read or write, ready to be batched or sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSpec {
    pub target: Address,
    pub payload: Bytes,
}

impl CallSpec {
    pub fn new(target: Address, payload: Bytes) -> Self {
        Self { target, payload }
    }
}

pub fn load_abi(json: &str) -> Result<JsonAbi> {
    serde_json::from_str(json).map_err(|e| VaultError::Encoding(format!("invalid ABI document: {e}")))
}

fn lookup<'a>(abi: &'a JsonAbi, function_name: &str) -> Result<&'a [Function]> {
    abi.function(function_name)
        .map(|overloads| overloads.as_slice())
        .filter(|overloads| !overloads.is_empty())
        .ok_or_else(|| VaultError::FunctionNotFound(function_name.to_string()))
}

fn resolve_types(params: &[Param]) -> Result<Vec<DynSolType>> {
    params
        .iter()
        .map(|param| {
            let ty = param.selector_type();
            DynSolType::parse(&ty)
                .map_err(|e| VaultError::Encoding(format!("unsupported ABI type {ty}: {e}")))
        })
        .collect()
}

fn signature(function: &Function) -> String {
    let types: Vec<_> = function.inputs.iter().map(|p| p.selector_type()).collect();
    format!("{}({})", function.name, types.join(","))
}

/// First four bytes of keccak256 over the canonical signature of the first
/// overload declared under `function_name`.
pub fn function_selector(abi: &JsonAbi, function_name: &str) -> Result<[u8; 4]> {
    let function = &lookup(abi, function_name)?[0];
    Ok(selector_of(function))
}

fn selector_of(function: &Function) -> [u8; 4] {
    let hash = keccak256(signature(function).as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash[..4]);
    selector
}

/// Builds `selector ++ abi_encode(args)` for `function_name`.
///
/// When the name is overloaded, the first overload whose arity matches `args`
/// is used. Arguments must already carry the exact declared type; no implicit
/// widening is performed.
pub fn encode_call(abi: &JsonAbi, function_name: &str, args: &[DynSolValue]) -> Result<Bytes> {
    let overloads = lookup(abi, function_name)?;
    let function = overloads
        .iter()
        .find(|f| f.inputs.len() == args.len())
        .ok_or_else(|| {
            VaultError::Encoding(format!(
                "{function_name} expects {} arguments, got {}",
                overloads[0].inputs.len(),
                args.len()
            ))
        })?;

    let types = resolve_types(&function.inputs)?;
    for (index, (ty, value)) in types.iter().zip(args).enumerate() {
        if !ty.matches(value) {
            return Err(VaultError::Encoding(format!(
                "argument {index} of {function_name} cannot be coerced to {}",
                ty.sol_type_name()
            )));
        }
    }

    let mut payload = selector_of(function).to_vec();
    if !args.is_empty() {
        payload.extend(DynSolValue::Tuple(args.to_vec()).abi_encode_params());
    }
    Ok(Bytes::from(payload))
}

/// Decodes a complete return payload against the declared outputs of the
/// first overload of `function_name`.
pub fn decode_output(abi: &JsonAbi, function_name: &str, data: &[u8]) -> Result<Vec<DynSolValue>> {
    let function = &lookup(abi, function_name)?[0];
    let types = resolve_types(&function.outputs)?;
    let decoded = DynSolType::Tuple(types)
        .abi_decode_params(data)
        .map_err(|e| VaultError::Decode(format!("{function_name} output: {e}")))?;

    match decoded {
        DynSolValue::Tuple(values) => Ok(values),
        other => Ok(vec![other]),
    }
}
