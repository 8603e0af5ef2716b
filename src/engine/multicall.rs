use crate::engine::encoder::CallSpec;
use crate::error::{Result, VaultError};
use crate::ethereum::ChainReader;
use alloy::{
    primitives::{Address, Bytes},
    sol_types::SolCall,
};
use tracing::debug;

pub mod abi {
    use alloy::sol;

    // Multicall2, deployed on Arbitrum One at 0x842eC2c7D803033Edf55E478F461FC547Bc54EB2
    sol! {
        #[allow(missing_docs)]
        struct Call {
            address target;
            bytes callData;
        }

        #[allow(missing_docs)]
        struct Result {
            bool success;
            bytes returnData;
        }

        #[allow(missing_docs)]
        function tryBlockAndAggregate(bool requireSuccess, Call[] calls)
            external
            returns (uint256 blockNumber, bytes32 blockHash, Result[] returnData);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResult {
    pub success: bool,
    pub return_data: Bytes,
}

#[derive(Debug, Clone)]
pub struct BatchExecutionResult {
    pub block_number: u64,
    pub results: Vec<CallResult>,
}

/// Runs every call in one `tryBlockAndAggregate` read so all results refer to
/// the same block. With `require_all_success = false` a reverting sub-call is
/// reported as `success = false` instead of failing the batch.
///
/// Results are returned in submission order.
pub async fn execute_batch(
    chain: &dyn ChainReader,
    multicall: Address,
    calls: &[CallSpec],
    require_all_success: bool,
) -> Result<BatchExecutionResult> {
    let payload = abi::tryBlockAndAggregateCall {
        requireSuccess: require_all_success,
        calls: calls
            .iter()
            .map(|c| abi::Call {
                target: c.target,
                callData: c.payload.clone(),
            })
            .collect(),
    }
    .abi_encode();

    debug!(calls = calls.len(), %multicall, "submitting multicall batch");
    let raw = chain.call(multicall, Bytes::from(payload)).await?;

    let decoded = abi::tryBlockAndAggregateCall::abi_decode_returns(&raw, true)
        .map_err(|e| VaultError::Decode(format!("multicall response: {e}")))?;

    if decoded.returnData.len() != calls.len() {
        return Err(VaultError::Decode(format!(
            "multicall returned {} results for {} calls",
            decoded.returnData.len(),
            calls.len()
        )));
    }

    let block_number = u64::try_from(decoded.blockNumber)
        .map_err(|_| VaultError::Decode("block number exceeds u64".into()))?;
    debug!(block_number, "multicall batch executed");

    Ok(BatchExecutionResult {
        block_number,
        results: decoded
            .returnData
            .into_iter()
            .map(|r| CallResult {
                success: r.success,
                return_data: r.returnData,
            })
            .collect(),
    })
}

/// Walks a flat result list in fixed-size groups, one group per target.
pub struct BatchCursor<'a> {
    results: &'a [CallResult],
    stride: usize,
    position: usize,
}

impl<'a> BatchCursor<'a> {
    /// Fails unless `results` holds exactly `groups * stride` entries.
    pub fn new(results: &'a [CallResult], stride: usize, groups: usize) -> Result<Self> {
        if stride == 0 {
            return Err(VaultError::Decode("batch stride must be positive".into()));
        }
        let expected = stride
            .checked_mul(groups)
            .ok_or_else(|| VaultError::Decode("batch size overflow".into()))?;
        if results.len() != expected {
            return Err(VaultError::Decode(format!(
                "expected {expected} results ({groups} x {stride}), got {}",
                results.len()
            )));
        }
        Ok(Self {
            results,
            stride,
            position: 0,
        })
    }

    pub fn remaining(&self) -> usize {
        (self.results.len() - self.position) / self.stride
    }

    /// Next group of `stride` results; an error once the batch is exhausted.
    pub fn next_group(&mut self) -> Result<&'a [CallResult]> {
        let end = self.position + self.stride;
        let group = self.results.get(self.position..end).ok_or_else(|| {
            VaultError::Decode(format!(
                "batch cursor out of range at offset {}",
                self.position
            ))
        })?;
        self.position = end;
        Ok(group)
    }
}
