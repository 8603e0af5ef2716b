use alloy::transports::{RpcError, TransportError};
use thiserror::Error;

/// Coarse classification used by callers to decide what to do with a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad caller input. Report immediately, never retry.
    Input,
    /// ABI or data-shape mismatch. Fatal to the current call.
    Fatal,
    /// Transport or remote service failure.
    Remote,
    /// Valid request with nothing to show.
    NoData,
}

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Function {0} not found in ABI")]
    FunctionNotFound(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Remote query error: {0}")]
    RemoteQuery(String),

    #[error("No data found: {0}")]
    NoData(String),

    #[error("Vault query failed: {0}")]
    VaultQuery(#[source] Box<VaultError>),
}

pub type Result<T> = std::result::Result<T, VaultError>;

impl VaultError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAddress(_) | Self::InvalidAmount(_) | Self::InvalidParameter(_) => {
                ErrorKind::Input
            }
            Self::FunctionNotFound(_) | Self::Encoding(_) | Self::Decode(_) => ErrorKind::Fatal,
            Self::Connection(_) | Self::Rpc(_) | Self::RemoteQuery(_) => ErrorKind::Remote,
            Self::NoData(_) => ErrorKind::NoData,
            Self::VaultQuery(inner) => inner.kind(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Remote
    }

    /// Wraps a lower-layer failure raised while aggregating vault info.
    /// Already-wrapped errors are passed through unchanged.
    pub fn vault_query(err: VaultError) -> Self {
        match err {
            Self::VaultQuery(_) => err,
            other => Self::VaultQuery(Box::new(other)),
        }
    }
}

impl From<TransportError> for VaultError {
    fn from(err: TransportError) -> Self {
        match err {
            RpcError::Transport(kind) => Self::Connection(kind.to_string()),
            other => Self::Rpc(other.to_string()),
        }
    }
}
