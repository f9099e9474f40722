use chain_sol::Signature;
use thiserror::Error;

use crate::view::Action;

/// Failures reported by the injected wallet provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("user rejected the request")]
    UserRejected,

    #[error("wallet is not connected")]
    NotConnected,

    #[error("unsupported request: {0}")]
    Unsupported(String),

    #[error("provider error {code}: {message}")]
    Rpc { code: i64, message: String },
}

/// Failures talking to the cluster RPC endpoint.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Server { code: i64, message: String },

    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),

    #[error("cannot encode request: {0}")]
    Encode(#[from] chain_sol::SolError),

    #[error("transaction {signature} failed: {reason}")]
    TransactionFailed { signature: Signature, reason: String },

    #[error(
        "blockhash expired before {signature} was confirmed \
         (block height {block_height} > {last_valid_block_height})"
    )]
    BlockhashExpired {
        signature: Signature,
        block_height: u64,
        last_valid_block_height: u64,
    },
}

/// Errors surfaced by the demo operations.
#[derive(Debug, Error)]
pub enum DemoError {
    #[error("no wallet provider found")]
    NoProvider,

    #[error("wallet provider: {0}")]
    Provider(#[from] ProviderError),

    #[error("network: {0}")]
    Rpc(#[from] RpcError),

    #[error("SOL: {0}")]
    Chain(#[from] chain_sol::SolError),

    #[error("no funded account, create one first")]
    NoSender,

    #[error("no wallet connected")]
    NotConnected,

    #[error("{0} is already in progress")]
    Busy(Action),

    #[error("{0} is not available right now")]
    Unavailable(Action),

    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_wraps_provider_error() {
        let err: DemoError = ProviderError::UserRejected.into();
        assert_eq!(err.to_string(), "wallet provider: user rejected the request");
    }

    #[test]
    fn display_wraps_rpc_error() {
        let err: DemoError = RpcError::Server {
            code: 429,
            message: "airdrop limit reached".into(),
        }
        .into();
        assert_eq!(err.to_string(), "network: rpc error 429: airdrop limit reached");
    }

    #[test]
    fn display_busy_names_action() {
        let err = DemoError::Busy(Action::Transfer);
        assert_eq!(err.to_string(), "transfer is already in progress");
    }

    #[test]
    fn display_blockhash_expired() {
        let err = RpcError::BlockhashExpired {
            signature: Signature::default(),
            block_height: 12,
            last_valid_block_height: 10,
        };
        assert!(err.to_string().contains("block height 12 > 10"));
    }

    #[test]
    fn encode_failure_is_not_a_response_error() {
        let err: RpcError = chain_sol::SolError::SerializationError("too many keys".into()).into();
        assert!(matches!(err, RpcError::Encode(_)));
        assert_eq!(
            err.to_string(),
            "cannot encode request: serialization error: too many keys"
        );
    }

    #[test]
    fn chain_error_converts() {
        let err: DemoError = chain_sol::SolError::TransactionBuildError("zero".into()).into();
        assert!(matches!(err, DemoError::Chain(_)));
    }
}
