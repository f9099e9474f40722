//! The network client contract and blockhash-bounded confirmation.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chain_sol::{Blockhash, Pubkey, Signature, Transaction};
use serde::{Deserialize, Serialize};

use crate::error::RpcError;

/// Finality tier a transaction must reach before it is treated as settled.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recent blockhash and the last block height at which it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestBlockhash {
    pub blockhash: Blockhash,
    pub last_valid_block_height: u64,
}

/// Cluster-reported status of one signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub confirmation_status: Option<Commitment>,
    /// Set when the transaction landed but failed.
    pub err: Option<String>,
}

impl SignatureStatus {
    pub fn reached(&self, commitment: Commitment) -> bool {
        self.confirmation_status.is_some_and(|c| c >= commitment)
    }
}

/// The subset of the Solana JSON-RPC API the demo consumes.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    async fn get_balance(&self, pubkey: &Pubkey, commitment: Commitment) -> Result<u64, RpcError>;

    async fn get_latest_blockhash(
        &self,
        commitment: Commitment,
    ) -> Result<LatestBlockhash, RpcError>;

    /// Ask the faucet for `lamports`; returns the airdrop signature.
    async fn request_airdrop(
        &self,
        pubkey: &Pubkey,
        lamports: u64,
        commitment: Commitment,
    ) -> Result<Signature, RpcError>;

    async fn send_transaction(
        &self,
        transaction: &Transaction,
        preflight_commitment: Commitment,
    ) -> Result<Signature, RpcError>;

    /// `None` when the cluster has not seen the signature yet.
    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcError>;

    async fn get_block_height(&self, commitment: Commitment) -> Result<u64, RpcError>;
}

/// Wait until `signature` reaches `commitment`.
///
/// Polls every `poll_interval` and gives up once the cluster's block height
/// passes the blockhash's `last_valid_block_height`.
pub async fn confirm_transaction(
    client: &dyn NetworkClient,
    signature: &Signature,
    blockhash: &LatestBlockhash,
    commitment: Commitment,
    poll_interval: Duration,
) -> Result<(), RpcError> {
    loop {
        if let Some(status) = client.get_signature_status(signature).await? {
            if let Some(reason) = status.err {
                return Err(RpcError::TransactionFailed {
                    signature: *signature,
                    reason,
                });
            }
            if status.reached(commitment) {
                log::debug!("{signature} reached {commitment}");
                return Ok(());
            }
        }

        let block_height = client.get_block_height(commitment).await?;
        if block_height > blockhash.last_valid_block_height {
            return Err(RpcError::BlockhashExpired {
                signature: *signature,
                block_height,
                last_valid_block_height: blockhash.last_valid_block_height,
            });
        }

        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_orders_by_finality() {
        assert!(Commitment::Processed < Commitment::Confirmed);
        assert!(Commitment::Confirmed < Commitment::Finalized);
        assert_eq!(Commitment::default(), Commitment::Confirmed);
    }

    #[test]
    fn commitment_serde_is_lowercase() {
        let json = serde_json::to_string(&Commitment::Finalized).unwrap();
        assert_eq!(json, "\"finalized\"");
        let parsed: Commitment = serde_json::from_str("\"processed\"").unwrap();
        assert_eq!(parsed, Commitment::Processed);
    }

    #[test]
    fn finalized_status_satisfies_confirmed() {
        let status = SignatureStatus {
            confirmation_status: Some(Commitment::Finalized),
            err: None,
        };
        assert!(status.reached(Commitment::Confirmed));
    }

    #[test]
    fn processed_status_does_not_satisfy_confirmed() {
        let status = SignatureStatus {
            confirmation_status: Some(Commitment::Processed),
            err: None,
        };
        assert!(!status.reached(Commitment::Confirmed));

        let unknown = SignatureStatus {
            confirmation_status: None,
            err: None,
        };
        assert!(!unknown.reached(Commitment::Processed));
    }
}
