//! Faucet-funded throwaway accounts.

use std::sync::Arc;
use std::time::Duration;

use chain_sol::{Keypair, Pubkey, Signature};
use zeroize::Zeroizing;

use crate::config::DemoConfig;
use crate::error::DemoError;
use crate::rpc::{confirm_transaction, Commitment, NetworkClient};

/// A generated keypair whose airdrop has been confirmed.
#[derive(Debug)]
pub struct FundedAccount {
    pub keypair: Keypair,
    pub airdrop_signature: Signature,
    /// Balance read after funding; `None` if that read failed.
    pub balance: Option<u64>,
}

impl FundedAccount {
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn secret_bytes(&self) -> Zeroizing<[u8; 64]> {
        self.keypair.secret_bytes()
    }
}

pub struct AccountFactory {
    client: Arc<dyn NetworkClient>,
    airdrop_lamports: u64,
    commitment: Commitment,
    poll_interval: Duration,
}

impl AccountFactory {
    pub fn new(client: Arc<dyn NetworkClient>, config: &DemoConfig) -> Self {
        Self {
            client,
            airdrop_lamports: config.airdrop_lamports,
            commitment: config.commitment,
            poll_interval: config.poll_interval(),
        }
    }

    /// Generate a keypair and fund it from the faucet.
    ///
    /// Nothing is retried. The account is only returned once the airdrop has
    /// reached the configured commitment.
    pub async fn create_funded_account(&self) -> Result<FundedAccount, DemoError> {
        let keypair = Keypair::generate();
        let pubkey = keypair.pubkey();
        log::info!(
            "sender account {pubkey}, requesting airdrop of {} lamports",
            self.airdrop_lamports
        );

        let airdrop_signature = self
            .client
            .request_airdrop(&pubkey, self.airdrop_lamports, self.commitment)
            .await?;
        let latest = self.client.get_latest_blockhash(self.commitment).await?;
        confirm_transaction(
            self.client.as_ref(),
            &airdrop_signature,
            &latest,
            self.commitment,
            self.poll_interval,
        )
        .await?;
        log::info!("airdrop {airdrop_signature} confirmed for {pubkey}");

        // Funding is settled at this point, a failed read only loses the figure.
        let balance = match self.client.get_balance(&pubkey, self.commitment).await {
            Ok(lamports) => {
                log::info!("sender balance: {lamports} lamports");
                Some(lamports)
            }
            Err(e) => {
                log::warn!("could not read balance of {pubkey}: {e}");
                None
            }
        };

        Ok(FundedAccount {
            keypair,
            airdrop_signature,
            balance,
        })
    }
}
