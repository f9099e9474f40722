//! One System Program transfer from the generated account to the wallet.

use std::sync::Arc;
use std::time::Duration;

use chain_sol::{build_transfer, Keypair, Pubkey, Signature, LAMPORTS_PER_SOL};

use crate::config::DemoConfig;
use crate::error::DemoError;
use crate::rpc::{confirm_transaction, Commitment, NetworkClient};

/// What one confirmed transfer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRecord {
    pub from: Pubkey,
    pub to: Pubkey,
    pub lamports: u64,
    pub signature: Signature,
    /// Receiver balance read after confirmation; `None` if that read failed.
    pub recipient_balance: Option<u64>,
}

pub struct TransferOperation {
    client: Arc<dyn NetworkClient>,
    commitment: Commitment,
    poll_interval: Duration,
}

impl TransferOperation {
    pub fn new(client: Arc<dyn NetworkClient>, config: &DemoConfig) -> Self {
        Self {
            client,
            commitment: config.commitment,
            poll_interval: config.poll_interval(),
        }
    }

    /// Sign and submit a transfer of `lamports`, then wait for confirmation.
    pub async fn transfer(
        &self,
        from: &Keypair,
        to: &Pubkey,
        lamports: u64,
    ) -> Result<TransferRecord, DemoError> {
        let sender = from.pubkey();
        let latest = self.client.get_latest_blockhash(self.commitment).await?;

        let mut tx = build_transfer(&sender, to, lamports, latest.blockhash)?;
        tx.sign(from)?;

        let signature = self.client.send_transaction(&tx, self.commitment).await?;
        log::info!("transfer {signature}: {lamports} lamports {sender} -> {to}");
        confirm_transaction(
            self.client.as_ref(),
            &signature,
            &latest,
            self.commitment,
            self.poll_interval,
        )
        .await?;

        match self.client.get_balance(&sender, self.commitment).await {
            Ok(b) => log::info!("sender balance: {} SOL", b / LAMPORTS_PER_SOL),
            Err(e) => log::debug!("sender balance unavailable: {e}"),
        }
        let recipient_balance = match self.client.get_balance(to, self.commitment).await {
            Ok(b) => {
                log::info!("receiver balance: {} SOL", b / LAMPORTS_PER_SOL);
                Some(b)
            }
            Err(e) => {
                log::warn!("could not refresh balance of {to}: {e}");
                None
            }
        };

        Ok(TransferRecord {
            from: sender,
            to: *to,
            lamports,
            signature,
            recipient_balance,
        })
    }
}
