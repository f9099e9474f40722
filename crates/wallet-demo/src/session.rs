//! Connecting and disconnecting the provider wallet.

use std::sync::Arc;

use chain_sol::Pubkey;

use crate::error::DemoError;
use crate::provider::{ConnectOpts, ProviderHandle};
use crate::rpc::{Commitment, NetworkClient};

/// Identity and balance read right after a successful connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectedWallet {
    pub public_key: Pubkey,
    pub balance: u64,
}

/// Provider calls plus the balance reads that follow them. Holds no identity
/// itself; the controller owns that state.
pub struct WalletSession {
    provider: ProviderHandle,
    client: Arc<dyn NetworkClient>,
    commitment: Commitment,
}

impl WalletSession {
    pub fn new(
        provider: ProviderHandle,
        client: Arc<dyn NetworkClient>,
        commitment: Commitment,
    ) -> Self {
        Self {
            provider,
            client,
            commitment,
        }
    }

    pub fn provider(&self) -> &ProviderHandle {
        &self.provider
    }

    /// Prompt the user to connect (never the trusted-only silent path), then
    /// read the wallet balance once.
    pub async fn connect(&self) -> Result<ConnectedWallet, DemoError> {
        let response = self
            .provider
            .connect(ConnectOpts {
                only_if_trusted: false,
            })
            .await?;
        let public_key = response.public_key;
        log::info!("connected wallet address: {public_key}");

        let balance = self.balance_of(&public_key).await?;
        Ok(ConnectedWallet {
            public_key,
            balance,
        })
    }

    /// Disconnect the provider. A no-op when it is not connected.
    pub async fn disconnect(&self) -> Result<(), DemoError> {
        if !self.provider.is_connected() {
            log::debug!("disconnect requested with no connected wallet");
            return Ok(());
        }
        self.provider.disconnect().await?;
        log::info!("wallet disconnected");
        Ok(())
    }

    pub async fn balance_of(&self, public_key: &Pubkey) -> Result<u64, DemoError> {
        Ok(self.client.get_balance(public_key, self.commitment).await?)
    }
}
