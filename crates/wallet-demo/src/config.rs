//! Demo configuration: cluster endpoint, amounts, commitment, provider lookup.

use std::time::Duration;

use chain_sol::LAMPORTS_PER_SOL;
use serde::{Deserialize, Serialize};

use crate::error::DemoError;
use crate::rpc::Commitment;

/// Public Solana clusters plus a local test validator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    #[default]
    Devnet,
    Testnet,
    MainnetBeta,
    Localnet,
}

impl Cluster {
    pub fn rpc_url(&self) -> &'static str {
        match self {
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Cluster::Localnet => "http://127.0.0.1:8899",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Cluster::Devnet => "Solana Devnet",
            Cluster::Testnet => "Solana Testnet",
            Cluster::MainnetBeta => "Solana Mainnet Beta",
            Cluster::Localnet => "Local Validator",
        }
    }

    /// Whether the cluster runs a faucet.
    pub fn has_faucet(&self) -> bool {
        !matches!(self, Cluster::MainnetBeta)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub cluster: Cluster,
    /// Overrides the cluster's public endpoint.
    pub rpc_url: Option<String>,
    pub commitment: Commitment,
    /// Faucet request made for every generated account.
    pub airdrop_lamports: u64,
    /// Amount moved by one transfer.
    pub transfer_lamports: u64,
    /// Name the provider is injected under.
    pub provider_namespace: String,
    pub install_url: String,
    pub confirm_poll_interval_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            cluster: Cluster::Devnet,
            rpc_url: None,
            commitment: Commitment::Confirmed,
            airdrop_lamports: 2 * LAMPORTS_PER_SOL,
            transfer_lamports: LAMPORTS_PER_SOL,
            provider_namespace: "solana".into(),
            install_url: "https://phantom.app/".into(),
            confirm_poll_interval_ms: 500,
        }
    }
}

impl DemoConfig {
    /// Parse a JSON config; absent fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, DemoError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| DemoError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DemoError> {
        if self.airdrop_lamports == 0 {
            return Err(DemoError::Config("airdrop_lamports must be > 0".into()));
        }
        if self.transfer_lamports == 0 {
            return Err(DemoError::Config("transfer_lamports must be > 0".into()));
        }
        if self.confirm_poll_interval_ms == 0 {
            return Err(DemoError::Config("confirm_poll_interval_ms must be > 0".into()));
        }
        if self.provider_namespace.is_empty() {
            return Err(DemoError::Config("provider_namespace is empty".into()));
        }
        if !self.cluster.has_faucet() && self.rpc_url.is_none() {
            return Err(DemoError::Config(format!(
                "{} has no faucet",
                self.cluster.display_name()
            )));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> &str {
        self.rpc_url.as_deref().unwrap_or(self.cluster.rpc_url())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_interval_ms)
    }
}
