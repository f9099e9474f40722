//! # wallet-demo
//!
//! Wallet connection and SOL transfer against a Solana test cluster, driven
//! by an injected browser wallet provider. [`WalletDemo`] owns all state; the
//! provider and the RPC endpoint are traits so both can be swapped for fakes.

pub mod account;
pub mod config;
pub mod demo;
pub mod error;
pub mod http;
pub mod provider;
pub mod rpc;
pub mod session;
pub mod transfer;
pub mod view;

pub use account::{AccountFactory, FundedAccount};
pub use config::{Cluster, DemoConfig};
pub use demo::WalletDemo;
pub use error::{DemoError, ProviderError, RpcError};
pub use http::HttpRpcClient;
pub use provider::{
    ConnectOpts, ConnectResponse, DisplayEncoding, EventHandler, EventPayload,
    InjectedProviders, ProviderEnvironment, ProviderEvent, ProviderHandle, ProviderLocator,
    RequestMethod, SignedMessage, WalletProvider,
};
pub use rpc::{confirm_transaction, Commitment, LatestBlockhash, NetworkClient, SignatureStatus};
pub use session::{ConnectedWallet, WalletSession};
pub use transfer::{TransferOperation, TransferRecord};
pub use view::{format_balance, render, Action, Button, InstallNotice, Screen, ViewState};
