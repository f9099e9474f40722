//! The injected wallet provider contract and its detection.
//!
//! A browser wallet extension (Phantom) injects an object into the page. Here
//! that object is the [`WalletProvider`] trait, and the page is a
//! [`ProviderEnvironment`] that may or may not hold one under a namespace.

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use chain_sol::{Pubkey, Signature, Transaction};
use serde_json::Value;

use crate::error::ProviderError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectOpts {
    /// Connect silently only if the site is already trusted.
    pub only_if_trusted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectResponse {
    pub public_key: Pubkey,
}

/// How the wallet shows a message it is asked to sign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DisplayEncoding {
    #[default]
    Utf8,
    Hex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedMessage {
    pub signature: Signature,
    pub public_key: Pubkey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderEvent {
    Connect,
    Disconnect,
    AccountChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPayload {
    Connected(Pubkey),
    Disconnected,
    /// `None` when the wallet switched to an account this site may not see.
    AccountChanged(Option<Pubkey>),
}

impl EventPayload {
    pub fn event(&self) -> ProviderEvent {
        match self {
            EventPayload::Connected(_) => ProviderEvent::Connect,
            EventPayload::Disconnected => ProviderEvent::Disconnect,
            EventPayload::AccountChanged(_) => ProviderEvent::AccountChanged,
        }
    }
}

pub type EventHandler = Box<dyn Fn(&EventPayload) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestMethod {
    Connect,
    Disconnect,
    SignTransaction,
    SignAllTransactions,
    SignMessage,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Connect => "connect",
            RequestMethod::Disconnect => "disconnect",
            RequestMethod::SignTransaction => "signTransaction",
            RequestMethod::SignAllTransactions => "signAllTransactions",
            RequestMethod::SignMessage => "signMessage",
        }
    }
}

/// Capability set of an injected Solana wallet.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Self-identification flag of the Phantom extension.
    fn is_phantom(&self) -> bool;

    fn public_key(&self) -> Option<Pubkey>;

    fn is_connected(&self) -> bool;

    async fn connect(&self, opts: ConnectOpts) -> Result<ConnectResponse, ProviderError>;

    async fn disconnect(&self) -> Result<(), ProviderError>;

    async fn sign_transaction(&self, transaction: Transaction)
        -> Result<Transaction, ProviderError>;

    async fn sign_all_transactions(
        &self,
        transactions: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, ProviderError> {
        let mut signed = Vec::with_capacity(transactions.len());
        for tx in transactions {
            signed.push(self.sign_transaction(tx).await?);
        }
        Ok(signed)
    }

    async fn sign_message(
        &self,
        message: &[u8],
        display: DisplayEncoding,
    ) -> Result<SignedMessage, ProviderError>;

    /// Register `handler` for `event`. Handlers live as long as the provider.
    fn on(&self, event: ProviderEvent, handler: EventHandler);

    async fn request(&self, method: RequestMethod, params: Value) -> Result<Value, ProviderError>;
}

/// A provider that passed detection.
#[derive(Clone)]
pub struct ProviderHandle(Arc<dyn WalletProvider>);

impl Deref for ProviderHandle {
    type Target = dyn WalletProvider;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("connected", &self.0.is_connected())
            .field("public_key", &self.0.public_key())
            .finish()
    }
}

/// The execution environment a provider may be injected into.
pub trait ProviderEnvironment {
    fn injected(&self, namespace: &str) -> Option<Arc<dyn WalletProvider>>;
}

/// An environment backed by an explicit namespace map.
#[derive(Default, Clone)]
pub struct InjectedProviders {
    objects: HashMap<String, Arc<dyn WalletProvider>>,
}

impl InjectedProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(mut self, namespace: impl Into<String>, provider: Arc<dyn WalletProvider>) -> Self {
        self.objects.insert(namespace.into(), provider);
        self
    }
}

impl ProviderEnvironment for InjectedProviders {
    fn injected(&self, namespace: &str) -> Option<Arc<dyn WalletProvider>> {
        self.objects.get(namespace).cloned()
    }
}

/// Finds a Phantom provider under a fixed namespace.
#[derive(Debug, Clone)]
pub struct ProviderLocator {
    namespace: String,
}

impl ProviderLocator {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn locate(&self, env: &dyn ProviderEnvironment) -> Option<ProviderHandle> {
        let Some(object) = env.injected(&self.namespace) else {
            log::debug!("nothing injected under {:?}", self.namespace);
            return None;
        };
        if !object.is_phantom() {
            log::debug!("object under {:?} is not a Phantom provider", self.namespace);
            return None;
        }
        log::info!("Phantom provider found under {:?}", self.namespace);
        Some(ProviderHandle(object))
    }
}
