//! `WalletDemo`: the single owner of demo state.
//!
//! Every operation runs under an in-flight marker. While it is set the view
//! disables all buttons and any other operation fails with
//! [`DemoError::Busy`]. The state lock is never held across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chain_sol::Pubkey;
use zeroize::Zeroizing;

use crate::account::{AccountFactory, FundedAccount};
use crate::config::DemoConfig;
use crate::error::DemoError;
use crate::provider::{
    EventPayload, ProviderEnvironment, ProviderEvent, ProviderHandle, ProviderLocator,
};
use crate::rpc::NetworkClient;
use crate::session::{ConnectedWallet, WalletSession};
use crate::transfer::{TransferOperation, TransferRecord};
use crate::view::{render, Action, Screen, ViewState};

#[derive(Debug, Default)]
struct DemoState {
    wallet: Option<Pubkey>,
    balance: Option<u64>,
    account: Option<Arc<FundedAccount>>,
    in_flight: Option<Action>,
    last_error: Option<String>,
}

fn lock(state: &Mutex<DemoState>) -> MutexGuard<'_, DemoState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the in-flight marker when the operation ends, however it ends.
struct InFlight<'a> {
    state: &'a Mutex<DemoState>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.state).in_flight = None;
    }
}

pub struct WalletDemo {
    config: DemoConfig,
    accounts: AccountFactory,
    transfers: TransferOperation,
    session: Option<WalletSession>,
    state: Arc<Mutex<DemoState>>,
}

impl WalletDemo {
    /// Validate `config`, detect the provider, wire its events and start with
    /// empty state.
    pub fn mount(
        config: DemoConfig,
        env: &dyn ProviderEnvironment,
        client: Arc<dyn NetworkClient>,
    ) -> Result<Self, DemoError> {
        config.validate()?;
        let state = Arc::new(Mutex::new(DemoState::default()));
        let provider = ProviderLocator::new(config.provider_namespace.clone()).locate(env);
        if let Some(provider) = &provider {
            subscribe(provider, Arc::downgrade(&state));
        }

        log::info!("wallet demo mounted against {}", config.endpoint());
        Ok(Self {
            accounts: AccountFactory::new(client.clone(), &config),
            transfers: TransferOperation::new(client.clone(), &config),
            session: provider.map(|p| WalletSession::new(p, client, config.commitment)),
            config,
            state,
        })
    }

    /// Tear down. Event handlers still registered with the provider become
    /// no-ops once the state is dropped.
    pub fn unmount(self) {
        log::info!("wallet demo unmounted");
    }

    pub fn config(&self) -> &DemoConfig {
        &self.config
    }

    pub fn provider(&self) -> Option<&ProviderHandle> {
        self.session.as_ref().map(WalletSession::provider)
    }

    pub fn connected_wallet(&self) -> Option<Pubkey> {
        lock(&self.state).wallet
    }

    /// Last fetched balance of the connected wallet.
    pub fn balance(&self) -> Option<u64> {
        lock(&self.state).balance
    }

    pub fn account(&self) -> Option<Pubkey> {
        lock(&self.state).account.as_ref().map(|a| a.pubkey())
    }

    /// Secret key of the generated account, `seed || pubkey`.
    pub fn account_secret(&self) -> Option<Zeroizing<[u8; 64]>> {
        lock(&self.state).account.as_ref().map(|a| a.secret_bytes())
    }

    pub fn view_state(&self) -> ViewState {
        let state = lock(&self.state);
        ViewState {
            provider_present: self.session.is_some(),
            wallet: state.wallet,
            balance: state.balance,
            account: state.account.as_ref().map(|a| a.pubkey()),
            in_flight: state.in_flight,
            last_error: state.last_error.clone(),
        }
    }

    pub fn view(&self) -> Screen {
        render(&self.view_state(), &self.config.install_url)
    }

    /// Run the action behind a button, refusing buttons that are not shown.
    pub async fn dispatch(&self, action: Action) -> Result<(), DemoError> {
        if !self.view_state().is_visible(action) {
            return Err(self.fail(action, DemoError::Unavailable(action)));
        }
        match action {
            Action::CreateAccount => self.create_account().await.map(drop),
            Action::ConnectWallet => self.connect_wallet().await.map(drop),
            Action::DisconnectWallet => self.disconnect_wallet().await,
            Action::Transfer => self.transfer().await.map(drop),
        }
    }

    /// Generate and fund a new sender account, replacing any previous one.
    pub async fn create_account(&self) -> Result<Pubkey, DemoError> {
        let action = Action::CreateAccount;
        let _guard = self.begin(action)?;
        let result = self.accounts.create_funded_account().await;
        self.settle(action, result, |state, account| {
            let pubkey = account.pubkey();
            state.account = Some(Arc::new(account));
            pubkey
        })
    }

    pub async fn connect_wallet(&self) -> Result<ConnectedWallet, DemoError> {
        let action = Action::ConnectWallet;
        let session = self.session_for(action)?;
        let _guard = self.begin(action)?;
        let result = session.connect().await;
        self.settle(action, result, |state, wallet| {
            state.wallet = Some(wallet.public_key);
            state.balance = Some(wallet.balance);
            wallet
        })
    }

    /// Disconnect the wallet. Without a connection this is a no-op.
    pub async fn disconnect_wallet(&self) -> Result<(), DemoError> {
        let action = Action::DisconnectWallet;
        let Some(session) = &self.session else {
            return Ok(());
        };
        let _guard = self.begin(action)?;
        let result = session.disconnect().await;
        self.settle(action, result, |state, ()| {
            state.wallet = None;
            state.balance = None;
        })
    }

    /// Send the configured amount from the generated account to the wallet.
    pub async fn transfer(&self) -> Result<TransferRecord, DemoError> {
        let action = Action::Transfer;
        let _guard = self.begin(action)?;
        let (account, wallet) = {
            let state = lock(&self.state);
            (state.account.clone(), state.wallet)
        };
        let Some(account) = account else {
            return Err(self.fail(action, DemoError::NoSender));
        };
        let Some(to) = wallet else {
            return Err(self.fail(action, DemoError::NotConnected));
        };

        let result = self
            .transfers
            .transfer(&account.keypair, &to, self.config.transfer_lamports)
            .await;
        self.settle(action, result, |state, record| {
            // The wallet may have switched while the transfer was in flight.
            if state.wallet == Some(record.to) {
                if let Some(balance) = record.recipient_balance {
                    state.balance = Some(balance);
                }
            }
            record
        })
    }

    fn session_for(&self, action: Action) -> Result<&WalletSession, DemoError> {
        self.session
            .as_ref()
            .ok_or_else(|| self.fail(action, DemoError::NoProvider))
    }

    fn begin(&self, action: Action) -> Result<InFlight<'_>, DemoError> {
        let mut state = lock(&self.state);
        if let Some(running) = state.in_flight {
            drop(state);
            log::debug!("{action} refused while {running} runs");
            return Err(DemoError::Busy(running));
        }
        state.in_flight = Some(action);
        Ok(InFlight { state: &self.state })
    }

    /// Apply a successful result to state, or log and record the failure.
    fn settle<T, R>(
        &self,
        action: Action,
        result: Result<T, DemoError>,
        apply: impl FnOnce(&mut DemoState, T) -> R,
    ) -> Result<R, DemoError> {
        match result {
            Ok(value) => {
                let mut state = lock(&self.state);
                state.last_error = None;
                Ok(apply(&mut state, value))
            }
            Err(err) => Err(self.fail(action, err)),
        }
    }

    fn fail(&self, action: Action, err: DemoError) -> DemoError {
        log::warn!("{action} failed: {err}");
        lock(&self.state).last_error = Some(format!("{action} failed: {err}"));
        err
    }
}

fn subscribe(provider: &ProviderHandle, state: Weak<Mutex<DemoState>>) {
    let on_disconnect = state.clone();
    provider.on(
        ProviderEvent::Disconnect,
        Box::new(move |_| {
            let Some(state) = on_disconnect.upgrade() else {
                return;
            };
            let mut state = lock(&state);
            if state.wallet.take().is_some() {
                log::info!("wallet disconnected by provider");
            }
            state.balance = None;
        }),
    );

    provider.on(
        ProviderEvent::AccountChanged,
        Box::new(move |payload| {
            let EventPayload::AccountChanged(next) = payload else {
                return;
            };
            let Some(state) = state.upgrade() else {
                return;
            };
            let mut state = lock(&state);
            if state.wallet.is_none() {
                return;
            }
            log::info!("wallet account changed to {next:?}");
            state.wallet = *next;
            // Not fetched for the new identity yet.
            state.balance = None;
        }),
    );
}
