//! Screen rendering. Pure functions of [`ViewState`].

use std::fmt;

use chain_sol::{Pubkey, LAMPORTS_PER_SOL};

/// The four user actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreateAccount,
    ConnectWallet,
    DisconnectWallet,
    Transfer,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::CreateAccount,
        Action::ConnectWallet,
        Action::DisconnectWallet,
        Action::Transfer,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Action::CreateAccount => "Create a New Solana Account",
            Action::ConnectWallet => "Connect to Phantom Wallet",
            Action::DisconnectWallet => "Disconnect from Wallet",
            Action::Transfer => "Transfer SOL to Phantom Wallet",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::CreateAccount => "account creation",
            Action::ConnectWallet => "wallet connection",
            Action::DisconnectWallet => "wallet disconnection",
            Action::Transfer => "transfer",
        })
    }
}

/// Snapshot of everything the screen depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub provider_present: bool,
    pub wallet: Option<Pubkey>,
    pub balance: Option<u64>,
    pub account: Option<Pubkey>,
    pub in_flight: Option<Action>,
    pub last_error: Option<String>,
}

impl ViewState {
    /// Whether the button for `action` is shown.
    pub fn is_visible(&self, action: Action) -> bool {
        let connected = self.wallet.is_some();
        match action {
            Action::CreateAccount => true,
            Action::ConnectWallet => self.provider_present && !connected,
            Action::DisconnectWallet => self.provider_present && connected,
            Action::Transfer => self.provider_present && connected && self.account.is_some(),
        }
    }
}

/// Whole SOL, fractional lamports dropped.
pub fn format_balance(lamports: u64) -> String {
    (lamports / LAMPORTS_PER_SOL).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub action: Action,
    pub label: &'static str,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallNotice {
    pub text: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub heading: String,
    pub status: String,
    pub buttons: Vec<Button>,
    pub notice: Option<InstallNotice>,
    pub error: Option<String>,
}

impl Screen {
    pub fn button(&self, action: Action) -> Option<&Button> {
        self.buttons.iter().find(|b| b.action == action)
    }
}

pub const CONNECT_PROMPT: &str = "Connect Wallet to view Balance";

/// Build the screen for `state`.
///
/// A connected wallet holding 0 lamports shows `0 SOL`; the connect prompt is
/// reserved for the disconnected state.
pub fn render(state: &ViewState, install_url: &str) -> Screen {
    let status = match (state.wallet, state.balance) {
        (Some(_), Some(lamports)) => format!("{} SOL", format_balance(lamports)),
        (Some(_), None) => "Balance unknown".to_string(),
        (None, _) => CONNECT_PROMPT.to_string(),
    };

    // Everything is disabled while an operation is running.
    let buttons = Action::ALL
        .into_iter()
        .filter(|a| state.is_visible(*a))
        .map(|action| Button {
            action,
            label: action.label(),
            enabled: state.in_flight.is_none(),
        })
        .collect();

    let notice = (!state.provider_present).then(|| InstallNotice {
        text: "No provider found. Install Phantom Browser extension".to_string(),
        link: install_url.to_string(),
    });

    Screen {
        heading: "Solana Wallet Demo".to_string(),
        status,
        buttons,
        notice,
        error: state.last_error.clone(),
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.heading)?;
        writeln!(f, "{}", self.status)?;
        for button in &self.buttons {
            let marker = if button.enabled { " " } else { "~" };
            writeln!(f, "[{marker}{}{marker}]", button.label)?;
        }
        if let Some(notice) = &self.notice {
            writeln!(f, "{} ({})", notice.text, notice.link)?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "error: {error}")?;
        }
        Ok(())
    }
}
