//! In-memory stand-ins for the cluster and the Phantom extension.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chain_sol::{Blockhash, Keypair, Pubkey, Signature, Transaction};
use serde_json::{json, Value};
use tokio::sync::Notify;
use wallet_demo::{
    Commitment, ConnectOpts, ConnectResponse, DemoConfig, DisplayEncoding, EventHandler,
    EventPayload, LatestBlockhash, NetworkClient, ProviderError, ProviderEvent, RequestMethod,
    RpcError, SignatureStatus, SignedMessage, WalletProvider,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn test_config() -> DemoConfig {
    DemoConfig {
        confirm_poll_interval_ms: 1,
        ..DemoConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fail {
    Airdrop,
    Balance,
    Blockhash,
    Send,
}

#[derive(Default)]
struct Ledger {
    balances: HashMap<Pubkey, u64>,
    statuses: HashMap<Signature, SignatureStatus>,
    /// Status reads left before a signature reports its final level.
    pending_reads: HashMap<Signature, u32>,
    block_height: u64,
    next_id: u64,
    failures: HashSet<Fail>,
    sent: Vec<Transaction>,
    status_reads: usize,
}

pub struct FakeNetwork {
    ledger: Mutex<Ledger>,
    fee_lamports: u64,
    /// Status reads that stay at `processed` before confirming.
    confirm_after: u32,
    /// Blocks a blockhash stays valid for.
    validity: u64,
    never_confirm: AtomicBool,
    airdrop_gate: Option<Arc<Notify>>,
}

impl FakeNetwork {
    pub fn new(fee_lamports: u64) -> Self {
        Self {
            ledger: Mutex::new(Ledger::default()),
            fee_lamports,
            confirm_after: 0,
            validity: 150,
            never_confirm: AtomicBool::new(false),
            airdrop_gate: None,
        }
    }

    pub fn confirming_after(mut self, reads: u32) -> Self {
        self.confirm_after = reads;
        self
    }

    pub fn with_validity(mut self, blocks: u64) -> Self {
        self.validity = blocks;
        self
    }

    /// Hold every airdrop until the gate is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.airdrop_gate = Some(gate);
        self
    }

    pub fn never_confirm(&self) {
        self.never_confirm.store(true, Ordering::SeqCst);
    }

    pub fn fail(&self, what: Fail) {
        self.ledger.lock().unwrap().failures.insert(what);
    }

    pub fn recover(&self, what: Fail) {
        self.ledger.lock().unwrap().failures.remove(&what);
    }

    pub fn fund(&self, pubkey: &Pubkey, lamports: u64) {
        *self.ledger.lock().unwrap().balances.entry(*pubkey).or_default() += lamports;
    }

    pub fn balance(&self, pubkey: &Pubkey) -> u64 {
        self.ledger
            .lock()
            .unwrap()
            .balances
            .get(pubkey)
            .copied()
            .unwrap_or(0)
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.ledger.lock().unwrap().sent.clone()
    }

    pub fn status_reads(&self) -> usize {
        self.ledger.lock().unwrap().status_reads
    }

    fn check(&self, ledger: &Ledger, what: Fail) -> Result<(), RpcError> {
        if ledger.failures.contains(&what) {
            return Err(RpcError::Transport(format!("{what:?} unavailable")));
        }
        Ok(())
    }

    fn record(&self, ledger: &mut Ledger, signature: Signature) {
        let level = if self.never_confirm.load(Ordering::SeqCst) {
            Commitment::Processed
        } else {
            Commitment::Confirmed
        };
        ledger.statuses.insert(
            signature,
            SignatureStatus {
                confirmation_status: Some(level),
                err: None,
            },
        );
        ledger.pending_reads.insert(signature, self.confirm_after);
    }
}

#[async_trait]
impl NetworkClient for FakeNetwork {
    async fn get_balance(&self, pubkey: &Pubkey, _commitment: Commitment) -> Result<u64, RpcError> {
        let ledger = self.ledger.lock().unwrap();
        self.check(&ledger, Fail::Balance)?;
        Ok(ledger.balances.get(pubkey).copied().unwrap_or(0))
    }

    async fn get_latest_blockhash(
        &self,
        _commitment: Commitment,
    ) -> Result<LatestBlockhash, RpcError> {
        let ledger = self.ledger.lock().unwrap();
        self.check(&ledger, Fail::Blockhash)?;
        let mut hash = [0u8; 32];
        hash[..8].copy_from_slice(&ledger.block_height.to_le_bytes());
        Ok(LatestBlockhash {
            blockhash: Blockhash::new(hash),
            last_valid_block_height: ledger.block_height + self.validity,
        })
    }

    async fn request_airdrop(
        &self,
        pubkey: &Pubkey,
        lamports: u64,
        _commitment: Commitment,
    ) -> Result<Signature, RpcError> {
        if let Some(gate) = &self.airdrop_gate {
            gate.notified().await;
        }
        let mut ledger = self.ledger.lock().unwrap();
        self.check(&ledger, Fail::Airdrop)?;
        ledger.next_id += 1;
        let mut bytes = [0xa1u8; 64];
        bytes[..8].copy_from_slice(&ledger.next_id.to_le_bytes());
        let signature = Signature::new(bytes);
        *ledger.balances.entry(*pubkey).or_default() += lamports;
        self.record(&mut ledger, signature);
        Ok(signature)
    }

    async fn send_transaction(
        &self,
        transaction: &Transaction,
        _preflight_commitment: Commitment,
    ) -> Result<Signature, RpcError> {
        let mut ledger = self.ledger.lock().unwrap();
        self.check(&ledger, Fail::Send)?;

        // Exercise the real wire format end to end.
        let wire = transaction.serialize()?;
        let tx = Transaction::deserialize(&wire).map_err(|e| RpcError::Server {
            code: -32602,
            message: e.to_string(),
        })?;
        tx.verify().map_err(|e| RpcError::Server {
            code: -32003,
            message: e.to_string(),
        })?;

        let payer = *tx.message.fee_payer().ok_or_else(|| RpcError::Server {
            code: -32602,
            message: "no fee payer".into(),
        })?;
        let transfers = tx.message.system_transfers();
        let debit: u64 = transfers.iter().map(|t| t.lamports).sum::<u64>() + self.fee_lamports;
        let available = ledger.balances.get(&payer).copied().unwrap_or(0);
        if available < debit {
            return Err(RpcError::Server {
                code: -32002,
                message: "insufficient funds for fee and transfer".into(),
            });
        }

        *ledger.balances.entry(payer).or_default() -= self.fee_lamports;
        for t in &transfers {
            *ledger.balances.entry(t.from).or_default() -= t.lamports;
            *ledger.balances.entry(t.to).or_default() += t.lamports;
        }

        let signature = *tx.signature().ok_or_else(|| RpcError::Server {
            code: -32602,
            message: "unsigned".into(),
        })?;
        self.record(&mut ledger, signature);
        ledger.sent.push(tx);
        Ok(signature)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcError> {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.status_reads += 1;
        let Some(status) = ledger.statuses.get(signature).cloned() else {
            return Ok(None);
        };
        let pending = ledger.pending_reads.entry(*signature).or_default();
        if *pending > 0 {
            *pending -= 1;
            return Ok(Some(SignatureStatus {
                confirmation_status: Some(Commitment::Processed),
                err: None,
            }));
        }
        Ok(Some(status))
    }

    async fn get_block_height(&self, _commitment: Commitment) -> Result<u64, RpcError> {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.block_height += 1;
        Ok(ledger.block_height)
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

pub struct FakeProvider {
    keypair: Mutex<Keypair>,
    phantom: bool,
    connected: AtomicBool,
    reject_connect: AtomicBool,
    fail_disconnect: AtomicBool,
    connect_calls: AtomicUsize,
    last_opts: Mutex<Option<ConnectOpts>>,
    handlers: Mutex<Vec<(ProviderEvent, EventHandler)>>,
}

impl FakeProvider {
    pub fn phantom(seed: u8) -> Arc<Self> {
        Arc::new(Self::build(seed, true))
    }

    /// An injected object that does not claim to be Phantom.
    pub fn impostor(seed: u8) -> Arc<Self> {
        Arc::new(Self::build(seed, false))
    }

    fn build(seed: u8, phantom: bool) -> Self {
        Self {
            keypair: Mutex::new(Keypair::from_seed(&[seed; 32])),
            phantom,
            connected: AtomicBool::new(false),
            reject_connect: AtomicBool::new(false),
            fail_disconnect: AtomicBool::new(false),
            connect_calls: AtomicUsize::new(0),
            last_opts: Mutex::new(None),
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.lock().unwrap().pubkey()
    }

    pub fn reject_connections(&self, reject: bool) {
        self.reject_connect.store(reject, Ordering::SeqCst);
    }

    pub fn fail_disconnects(&self, fail: bool) {
        self.fail_disconnect.store(fail, Ordering::SeqCst);
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn last_opts(&self) -> Option<ConnectOpts> {
        *self.last_opts.lock().unwrap()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.lock().unwrap().len()
    }

    /// Fire `payload` at every handler registered for its event.
    pub fn emit(&self, payload: EventPayload) {
        let handlers = self.handlers.lock().unwrap();
        for (event, handler) in handlers.iter() {
            if *event == payload.event() {
                handler(&payload);
            }
        }
    }

    /// Simulate the user switching accounts inside the extension.
    pub fn switch_account(&self, seed: u8) {
        let next = Keypair::from_seed(&[seed; 32]);
        let pubkey = next.pubkey();
        *self.keypair.lock().unwrap() = next;
        self.emit(EventPayload::AccountChanged(Some(pubkey)));
    }

    /// Simulate the user disconnecting from inside the extension.
    pub fn disconnect_externally(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.emit(EventPayload::Disconnected);
    }
}

#[async_trait]
impl WalletProvider for FakeProvider {
    fn is_phantom(&self) -> bool {
        self.phantom
    }

    fn public_key(&self) -> Option<Pubkey> {
        self.is_connected().then(|| self.pubkey())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn connect(&self, opts: ConnectOpts) -> Result<ConnectResponse, ProviderError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_opts.lock().unwrap() = Some(opts);
        if self.reject_connect.load(Ordering::SeqCst) {
            return Err(ProviderError::UserRejected);
        }
        self.connected.store(true, Ordering::SeqCst);
        let public_key = self.pubkey();
        self.emit(EventPayload::Connected(public_key));
        Ok(ConnectResponse { public_key })
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(ProviderError::Rpc {
                code: 4900,
                message: "extension unreachable".into(),
            });
        }
        self.connected.store(false, Ordering::SeqCst);
        self.emit(EventPayload::Disconnected);
        Ok(())
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction, ProviderError> {
        if !self.is_connected() {
            return Err(ProviderError::NotConnected);
        }
        let keypair = self.keypair.lock().unwrap().clone();
        transaction.sign(&keypair).map_err(|e| ProviderError::Rpc {
            code: -32603,
            message: e.to_string(),
        })?;
        Ok(transaction)
    }

    async fn sign_message(
        &self,
        message: &[u8],
        _display: DisplayEncoding,
    ) -> Result<SignedMessage, ProviderError> {
        if !self.is_connected() {
            return Err(ProviderError::NotConnected);
        }
        let keypair = self.keypair.lock().unwrap().clone();
        Ok(SignedMessage {
            signature: keypair.sign(message),
            public_key: keypair.pubkey(),
        })
    }

    fn on(&self, event: ProviderEvent, handler: EventHandler) {
        self.handlers.lock().unwrap().push((event, handler));
    }

    async fn request(&self, method: RequestMethod, params: Value) -> Result<Value, ProviderError> {
        match method {
            RequestMethod::Connect => {
                let only_if_trusted = params["onlyIfTrusted"].as_bool().unwrap_or(false);
                let response = self.connect(ConnectOpts { only_if_trusted }).await?;
                Ok(json!({ "publicKey": response.public_key.to_string() }))
            }
            RequestMethod::Disconnect => {
                self.disconnect().await?;
                Ok(Value::Null)
            }
            RequestMethod::SignMessage => {
                let message = params["message"].as_str().unwrap_or_default();
                let signed = self
                    .sign_message(message.as_bytes(), DisplayEncoding::Utf8)
                    .await?;
                Ok(json!({
                    "signature": signed.signature.to_string(),
                    "publicKey": signed.public_key.to_string(),
                }))
            }
            other => Err(ProviderError::Unsupported(other.as_str().into())),
        }
    }
}
