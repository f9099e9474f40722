//! JSON-RPC 2.0 over HTTP, implementing [`NetworkClient`] with `reqwest`.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::Engine;
use chain_sol::{Blockhash, Pubkey, Signature, Transaction};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::DemoConfig;
use crate::error::RpcError;
use crate::rpc::{Commitment, LatestBlockhash, NetworkClient, SignatureStatus};

/// A cluster RPC endpoint.
pub struct HttpRpcClient {
    url: String,
    /// reqwest::Client is Arc-backed, cheap to share.
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn from_config(config: &DemoConfig) -> Self {
        Self::new(config.endpoint())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = request_body(id, method, params);
        log::debug!("rpc #{id} -> {method}");

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(format!("{method}: {e}")))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RpcError::Transport(format!("{method}: {e}")))?;

        if !status.is_success() {
            return Err(RpcError::Transport(format!(
                "{method}: HTTP {status}: {}",
                String::from_utf8_lossy(&bytes)
            )));
        }

        decode_response(&bytes)
    }
}

fn request_body(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: Option<T>,
    error: Option<ErrorObject>,
}

#[derive(Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
}

/// Most read methods wrap their payload as `{ context, value }`.
#[derive(Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
    last_valid_block_height: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusValue {
    confirmation_status: Option<Commitment>,
    err: Option<Value>,
}

fn decode_response<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, RpcError> {
    let envelope: Envelope<T> = serde_json::from_slice(bytes)
        .map_err(|e| RpcError::InvalidResponse(format!("malformed body: {e}")))?;

    if let Some(error) = envelope.error {
        return Err(RpcError::Server {
            code: error.code,
            message: error.message,
        });
    }
    envelope
        .result
        .ok_or_else(|| RpcError::InvalidResponse("missing result".into()))
}

fn parse_signature(raw: &str) -> Result<Signature, RpcError> {
    raw.parse()
        .map_err(|e| RpcError::InvalidResponse(format!("signature {raw:?}: {e}")))
}

fn into_latest_blockhash(value: BlockhashValue) -> Result<LatestBlockhash, RpcError> {
    let blockhash: Blockhash = value
        .blockhash
        .parse()
        .map_err(|e| RpcError::InvalidResponse(format!("{e}")))?;
    Ok(LatestBlockhash {
        blockhash,
        last_valid_block_height: value.last_valid_block_height,
    })
}

fn into_signature_status(value: StatusValue) -> SignatureStatus {
    SignatureStatus {
        confirmation_status: value.confirmation_status,
        err: value.err.filter(|e| !e.is_null()).map(|e| e.to_string()),
    }
}

#[async_trait]
impl NetworkClient for HttpRpcClient {
    async fn get_balance(&self, pubkey: &Pubkey, commitment: Commitment) -> Result<u64, RpcError> {
        let result: WithContext<u64> = self
            .call(
                "getBalance",
                json!([pubkey.to_string(), { "commitment": commitment }]),
            )
            .await?;
        Ok(result.value)
    }

    async fn get_latest_blockhash(
        &self,
        commitment: Commitment,
    ) -> Result<LatestBlockhash, RpcError> {
        let result: WithContext<BlockhashValue> = self
            .call("getLatestBlockhash", json!([{ "commitment": commitment }]))
            .await?;
        into_latest_blockhash(result.value)
    }

    async fn request_airdrop(
        &self,
        pubkey: &Pubkey,
        lamports: u64,
        commitment: Commitment,
    ) -> Result<Signature, RpcError> {
        let raw: String = self
            .call(
                "requestAirdrop",
                json!([pubkey.to_string(), lamports, { "commitment": commitment }]),
            )
            .await?;
        parse_signature(&raw)
    }

    async fn send_transaction(
        &self,
        transaction: &Transaction,
        preflight_commitment: Commitment,
    ) -> Result<Signature, RpcError> {
        let wire = transaction.serialize()?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(wire);
        let raw: String = self
            .call(
                "sendTransaction",
                json!([encoded, {
                    "encoding": "base64",
                    "preflightCommitment": preflight_commitment,
                }]),
            )
            .await?;
        parse_signature(&raw)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcError> {
        let result: WithContext<Vec<Option<StatusValue>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature.to_string()], { "searchTransactionHistory": false }]),
            )
            .await?;
        Ok(result
            .value
            .into_iter()
            .next()
            .flatten()
            .map(into_signature_status))
    }

    async fn get_block_height(&self, commitment: Commitment) -> Result<u64, RpcError> {
        self.call("getBlockHeight", json!([{ "commitment": commitment }]))
            .await
    }
}
