//! JSON-RPC access to a Solana-compatible node.

use std::fmt::{self, Display, Formatter};
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use solbank_sdk::{Pubkey, Signature, SignedTransaction};
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::RpcError;

/// Well-known cluster endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RpcUrl {
    #[default]
    Localnet,
    Devnet,
    Testnet,
    Custom(String),
}

impl Display for RpcUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let url = match self {
            RpcUrl::Localnet => "http://localhost:8899",
            RpcUrl::Devnet => "https://api.devnet.solana.com",
            RpcUrl::Testnet => "https://api.testnet.solana.com",
            RpcUrl::Custom(url) => url,
        };
        f.write_str(url)
    }
}

impl FromStr for RpcUrl {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "localnet" | "localhost" => RpcUrl::Localnet,
            "devnet" => RpcUrl::Devnet,
            "testnet" => RpcUrl::Testnet,
            other => RpcUrl::Custom(other.to_string()),
        })
    }
}

/// Whether `url` points at this machine.
pub fn is_loopback_url(url: &str) -> bool {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return false;
    };
    match parsed.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false),
        None => false,
    }
}

/// Commitment levels, weakest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

impl Display for Commitment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An on-chain account as returned by `getAccountInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub lamports: u64,
    pub data: Vec<u8>,
    pub owner: Pubkey,
    pub executable: bool,
}

/// One entry of `getSignatureStatuses`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureStatus {
    pub slot: u64,
    pub confirmation_status: Option<Commitment>,
    /// Transaction error object; `None` on success.
    pub err: Option<Value>,
}

#[async_trait]
pub trait RpcConnection: Send + Sync {
    fn url(&self) -> &str;
    fn commitment(&self) -> Commitment;

    async fn get_balance(&self, address: &Pubkey) -> Result<u64, RpcError>;
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, RpcError>;
    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, RpcError>;
    async fn get_latest_blockhash(&self) -> Result<[u8; 32], RpcError>;
    async fn get_slot(&self) -> Result<u64, RpcError>;

    /// Submit a signed transaction; returns once the node accepts it.
    async fn send_transaction(&self, transaction: &SignedTransaction)
        -> Result<Signature, RpcError>;
    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcError>;
    /// Block until `signature` reaches the connection's commitment.
    async fn confirm_transaction(&self, signature: &Signature) -> Result<(), RpcError>;

    async fn request_airdrop(&self, address: &Pubkey, lamports: u64)
        -> Result<Signature, RpcError>;
}

/// Untyped JSON-RPC access for node-specific methods.
///
/// Validator-only methods are reached through [`CheatCodes`](crate::CheatCodes),
/// which checks the endpoint before calling.
#[async_trait]
pub trait RawRpc: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiAccount {
    lamports: u64,
    owner: String,
    data: (String, String),
    executable: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiBlockhash {
    blockhash: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiSignatureStatus {
    slot: u64,
    confirmation_status: Option<Commitment>,
    err: Option<Value>,
}

/// HTTP JSON-RPC connection.
pub struct SolanaRpcConnection {
    client: reqwest::Client,
    url: String,
    commitment: Commitment,
    confirm_timeout: Duration,
    poll_interval: Duration,
    next_id: AtomicU64,
}

impl fmt::Debug for SolanaRpcConnection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "SolanaRpcConnection {{ url: {} }}", self.url)
    }
}

impl SolanaRpcConnection {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.rpc_url.to_string(),
            commitment: config.commitment,
            confirm_timeout: config.confirm_timeout,
            poll_interval: config.poll_interval,
            next_id: AtomicU64::new(1),
        }
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let result = self.call(method, params).await?;
        serde_json::from_value(result)
            .map_err(|e| RpcError::UnexpectedResponse(format!("{method}: {e}")))
    }
}

#[async_trait]
impl RawRpc for SolanaRpcConnection {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "rpc request");

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        let body: RpcResponse = response.json().await?;

        if let Some(error) = body.error {
            return Err(rpc_error(error));
        }
        body.result
            .ok_or_else(|| RpcError::UnexpectedResponse(format!("{method}: missing result")))
    }
}

#[async_trait]
impl RpcConnection for SolanaRpcConnection {
    fn url(&self) -> &str {
        &self.url
    }

    fn commitment(&self) -> Commitment {
        self.commitment
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64, RpcError> {
        let balance: WithContext<u64> = self
            .request(
                "getBalance",
                json!([address.to_string(), { "commitment": self.commitment }]),
            )
            .await?;
        Ok(balance.value)
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, RpcError> {
        let account: WithContext<Option<UiAccount>> = self
            .request(
                "getAccountInfo",
                json!([
                    address.to_string(),
                    { "encoding": "base64", "commitment": self.commitment }
                ]),
            )
            .await?;

        let Some(ui) = account.value else {
            return Ok(None);
        };
        let data = STANDARD
            .decode(&ui.data.0)
            .map_err(|e| RpcError::UnexpectedResponse(format!("account data: {e}")))?;
        Ok(Some(Account {
            lamports: ui.lamports,
            data,
            owner: ui.owner.parse()?,
            executable: ui.executable,
        }))
    }

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, RpcError> {
        self.request(
            "getMinimumBalanceForRentExemption",
            json!([data_len, { "commitment": self.commitment }]),
        )
        .await
    }

    async fn get_latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        let blockhash: WithContext<UiBlockhash> = self
            .request(
                "getLatestBlockhash",
                json!([{ "commitment": self.commitment }]),
            )
            .await?;
        let bytes = bs58::decode(&blockhash.value.blockhash)
            .into_vec()
            .map_err(|e| RpcError::UnexpectedResponse(format!("blockhash: {e}")))?;
        bytes.try_into().map_err(|v: Vec<u8>| {
            RpcError::UnexpectedResponse(format!("blockhash has {} bytes", v.len()))
        })
    }

    async fn get_slot(&self) -> Result<u64, RpcError> {
        self.request("getSlot", json!([{ "commitment": self.commitment }]))
            .await
    }

    async fn send_transaction(
        &self,
        transaction: &SignedTransaction,
    ) -> Result<Signature, RpcError> {
        let wire = STANDARD.encode(transaction.serialize()?);
        let signature: String = self
            .request(
                "sendTransaction",
                json!([
                    wire,
                    { "encoding": "base64", "preflightCommitment": self.commitment }
                ]),
            )
            .await?;
        Ok(signature.parse()?)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcError> {
        let statuses: WithContext<Vec<Option<UiSignatureStatus>>> = self
            .request(
                "getSignatureStatuses",
                json!([[signature.to_string()], { "searchTransactionHistory": true }]),
            )
            .await?;
        Ok(statuses
            .value
            .into_iter()
            .next()
            .flatten()
            .map(|status| SignatureStatus {
                slot: status.slot,
                confirmation_status: status.confirmation_status,
                err: status.err,
            }))
    }

    async fn confirm_transaction(&self, signature: &Signature) -> Result<(), RpcError> {
        let deadline = Instant::now() + self.confirm_timeout;
        loop {
            if let Some(status) = self.get_signature_status(signature).await? {
                if let Some(err) = status.err {
                    return Err(RpcError::rejected(err.to_string(), &err, Vec::new()));
                }
                if status
                    .confirmation_status
                    .is_some_and(|reached| reached >= self.commitment)
                {
                    debug!(%signature, slot = status.slot, "transaction confirmed");
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                return Err(RpcError::ConfirmationTimeout {
                    signature: signature.to_string(),
                    timeout: self.confirm_timeout,
                });
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn request_airdrop(
        &self,
        address: &Pubkey,
        lamports: u64,
    ) -> Result<Signature, RpcError> {
        let signature: String = self
            .request(
                "requestAirdrop",
                json!([address.to_string(), lamports, { "commitment": self.commitment }]),
            )
            .await?;
        Ok(signature.parse()?)
    }
}

/// Preflight failures carry the transaction error and program logs in `data`.
fn rpc_error(error: RpcErrorObject) -> RpcError {
    match error.data {
        Some(data) if data.get("err").is_some_and(|err| !err.is_null()) => {
            let logs = data
                .get("logs")
                .and_then(Value::as_array)
                .map(|logs| {
                    logs.iter()
                        .filter_map(|line| line.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            RpcError::rejected(error.message, &data["err"], logs)
        }
        _ => RpcError::Rpc {
            code: error.code,
            message: error.message,
        },
    }
}
