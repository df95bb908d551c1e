//! JSON-RPC clients for the payment network.
//!
//! Two endpoints are usually configured: a gating endpoint (always the main
//! network, where the gating token lives) and a payment endpoint (which may
//! point at a test network during development).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use souk_types::WalletAddress;

use crate::{BalanceOracle, ChainError, PaymentVerifier};

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimal JSON-RPC 2.0 client over HTTP.
pub struct RpcClient {
    /// HTTP client (reusable connection pool).
    http_client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one request and decode its `result`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http_client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChainError::Unreachable(format!("request timed out: {e}"))
                } else if e.is_connect() {
                    ChainError::Unreachable(format!("connection failed: {e}"))
                } else {
                    ChainError::RequestFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(ChainError::RequestFailed(format!(
                "{method}: HTTP status {}",
                response.status()
            )));
        }

        let envelope: RpcEnvelope<T> = response.json().await.map_err(|e| {
            ChainError::InvalidResponse(format!("{method}: failed to parse response: {e}"))
        })?;
        unwrap_envelope(method, envelope)
    }

    /// Node software version; used as a connectivity probe.
    pub async fn version(&self) -> Result<String, ChainError> {
        #[derive(Deserialize)]
        struct Version {
            #[serde(rename = "solana-core")]
            core: String,
        }
        let v: Version = self.call("getVersion", json!([])).await?;
        Ok(v.core)
    }
}

fn unwrap_envelope<T>(method: &str, envelope: RpcEnvelope<T>) -> Result<T, ChainError> {
    match (envelope.result, envelope.error) {
        (_, Some(err)) => Err(ChainError::RequestFailed(format!(
            "{method}: rpc error {}: {}",
            err.code, err.message
        ))),
        (Some(result), None) => Ok(result),
        (None, None) => Err(ChainError::InvalidResponse(format!(
            "{method}: neither result nor error"
        ))),
    }
}

// ── Token balance ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenAccounts {
    value: Vec<KeyedAccount>,
}

#[derive(Debug, Deserialize)]
struct KeyedAccount {
    account: ParsedAccount,
}

#[derive(Debug, Deserialize)]
struct ParsedAccount {
    data: ParsedData,
}

#[derive(Debug, Deserialize)]
struct ParsedData {
    parsed: ParsedInfo,
}

#[derive(Debug, Deserialize)]
struct ParsedInfo {
    info: TokenInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenInfo {
    token_amount: TokenAmount,
}

#[derive(Debug, Deserialize)]
struct TokenAmount {
    amount: String,
    decimals: u8,
}

impl TokenAmount {
    fn ui_amount(&self) -> Result<f64, ChainError> {
        let raw: u64 = self
            .amount
            .parse()
            .map_err(|_| ChainError::InvalidResponse(format!("token amount {:?}", self.amount)))?;
        Ok(raw as f64 / 10f64.powi(i32::from(self.decimals)))
    }
}

/// Sum the balances of every token account returned for one owner and mint.
fn total_balance(accounts: &TokenAccounts) -> Result<f64, ChainError> {
    accounts
        .value
        .iter()
        .map(|a| a.account.data.parsed.info.token_amount.ui_amount())
        .sum()
}

/// Reads a wallet's gating-token balance with `getTokenAccountsByOwner`.
pub struct RpcBalanceOracle {
    client: RpcClient,
    mint: String,
}

impl RpcBalanceOracle {
    pub fn new(client: RpcClient, mint: impl Into<String>) -> Self {
        Self {
            client,
            mint: mint.into(),
        }
    }
}

#[async_trait]
impl BalanceOracle for RpcBalanceOracle {
    async fn balance_of(&self, wallet: &WalletAddress) -> Result<f64, ChainError> {
        let accounts: TokenAccounts = self
            .client
            .call(
                "getTokenAccountsByOwner",
                json!([
                    wallet.as_str(),
                    { "mint": self.mint },
                    { "encoding": "jsonParsed", "commitment": "confirmed" }
                ]),
            )
            .await?;
        let balance = total_balance(&accounts)?;
        tracing::debug!(wallet = wallet.short(), balance, "fetched gating balance");
        Ok(balance)
    }
}

// ── Payment verification ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SignatureStatuses {
    value: Vec<Option<SignatureStatus>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    err: Option<Value>,
    confirmation_status: Option<String>,
}

impl SignatureStatus {
    fn settled(&self) -> bool {
        self.err.is_none()
            && matches!(
                self.confirmation_status.as_deref(),
                Some("confirmed") | Some("finalized")
            )
    }
}

/// Verifies settlements with `getSignatureStatuses`: a reference is accepted
/// once the network reports it confirmed or finalized without error.
pub struct RpcPaymentVerifier {
    client: RpcClient,
}

impl RpcPaymentVerifier {
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PaymentVerifier for RpcPaymentVerifier {
    async fn verify(&self, reference: &str) -> Result<bool, ChainError> {
        let statuses: SignatureStatuses = self
            .client
            .call(
                "getSignatureStatuses",
                json!([[reference], { "searchTransactionHistory": true }]),
            )
            .await?;
        let settled = statuses
            .value
            .first()
            .and_then(Option::as_ref)
            .is_some_and(SignatureStatus::settled);
        tracing::debug!(reference, settled, "checked payment reference");
        Ok(settled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_sums_all_accounts() {
        let raw = json!({
            "context": { "slot": 1 },
            "value": [
                { "pubkey": "a", "account": { "data": { "parsed": { "info": {
                    "tokenAmount": { "amount": "1500000", "decimals": 6, "uiAmount": 1.5 }
                } } } } },
                { "pubkey": "b", "account": { "data": { "parsed": { "info": {
                    "tokenAmount": { "amount": "250", "decimals": 2, "uiAmount": 2.5 }
                } } } } }
            ]
        });
        let accounts: TokenAccounts = serde_json::from_value(raw).unwrap();
        assert_eq!(total_balance(&accounts).unwrap(), 4.0);
    }

    #[test]
    fn no_accounts_is_zero_balance() {
        let accounts: TokenAccounts = serde_json::from_value(json!({ "value": [] })).unwrap();
        assert_eq!(total_balance(&accounts).unwrap(), 0.0);
    }

    #[test]
    fn garbage_amount_is_invalid_response() {
        let amount = TokenAmount {
            amount: "lots".into(),
            decimals: 6,
        };
        assert!(matches!(
            amount.ui_amount(),
            Err(ChainError::InvalidResponse(_))
        ));
    }

    #[test]
    fn signature_status_settlement() {
        let parse = |v: Value| serde_json::from_value::<SignatureStatus>(v).unwrap();
        assert!(parse(json!({ "err": null, "confirmationStatus": "finalized" })).settled());
        assert!(parse(json!({ "err": null, "confirmationStatus": "confirmed" })).settled());
        assert!(!parse(json!({ "err": null, "confirmationStatus": "processed" })).settled());
        assert!(!parse(json!({ "err": { "InstructionError": [0, "Custom"] },
                                "confirmationStatus": "finalized" }))
        .settled());
    }

    #[test]
    fn envelope_error_wins() {
        let env: RpcEnvelope<u64> = serde_json::from_value(json!({
            "jsonrpc": "2.0", "id": 1,
            "error": { "code": -32602, "message": "Invalid params" }
        }))
        .unwrap();
        assert!(matches!(
            unwrap_envelope("m", env),
            Err(ChainError::RequestFailed(_))
        ));

        let empty: RpcEnvelope<u64> = serde_json::from_value(json!({ "id": 1 })).unwrap();
        assert!(matches!(
            unwrap_envelope("m", empty),
            Err(ChainError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint() {
        let client = RpcClient::with_timeout("http://127.0.0.1:1", Duration::from_secs(2));
        let err = client.version().await.unwrap_err();
        assert!(matches!(err, ChainError::Unreachable(_)), "{err}");
    }
}
