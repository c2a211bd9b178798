//! Ledger access over HTTP.
//!
//! Account state comes from Horizon. Transactions are posted as
//! [`TransactionRequest`] JSON to a signing gateway that holds the source
//! account keys and answers in Horizon's transaction format.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;
use vesto_bridge::ledger::{
    AccountState, Ledger, LedgerError, ResultCodes, SubmitResponse, TransactionRequest,
};

pub(crate) struct HorizonLedger {
    client: Client,
    horizon_url: String,
    gateway_url: String,
    /// Held across a submission so sequence numbers are consumed in order.
    submissions: Mutex<()>,
}

impl HorizonLedger {
    pub(crate) fn new(client: Client, horizon_url: &str, gateway_url: &str) -> Self {
        Self {
            client,
            horizon_url: horizon_url.trim_end_matches('/').to_string(),
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
            submissions: Mutex::new(()),
        }
    }
}

fn transport(err: reqwest::Error) -> LedgerError {
    LedgerError::Transport(err.to_string())
}

#[async_trait]
impl Ledger for HorizonLedger {
    async fn load_account(&self, account_id: &str) -> Result<Option<AccountState>, LedgerError> {
        let url = format!("{}/accounts/{account_id}", self.horizon_url);
        let response = self.client.get(&url).send().await.map_err(transport)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(account = account_id, "Account not found");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LedgerError::Transport(format!(
                "account lookup returned {status}"
            )));
        }
        let account = response
            .json::<AccountState>()
            .await
            .map_err(transport)?;
        debug!(
            account = account_id,
            balances = account.balances.len(),
            "Loaded account"
        );
        Ok(Some(account))
    }

    async fn submit(&self, tx: TransactionRequest) -> Result<SubmitResponse, LedgerError> {
        let _guard = self.submissions.lock().await;

        let url = format!("{}/transactions", self.gateway_url);
        let response = self
            .client
            .post(&url)
            .json(&tx)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

        if status.is_success() {
            let submitted = parse_submitted(&body)?;
            debug!(tx_hash = %submitted.hash, source = %tx.source_account, "Submitted transaction");
            Ok(submitted)
        } else {
            Err(parse_rejection(status.as_u16(), &body))
        }
    }
}

/// Read a successful Horizon transaction response.
fn parse_submitted(body: &Value) -> Result<SubmitResponse, LedgerError> {
    let hash = body
        .get("hash")
        .and_then(Value::as_str)
        .filter(|hash| !hash.is_empty())
        .ok_or(LedgerError::MissingHash)?;
    let fee_charged = body.get("fee_charged").map(|fee| match fee {
        Value::String(fee) => fee.clone(),
        other => other.to_string(),
    });
    let signature_count = body
        .get("signatures")
        .and_then(Value::as_array)
        .map_or(1, |signatures| signatures.len() as u32);
    Ok(SubmitResponse {
        hash: hash.to_string(),
        fee_charged,
        signature_count,
    })
}

/// Read a Horizon problem response, keeping its result codes.
fn parse_rejection(status: u16, body: &Value) -> LedgerError {
    let result_codes = body
        .pointer("/extras/result_codes")
        .cloned()
        .and_then(|codes| serde_json::from_value::<ResultCodes>(codes).ok())
        .unwrap_or_default();
    let detail = match body {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        _ => body
            .get("detail")
            .or_else(|| body.get("title"))
            .and_then(Value::as_str)
            .map(str::to_string),
    };
    LedgerError::Rejected {
        status: Some(status),
        result_codes,
        detail,
    }
}
