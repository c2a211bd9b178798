//! Recording reserve attestations.
//!
//! A custodian builds the canonical message, signs it, stores the reserve
//! document, and records the document's commitment on the ledger with a
//! minimal self-payment from the custodian account.

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use jiff::Timestamp;
use rand::{Rng as _, distributions::Alphanumeric};
use serde::Deserialize;
use tracing::{info, warn};
use vesto_primitives::{Amount, Asset, commit};

use super::{
    AttestationBlock, AttestationMessage, AttestationStatus, IsoWeek, RESERVE_DATA_KEY,
    RESERVE_SCHEMA, ReplayGuard, ReserveDocument, SpvBalance, signer::AttestationSigner,
};
use crate::{
    error::{BridgeError, Result},
    ledger::{DEFAULT_TX_TIMEOUT_SECS, Ledger, Operation, TransactionRequest},
    orchestrator::Clock,
    store::{ContentStore, ProofStore},
};

/// Amount of the native self-payment carrying the memo, in stroops.
pub const MARKER_PAYMENT_STROOPS: i64 = 1;

/// Length of generated nonces.
const GENERATED_NONCE_LEN: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationRequest {
    pub reserve_amount: String,
    /// ISO week number; defaults to the week of `as_of`.
    #[serde(default)]
    pub week: Option<u64>,
    /// RFC 3339 timestamp; defaults to now.
    #[serde(default)]
    pub as_of: Option<String>,
    /// Generated when absent.
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub spv_balances: Vec<SpvBalance>,
    #[serde(default)]
    pub last_tx: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Base64 reserve statement, stored as a file and referenced by CID.
    #[serde(default)]
    pub file_base64: Option<String>,
    #[serde(default)]
    pub request_cid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationReceipt {
    pub hash: String,
    pub cid: String,
    pub memo_hash_hex: String,
    pub status: AttestationStatus,
    pub document: ReserveDocument,
}

pub struct Custodian {
    signer: AttestationSigner,
    ledger: Arc<dyn Ledger>,
    proofs: ProofStore,
    guard: ReplayGuard,
    clock: Clock,
    tx_timeout_secs: u64,
}

impl Custodian {
    pub fn new(
        signer: AttestationSigner,
        ledger: Arc<dyn Ledger>,
        store: Arc<dyn ContentStore>,
        guard: ReplayGuard,
    ) -> Self {
        Self {
            signer,
            ledger,
            proofs: ProofStore::new(store),
            guard,
            clock: Arc::new(Timestamp::now),
            tx_timeout_secs: DEFAULT_TX_TIMEOUT_SECS,
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> Timestamp + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_tx_timeout(mut self, secs: u64) -> Self {
        self.tx_timeout_secs = secs;
        self
    }

    /// The custodian's account id, which signs and records attestations.
    pub fn account(&self) -> &str {
        self.signer.public_key()
    }

    /// Sign, store and record a reserve attestation.
    ///
    /// The custodian's week is reserved before anything is stored and
    /// released again if recording fails.
    pub async fn attest(&self, request: AttestationRequest) -> Result<AttestationReceipt> {
        let status = AttestationStatus::Pending;
        let reserve_amount =
            Amount::parse_non_negative(request.reserve_amount.trim(), Asset::Native.precision())?;
        let as_of = match request.as_of.as_deref().map(str::trim) {
            None | Some("") => (self.clock)(),
            Some(value) => value.parse::<Timestamp>().map_err(|e| {
                BridgeError::invalid_input(format!("asOf must be an RFC 3339 timestamp: {e}"))
            })?,
        };
        let week = request
            .week
            .unwrap_or_else(|| IsoWeek::containing(as_of).week);
        let nonce = request.nonce.unwrap_or_else(generate_nonce);

        let message = AttestationMessage::new(week, reserve_amount, as_of.to_string(), nonce)?;
        let claimed = IsoWeek::nearest(as_of, week);
        let claim = self
            .guard
            .try_claim(self.account(), claimed, &message.nonce)
            .map_err(|_| {
                BridgeError::invalid_input(format!(
                    "an attestation for {claimed} is already recorded"
                ))
            })?;

        let bytes = message.to_bytes()?;
        let signature = self.signer.sign(&bytes);

        let file_cid = match request.file_base64.as_deref() {
            Some(encoded) => {
                let file = STANDARD
                    .decode(encoded.trim())
                    .map_err(|_| BridgeError::invalid_input("fileBase64 is not valid base64"))?;
                Some(self.proofs.upload_file(file).await?)
            }
            None => None,
        };

        let document = ReserveDocument {
            schema: RESERVE_SCHEMA.to_string(),
            week,
            reserve_amount,
            spv_balances: request.spv_balances,
            as_of: message.timestamp.clone(),
            file_cid,
            last_tx: request.last_tx,
            notes: request.notes,
            attestation: AttestationBlock {
                nonce: message.nonce.clone(),
                message: STANDARD.encode(&bytes),
                signed_by: self.account().to_string(),
                signature: STANDARD.encode(signature),
                request_cid: request.request_cid,
            },
        };
        let cid = self.proofs.upload_structured(&document).await?;
        let memo = commit(&cid);

        let tx = TransactionRequest {
            source_account: self.account().to_string(),
            memo,
            operations: vec![
                Operation::Payment {
                    destination: self.account().to_string(),
                    asset: Asset::Native,
                    amount: Amount::from_stroops(MARKER_PAYMENT_STROOPS)?,
                },
                Operation::ManageData {
                    name: RESERVE_DATA_KEY.to_string(),
                    value: cid.clone(),
                },
            ],
            timeout_secs: self.tx_timeout_secs,
        };
        let response = self.ledger.submit(tx).await.map_err(|e| {
            warn!(%cid, week = %claimed, error = %e, hint = ?e.hint(), "Ledger rejected attestation");
            BridgeError::Ledger(e)
        })?;
        claim.commit(&cid);

        let status = status
            .transition(AttestationStatus::Recorded)
            .map_err(|e| BridgeError::Unexpected(eyre::Report::new(e)))?;

        info!(
            tx_hash = %response.hash,
            %cid,
            week = %claimed,
            reserve = %reserve_amount,
            custodian = self.account(),
            "Recorded reserve attestation"
        );
        Ok(AttestationReceipt {
            hash: response.hash,
            cid,
            memo_hash_hex: memo.hex(),
            status,
            document,
        })
    }
}

fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_NONCE_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_nonce() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_eq!(a.len(), GENERATED_NONCE_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
