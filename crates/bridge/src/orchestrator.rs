//! Lock, mint and redeem.
//!
//! Every operation follows the same pattern: validate the request, store a
//! proof document, commit to its CID in the memo, and submit one payment plus
//! one `manage_data` entry naming the CID. The orchestrator holds no mutable
//! state; retries of an identical request re-upload to the same CID and only
//! repeat the submission.

use std::sync::Arc;

use jiff::Timestamp;
use serde::Deserialize;
use tracing::{info, warn};
use vesto_primitives::{
    Amount, Asset, Chain, IssuedAsset, MemoCommitment, asset::NATIVE_CODE, cid, commit,
};

use crate::{
    config::BridgeConfig,
    documents::{
        BridgeReceipt, BridgeRecord, LOCK_SCHEMA, LockDocument, ProofDocument, REDEEM_SCHEMA,
        RecordKind, RecordStatus, RedeemDocument,
    },
    error::{BridgeError, Result},
    ledger::{Ledger, Operation, SubmitResponse, TransactionRequest},
    store::{ContentStore, ProofStore, StoreError},
    trustline::TrustlineChecker,
};

/// Source of the current time, injectable for deterministic documents.
pub type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRequest {
    pub amount: String,
    /// Defaults to the native asset.
    #[serde(default = "native_code")]
    pub asset: String,
    pub recipient: String,
    #[serde(default)]
    pub chain: Option<String>,
}

fn native_code() -> String {
    NATIVE_CODE.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub amount: String,
    pub target_account: String,
    #[serde(default, alias = "lockProofCid")]
    pub evm_lock_proof_cid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    pub amount: String,
    pub evm_recipient: String,
}

#[derive(Clone)]
pub struct BridgeOrchestrator {
    config: Arc<BridgeConfig>,
    ledger: Arc<dyn Ledger>,
    proofs: ProofStore,
    trustlines: TrustlineChecker,
    clock: Clock,
}

impl BridgeOrchestrator {
    pub fn new(
        config: BridgeConfig,
        ledger: Arc<dyn Ledger>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            trustlines: TrustlineChecker::new(ledger.clone()),
            ledger,
            proofs: ProofStore::new(store),
            clock: Arc::new(Timestamp::now),
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> Timestamp + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn proofs(&self) -> &ProofStore {
        &self.proofs
    }

    pub fn trustlines(&self) -> &TrustlineChecker {
        &self.trustlines
    }

    /// Whether `account_id` trusts the configured issued asset.
    pub async fn has_trustline(&self, account_id: &str) -> Result<bool> {
        let asset = self.config.issued_asset()?;
        self.trustlines.has_trustline(account_id.trim(), &asset).await
    }

    /// Lock `amount` of `asset` in escrow for `recipient` on `chain` (default EVM).
    pub async fn process_lock(&self, request: LockRequest) -> Result<BridgeReceipt> {
        let asset = self.resolve_asset(request.asset.trim())?;
        let amount = parse_amount(&request.amount, &asset)?;
        let chain = match request.chain.as_deref().map(str::trim) {
            None | Some("") => Chain::Evm,
            Some(chain) => chain
                .parse::<Chain>()
                .map_err(|e| BridgeError::invalid_input(e.to_string()))?,
        };
        let recipient = validate_address(chain, &request.recipient)?;

        let document = LockDocument {
            schema: LOCK_SCHEMA.to_string(),
            bridge_account: self.config.bridge_account.clone(),
            chain,
            asset: asset.code().to_string(),
            asset_issuer: asset.issuer().map(str::to_string),
            amount,
            recipient: recipient.clone(),
            timestamp: self.now(),
        };
        let cid = self.proofs.upload_structured(&document).await?;
        let memo = commit(&cid);

        let payment = Operation::Payment {
            destination: self.config.bridge_account.clone(),
            asset: asset.clone(),
            amount,
        };
        let response = self.submit(RecordKind::Lock, payment, &cid, memo).await?;

        info!(
            tx_hash = %response.hash,
            %cid,
            %amount,
            %asset,
            %recipient,
            "Recorded bridge lock"
        );
        Ok(self.receipt(
            Draft {
                kind: RecordKind::Lock,
                cid,
                memo,
                amount,
                asset_code: asset.code().to_string(),
                chain,
                recipient,
                created_at: document.timestamp,
            },
            response,
        ))
    }

    /// Mint the issued asset to `target_account` against a recorded lock.
    ///
    /// The memo commits to the lock proof's CID, linking the mint to the lock.
    ///
    /// Each call submits a new mint. Prior mints against the same lock are not
    /// looked up, so callers must refuse a lock CID whose memo already appears
    /// on a recorded mint.
    pub async fn process_mint(&self, request: MintRequest) -> Result<BridgeReceipt> {
        let amount = Amount::parse(request.amount.trim(), Asset::Native.precision())?;
        let target = validate_address(Chain::Stellar, &request.target_account)?;

        let raw_cid = request
            .evm_lock_proof_cid
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();
        if raw_cid.is_empty() {
            return Err(BridgeError::MissingProof);
        }
        let lock_cid = cid::normalize_to_v1(raw_cid).map_err(|e| {
            BridgeError::invalid_input(format!("evmLockProofCid must be a valid CID: {e}"))
        })?;

        let lock = self.resolve_lock(&lock_cid).await?;
        let asset = self.config.issued_asset()?;
        self.check_lock_agrees(&lock_cid, &lock, amount, &asset)?;

        if !self.trustlines.has_trustline(&target, &asset).await? {
            return Err(BridgeError::TrustlineMissing {
                account: target,
                asset,
            });
        }

        let memo = commit(&lock_cid);
        let payment = Operation::Payment {
            destination: target.clone(),
            asset: Asset::Credit(asset.clone()),
            amount,
        };
        let response = self
            .submit(RecordKind::Mint, payment, &lock_cid, memo)
            .await?;

        info!(
            tx_hash = %response.hash,
            cid = %lock_cid,
            %amount,
            %target,
            "Recorded bridge mint"
        );
        Ok(self.receipt(
            Draft {
                kind: RecordKind::Mint,
                cid: lock_cid,
                memo,
                amount,
                asset_code: asset.code,
                chain: Chain::Stellar,
                recipient: target,
                created_at: self.now(),
            },
            response,
        ))
    }

    /// Burn `amount` of the issued asset for release to `evm_recipient`.
    ///
    /// The redeem receipt is stored before submission so the burn can carry
    /// its commitment in the memo.
    pub async fn process_redeem(&self, request: RedeemRequest) -> Result<BridgeReceipt> {
        let amount = Amount::parse(request.amount.trim(), Asset::Native.precision())?;
        let recipient = validate_address(Chain::Evm, &request.evm_recipient)?;
        let asset = self.config.issued_asset()?;

        let document = RedeemDocument {
            schema: REDEEM_SCHEMA.to_string(),
            bridge_account: self.config.bridge_account.clone(),
            target_chain: Chain::Evm,
            recipient: recipient.clone(),
            amount,
            asset: asset.clone(),
            timestamp: self.now(),
        };
        let cid = self.proofs.upload_structured(&document).await?;
        let memo = commit(&cid);

        let payment = Operation::Payment {
            destination: asset.issuer.clone(),
            asset: Asset::Credit(asset.clone()),
            amount,
        };
        let response = self.submit(RecordKind::Redeem, payment, &cid, memo).await?;

        info!(
            tx_hash = %response.hash,
            %cid,
            %amount,
            %recipient,
            "Recorded bridge redeem"
        );
        Ok(self.receipt(
            Draft {
                kind: RecordKind::Redeem,
                cid,
                memo,
                amount,
                asset_code: asset.code,
                chain: Chain::Evm,
                recipient,
                created_at: document.timestamp,
            },
            response,
        ))
    }

    fn now(&self) -> String {
        (self.clock)().to_string()
    }

    fn resolve_asset(&self, code: &str) -> Result<Asset> {
        if code == NATIVE_CODE {
            return Ok(Asset::Native);
        }
        if code == self.config.asset_code {
            return Ok(Asset::Credit(self.config.issued_asset()?));
        }
        Err(BridgeError::invalid_input(format!(
            "Unsupported asset `{code}`. Use {NATIVE_CODE} or {}.",
            self.config.asset_code
        )))
    }

    async fn resolve_lock(&self, cid: &str) -> Result<LockDocument> {
        let lock: LockDocument = self.proofs.resolve(cid).await.map_err(|e| match e {
            StoreError::NotFound { cid, reason } => BridgeError::ProofNotFound { cid, reason },
            StoreError::Decode { cid, reason } => BridgeError::ProofMismatch { cid, reason },
            StoreError::Integrity { cid } => BridgeError::ProofMismatch {
                cid,
                reason: "content does not match its CID".to_string(),
            },
            other => BridgeError::Store(other),
        })?;
        if !lock.has_expected_schema() {
            return Err(BridgeError::ProofMismatch {
                cid: cid.to_string(),
                reason: format!("expected a {LOCK_SCHEMA} document, got {}", lock.schema),
            });
        }
        Ok(lock)
    }

    fn check_lock_agrees(
        &self,
        cid: &str,
        lock: &LockDocument,
        amount: Amount,
        asset: &IssuedAsset,
    ) -> Result<()> {
        let mismatch = |reason: String| BridgeError::ProofMismatch {
            cid: cid.to_string(),
            reason,
        };
        if lock.bridge_account != self.config.bridge_account {
            return Err(mismatch(format!(
                "lock was recorded by {}",
                lock.bridge_account
            )));
        }
        if lock.amount != amount {
            return Err(mismatch(format!(
                "lock amount {} differs from {amount}",
                lock.amount
            )));
        }
        if lock.asset != asset.code {
            return Err(mismatch(format!(
                "lock asset {} differs from {}",
                lock.asset, asset.code
            )));
        }
        Ok(())
    }

    async fn submit(
        &self,
        kind: RecordKind,
        payment: Operation,
        cid: &str,
        memo: MemoCommitment,
    ) -> Result<SubmitResponse> {
        let tx = TransactionRequest {
            source_account: self.config.bridge_account.clone(),
            memo,
            operations: vec![
                payment,
                Operation::ManageData {
                    name: kind.data_key().to_string(),
                    value: cid.to_string(),
                },
            ],
            timeout_secs: self.config.tx_timeout_secs,
        };
        self.ledger.submit(tx).await.map_err(|e| {
            warn!(?kind, %cid, error = %e, hint = ?e.hint(), "Ledger rejected bridge transaction");
            BridgeError::Ledger(e)
        })
    }

    fn receipt(&self, draft: Draft, response: SubmitResponse) -> BridgeReceipt {
        let memo_hash_hex = draft.memo.hex();
        let record = BridgeRecord {
            id: response.hash.clone(),
            kind: draft.kind,
            amount: draft.amount,
            asset_code: draft.asset_code,
            chain: draft.chain,
            recipient: draft.recipient,
            proof_cid: draft.cid.clone(),
            memo_hash_hex: memo_hash_hex.clone(),
            source_account: self.config.bridge_account.clone(),
            created_at: draft.created_at,
            fee_charged: response.fee_charged,
            signature_count: response.signature_count,
            status: RecordStatus::Recorded,
            metadata_error: None,
        };
        BridgeReceipt {
            hash: response.hash,
            cid: draft.cid,
            memo_hash_hex,
            record,
        }
    }
}

/// Record fields known before submission.
struct Draft {
    kind: RecordKind,
    cid: String,
    memo: MemoCommitment,
    amount: Amount,
    asset_code: String,
    chain: Chain,
    recipient: String,
    created_at: String,
}

fn parse_amount(amount: &str, asset: &Asset) -> Result<Amount> {
    Ok(Amount::parse(amount.trim(), asset.precision())?)
}

fn validate_address(chain: Chain, address: &str) -> Result<String> {
    let address = address.trim();
    if !chain.is_valid_address(address) {
        return Err(BridgeError::InvalidAddress {
            chain,
            address: address.to_string(),
        });
    }
    Ok(address.to_string())
}
