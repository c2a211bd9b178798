//! Derive the status of recorded bridge transactions.
//!
//! A record moves from `Recorded` to `Verified` once its proof document has
//! been fetched, matches the memo commitment, and agrees with the record. A
//! document that cannot be fetched leaves the record `Recorded` so the check
//! can run again later; anything that disagrees makes it `Invalid`.

use tracing::{debug, warn};
use vesto_primitives::{Chain, memo};

use crate::{
    documents::{BridgeRecord, LockDocument, ProofDocument, RecordKind, RecordStatus, RedeemDocument},
    store::{ProofStore, StoreError},
};

/// Reconcile any record against the proof it names.
pub async fn reconcile(store: &ProofStore, record: BridgeRecord) -> BridgeRecord {
    match record.kind {
        RecordKind::Lock => reconcile_lock(store, record).await,
        RecordKind::Mint => reconcile_mint(store, record).await,
        RecordKind::Redeem => reconcile_redeem(store, record).await,
    }
}

pub async fn reconcile_lock(store: &ProofStore, record: BridgeRecord) -> BridgeRecord {
    check(store, record, |record, lock: &LockDocument| {
        agree(&[
            ("amount", lock.amount == record.amount),
            ("asset", lock.asset == record.asset_code),
            ("chain", lock.chain == record.chain),
            ("recipient", same_recipient(lock.chain, &lock.recipient, &record.recipient)),
        ])
    })
    .await
}

/// Mints name the lock they consumed; the lock must cover the minted amount and asset.
pub async fn reconcile_mint(store: &ProofStore, record: BridgeRecord) -> BridgeRecord {
    check(store, record, |record, lock: &LockDocument| {
        agree(&[
            ("amount", lock.amount == record.amount),
            ("asset", lock.asset == record.asset_code),
        ])
    })
    .await
}

pub async fn reconcile_redeem(store: &ProofStore, record: BridgeRecord) -> BridgeRecord {
    check(store, record, |record, redeem: &RedeemDocument| {
        agree(&[
            ("amount", redeem.amount == record.amount),
            ("asset", redeem.asset.code == record.asset_code),
            ("chain", redeem.target_chain == record.chain),
            (
                "recipient",
                same_recipient(redeem.target_chain, &redeem.recipient, &record.recipient),
            ),
        ])
    })
    .await
}

async fn check<D, F>(store: &ProofStore, record: BridgeRecord, agrees: F) -> BridgeRecord
where
    D: ProofDocument + serde::de::DeserializeOwned,
    F: FnOnce(&BridgeRecord, &D) -> Result<(), String>,
{
    if record.status.is_terminal() {
        return record;
    }

    if !memo::reconciles(&record.proof_cid, &record.memo_hash_hex) {
        warn!(tx_hash = %record.id, cid = %record.proof_cid, "Memo does not commit to proof CID");
        return record.with_status(RecordStatus::Invalid, Some("memo-mismatch".to_string()));
    }

    let document: D = match store.resolve(&record.proof_cid).await {
        Ok(document) => document,
        Err(StoreError::NotFound { reason, .. } | StoreError::Transport(reason)) => {
            debug!(tx_hash = %record.id, %reason, "Proof not available yet");
            return record.with_status(RecordStatus::Recorded, Some(format!("fetch: {reason}")));
        }
        Err(err) => {
            warn!(tx_hash = %record.id, error = %err, "Proof failed to decode");
            return record.with_status(RecordStatus::Invalid, Some(format!("decode: {err}")));
        }
    };

    if !document.has_expected_schema() {
        let error = format!("schema: expected {}, got {}", D::SCHEMA, document.schema());
        return record.with_status(RecordStatus::Invalid, Some(error));
    }

    match agrees(&record, &document) {
        Ok(()) => record.with_status(RecordStatus::Verified, None),
        Err(error) => {
            warn!(tx_hash = %record.id, %error, "Proof disagrees with record");
            record.with_status(RecordStatus::Invalid, Some(error))
        }
    }
}

fn agree(checks: &[(&str, bool)]) -> Result<(), String> {
    let failed: Vec<&str> = checks
        .iter()
        .filter(|(_, ok)| !ok)
        .map(|(field, _)| *field)
        .collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(format!("mismatch: {}", failed.join(", ")))
    }
}

/// EVM addresses compare case-insensitively; everything else exactly.
fn same_recipient(chain: Chain, a: &str, b: &str) -> bool {
    match chain {
        Chain::Evm => a.eq_ignore_ascii_case(b),
        Chain::Stellar => a == b,
    }
}
