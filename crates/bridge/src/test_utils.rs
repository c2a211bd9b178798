//! In-memory collaborators for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use vesto_primitives::{
    cid::{self, DAG_CBOR, RAW},
    strkey,
};

use crate::{
    ledger::{
        AccountState, Balance, Ledger, LedgerError, ResultCodes, SubmitResponse,
        TransactionRequest,
    },
    store::{ContentStore, StoreError},
};

/// A valid account id whose key bytes are all `n`.
pub fn account(n: u8) -> String {
    strkey::encode_ed25519_public_key(&[n; 32])
}

/// Ledger that records submissions and answers account lookups from memory.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    accounts: Mutex<HashMap<String, AccountState>>,
    submitted: Mutex<Vec<TransactionRequest>>,
    reject: Mutex<Option<(u16, ResultCodes)>>,
}

impl MemoryLedger {
    pub fn set_balances(&self, account_id: &str, balances: Vec<Balance>) {
        self.accounts.lock().insert(
            account_id.to_string(),
            AccountState {
                account_id: account_id.to_string(),
                balances,
            },
        );
    }

    /// Reject every following submission with `status` and `codes`.
    pub fn reject_with(&self, status: u16, codes: ResultCodes) {
        *self.reject.lock() = Some((status, codes));
    }

    /// Accept submissions again after [`MemoryLedger::reject_with`].
    pub fn accept(&self) {
        *self.reject.lock() = None;
    }

    pub fn submitted(&self) -> Vec<TransactionRequest> {
        self.submitted.lock().clone()
    }

    pub fn last_submitted(&self) -> Option<TransactionRequest> {
        self.submitted.lock().last().cloned()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn load_account(&self, account_id: &str) -> Result<Option<AccountState>, LedgerError> {
        Ok(self.accounts.lock().get(account_id).cloned())
    }

    async fn submit(&self, tx: TransactionRequest) -> Result<SubmitResponse, LedgerError> {
        if let Some((status, codes)) = self.reject.lock().clone() {
            return Err(LedgerError::Rejected {
                status: Some(status),
                result_codes: codes,
                detail: None,
            });
        }
        let mut submitted = self.submitted.lock();
        submitted.push(tx);
        Ok(SubmitResponse {
            hash: format!("{:064x}", submitted.len()),
            fee_charged: Some("100".to_string()),
            signature_count: 1,
        })
    }
}

/// Content store keyed by real CIDs.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    misreport: Mutex<bool>,
}

impl MemoryContentStore {
    /// Replace the bytes stored under `cid` without changing the key.
    pub fn overwrite(&self, cid: &str, bytes: Vec<u8>) {
        self.blobs.lock().insert(cid.to_string(), bytes);
    }

    /// Report a CID for unrelated content from every following upload.
    pub fn misreport_cids(&self, misreport: bool) {
        *self.misreport.lock() = misreport;
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn put(&self, codec: u64, bytes: Vec<u8>) -> Result<String, StoreError> {
        let key = cid::cid_for(codec, &bytes)?.to_string();
        self.blobs.lock().insert(key.clone(), bytes);
        if *self.misreport.lock() {
            return Ok(cid::cid_for(codec, b"something else")?.to_string());
        }
        Ok(key)
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn add(&self, bytes: Vec<u8>) -> Result<String, StoreError> {
        self.put(RAW, bytes)
    }

    async fn dag_put(&self, block: Vec<u8>) -> Result<String, StoreError> {
        self.put(DAG_CBOR, block)
    }

    async fn get(&self, cid: &str) -> Result<Vec<u8>, StoreError> {
        self.blobs
            .lock()
            .get(cid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                cid: cid.to_string(),
                reason: "no such block".to_string(),
            })
    }
}
