//! Proof documents and bridge records.
//!
//! Documents are what gets stored off-chain and committed to in a memo;
//! records are what the bridge reports about a transaction it submitted.

use serde::{Deserialize, Serialize};
use vesto_primitives::{Amount, Chain, IssuedAsset};

pub const LOCK_SCHEMA: &str = "vesto.lock@1";
pub const REDEEM_SCHEMA: &str = "vesto.redeem@1";

/// `manage_data` key holding the lock proof CID.
pub const LOCK_DATA_KEY: &str = "vesto.bridge.lock.cid";
/// `manage_data` key holding the lock proof a mint consumed.
pub const MINT_DATA_KEY: &str = "vesto.bridge.mint.cid";
/// `manage_data` key holding the redeem proof CID.
pub const REDEEM_DATA_KEY: &str = "vesto.bridge.redeem.cid";

/// A document carrying a schema tag.
pub trait ProofDocument {
    const SCHEMA: &'static str;

    fn schema(&self) -> &str;

    fn has_expected_schema(&self) -> bool {
        self.schema() == Self::SCHEMA
    }
}

/// Intent to move funds locked in escrow to `recipient` on `chain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockDocument {
    pub schema: String,
    pub bridge_account: String,
    pub chain: Chain,
    /// Asset code, `XLM` for the native asset.
    pub asset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_issuer: Option<String>,
    pub amount: Amount,
    pub recipient: String,
    pub timestamp: String,
}

impl ProofDocument for LockDocument {
    const SCHEMA: &'static str = LOCK_SCHEMA;

    fn schema(&self) -> &str {
        &self.schema
    }
}

/// Receipt for issued asset burned on the ledger and released on `target_chain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemDocument {
    pub schema: String,
    pub bridge_account: String,
    pub target_chain: Chain,
    pub recipient: String,
    pub amount: Amount,
    pub asset: IssuedAsset,
    pub timestamp: String,
}

impl ProofDocument for RedeemDocument {
    const SCHEMA: &'static str = REDEEM_SCHEMA;

    fn schema(&self) -> &str {
        &self.schema
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Lock,
    Mint,
    Redeem,
}

impl RecordKind {
    pub const fn data_key(&self) -> &'static str {
        match self {
            Self::Lock => LOCK_DATA_KEY,
            Self::Mint => MINT_DATA_KEY,
            Self::Redeem => REDEEM_DATA_KEY,
        }
    }
}

/// Status of a bridge record. `Verified` and `Invalid` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordStatus {
    Recorded,
    Verified,
    Invalid,
}

impl RecordStatus {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified | Self::Invalid)
    }
}

/// A lock, mint or redeem as the ledger saw it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeRecord {
    /// Transaction hash.
    pub id: String,
    pub kind: RecordKind,
    pub amount: Amount,
    pub asset_code: String,
    pub chain: Chain,
    pub recipient: String,
    pub proof_cid: String,
    pub memo_hash_hex: String,
    pub source_account: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_charged: Option<String>,
    pub signature_count: u32,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_error: Option<String>,
}

impl BridgeRecord {
    pub(crate) fn with_status(mut self, status: RecordStatus, error: Option<String>) -> Self {
        self.status = status;
        self.metadata_error = error;
        self
    }
}

/// Result of a successful lock, mint or redeem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeReceipt {
    pub hash: String,
    pub cid: String,
    pub memo_hash_hex: String,
    pub record: BridgeRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_document_wire_shape() {
        let doc = LockDocument {
            schema: LOCK_SCHEMA.to_string(),
            bridge_account: "GBRIDGE".into(),
            chain: Chain::Evm,
            asset: "XLM".into(),
            asset_issuer: None,
            amount: "100".parse().unwrap(),
            recipient: "0xabc".into(),
            timestamp: "2025-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "schema": "vesto.lock@1",
                "bridgeAccount": "GBRIDGE",
                "chain": "EVM",
                "asset": "XLM",
                "amount": "100.0000000",
                "recipient": "0xabc",
                "timestamp": "2025-01-01T00:00:00Z",
            })
        );
        assert!(doc.has_expected_schema());
    }

    #[test]
    fn test_schema_check() {
        let doc = RedeemDocument {
            schema: "vesto.mint@1".into(),
            bridge_account: "GBRIDGE".into(),
            target_chain: Chain::Evm,
            recipient: "0xabc".into(),
            amount: "1".parse().unwrap(),
            asset: IssuedAsset::new("SUSD", "GISSUER"),
            timestamp: "2025-01-01T00:00:00Z".into(),
        };
        assert!(!doc.has_expected_schema());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!RecordStatus::Recorded.is_terminal());
        assert!(RecordStatus::Verified.is_terminal());
        assert!(RecordStatus::Invalid.is_terminal());
        assert_eq!(RecordKind::Mint.data_key(), "vesto.bridge.mint.cid");
    }
}
