//! The ledger collaborator.
//!
//! The bridge never builds or signs envelopes itself. It describes a
//! transaction as a [`TransactionRequest`] and hands it to a [`Ledger`]
//! implementation, which owns the signing key and the source account's
//! sequence number. Implementations must serialize submissions per source
//! account.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vesto_primitives::{Amount, Asset, IssuedAsset, MemoCommitment};

/// Seconds a submitted transaction stays valid.
pub const DEFAULT_TX_TIMEOUT_SECS: u64 = 60;

/// A balance line as reported for an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub asset_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_issuer: Option<String>,
    #[serde(default)]
    pub balance: String,
}

impl Balance {
    pub fn native(balance: impl Into<String>) -> Self {
        Self {
            asset_type: "native".to_string(),
            asset_code: None,
            asset_issuer: None,
            balance: balance.into(),
        }
    }

    pub fn issued(asset: &IssuedAsset, balance: impl Into<String>) -> Self {
        let asset_type = if asset.code.len() <= 4 {
            "credit_alphanum4"
        } else {
            "credit_alphanum12"
        };
        Self {
            asset_type: asset_type.to_string(),
            asset_code: Some(asset.code.clone()),
            asset_issuer: Some(asset.issuer.clone()),
            balance: balance.into(),
        }
    }

    /// The issued asset this line holds, `None` for native and pool shares.
    pub fn issued_asset(&self) -> Option<IssuedAsset> {
        match (&self.asset_code, &self.asset_issuer) {
            (Some(code), Some(issuer)) => Some(IssuedAsset::new(code, issuer)),
            _ => None,
        }
    }

    /// Exact match on both code and issuer.
    pub fn holds(&self, asset: &IssuedAsset) -> bool {
        self.asset_code.as_deref() == Some(asset.code.as_str())
            && self.asset_issuer.as_deref() == Some(asset.issuer.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub account_id: String,
    #[serde(default)]
    pub balances: Vec<Balance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Payment {
        destination: String,
        asset: Asset,
        amount: Amount,
    },
    /// Stores `value` under `name` on the source account.
    ManageData { name: String, value: String },
}

/// An unsigned transaction with a hash memo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub source_account: String,
    #[serde(with = "memo_hex")]
    pub memo: MemoCommitment,
    pub operations: Vec<Operation>,
    pub timeout_secs: u64,
}

impl TransactionRequest {
    pub fn manage_data(&self, name: &str) -> Option<&str> {
        self.operations.iter().find_map(|op| match op {
            Operation::ManageData { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn payments(&self) -> impl Iterator<Item = (&str, &Asset, &Amount)> {
        self.operations.iter().filter_map(|op| match op {
            Operation::Payment {
                destination,
                asset,
                amount,
            } => Some((destination.as_str(), asset, amount)),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub hash: String,
    #[serde(default)]
    pub fee_charged: Option<String>,
    #[serde(default = "default_signature_count")]
    pub signature_count: u32,
}

const fn default_signature_count() -> u32 {
    1
}

/// Diagnostic codes attached to a rejected transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultCodes {
    #[serde(default)]
    pub transaction: Option<String>,
    #[serde(default)]
    pub operations: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger rejected the transaction")]
    Rejected {
        status: Option<u16>,
        result_codes: ResultCodes,
        detail: Option<String>,
    },
    #[error("transaction submitted but no hash was returned")]
    MissingHash,
    #[error("ledger request failed: {0}")]
    Transport(String),
}

impl LedgerError {
    pub fn status(&self) -> u16 {
        match self {
            Self::Rejected {
                status: Some(status),
                ..
            } => *status,
            _ => 502,
        }
    }

    /// `"<tx code> | ops: <op codes> | <detail>"`, omitting absent parts.
    ///
    /// Only rejections have a hint; transport failures stay in the logs.
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Rejected {
                result_codes,
                detail,
                ..
            } => {
                let mut parts = Vec::new();
                if let Some(tx) = &result_codes.transaction {
                    parts.push(tx.clone());
                }
                if !result_codes.operations.is_empty() {
                    parts.push(format!("ops: {}", result_codes.operations.join(", ")));
                }
                if let Some(detail) = detail {
                    parts.push(detail.clone());
                }
                (!parts.is_empty()).then(|| parts.join(" | "))
            }
            Self::MissingHash | Self::Transport(_) => None,
        }
    }
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Load an account, `None` if it does not exist.
    async fn load_account(&self, account_id: &str) -> Result<Option<AccountState>, LedgerError>;

    /// Sign, submit and wait for the transaction to be applied.
    async fn submit(&self, tx: TransactionRequest) -> Result<SubmitResponse, LedgerError>;
}

/// Serde helper for [`MemoCommitment`] as a hex string.
mod memo_hex {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use vesto_primitives::MemoCommitment;

    pub(super) fn serialize<S>(memo: &MemoCommitment, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        memo.hex().serialize(serializer)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<MemoCommitment, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        MemoCommitment::from_hex(&s).ok_or_else(|| serde::de::Error::custom("invalid memo hash"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_matching_is_exact() {
        let susd = IssuedAsset::new("SUSD", "GISSUER");
        let line = Balance::issued(&susd, "10.0000000");

        assert!(line.holds(&susd));
        assert!(!line.holds(&IssuedAsset::new("SUSD", "gissuer")));
        assert!(!line.holds(&IssuedAsset::new("USD", "GISSUER")));
        assert!(!Balance::native("1").holds(&susd));
        assert_eq!(line.issued_asset(), Some(susd));
        assert_eq!(line.asset_type, "credit_alphanum4");
    }

    #[test]
    fn test_balance_deserializes_horizon_shape() {
        let json = serde_json::json!([
            {"balance": "100.0000000", "asset_type": "native"},
            {"balance": "5.0000000", "asset_type": "credit_alphanum4", "asset_code": "SUSD", "asset_issuer": "GX", "limit": "922337203685.4775807"},
            {"balance": "1.0000000", "asset_type": "liquidity_pool_shares", "liquidity_pool_id": "abcd"}
        ]);
        let balances: Vec<Balance> = serde_json::from_value(json).unwrap();

        assert_eq!(balances.len(), 3);
        assert_eq!(balances[0].issued_asset(), None);
        assert_eq!(balances[1].issued_asset(), Some(IssuedAsset::new("SUSD", "GX")));
        assert_eq!(balances[2].issued_asset(), None);
    }

    #[test]
    fn test_hint_format() {
        let err = LedgerError::Rejected {
            status: None,
            result_codes: ResultCodes {
                transaction: Some("tx_failed".into()),
                operations: vec!["op_success".into(), "op_no_trust".into()],
            },
            detail: Some("see result codes".into()),
        };
        assert_eq!(
            err.hint().as_deref(),
            Some("tx_failed | ops: op_success, op_no_trust | see result codes")
        );
        assert_eq!(err.status(), 502);

        let bare = LedgerError::Rejected {
            status: Some(504),
            result_codes: ResultCodes::default(),
            detail: None,
        };
        assert_eq!(bare.hint(), None);
        assert_eq!(bare.status(), 504);

        let transport = LedgerError::Transport("error sending request for url (http://gateway)".into());
        assert_eq!(transport.hint(), None);
        assert_eq!(transport.status(), 502);
    }

    #[test]
    fn test_transaction_request_json_shape() {
        let tx = TransactionRequest {
            source_account: "GBRIDGE".into(),
            memo: vesto_primitives::commit("bafy"),
            operations: vec![
                Operation::Payment {
                    destination: "GBRIDGE".into(),
                    asset: Asset::Native,
                    amount: "1".parse().unwrap(),
                },
                Operation::ManageData {
                    name: "vesto.bridge.lock.cid".into(),
                    value: "bafy".into(),
                },
            ],
            timeout_secs: DEFAULT_TX_TIMEOUT_SECS,
        };
        let json = serde_json::to_value(&tx).unwrap();

        assert_eq!(json["memo"], vesto_primitives::commit("bafy").hex());
        assert_eq!(json["operations"][0]["type"], "payment");
        assert_eq!(json["operations"][0]["asset"]["type"], "native");
        assert_eq!(json["operations"][0]["amount"], "1.0000000");
        assert_eq!(json["operations"][1]["type"], "manage_data");
        assert_eq!(tx.manage_data("vesto.bridge.lock.cid"), Some("bafy"));
        assert_eq!(tx.payments().count(), 1);

        let back: TransactionRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
    }
}
