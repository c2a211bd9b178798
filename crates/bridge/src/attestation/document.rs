use base64::{Engine as _, engine::general_purpose::STANDARD};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use vesto_primitives::Amount;

use super::{IsoWeek, message::AttestationMessage, signer};
use crate::{documents::ProofDocument, error::Result};

pub const RESERVE_SCHEMA: &str = "vesto.reserve@1";

/// `manage_data` key holding the reserve proof CID.
pub const RESERVE_DATA_KEY: &str = "vesto.reserve.cid";

/// Balance held by the SPV backing the issued asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpvBalance {
    pub asset: String,
    pub balance: String,
}

/// Signature block of a reserve proof. `message` and `signature` are base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationBlock {
    pub nonce: String,
    pub message: String,
    pub signed_by: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_cid: Option<String>,
}

/// A custodian's signed statement of reserves for one ISO week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveDocument {
    pub schema: String,
    pub week: u64,
    #[serde(with = "vesto_primitives::amount::non_negative")]
    pub reserve_amount: Amount,
    #[serde(default)]
    pub spv_balances: Vec<SpvBalance>,
    /// Also the signed timestamp.
    pub as_of: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_cid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tx: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub attestation: AttestationBlock,
}

impl ProofDocument for ReserveDocument {
    const SCHEMA: &'static str = RESERVE_SCHEMA;

    fn schema(&self) -> &str {
        &self.schema
    }
}

impl ReserveDocument {
    /// Rebuild the signed message from the document's own fields.
    pub fn message(&self) -> Result<AttestationMessage> {
        AttestationMessage::new(
            self.week,
            self.reserve_amount,
            self.as_of.as_str(),
            self.attestation.nonce.as_str(),
        )
    }

    /// The year-qualified week this document attests, resolved against `asOf`.
    pub fn attested_week(&self) -> Result<IsoWeek, String> {
        let as_of = self
            .as_of
            .parse::<Timestamp>()
            .map_err(|e| format!("asOf is not an RFC 3339 timestamp: {e}"))?;
        Ok(IsoWeek::nearest(as_of, self.week))
    }

    /// Check schema, nonce, embedded message and signature.
    ///
    /// The embedded message must equal the one rebuilt from the fields, and the
    /// signature must verify under `signedBy`.
    pub fn check_signature(&self) -> Result<(), String> {
        if !self.has_expected_schema() {
            return Err(format!("schema: expected {RESERVE_SCHEMA}, got {}", self.schema));
        }
        let message = self
            .message()
            .and_then(|message| message.to_bytes())
            .map_err(|e| e.to_string())?;

        let embedded = STANDARD
            .decode(self.attestation.message.trim())
            .map_err(|_| "message is not base64".to_string())?;
        if embedded != message {
            return Err("message does not match document fields".to_string());
        }

        let signature = STANDARD
            .decode(self.attestation.signature.trim())
            .map_err(|_| "signature is not base64".to_string())?;
        if !signer::verify(&message, &signature, &self.attestation.signed_by) {
            return Err("signature does not verify".to_string());
        }
        Ok(())
    }
}
