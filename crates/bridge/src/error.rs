//! The error every bridge operation returns.
//!
//! Each variant carries an HTTP-style status, a stable machine-readable code
//! and an optional hint. [`BridgeError::Unexpected`] keeps its cause for the
//! logs but never exposes it through [`BridgeError::body`].

use serde::Serialize;
use vesto_primitives::{Chain, IssuedAsset, amount::AmountError};

use crate::{ledger::LedgerError, store::StoreError};

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("`{address}` is not a valid {chain} address")]
    InvalidAddress { chain: Chain, address: String },

    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    #[error("a lock proof CID is required")]
    MissingProof,

    #[error("proof `{cid}` could not be retrieved")]
    ProofNotFound { cid: String, reason: String },

    #[error("proof `{cid}` does not match the request: {reason}")]
    ProofMismatch { cid: String, reason: String },

    #[error("account {account} has no trustline to {asset}")]
    TrustlineMissing { account: String, asset: IssuedAsset },

    #[error("{0}")]
    Config(String),

    #[error("proof store request failed")]
    Store(#[from] StoreError),

    #[error("ledger request failed")]
    Ledger(#[from] LedgerError),

    #[error("unexpected error")]
    Unexpected(#[from] eyre::Report),
}

impl BridgeError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// HTTP status mirrored to the caller.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidInput(_)
            | Self::InvalidAddress { .. }
            | Self::InvalidAmount(_)
            | Self::MissingProof
            | Self::ProofMismatch { .. }
            | Self::TrustlineMissing { .. } => 400,
            Self::ProofNotFound { .. } => 404,
            Self::Store(_) => 502,
            Self::Ledger(err) => err.status(),
            Self::Config(_) | Self::Unexpected(_) => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidAddress { .. } => "invalid_address",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::MissingProof => "missing_proof",
            Self::ProofNotFound { .. } => "proof_not_found",
            Self::ProofMismatch { .. } => "proof_mismatch",
            Self::TrustlineMissing { .. } => "trustline_missing",
            Self::Config(_) => "config_missing",
            Self::Store(_) => "store_error",
            Self::Ledger(LedgerError::Transport(_)) => "ledger_unavailable",
            Self::Ledger(_) => "submission_failed",
            Self::Unexpected(_) => "unexpected",
        }
    }

    /// Client-facing diagnostic. Only ledger rejections and missing proofs carry one.
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::ProofNotFound { reason, .. } => Some(reason.clone()),
            Self::Ledger(err) => err.hint(),
            _ => None,
        }
    }

    /// Client-facing message. Unexpected failures are replaced with a generic text.
    pub fn message(&self) -> String {
        match self {
            Self::Unexpected(_) => "Unexpected server error.".to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_unexpected(&self) -> bool {
        matches!(self, Self::Unexpected(_))
    }

    /// A content store or ledger that could not be reached or misbehaved.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Ledger(LedgerError::Transport(_)))
    }

    /// The `{error: {code, message, hint?}}` response body.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.message(),
                hint: self.hint(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}
