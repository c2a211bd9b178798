//! Vesto bridge service core.
//!
//! Moves value between an EVM chain and the ledger, and records custodian
//! reserve attestations. Every ledger transaction carries a memo that commits
//! to the CID of a proof document, so anyone holding the transaction can fetch
//! the proof and check it.
//!
//! ## Components
//!
//! - **orchestrator**: lock, mint and redeem
//! - **store**: canonical DAG-CBOR proof documents behind a content store
//! - **trustline**: trustline lookups for mint targets
//! - **reconcile**: derive `Verified`/`Invalid` status for recorded transactions
//! - **attestation**: signed weekly reserve attestations and their verification
//! - **ledger**: the transaction-submission collaborator
//! - **config**: bridge account and issued asset settings
//! - **error**: error kinds with their HTTP status and stable codes

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod attestation;
pub mod config;
pub mod documents;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod reconcile;
pub mod store;
pub mod trustline;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::BridgeConfig;
pub use documents::{BridgeReceipt, BridgeRecord, RecordKind, RecordStatus};
pub use error::{BridgeError, Result};
pub use ledger::Ledger;
pub use orchestrator::{BridgeOrchestrator, LockRequest, MintRequest, RedeemRequest};
pub use store::{ContentStore, ProofStore, StoreError};
pub use trustline::TrustlineChecker;
