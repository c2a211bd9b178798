use tracing::{debug, warn};
use vesto_primitives::memo;

use super::{AttestationStatus, Observation, ReplayGuard, ReserveDocument};
use crate::store::{ProofStore, StoreError};

/// Outcome of re-checking a recorded attestation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationVerdict {
    pub status: AttestationStatus,
    pub reason: Option<String>,
    pub document: Option<ReserveDocument>,
}

impl AttestationVerdict {
    fn settle(status: AttestationStatus, reason: Option<String>, document: Option<ReserveDocument>) -> Self {
        // Anything that cannot settle from `Recorded` is treated as invalid.
        let status = AttestationStatus::Recorded
            .transition(status)
            .unwrap_or(AttestationStatus::Invalid);
        Self {
            status,
            reason,
            document,
        }
    }

    fn pending(reason: String) -> Self {
        Self {
            status: AttestationStatus::Recorded,
            reason: Some(reason),
            document: None,
        }
    }
}

/// Independent re-check of attestations recorded by any custodian.
#[derive(Debug, Clone)]
pub struct AttestationVerifier {
    proofs: ProofStore,
    guard: ReplayGuard,
}

impl AttestationVerifier {
    pub fn new(proofs: ProofStore, guard: ReplayGuard) -> Self {
        Self { proofs, guard }
    }

    /// Verify the attestation stored at `cid`, recorded by a transaction with memo `memo_hex`.
    ///
    /// The attestation stays `Recorded` while its document cannot be fetched.
    pub async fn verify_recorded(&self, cid: &str, memo_hex: &str) -> AttestationVerdict {
        if !memo::reconciles(cid, memo_hex) {
            warn!(%cid, "Attestation memo does not commit to its CID");
            return AttestationVerdict::settle(
                AttestationStatus::Invalid,
                Some("memo does not commit to the attestation CID".to_string()),
                None,
            );
        }

        let document: ReserveDocument = match self.proofs.resolve(cid).await {
            Ok(document) => document,
            Err(StoreError::NotFound { reason, .. } | StoreError::Transport(reason)) => {
                debug!(%cid, %reason, "Attestation document not available yet");
                return AttestationVerdict::pending(reason);
            }
            Err(err) => {
                return AttestationVerdict::settle(
                    AttestationStatus::Invalid,
                    Some(err.to_string()),
                    None,
                );
            }
        };

        if let Err(reason) = document.check_signature() {
            warn!(%cid, %reason, "Attestation failed verification");
            return AttestationVerdict::settle(AttestationStatus::Invalid, Some(reason), Some(document));
        }

        let week = match document.attested_week() {
            Ok(week) => week,
            Err(reason) => {
                warn!(%cid, %reason, "Attestation week cannot be resolved");
                return AttestationVerdict::settle(AttestationStatus::Invalid, Some(reason), Some(document));
            }
        };
        let observation = self.guard.observe(
            &document.attestation.signed_by,
            week,
            &document.attestation.nonce,
            cid,
        );
        if let Observation::Replay { first_cid } = observation {
            let reason = match first_cid {
                Some(first_cid) => format!("{week} already attested by {first_cid}"),
                None => format!("{week} is claimed by an attestation still being recorded"),
            };
            return AttestationVerdict::settle(AttestationStatus::Invalid, Some(reason), Some(document));
        }

        AttestationVerdict::settle(AttestationStatus::Verified, None, Some(document))
    }
}
