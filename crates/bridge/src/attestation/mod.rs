//! Custodian reserve attestations.
//!
//! ## Components
//!
//! - **message**: the canonical byte string a custodian signs
//! - **signer**: ed25519 signing with a strkey custodian secret, and verification
//! - **document**: the `vesto.reserve@1` proof document
//! - **replay**: one attestation per custodian and ISO week
//! - **custodian**: sign, store and record an attestation on the ledger
//! - **verifier**: independent re-check of a recorded attestation

use serde::{Deserialize, Serialize};

pub mod custodian;
pub mod document;
pub mod message;
pub mod replay;
pub mod signer;
pub mod verifier;

pub use custodian::{AttestationReceipt, AttestationRequest, Custodian};
pub use document::{AttestationBlock, RESERVE_DATA_KEY, RESERVE_SCHEMA, ReserveDocument, SpvBalance};
pub use message::{AttestationMessage, MAX_FIELD_LEN, MAX_WEEK, MIN_NONCE_LEN, build_message};
pub use replay::{IsoWeek, Observation, ReplayGuard, WeekClaim};
pub use signer::{AttestationSigner, verify};
pub use verifier::{AttestationVerdict, AttestationVerifier};

/// Lifecycle of an attestation.
///
/// `Pending` (built, unsigned) moves to `Recorded` once signed and submitted,
/// then to `Verified` or `Invalid` after an independent re-check. A pending
/// attestation that fails validation goes straight to `Invalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttestationStatus {
    Pending,
    Recorded,
    Verified,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("attestation cannot move from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: AttestationStatus,
    pub to: AttestationStatus,
}

impl AttestationStatus {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified | Self::Invalid)
    }

    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Recorded)
                | (Self::Pending, Self::Invalid)
                | (Self::Recorded, Self::Verified)
                | (Self::Recorded, Self::Invalid)
        )
    }

    pub fn transition(self, next: Self) -> Result<Self, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AttestationStatus::{self, *};

    const ALL: [AttestationStatus; 4] = [Pending, Recorded, Verified, Invalid];

    #[test]
    fn test_forward_transitions() {
        assert_eq!(Pending.transition(Recorded), Ok(Recorded));
        assert_eq!(Recorded.transition(Verified), Ok(Verified));
        assert_eq!(Recorded.transition(Invalid), Ok(Invalid));
        assert_eq!(Pending.transition(Invalid), Ok(Invalid));
    }

    #[test]
    fn test_terminal_states_never_move() {
        for from in [Verified, Invalid] {
            assert!(from.is_terminal());
            for to in ALL {
                assert!(from.transition(to).is_err(), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        assert!(Pending.transition(Verified).is_err());
        assert!(Recorded.transition(Pending).is_err());
        for status in ALL {
            assert!(status.transition(status).is_err());
        }
    }
}
