//! Nonce tracking for attestations.
//!
//! Each custodian attests once per ISO week. The first attestation seen for a
//! `(custodian, week)` pair claims it; any other nonce or document for the
//! same pair is a replay. Weeks are qualified by their ISO week-numbering
//! year, so week 2 of 2025 and week 2 of 2026 are distinct.
//!
//! A custodian reserves its week with [`ReplayGuard::try_claim`] before it
//! records anything, so concurrent attestations for one week cannot both
//! proceed.

use std::{collections::HashMap, fmt, sync::Arc};

use jiff::{Timestamp, tz::TimeZone};
use parking_lot::RwLock;
use tracing::{debug, warn};

/// An ISO 8601 week qualified by its week-numbering year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IsoWeek {
    pub year: i16,
    pub week: u64,
}

impl IsoWeek {
    /// The week containing `timestamp`, in UTC.
    pub fn containing(timestamp: Timestamp) -> Self {
        let date = timestamp.to_zoned(TimeZone::UTC).date().iso_week_date();
        Self {
            year: date.year(),
            week: u64::from(date.week().unsigned_abs()),
        }
    }

    /// The week numbered `week` closest to `timestamp`.
    ///
    /// A week number more than half a year past the timestamp's own week
    /// belongs to the previous year; one more than half a year before it
    /// belongs to the next.
    pub fn nearest(timestamp: Timestamp, week: u64) -> Self {
        let own = Self::containing(timestamp);
        let year = if week > own.week.saturating_add(26) {
            own.year.saturating_sub(1)
        } else if week.saturating_add(26) < own.week {
            own.year.saturating_add(1)
        } else {
            own.year
        };
        Self { year, week }
    }
}

impl fmt::Display for IsoWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// First attestation for this custodian and week.
    Fresh,
    /// The attestation that already claimed this custodian and week.
    Repeat,
    /// A different attestation for an already claimed custodian and week.
    ///
    /// `first_cid` is `None` while the claiming attestation is still being recorded.
    Replay { first_cid: Option<String> },
}

#[derive(Debug, Clone)]
struct Claim {
    nonce: String,
    cid: Option<String>,
}

type ClaimKey = (String, IsoWeek);

/// Shared, in-memory record of claimed `(custodian, week)` pairs.
#[derive(Debug, Clone, Default)]
pub struct ReplayGuard {
    claims: Arc<RwLock<HashMap<ClaimKey, Claim>>>,
}

impl ReplayGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_claimed(&self, custodian: &str, week: IsoWeek) -> bool {
        self.claims
            .read()
            .contains_key(&(custodian.to_string(), week))
    }

    /// Classify an attestation without recording it.
    pub fn check(&self, custodian: &str, week: IsoWeek, nonce: &str, cid: &str) -> Observation {
        let claims = self.claims.read();
        classify(claims.get(&(custodian.to_string(), week)), nonce, cid)
    }

    /// Classify an attestation, claiming the pair if it is fresh.
    pub fn observe(&self, custodian: &str, week: IsoWeek, nonce: &str, cid: &str) -> Observation {
        let mut claims = self.claims.write();
        let key = (custodian.to_string(), week);
        let observation = classify(claims.get(&key), nonce, cid);
        match &observation {
            Observation::Fresh => {
                claims.insert(
                    key,
                    Claim {
                        nonce: nonce.to_string(),
                        cid: Some(cid.to_string()),
                    },
                );
            }
            Observation::Replay { first_cid } => {
                warn!(custodian, %week, nonce, cid, ?first_cid, "Attestation replay");
            }
            Observation::Repeat => {}
        }
        observation
    }

    /// Reserve `(custodian, week)` for an attestation about to be recorded.
    ///
    /// Fails with the existing claim's [`Observation`] if the pair is taken.
    /// The reservation is released when the returned [`WeekClaim`] is dropped
    /// without being committed.
    pub fn try_claim(
        &self,
        custodian: &str,
        week: IsoWeek,
        nonce: &str,
    ) -> Result<WeekClaim<'_>, Observation> {
        let mut claims = self.claims.write();
        let key = (custodian.to_string(), week);
        if let Some(claim) = claims.get(&key) {
            return Err(Observation::Replay {
                first_cid: claim.cid.clone(),
            });
        }
        claims.insert(
            key.clone(),
            Claim {
                nonce: nonce.to_string(),
                cid: None,
            },
        );
        Ok(WeekClaim {
            guard: self,
            key,
            committed: false,
        })
    }
}

/// A custodian's reservation of one week, held while its attestation is recorded.
#[must_use = "dropping a claim releases the week"]
#[derive(Debug)]
pub struct WeekClaim<'a> {
    guard: &'a ReplayGuard,
    key: ClaimKey,
    committed: bool,
}

impl WeekClaim<'_> {
    pub fn week(&self) -> IsoWeek {
        self.key.1
    }

    /// Keep the reservation, bound to the recorded attestation's CID.
    pub fn commit(mut self, cid: &str) {
        if let Some(claim) = self.guard.claims.write().get_mut(&self.key) {
            claim.cid = Some(cid.to_string());
        }
        self.committed = true;
    }
}

impl Drop for WeekClaim<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.guard.claims.write().remove(&self.key);
            debug!(custodian = %self.key.0, week = %self.key.1, "Released attestation claim");
        }
    }
}

fn classify(claim: Option<&Claim>, nonce: &str, cid: &str) -> Observation {
    match claim {
        None => Observation::Fresh,
        Some(claim)
            if claim.nonce == nonce && claim.cid.as_deref().is_none_or(|first| first == cid) =>
        {
            Observation::Repeat
        }
        Some(claim) => Observation::Replay {
            first_cid: claim.cid.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W10: IsoWeek = IsoWeek {
        year: 2025,
        week: 10,
    };

    fn at(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    fn replay_of(cid: &str) -> Observation {
        Observation::Replay {
            first_cid: Some(cid.to_string()),
        }
    }

    #[test]
    fn test_containing_week() {
        let week = |s: &str| IsoWeek::containing(at(s));

        assert_eq!(week("2025-01-06T12:00:00Z"), IsoWeek { year: 2025, week: 2 });
        // 2024-12-30 belongs to week 1 of 2025.
        assert_eq!(week("2024-12-30T00:00:00Z"), IsoWeek { year: 2025, week: 1 });
        assert_eq!(week("2021-01-03T23:59:59Z"), IsoWeek { year: 2020, week: 53 });
        assert_eq!(week("2026-01-06T00:00:00Z").to_string(), "2026-W02");
    }

    #[test]
    fn test_nearest_week_crosses_years() {
        let early_january = at("2026-01-05T00:00:00Z");
        assert_eq!(IsoWeek::nearest(early_january, 2), IsoWeek { year: 2026, week: 2 });
        assert_eq!(IsoWeek::nearest(early_january, 52), IsoWeek { year: 2025, week: 52 });

        let late_december = at("2025-12-24T00:00:00Z");
        assert_eq!(IsoWeek::nearest(late_december, 1), IsoWeek { year: 2026, week: 1 });
        assert_eq!(IsoWeek::nearest(late_december, 40), IsoWeek { year: 2025, week: 40 });
    }

    #[test]
    fn test_first_claim_wins() {
        let guard = ReplayGuard::new();

        assert_eq!(guard.check("G1", W10, "nonce-aaaa", "bafy1"), Observation::Fresh);
        assert!(!guard.is_claimed("G1", W10));

        assert_eq!(guard.observe("G1", W10, "nonce-aaaa", "bafy1"), Observation::Fresh);
        assert!(guard.is_claimed("G1", W10));
        assert_eq!(guard.observe("G1", W10, "nonce-aaaa", "bafy1"), Observation::Repeat);
    }

    #[test]
    fn test_reuse_is_replay() {
        let guard = ReplayGuard::new();
        guard.observe("G1", W10, "nonce-aaaa", "bafy1");

        // Same nonce, different document.
        assert_eq!(guard.observe("G1", W10, "nonce-aaaa", "bafy2"), replay_of("bafy1"));
        // Second nonce for the same week.
        assert_eq!(guard.observe("G1", W10, "nonce-bbbb", "bafy3"), replay_of("bafy1"));
    }

    #[test]
    fn test_pairs_are_independent() {
        let guard = ReplayGuard::new();
        guard.observe("G1", W10, "nonce-aaaa", "bafy1");

        let next_week = IsoWeek { week: 11, ..W10 };
        let next_year = IsoWeek { year: 2026, ..W10 };
        assert_eq!(guard.observe("G1", next_week, "nonce-aaaa", "bafy2"), Observation::Fresh);
        assert_eq!(guard.observe("G1", next_year, "nonce-aaaa", "bafy3"), Observation::Fresh);
        assert_eq!(guard.observe("G2", W10, "nonce-aaaa", "bafy4"), Observation::Fresh);
    }

    #[test]
    fn test_clones_share_state() {
        let guard = ReplayGuard::new();
        let other = guard.clone();
        guard.observe("G1", W10, "nonce-aaaa", "bafy1");
        assert!(other.is_claimed("G1", W10));
    }

    #[test]
    fn test_claim_is_exclusive_until_released() {
        let guard = ReplayGuard::new();

        let claim = guard.try_claim("G1", W10, "nonce-aaaa").unwrap();
        assert_eq!(claim.week(), W10);
        assert_eq!(
            guard.try_claim("G1", W10, "nonce-bbbb").unwrap_err(),
            Observation::Replay { first_cid: None }
        );
        // The in-flight attestation itself is not a replay.
        assert_eq!(guard.check("G1", W10, "nonce-aaaa", "bafy1"), Observation::Repeat);
        assert_eq!(
            guard.check("G1", W10, "nonce-bbbb", "bafy2"),
            Observation::Replay { first_cid: None }
        );

        drop(claim);
        assert!(!guard.is_claimed("G1", W10));
        assert!(guard.try_claim("G1", W10, "nonce-bbbb").is_ok());
    }

    #[test]
    fn test_committed_claim_is_kept() {
        let guard = ReplayGuard::new();
        guard.try_claim("G1", W10, "nonce-aaaa").unwrap().commit("bafy1");

        assert!(guard.is_claimed("G1", W10));
        assert_eq!(guard.observe("G1", W10, "nonce-aaaa", "bafy1"), Observation::Repeat);
        assert_eq!(guard.observe("G1", W10, "nonce-bbbb", "bafy2"), replay_of("bafy1"));
        assert_eq!(
            guard.try_claim("G1", W10, "nonce-cccc").unwrap_err(),
            replay_of("bafy1")
        );
    }
}
