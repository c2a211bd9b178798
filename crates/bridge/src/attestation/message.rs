use vesto_primitives::Amount;

use crate::error::{BridgeError, Result};

/// Domain separator for reserve attestations.
pub const ATTESTATION_DOMAIN: &[u8] = b"VESTO_RESERVE_ATTESTATION_V1";

/// Minimum nonce length, in characters.
pub const MIN_NONCE_LEN: usize = 8;

/// Maximum length of each length-prefixed field, in bytes.
pub const MAX_FIELD_LEN: usize = 256;

/// Highest ISO week number.
pub const MAX_WEEK: u64 = 53;

/// The fields a custodian signs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationMessage {
    pub week: u64,
    pub reserve_amount: Amount,
    pub timestamp: String,
    pub nonce: String,
}

impl AttestationMessage {
    pub fn new(
        week: u64,
        reserve_amount: Amount,
        timestamp: impl Into<String>,
        nonce: impl Into<String>,
    ) -> Result<Self> {
        let timestamp = timestamp.into();
        let nonce = nonce.into();
        if !(1..=MAX_WEEK).contains(&week) {
            return Err(BridgeError::invalid_input(format!(
                "attestation week must be between 1 and {MAX_WEEK}, got {week}"
            )));
        }
        if timestamp.is_empty() {
            return Err(BridgeError::invalid_input("attestation timestamp is required"));
        }
        if nonce.chars().count() < MIN_NONCE_LEN {
            return Err(BridgeError::invalid_input(format!(
                "attestation nonce must be at least {MIN_NONCE_LEN} characters"
            )));
        }
        if timestamp.len() > MAX_FIELD_LEN || nonce.len() > MAX_FIELD_LEN {
            return Err(BridgeError::invalid_input(format!(
                "attestation timestamp and nonce must be at most {MAX_FIELD_LEN} bytes"
            )));
        }
        Ok(Self {
            week,
            reserve_amount,
            timestamp,
            nonce,
        })
    }

    /// Canonical bytes to sign.
    ///
    /// Format: domain || week || field(reserveAmount) || field(timestamp) || field(nonce)
    /// where `week` is a big-endian u64 and `field(s)` is the big-endian u32
    /// byte length of `s` followed by its UTF-8 bytes. `reserveAmount` uses the
    /// 7-digit canonical form, e.g. `1500.0000000`.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let amount = self.reserve_amount.to_string();
        let mut data = Vec::with_capacity(
            ATTESTATION_DOMAIN.len() + 8 + 12 + amount.len() + self.timestamp.len() + self.nonce.len(),
        );
        data.extend_from_slice(ATTESTATION_DOMAIN);
        data.extend_from_slice(&self.week.to_be_bytes());
        for field in [amount.as_str(), self.timestamp.as_str(), self.nonce.as_str()] {
            let len = u32::try_from(field.len()).map_err(|_| {
                BridgeError::invalid_input(format!(
                    "attestation field of {} bytes does not fit its length prefix",
                    field.len()
                ))
            })?;
            data.extend_from_slice(&len.to_be_bytes());
            data.extend_from_slice(field.as_bytes());
        }
        Ok(data)
    }
}

/// Build the canonical message for `(week, reserve_amount, timestamp, nonce)`.
pub fn build_message(
    week: u64,
    reserve_amount: Amount,
    timestamp: &str,
    nonce: &str,
) -> Result<Vec<u8>> {
    AttestationMessage::new(week, reserve_amount, timestamp, nonce)?.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn test_layout() {
        let bytes = build_message(2, amount("1.5"), "T", "noncenonce").unwrap();

        let mut expected = ATTESTATION_DOMAIN.to_vec();
        expected.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 2]);
        expected.extend_from_slice(&[0, 0, 0, 9]);
        expected.extend_from_slice(b"1.5000000");
        expected.extend_from_slice(&[0, 0, 0, 1]);
        expected.extend_from_slice(b"T");
        expected.extend_from_slice(&[0, 0, 0, 10]);
        expected.extend_from_slice(b"noncenonce");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_every_field_is_bound() {
        let base = build_message(10, amount("100"), "2025-03-03T00:00:00Z", "abcdefgh").unwrap();

        for other in [
            build_message(11, amount("100"), "2025-03-03T00:00:00Z", "abcdefgh"),
            build_message(10, amount("100.0000001"), "2025-03-03T00:00:00Z", "abcdefgh"),
            build_message(10, amount("100"), "2025-03-03T00:00:01Z", "abcdefgh"),
            build_message(10, amount("100"), "2025-03-03T00:00:00Z", "abcdefgi"),
        ] {
            assert_ne!(other.unwrap(), base);
        }
    }

    #[test]
    fn test_field_boundaries_are_unambiguous() {
        let a = build_message(1, amount("1"), "2025-01-01", "Zabcdefgh").unwrap();
        let b = build_message(1, amount("1"), "2025-01-01Z", "abcdefgh").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_amount_is_canonicalized() {
        assert_eq!(
            build_message(1, amount("5"), "t", "12345678").unwrap(),
            build_message(1, amount("5.0000000"), "t", "12345678").unwrap()
        );
    }

    #[test]
    fn test_nonce_and_timestamp_are_required() {
        let err = build_message(1, amount("1"), "t", "1234567").unwrap_err();
        assert_eq!(err.code(), "invalid_input");
        assert!(build_message(1, amount("1"), "", "12345678").is_err());
        assert!(build_message(1, amount("1"), "t", "12345678").is_ok());
    }

    #[test]
    fn test_week_range() {
        for week in [0, MAX_WEEK + 1, u64::MAX] {
            let err = build_message(week, amount("1"), "t", "12345678").unwrap_err();
            assert_eq!(err.code(), "invalid_input");
        }
        assert!(build_message(MAX_WEEK, amount("1"), "t", "12345678").is_ok());
    }

    #[test]
    fn test_oversize_fields_are_rejected() {
        let long = "n".repeat(MAX_FIELD_LEN + 1);
        let err = build_message(1, amount("1"), "t", &long).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
        assert!(build_message(1, amount("1"), &long, "12345678").is_err());

        let at_limit = "n".repeat(MAX_FIELD_LEN);
        let bytes = build_message(1, amount("1"), "t", &at_limit).unwrap();
        assert!(bytes.ends_with(at_limit.as_bytes()));
    }

    #[test]
    fn test_zero_reserve() {
        let bytes = build_message(1, Amount::ZERO, "t", "12345678").unwrap();
        let needle = b"0.0000000";
        assert!(bytes.windows(needle.len()).any(|w| w == needle));
    }
}
