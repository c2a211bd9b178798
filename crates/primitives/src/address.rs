//! Destination address validation.
//!
//! The `check_*` functions return a tagged result describing why an address
//! was rejected; the `is_valid_*` predicates collapse that into a boolean and
//! never panic.

use std::{fmt, str::FromStr};

use alloy_primitives::keccak256;
use serde::{Deserialize, Serialize};

use crate::strkey::{self, StrkeyError};

/// Number of hex characters in an EVM address (without `0x`).
const EVM_HEX_LEN: usize = 40;

/// Chains the bridge can deliver to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chain {
    #[serde(rename = "EVM")]
    Evm,
    #[serde(rename = "Stellar")]
    Stellar,
}

impl Chain {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Evm => "EVM",
            Self::Stellar => "Stellar",
        }
    }

    /// Validate an address with the rules of this chain.
    pub fn is_valid_address(&self, address: &str) -> bool {
        match self {
            Self::Evm => is_valid_evm_address(address),
            Self::Stellar => is_valid_stellar_address(address),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EVM" | "evm" => Ok(Self::Evm),
            "Stellar" | "stellar" => Ok(Self::Stellar),
            other => Err(AddressError::UnknownChain(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address must start with 0x")]
    MissingPrefix,
    #[error("address must have 40 hex characters, got {0}")]
    InvalidLength(usize),
    #[error("address contains non-hex characters")]
    InvalidHex,
    #[error("mixed-case address fails the EIP-55 checksum")]
    ChecksumMismatch,
    #[error("invalid stellar address: {0}")]
    Strkey(#[from] StrkeyError),
    #[error("unknown chain: {0}")]
    UnknownChain(String),
}

/// Check an EVM address: `0x` followed by 40 hex characters.
///
/// Single-case addresses (all letters lower or all upper) are accepted without
/// a checksum. Mixed-case addresses must match EIP-55: a letter is uppercase iff
/// the matching nibble of `keccak256(lowercase hex)` is at least 8.
pub fn check_evm_address(address: &str) -> Result<(), AddressError> {
    let hex = address
        .strip_prefix("0x")
        .ok_or(AddressError::MissingPrefix)?;
    if hex.len() != EVM_HEX_LEN {
        return Err(AddressError::InvalidLength(hex.len()));
    }
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AddressError::InvalidHex);
    }

    let has_lower = hex.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = hex.bytes().any(|b| b.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        return Ok(());
    }

    let hash = keccak256(hex.to_ascii_lowercase().as_bytes());
    for (i, b) in hex.bytes().enumerate() {
        if !b.is_ascii_alphabetic() {
            continue;
        }
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if b.is_ascii_uppercase() != (nibble >= 8) {
            return Err(AddressError::ChecksumMismatch);
        }
    }

    Ok(())
}

/// Check a Stellar account address (`G...` ed25519 strkey).
pub fn check_stellar_address(address: &str) -> Result<[u8; 32], AddressError> {
    Ok(strkey::decode_ed25519_public_key(address)?)
}

pub fn is_valid_evm_address(address: &str) -> bool {
    check_evm_address(address).is_ok()
}

pub fn is_valid_stellar_address(address: &str) -> bool {
    check_stellar_address(address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use proptest::prelude::*;

    // Test vectors from EIP-55.
    const CHECKSUMMED: [&str; 4] = [
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
        "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
    ];

    #[test]
    fn test_eip55_vectors() {
        for address in CHECKSUMMED {
            assert!(is_valid_evm_address(address), "{address}");
        }
    }

    #[test]
    fn test_single_case_skips_checksum() {
        for address in CHECKSUMMED {
            let hex = &address[2..];
            assert!(is_valid_evm_address(&format!("0x{}", hex.to_lowercase())));
            assert!(is_valid_evm_address(&format!("0x{}", hex.to_uppercase())));
        }
    }

    #[test]
    fn test_flipped_case_rejected() {
        let address = CHECKSUMMED[0];
        // Flip the case of the first letter after the prefix ('a' at index 3).
        let flipped = "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        assert_ne!(address, flipped);
        assert_eq!(
            check_evm_address(flipped),
            Err(AddressError::ChecksumMismatch)
        );
    }

    #[test]
    fn test_malformed_evm_addresses() {
        assert_eq!(
            check_evm_address("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"),
            Err(AddressError::MissingPrefix)
        );
        assert_eq!(
            check_evm_address("0x5aAeb6053F"),
            Err(AddressError::InvalidLength(10))
        );
        assert_eq!(
            check_evm_address("0xzzzeb6053F3E94C9b9A09f33669435E7Ef1BeAed"),
            Err(AddressError::InvalidHex)
        );
        assert!(!is_valid_evm_address(""));
        assert!(!is_valid_evm_address("0x"));
    }

    #[test]
    fn test_stellar_address() {
        let address = strkey::encode_ed25519_public_key(&[0x11; 32]);
        assert!(is_valid_stellar_address(&address));
        assert!(Chain::Stellar.is_valid_address(&address));
        assert!(!Chain::Evm.is_valid_address(&address));

        let seed = strkey::encode_ed25519_secret_seed(&[0x11; 32]);
        assert!(!is_valid_stellar_address(&seed));
        assert!(!is_valid_stellar_address("GABC"));
        assert!(!is_valid_stellar_address(""));
    }

    #[test]
    fn test_chain_parse() {
        assert_eq!("EVM".parse::<Chain>().unwrap(), Chain::Evm);
        assert_eq!("Stellar".parse::<Chain>().unwrap(), Chain::Stellar);
        assert!("Solana".parse::<Chain>().is_err());
        assert_eq!(serde_json::to_string(&Chain::Evm).unwrap(), "\"EVM\"");
    }

    proptest! {
        #[test]
        fn prop_checksummed_addresses_validate(bytes in any::<[u8; 20]>()) {
            let address = Address::from(bytes);
            let checksummed = address.to_checksum(None);
            prop_assert!(is_valid_evm_address(&checksummed));

            let hex = &checksummed[2..];
            let lowercased = format!("0x{}", hex.to_lowercase());
            let uppercased = format!("0x{}", hex.to_uppercase());
            prop_assert!(is_valid_evm_address(&lowercased));
            prop_assert!(is_valid_evm_address(&uppercased));
        }

        #[test]
        fn prop_single_flipped_letter_fails(bytes in any::<[u8; 20]>(), pick in any::<usize>()) {
            let checksummed = Address::from(bytes).to_checksum(None);
            let hex = &checksummed[2..];
            let letters: Vec<usize> = hex
                .bytes()
                .enumerate()
                .filter(|(_, b)| b.is_ascii_alphabetic())
                .map(|(i, _)| i)
                .collect();
            let lower = hex.bytes().any(|b| b.is_ascii_lowercase());
            let upper = hex.bytes().any(|b| b.is_ascii_uppercase());

            // Flipping must leave the address mixed-case for the checksum to apply.
            prop_assume!(letters.len() >= 3 && lower && upper);

            let target = letters[pick % letters.len()];
            let flipped: String = hex
                .chars()
                .enumerate()
                .map(|(i, c)| {
                    if i != target {
                        c
                    } else if c.is_ascii_uppercase() {
                        c.to_ascii_lowercase()
                    } else {
                        c.to_ascii_uppercase()
                    }
                })
                .collect();
            let still_mixed = flipped.bytes().any(|b| b.is_ascii_lowercase())
                && flipped.bytes().any(|b| b.is_ascii_uppercase());
            prop_assume!(still_mixed);

            let flipped_address = format!("0x{flipped}");
            prop_assert!(!is_valid_evm_address(&flipped_address));
        }
    }
}
