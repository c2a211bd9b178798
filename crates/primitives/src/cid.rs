//! Content identifiers.
//!
//! Proof documents are addressed by CIDv1 with a sha2-256 multihash. Equality
//! between CIDs is defined on the canonical version-1 string form (base32
//! lower, `b...`), so every CID entering the bridge is normalized first.

use ::cid::{Cid, Version, multihash::Multihash};
use sha2::{Digest, Sha256};

/// Multicodec for raw leaves (uploaded files).
pub const RAW: u64 = 0x55;

/// Multicodec for DAG-CBOR (structured documents).
pub const DAG_CBOR: u64 = 0x71;

/// Multicodec for DAG-PB (CIDv0 and chunked files).
pub const DAG_PB: u64 = 0x70;

/// Multihash code for sha2-256.
pub const SHA2_256: u64 = 0x12;

/// Upper bound of a ledger `manage_data` value; the CID string must fit.
pub const MAX_MANAGE_DATA_LEN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum CidError {
    #[error("CID is empty")]
    Empty,
    #[error("failed to parse CID `{input}`")]
    Parse {
        input: String,
        #[source]
        source: ::cid::Error,
    },
    #[error("failed to build multihash: {0}")]
    Multihash(String),
    #[error("CID `{0}` exceeds the 64 byte manage_data limit")]
    TooLong(String),
}

/// Parse any supported CID form (v0 base58btc or multibase-encoded v1).
pub fn parse(input: &str) -> Result<Cid, CidError> {
    if input.is_empty() {
        return Err(CidError::Empty);
    }
    Cid::try_from(input).map_err(|source| CidError::Parse {
        input: input.to_string(),
        source,
    })
}

/// Return the canonical version-1 string of `input`.
///
/// Idempotent: normalizing an already canonical CID returns it unchanged.
pub fn normalize_to_v1(input: &str) -> Result<String, CidError> {
    let cid = parse(input)?;
    let v1 = if cid.version() == Version::V0 {
        cid.into_v1().map_err(|source| CidError::Parse {
            input: input.to_string(),
            source,
        })?
    } else {
        cid
    };
    Ok(v1.to_string())
}

/// Lenient variant of [`normalize_to_v1`] that hands back unparseable input
/// unchanged. Only for ingesting values that are compared, never trusted.
pub fn normalize_to_v1_or_keep(input: &str) -> String {
    normalize_to_v1(input).unwrap_or_else(|_| input.to_string())
}

/// Compute the CIDv1 of `bytes` under `codec` with a sha2-256 multihash.
pub fn cid_for(codec: u64, bytes: &[u8]) -> Result<Cid, CidError> {
    let digest = Sha256::digest(bytes);
    let hash = Multihash::<64>::wrap(SHA2_256, &digest)
        .map_err(|e| CidError::Multihash(e.to_string()))?;
    Ok(Cid::new_v1(codec, hash))
}

/// Check whether `bytes` hash to the digest carried by `cid`.
///
/// Returns `None` when the CID does not use sha2-256 or addresses a chunked
/// DAG-PB root, where the block bytes alone cannot be checked.
pub fn content_matches(cid: &Cid, bytes: &[u8]) -> Option<bool> {
    if cid.hash().code() != SHA2_256 || cid.codec() == DAG_PB {
        return None;
    }
    let digest = Sha256::digest(bytes);
    Some(cid.hash().digest() == digest.as_slice())
}

/// Ensure a CID string can be stored as a `manage_data` value.
pub fn ensure_manage_data_size(cid: &str) -> Result<(), CidError> {
    if cid.len() > MAX_MANAGE_DATA_LEN {
        return Err(CidError::TooLong(cid.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Same dag-pb multihash, as v0 and as canonical v1.
    const V0: &str = "QmWATWQ7fVPP2EFGu71UkfnqhYXDYH566qy47CnJDgvs8u";
    const V1: &str = "bafybeiduiecxoeiqs3gyc6r7v3lymmhserldnpw62qjnhmqsulqjxjmtzi";

    #[test]
    fn test_v0_upgrades_to_v1() {
        let normalized = normalize_to_v1(V0).unwrap();
        assert_eq!(normalized, V1);
        assert!(normalized.starts_with("bafy"));
    }

    #[test]
    fn test_v1_is_unchanged() {
        assert_eq!(normalize_to_v1(V1).unwrap(), V1);
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(normalize_to_v1(""), Err(CidError::Empty)));
        assert!(matches!(
            normalize_to_v1("not-a-cid"),
            Err(CidError::Parse { .. })
        ));
        assert_eq!(normalize_to_v1_or_keep("not-a-cid"), "not-a-cid");
        assert_eq!(normalize_to_v1_or_keep(V0), V1);
    }

    #[test]
    fn test_cid_for_is_content_addressed() {
        let a = cid_for(RAW, b"hello").unwrap();
        let b = cid_for(RAW, b"hello").unwrap();
        let c = cid_for(RAW, b"hello!").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.version(), Version::V1);
        assert_eq!(a.codec(), RAW);
        assert_ne!(cid_for(DAG_CBOR, b"hello").unwrap(), a);
    }

    #[test]
    fn test_content_matches() {
        let cid = cid_for(DAG_CBOR, b"payload").unwrap();
        assert_eq!(content_matches(&cid, b"payload"), Some(true));
        assert_eq!(content_matches(&cid, b"tampered"), Some(false));

        let dag_pb = parse(V0).unwrap();
        assert_eq!(content_matches(&dag_pb, b"anything"), None);
    }

    #[test]
    fn test_manage_data_size() {
        let cid = cid_for(RAW, b"x").unwrap().to_string();
        assert!(ensure_manage_data_size(&cid).is_ok());
        assert!(ensure_manage_data_size(&"b".repeat(65)).is_err());
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(bytes in proptest::collection::vec(any::<u8>(), 0..64), raw in any::<bool>()) {
            let codec = if raw { RAW } else { DAG_CBOR };
            let cid = cid_for(codec, &bytes).unwrap().to_string();

            let once = normalize_to_v1(&cid).unwrap();
            let twice = normalize_to_v1(&once).unwrap();
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(once, cid);
        }

        #[test]
        fn prop_lenient_normalize_is_idempotent(input in "\\PC{0,40}") {
            let once = normalize_to_v1_or_keep(&input);
            prop_assert_eq!(normalize_to_v1_or_keep(&once), once);
        }
    }
}
