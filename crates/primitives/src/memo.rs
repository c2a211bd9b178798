//! Memo commitments.
//!
//! Ledger memos hold at most 32 bytes while CIDs are longer, so a transaction
//! carries `sha256(utf8(cid))` instead of the CID itself. Anyone holding the
//! document's CID can recompute the digest and compare it with the memo.

use alloy_primitives::B256;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};

/// A 32-byte commitment to a CID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoCommitment(B256);

impl MemoCommitment {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(B256::new(bytes))
    }

    /// Parse a hex memo, with or without `0x`, in any case.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let bytes = const_hex::decode_to_array::<_, 32>(hex.trim()).ok()?;
        Some(Self::from_bytes(bytes))
    }

    /// Parse a base64 memo as reported by ledger APIs for hash memos.
    pub fn from_base64(encoded: &str) -> Option<Self> {
        let bytes = STANDARD.decode(encoded.trim()).ok()?;
        let bytes: [u8; 32] = bytes.try_into().ok()?;
        Some(Self::from_bytes(bytes))
    }

    pub const fn bytes(&self) -> &B256 {
        &self.0
    }

    /// Lowercase hex, 64 characters, no prefix.
    pub fn hex(&self) -> String {
        const_hex::encode(self.0)
    }
}

/// Commit to a CID string: `sha256(utf8(cid))`.
pub fn commit(cid: &str) -> MemoCommitment {
    let digest: [u8; 32] = Sha256::digest(cid.as_bytes()).into();
    MemoCommitment::from_bytes(digest)
}

/// Returns `true` iff the on-chain memo (hex) is the commitment of `cid`.
///
/// Hex comparison is case-insensitive and tolerates a `0x` prefix.
pub fn reconciles(cid: &str, memo_hex: &str) -> bool {
    let memo = memo_hex.trim();
    let memo = memo
        .strip_prefix("0x")
        .or_else(|| memo.strip_prefix("0X"))
        .unwrap_or(memo);
    memo.eq_ignore_ascii_case(&commit(cid).hex())
}
