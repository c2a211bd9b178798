//! ed25519 signing for reserve attestations.
//!
//! Custodian keys use the ledger's strkey encoding: the secret is an `S...`
//! seed and signatures are attributed to the matching `G...` account id.

use std::path::Path;

use ed25519_dalek::{SIGNATURE_LENGTH, Signature, Signer as _, SigningKey, VerifyingKey};
use vesto_primitives::strkey;

use crate::error::{BridgeError, Result};

pub struct AttestationSigner {
    signing_key: SigningKey,
    public_key: String,
}

impl std::fmt::Debug for AttestationSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttestationSigner")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl AttestationSigner {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let public_key = strkey::encode_ed25519_public_key(&signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            public_key,
        }
    }

    /// Create a signer from an `S...` strkey secret seed.
    pub fn from_secret(secret: &str) -> Result<Self> {
        let seed = strkey::decode_ed25519_secret_seed(secret.trim())
            .map_err(|e| BridgeError::config(format!("invalid custodian secret: {e}")))?;
        Ok(Self::from_seed(seed))
    }

    /// Load a signer from a file holding an `S...` strkey secret seed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let secret = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::config(format!(
                "failed to read custodian secret file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_secret(&secret)
    }

    /// The signer's `G...` account id.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Detached ed25519 signature over `message`.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LENGTH] {
        self.signing_key.sign(message).to_bytes()
    }
}

/// Verify a detached signature against a `G...` account id.
///
/// Malformed keys or signatures verify as `false`.
pub fn verify(message: &[u8], signature: &[u8], public_key: &str) -> bool {
    let Ok(key) = strkey::decode_ed25519_public_key(public_key) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&key) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    key.verify_strict(message, &signature).is_ok()
}
