//! Content-addressed proof storage.
//!
//! [`ProofStore`] wraps a [`ContentStore`] and keeps the bridge honest about
//! what it stores: structured documents are canonicalized and encoded as
//! DAG-CBOR locally, their CID is computed locally, and the store's answer is
//! only accepted if it agrees. Fetched content is re-hashed against the
//! requested CID before it is decoded.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tracing::debug;
use vesto_primitives::cid::{self, CidError, DAG_CBOR, RAW};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("content `{cid}` not found: {reason}")]
    NotFound { cid: String, reason: String },
    #[error("failed to decode content `{cid}`: {reason}")]
    Decode { cid: String, reason: String },
    #[error("content does not hash to `{cid}`")]
    Integrity { cid: String },
    #[error("store reported `{reported}`, expected `{expected}`")]
    CidMismatch { expected: String, reported: String },
    #[error("failed to encode document: {0}")]
    Encode(String),
    #[error(transparent)]
    Cid(#[from] CidError),
    #[error("content store request failed: {0}")]
    Transport(String),
}

/// The content-store collaborator.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store raw bytes, returning their CID.
    async fn add(&self, bytes: Vec<u8>) -> Result<String, StoreError>;

    /// Store an already-encoded DAG-CBOR block, returning its CID.
    async fn dag_put(&self, block: Vec<u8>) -> Result<String, StoreError>;

    /// Fetch the bytes behind `cid`. Any retrieval failure is [`StoreError::NotFound`].
    async fn get(&self, cid: &str) -> Result<Vec<u8>, StoreError>;
}

#[derive(Clone)]
pub struct ProofStore {
    store: Arc<dyn ContentStore>,
}

impl std::fmt::Debug for ProofStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofStore").finish_non_exhaustive()
    }
}

impl ProofStore {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Upload a file as raw leaves and return its canonical v1 CID.
    pub async fn upload_file(&self, bytes: Vec<u8>) -> Result<String, StoreError> {
        let local = cid::cid_for(RAW, &bytes)?;
        let reported = self.store.add(bytes.clone()).await?;
        let parsed = cid::parse(&reported)?;

        // Large files come back as a chunked DAG-PB root which cannot be
        // checked from the bytes alone.
        if parsed.codec() == RAW && parsed != local {
            return Err(StoreError::CidMismatch {
                expected: local.to_string(),
                reported,
            });
        }
        let cid = cid::normalize_to_v1(&reported)?;
        debug!(%cid, size = bytes.len(), "Uploaded file");
        Ok(cid)
    }

    /// Upload a structured document and return its canonical v1 CID.
    ///
    /// Documents with equal field values hash identically regardless of field
    /// order. The CID must fit a `manage_data` value.
    pub async fn upload_structured<T: Serialize>(&self, value: &T) -> Result<String, StoreError> {
        let block = encode_canonical(value)?;
        let expected = cid::cid_for(DAG_CBOR, &block)?.to_string();
        cid::ensure_manage_data_size(&expected)?;

        let reported = self.store.dag_put(block).await?;
        let reported = cid::normalize_to_v1(&reported)?;
        if reported != expected {
            return Err(StoreError::CidMismatch { expected, reported });
        }
        debug!(cid = %expected, "Uploaded structured document");
        Ok(expected)
    }

    /// Fetch and decode a document.
    ///
    /// DAG-CBOR blocks are decoded as DAG-CBOR, anything else as JSON.
    pub async fn resolve<T: DeserializeOwned>(&self, cid: &str) -> Result<T, StoreError> {
        let parsed = cid::parse(cid)?;
        let bytes = self.resolve_bytes(cid).await?;

        let decoded = if parsed.codec() == DAG_CBOR {
            serde_ipld_dagcbor::from_slice(&bytes).map_err(|e| e.to_string())
        } else {
            serde_json::from_slice(&bytes).map_err(|e| e.to_string())
        };
        decoded.map_err(|reason| StoreError::Decode {
            cid: cid.to_string(),
            reason,
        })
    }

    /// Fetch raw content, checking it against the CID's digest.
    pub async fn resolve_bytes(&self, cid: &str) -> Result<Vec<u8>, StoreError> {
        let parsed = cid::parse(cid)?;
        let bytes = self.store.get(cid).await?;
        if cid::content_matches(&parsed, &bytes) == Some(false) {
            return Err(StoreError::Integrity {
                cid: cid.to_string(),
            });
        }
        debug!(%cid, size = bytes.len(), "Resolved content");
        Ok(bytes)
    }
}

/// Encode `value` as canonical DAG-CBOR.
pub fn encode_canonical<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    let value = serde_json::to_value(value).map_err(|e| StoreError::Encode(e.to_string()))?;
    serde_ipld_dagcbor::to_vec(&canonicalize(value)).map_err(|e| StoreError::Encode(e.to_string()))
}

/// Compute the CID a structured document will be stored under.
pub fn structured_cid<T: Serialize>(value: &T) -> Result<String, StoreError> {
    let block = encode_canonical(value)?;
    Ok(cid::cid_for(DAG_CBOR, &block)?.to_string())
}

/// Rebuild every map with keys in DAG-CBOR order: shorter keys first, then bytewise.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
