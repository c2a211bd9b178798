//! Vesto bridge primitives.
//!
//! Pure building blocks shared by the bridge service and its verifiers:
//!
//! - **address**: destination address checks for EVM (EIP-55) and Stellar (strkey)
//! - **strkey**: strkey codec for ed25519 public keys and secret seeds
//! - **amount**: fixed-point ledger amounts
//! - **asset**: native and issued asset value objects
//! - **cid**: content identifier parsing and canonicalization
//! - **memo**: the 32-byte memo commitment over a CID

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod address;
pub mod amount;
pub mod asset;
pub mod cid;
pub mod memo;
pub mod strkey;

pub use address::{Chain, is_valid_evm_address, is_valid_stellar_address};
pub use amount::Amount;
pub use asset::{Asset, IssuedAsset};
pub use memo::{MemoCommitment, commit};
