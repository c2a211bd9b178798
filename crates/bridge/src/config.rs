//! Bridge configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use vesto_primitives::{IssuedAsset, is_valid_stellar_address};

use crate::{
    error::{BridgeError, Result},
    ledger::DEFAULT_TX_TIMEOUT_SECS,
};

/// Code of the issued asset when none is configured.
pub const DEFAULT_ASSET_CODE: &str = "SUSD";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Escrow account: source of every bridge transaction and destination of locks.
    pub bridge_account: String,

    #[serde(default = "default_asset_code")]
    pub asset_code: String,

    /// Issuer of the bridged asset. Operations that mint or burn fail with
    /// `config_missing` while this is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_issuer: Option<String>,

    #[serde(default = "default_tx_timeout")]
    pub tx_timeout_secs: u64,
}

fn default_asset_code() -> String {
    DEFAULT_ASSET_CODE.to_string()
}

const fn default_tx_timeout() -> u64 {
    DEFAULT_TX_TIMEOUT_SECS
}

impl BridgeConfig {
    pub fn new(bridge_account: impl Into<String>) -> Self {
        Self {
            bridge_account: bridge_account.into(),
            asset_code: default_asset_code(),
            asset_issuer: None,
            tx_timeout_secs: DEFAULT_TX_TIMEOUT_SECS,
        }
    }

    pub fn with_asset(mut self, code: impl Into<String>, issuer: impl Into<String>) -> Self {
        self.asset_code = code.into();
        self.asset_issuer = Some(issuer.into());
        self
    }

    /// Parses [`BridgeConfig`] from a toml formatted file at `path`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file_contents = std::fs::read_to_string(path)?;
        let this: Self = toml::from_str(&file_contents)?;
        this.validate()?;
        Ok(this)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !is_valid_stellar_address(&self.bridge_account) {
            return Err(Error::InvalidAccount(self.bridge_account.clone()));
        }
        Ok(())
    }

    /// The configured issued asset.
    pub fn issued_asset(&self) -> Result<IssuedAsset> {
        let asset = IssuedAsset::new(
            self.asset_code.trim(),
            self.asset_issuer.as_deref().unwrap_or_default().trim(),
        );
        if !asset.is_configured() {
            return Err(BridgeError::config(format!(
                "{} asset configuration missing",
                self.asset_code
            )));
        }
        Ok(asset)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open file for reading")]
    OpenFile(#[from] std::io::Error),
    #[error("failed parsing file contents")]
    Parse(#[from] toml::de::Error),
    #[error("bridge account `{0}` is not a valid account id")]
    InvalidAccount(String),
}
