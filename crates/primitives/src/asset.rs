//! Ledger asset value objects.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::amount::LEDGER_DECIMALS;

/// Code used for the native asset.
pub const NATIVE_CODE: &str = "XLM";

/// An issued (non-native) asset identified by its code and issuing account.
///
/// Both parts compare exactly; issuer comparison is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssuedAsset {
    pub code: String,
    pub issuer: String,
}

impl IssuedAsset {
    pub fn new(code: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            issuer: issuer.into(),
        }
    }

    /// Returns `true` when both code and issuer are present.
    pub fn is_configured(&self) -> bool {
        !self.code.trim().is_empty() && !self.issuer.trim().is_empty()
    }
}

impl fmt::Display for IssuedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.code, self.issuer)
    }
}

/// An asset a payment can move.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Asset {
    Native,
    Credit(IssuedAsset),
}

impl Asset {
    pub fn code(&self) -> &str {
        match self {
            Self::Native => NATIVE_CODE,
            Self::Credit(asset) => &asset.code,
        }
    }

    pub fn issuer(&self) -> Option<&str> {
        match self {
            Self::Native => None,
            Self::Credit(asset) => Some(&asset.issuer),
        }
    }

    /// Fractional digits the ledger tracks for this asset.
    pub const fn precision(&self) -> u32 {
        LEDGER_DECIMALS
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str(NATIVE_CODE),
            Self::Credit(asset) => asset.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_accessors() {
        let susd = IssuedAsset::new("SUSD", "GISSUER");
        let asset = Asset::Credit(susd.clone());

        assert_eq!(asset.code(), "SUSD");
        assert_eq!(asset.issuer(), Some("GISSUER"));
        assert_eq!(Asset::Native.code(), "XLM");
        assert_eq!(Asset::Native.issuer(), None);
        assert_eq!(asset.precision(), 7);
    }

    #[test]
    fn test_is_configured() {
        assert!(IssuedAsset::new("SUSD", "GISSUER").is_configured());
        assert!(!IssuedAsset::new("", "GISSUER").is_configured());
        assert!(!IssuedAsset::new("SUSD", "  ").is_configured());
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(Asset::Credit(IssuedAsset::new("SUSD", "GX"))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "credit", "code": "SUSD", "issuer": "GX"})
        );
        let json = serde_json::to_value(Asset::Native).unwrap();
        assert_eq!(json, serde_json::json!({"type": "native"}));
    }
}
