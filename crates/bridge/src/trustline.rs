//! Trustline lookups.

use std::sync::Arc;

use tracing::debug;
use vesto_primitives::{Chain, IssuedAsset, is_valid_stellar_address};

use crate::{
    error::{BridgeError, Result},
    ledger::Ledger,
};

/// Read-only check for an account's opt-in to an issued asset.
///
/// No retries: a failed lookup is returned to the caller as is.
#[derive(Clone)]
pub struct TrustlineChecker {
    ledger: Arc<dyn Ledger>,
}

impl TrustlineChecker {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Returns `true` iff `account_id` holds a balance line whose code and
    /// issuer both equal `asset`'s. Unknown accounts have no trustlines.
    pub async fn has_trustline(&self, account_id: &str, asset: &IssuedAsset) -> Result<bool> {
        if !asset.is_configured() {
            return Err(BridgeError::config(format!(
                "{} asset configuration missing",
                asset.code
            )));
        }
        if !is_valid_stellar_address(account_id) {
            return Err(BridgeError::InvalidAddress {
                chain: Chain::Stellar,
                address: account_id.to_string(),
            });
        }

        let Some(account) = self.ledger.load_account(account_id).await? else {
            debug!(account = account_id, "Account not found");
            return Ok(false);
        };
        let found = account.balances.iter().any(|line| line.holds(asset));
        debug!(account = account_id, %asset, found, "Checked trustline");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ledger::Balance,
        test_utils::{MemoryLedger, account},
    };

    fn susd() -> IssuedAsset {
        IssuedAsset::new("SUSD", account(9))
    }

    #[tokio::test]
    async fn test_trustline_requires_code_and_issuer() {
        let ledger = Arc::new(MemoryLedger::default());
        let checker = TrustlineChecker::new(ledger.clone());
        let holder = account(1);

        ledger.set_balances(
            &holder,
            vec![
                Balance::native("10"),
                Balance::issued(&IssuedAsset::new("SUSD", account(8)), "0"),
                Balance::issued(&IssuedAsset::new("VUSD", account(9)), "0"),
            ],
        );
        assert!(!checker.has_trustline(&holder, &susd()).await.unwrap());

        ledger.set_balances(&holder, vec![Balance::issued(&susd(), "0")]);
        assert!(checker.has_trustline(&holder, &susd()).await.unwrap());
    }

    #[tokio::test]
    async fn test_issuer_comparison_is_case_sensitive() {
        let ledger = Arc::new(MemoryLedger::default());
        let checker = TrustlineChecker::new(ledger.clone());
        let holder = account(1);
        let lowered = IssuedAsset::new("SUSD", account(9).to_lowercase());

        ledger.set_balances(&holder, vec![Balance::issued(&lowered, "0")]);
        assert!(!checker.has_trustline(&holder, &susd()).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_account_has_no_trustline() {
        let checker = TrustlineChecker::new(Arc::new(MemoryLedger::default()));
        assert!(!checker.has_trustline(&account(3), &susd()).await.unwrap());
    }

    #[tokio::test]
    async fn test_errors() {
        let checker = TrustlineChecker::new(Arc::new(MemoryLedger::default()));

        let err = checker
            .has_trustline(&account(1), &IssuedAsset::new("SUSD", ""))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "config_missing");

        let err = checker
            .has_trustline("GNOPE", &susd())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_address");
    }
}
