//! Vesto bridge service.
//!
//! Serves the bridge and attestation API over HTTP, talking to a Horizon
//! server for account state, a signing gateway for submissions, and a Kubo
//! node for proof documents.

mod api;
mod horizon;
mod ipfs;

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use eyre::{Result, WrapErr as _, eyre};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use vesto_bridge::{
    BridgeConfig, BridgeOrchestrator,
    attestation::{AttestationSigner, Custodian, ReplayGuard},
    config::DEFAULT_ASSET_CODE,
};

use crate::{api::AppState, horizon::HorizonLedger, ipfs::KuboStore};

/// Timeout for every outgoing HTTP request.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "vesto-bridge")]
#[command(about = "Bridge and reserve attestation service for Vesto")]
struct Args {
    /// TOML bridge configuration. Takes precedence over the account and asset flags.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Escrow account that sources every bridge transaction
    #[arg(long, env = "BRIDGE_ACCOUNT")]
    bridge_account: Option<String>,

    /// Code of the bridged asset
    #[arg(long, env = "SUSD_CODE", default_value = DEFAULT_ASSET_CODE)]
    asset_code: String,

    /// Issuer of the bridged asset
    #[arg(long, env = "SUSD_ISSUER")]
    asset_issuer: Option<String>,

    /// Horizon server URL
    #[arg(long, env = "HORIZON_URL")]
    horizon_url: String,

    /// Gateway that signs and submits transactions
    #[arg(long, env = "LEDGER_GATEWAY_URL")]
    ledger_gateway_url: String,

    /// Kubo RPC API URL
    #[arg(long, env = "IPFS_API_URL", default_value = "http://127.0.0.1:5001")]
    ipfs_api_url: String,

    #[arg(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:8080")]
    listen_addr: SocketAddr,

    /// Custodian secret seed. Attestations are disabled without it.
    #[arg(long, env = "CUSTODIAN_SECRET", hide_env_values = true)]
    custodian_secret: Option<String>,
}

impl Args {
    fn bridge_config(&self) -> Result<BridgeConfig> {
        if let Some(path) = &self.config {
            return BridgeConfig::from_file(path)
                .wrap_err_with(|| format!("failed to load config from {}", path.display()));
        }

        let account = self
            .bridge_account
            .clone()
            .ok_or_else(|| eyre!("either --bridge-account or --config is required"))?;
        let mut config = BridgeConfig::new(account);
        config.asset_code = self.asset_code.clone();
        config.asset_issuer = self
            .asset_issuer
            .clone()
            .filter(|issuer| !issuer.trim().is_empty());
        config.validate().wrap_err("invalid bridge configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("vesto_bridge=info".parse()?))
        .init();

    let args = Args::parse();
    let config = args.bridge_config()?;

    let client = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .wrap_err("failed to build HTTP client")?;
    let ledger = Arc::new(HorizonLedger::new(
        client.clone(),
        &args.horizon_url,
        &args.ledger_gateway_url,
    ));
    let store = Arc::new(KuboStore::new(client, &args.ipfs_api_url));

    let custodian = match args.custodian_secret.as_deref() {
        Some(secret) => {
            let signer =
                AttestationSigner::from_secret(secret).wrap_err("invalid custodian secret")?;
            let custodian = Custodian::new(signer, ledger.clone(), store.clone(), ReplayGuard::new())
                .with_tx_timeout(config.tx_timeout_secs);
            info!(custodian = custodian.account(), "Attestations enabled");
            Some(Arc::new(custodian))
        }
        None => None,
    };

    info!(
        bridge_account = %config.bridge_account,
        asset_code = %config.asset_code,
        asset_issuer = ?config.asset_issuer,
        horizon_url = %args.horizon_url,
        ipfs_api_url = %args.ipfs_api_url,
        "Starting bridge service"
    );

    let state = AppState {
        bridge: BridgeOrchestrator::new(config, ledger, store),
        custodian,
    };

    let listener = tokio::net::TcpListener::bind(args.listen_addr)
        .await
        .wrap_err_with(|| format!("failed to bind {}", args.listen_addr))?;
    info!(addr = %args.listen_addr, "Listening");
    axum::serve(listener, api::router(state))
        .await
        .wrap_err("server exited")
}
