//! JSON HTTP surface.
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/health` | GET | Liveness |
//! | `/api/bridge/lock` | POST | Lock funds in escrow |
//! | `/api/bridge/mint` | POST | Mint against a recorded lock |
//! | `/api/bridge/redeem` | POST | Burn for release on the EVM side |
//! | `/api/bridge/trustline` | POST | Check an account's trustline |
//! | `/api/attestation` | POST | Sign and record a reserve attestation |

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, warn};
use vesto_bridge::{
    BridgeError, BridgeOrchestrator, BridgeReceipt, LockRequest, MintRequest, RedeemRequest,
    attestation::{AttestationRequest, AttestationStatus, Custodian},
    error::{ErrorBody, ErrorDetail},
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) bridge: BridgeOrchestrator,
    /// `None` when no custodian secret is configured.
    pub(crate) custodian: Option<Arc<Custodian>>,
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/bridge/lock", post(lock))
        .route("/api/bridge/mint", post(mint))
        .route("/api/bridge/redeem", post(redeem))
        .route("/api/bridge/trustline", post(trustline))
        .route("/api/attestation", post(attest))
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptResponse {
    hash: String,
    cid: String,
    memo_hash_hex: String,
}

impl From<BridgeReceipt> for ReceiptResponse {
    fn from(receipt: BridgeReceipt) -> Self {
        Self {
            hash: receipt.hash,
            cid: receipt.cid,
            memo_hash_hex: receipt.memo_hash_hex,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrustlineRequest {
    #[serde(default)]
    account_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrustlineResponse {
    has_trustline: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AttestationResponse {
    hash: String,
    cid: String,
    memo_hash_hex: String,
    week: u64,
    status: AttestationStatus,
}

#[derive(Debug)]
enum ApiError {
    Bridge(BridgeError),
    InvalidJson(String),
    InvalidInput(String),
    AttestationDisabled,
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        Self::Bridge(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => Self::InvalidInput(err.body_text()),
            other => Self::InvalidJson(other.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Bridge(err) => {
                if err.is_unexpected() {
                    error!(error = ?err, "Unexpected error");
                } else if err.is_upstream() {
                    warn!(code = err.code(), error = ?err, "Upstream request failed");
                } else {
                    debug!(code = err.code(), error = %err, "Request failed");
                }
                let status = StatusCode::from_u16(err.status())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, err.body())
            }
            Self::InvalidJson(message) => (
                StatusCode::BAD_REQUEST,
                error_body("invalid_json", message),
            ),
            Self::InvalidInput(message) => (
                StatusCode::BAD_REQUEST,
                error_body("invalid_input", message),
            ),
            Self::AttestationDisabled => (
                StatusCode::FORBIDDEN,
                error_body(
                    "attestation_disabled",
                    "Server-side attestation signing is disabled.".to_string(),
                ),
            ),
        };
        (status, Json(body)).into_response()
    }
}

fn error_body(code: &'static str, message: String) -> ErrorBody {
    ErrorBody {
        error: ErrorDetail {
            code,
            message,
            hint: None,
        },
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn lock(
    State(state): State<AppState>,
    payload: Result<Json<LockRequest>, JsonRejection>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    let Json(request) = payload?;
    let receipt = state.bridge.process_lock(request).await?;
    Ok(Json(receipt.into()))
}

async fn mint(
    State(state): State<AppState>,
    payload: Result<Json<MintRequest>, JsonRejection>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    let Json(request) = payload?;
    let receipt = state.bridge.process_mint(request).await?;
    Ok(Json(receipt.into()))
}

async fn redeem(
    State(state): State<AppState>,
    payload: Result<Json<RedeemRequest>, JsonRejection>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    let Json(request) = payload?;
    let receipt = state.bridge.process_redeem(request).await?;
    Ok(Json(receipt.into()))
}

async fn trustline(
    State(state): State<AppState>,
    payload: Result<Json<TrustlineRequest>, JsonRejection>,
) -> Result<Json<TrustlineResponse>, ApiError> {
    let Json(request) = payload?;
    let account_id = request.account_id.trim();
    if account_id.is_empty() {
        return Err(ApiError::InvalidInput("accountId is required.".to_string()));
    }
    let has_trustline = state.bridge.has_trustline(account_id).await?;
    Ok(Json(TrustlineResponse { has_trustline }))
}

async fn attest(
    State(state): State<AppState>,
    payload: Result<Json<AttestationRequest>, JsonRejection>,
) -> Result<Json<AttestationResponse>, ApiError> {
    let custodian = state.custodian.ok_or(ApiError::AttestationDisabled)?;
    let Json(request) = payload?;
    let receipt = custodian.attest(request).await?;
    Ok(Json(AttestationResponse {
        hash: receipt.hash,
        cid: receipt.cid,
        memo_hash_hex: receipt.memo_hash_hex,
        week: receipt.document.week,
        status: receipt.status,
    }))
}
