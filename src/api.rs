use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::storage::{FundStorage, PrivateFund};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFundRequest {
    #[serde(rename = "FirmCrdNb")]
    pub firm_crd_nb: i64,
    #[serde(rename = "Private_Fund_ID")]
    pub fund_id: String,
    #[serde(rename = "Private_Fund_Name")]
    pub fund_name: String,
    #[serde(rename = "Gross_Asset_Value")]
    pub gross_asset_value: i64,
}

impl NewFundRequest {
    fn validate(&self) -> Result<(), (StatusCode, String)> {
        if self.gross_asset_value < 0 {
            return Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                "Gross Asset Value must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<NewFundRequest> for PrivateFund {
    fn from(req: NewFundRequest) -> Self {
        PrivateFund {
            fund_id: req.fund_id,
            fund_name: req.fund_name,
            firm_crd_nb: req.firm_crd_nb,
            gross_asset_value: req.gross_asset_value,
        }
    }
}

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn FundStorage>,
}

fn internal_error(e: anyhow::Error) -> (StatusCode, String) {
    log::error!("Storage error: {:#}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

async fn health() -> &'static str {
    "OK"
}

async fn get_funds_by_firm(
    State(state): State<AppState>,
    Path(firm_crd): Path<i64>,
) -> Result<Json<Vec<PrivateFund>>, (StatusCode, String)> {
    let funds = state
        .storage
        .funds_by_firm(firm_crd)
        .await
        .map_err(internal_error)?;

    if funds.is_empty() {
        return Err((
            StatusCode::NOT_FOUND,
            "Firm not found or has no funds.".to_string(),
        ));
    }
    Ok(Json(funds))
}

async fn get_top_funds(
    State(state): State<AppState>,
    Path(n): Path<u32>,
) -> Result<Json<Vec<PrivateFund>>, (StatusCode, String)> {
    let funds = state.storage.top_funds(n).await.map_err(internal_error)?;
    Ok(Json(funds))
}

async fn add_fund(
    State(state): State<AppState>,
    Json(req): Json<NewFundRequest>,
) -> Result<Json<PrivateFund>, (StatusCode, String)> {
    req.validate()?;

    if state
        .storage
        .fund_id_exists(&req.fund_id)
        .await
        .map_err(internal_error)?
    {
        return Err((StatusCode::BAD_REQUEST, "Fund ID already exists.".to_string()));
    }

    let fund = PrivateFund::from(req);
    state.storage.add_fund(&fund).await.map_err(internal_error)?;
    log::info!("Added fund {} for firm {}", fund.fund_id, fund.firm_crd_nb);

    Ok(Json(fund))
}

pub fn router(storage: Arc<dyn FundStorage>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/funds/add", post(add_fund))
        .route("/funds/top/:n", get(get_top_funds))
        .route("/funds/:firm_crd", get(get_funds_by_firm))
        .with_state(AppState { storage })
}
