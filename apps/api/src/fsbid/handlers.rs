//! Axum route handlers for the FSBid-backed API.
//!
//! Reads degrade to empty results when FSBid fails (the client has already
//! logged the failing URL). Mutations surface failures.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::auth::{BidderOnly, CdoOnly, CdoOrAo, RequireRole};
use crate::errors::AppError;
use crate::fsbid::bids::{self, BidRecord};
use crate::fsbid::classifications;
use crate::fsbid::clients::{self, ClientRecord};
use crate::fsbid::csv_export::{self, CsvExport};
use crate::fsbid::pagination::{paginate, PageParams, Paginated};
use crate::fsbid::query::ClientSearchParams;
use crate::fsbid::suggestions::{self, SuggestionQuery};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct BidListResponse {
    pub results: Vec<BidRecord>,
}

/// Body of classification inserts and deletes.
#[derive(Debug, Deserialize)]
pub struct ClassificationChange {
    pub te_id: Vec<Value>,
}

impl ClassificationChange {
    fn te_ids(&self) -> Vec<String> {
        self.te_id
            .iter()
            .filter_map(|id| match id {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Bid list (bidders)
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/fsbid/bidlist/
///
/// All live bids of the caller, with position information.
pub async fn handle_bidlist(
    State(state): State<AppState>,
    auth: RequireRole<BidderOnly>,
) -> Result<Json<BidListResponse>, AppError> {
    let user = auth.user;
    let results = bids::user_bids(
        &state.fsbid,
        &state.config.fsbid_api_url,
        &user.token,
        user.emp_id()?,
        None,
    )
    .await
    .unwrap_or_default();

    Ok(Json(BidListResponse { results }))
}

/// GET /api/v1/fsbid/bidlist/csv/
pub async fn handle_bidlist_csv(
    State(state): State<AppState>,
    auth: RequireRole<BidderOnly>,
) -> Result<CsvExport, AppError> {
    let user = auth.user;
    let records = bids::user_bids(
        &state.fsbid,
        &state.config.fsbid_api_url,
        &user.token,
        user.emp_id()?,
        None,
    )
    .await
    .unwrap_or_default();

    Ok(csv_export::bids_csv(&records, Local::now().naive_local())?)
}

/// PUT /api/v1/fsbid/bidlist/bid/:position_id/
///
/// Submits a bid. Any failure is logged and answered with a bare 422.
pub async fn handle_submit_bid(
    State(state): State<AppState>,
    auth: RequireRole<BidderOnly>,
    Path(position_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user = auth.user;
    let result = bids::submit_bid_on_position(
        &state.fsbid,
        &state.config.fsbid_api_url,
        &user.token,
        user.emp_id()?,
        &position_id,
    )
    .await;

    match result {
        Ok(()) => {
            info!("User {} submitted bid on {position_id}", user.ad_id());
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => {
            error!(
                "{} at line {} of {}: {e}. User {}",
                e.kind(),
                line!(),
                file!(),
                user.ad_id()
            );
            Err(AppError::UnprocessableEntity)
        }
    }
}

/// GET /api/v1/fsbid/bidlist/position/:position_id/
///
/// 204 if the position is on the caller's bid list, otherwise 404.
pub async fn handle_bid_membership(
    State(state): State<AppState>,
    auth: RequireRole<BidderOnly>,
    Path(position_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user = auth.user;
    let matching = bids::user_bids(
        &state.fsbid,
        &state.config.fsbid_api_url,
        &user.token,
        user.emp_id()?,
        Some(&position_id),
    )
    .await
    .unwrap_or_default();

    if matching.is_empty() {
        Err(AppError::NotFound(format!(
            "Position {position_id} is not on the bid list"
        )))
    } else {
        Ok(StatusCode::NO_CONTENT)
    }
}

/// PUT /api/v1/fsbid/bidlist/position/:position_id/
pub async fn handle_add_bid(
    State(state): State<AppState>,
    auth: RequireRole<BidderOnly>,
    Path(position_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user = auth.user;
    bids::bid_on_position(
        &state.fsbid,
        &state.config.fsbid_api_url,
        &user.token,
        user.emp_id()?,
        &position_id,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/fsbid/bidlist/position/:position_id/
pub async fn handle_remove_bid(
    State(state): State<AppState>,
    auth: RequireRole<BidderOnly>,
    Path(position_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user = auth.user;
    bids::remove_bid(
        &state.fsbid,
        &state.config.fsbid_api_url,
        &user.token,
        user.emp_id()?,
        &position_id,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/fsbid/bids/:user_id/
///
/// A bidder's bids as seen by their CDO or assignment officer.
pub async fn handle_user_bids(
    State(state): State<AppState>,
    auth: RequireRole<CdoOrAo>,
    Path(user_id): Path<String>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<BidRecord>>, AppError> {
    let records = bids::user_bids(
        &state.fsbid,
        &state.config.fsbid_api_url,
        &auth.user.token,
        &user_id,
        None,
    )
    .await
    .unwrap_or_default();

    Ok(Json(paginate(records, page)))
}

// ────────────────────────────────────────────────────────────────────────────
// Clients (CDOs)
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/fsbid/client/
pub async fn handle_client_search(
    State(state): State<AppState>,
    auth: RequireRole<CdoOnly>,
    Query(filters): Query<ClientSearchParams>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<ClientRecord>>, AppError> {
    let user = auth.user;
    let records = clients::search_clients(
        &state.fsbid,
        &state.config.fsbid_api_url,
        &user.token,
        user.ad_id(),
        &filters,
    )
    .await
    .unwrap_or_default();

    Ok(Json(paginate(records, page)))
}

/// GET /api/v1/fsbid/client/csv/
pub async fn handle_client_csv(
    State(state): State<AppState>,
    auth: RequireRole<CdoOnly>,
    Query(filters): Query<ClientSearchParams>,
) -> Result<CsvExport, AppError> {
    let user = auth.user;
    let records = clients::search_clients_for_csv(
        &state.fsbid,
        &state.config.fsbid_api_url,
        &user.token,
        user.ad_id(),
        &filters,
    )
    .await
    .unwrap_or_default();

    Ok(csv_export::clients_csv(&records, Local::now().naive_local())?)
}

async fn find_client(
    state: &AppState,
    auth: &RequireRole<CdoOnly>,
    perdet_seq_num: &str,
) -> Result<ClientRecord, AppError> {
    clients::single_client(
        &state.fsbid,
        &state.config.fsbid_api_url,
        &auth.user.token,
        auth.user.ad_id(),
        perdet_seq_num,
    )
    .await
    .ok()
    .flatten()
    .ok_or_else(|| AppError::NotFound(format!("Client {perdet_seq_num} not found")))
}

/// GET /api/v1/fsbid/client/:perdet_seq_num/
pub async fn handle_single_client(
    State(state): State<AppState>,
    auth: RequireRole<CdoOnly>,
    Path(perdet_seq_num): Path<String>,
) -> Result<Json<ClientRecord>, AppError> {
    Ok(Json(find_client(&state, &auth, &perdet_seq_num).await?))
}

/// GET /api/v1/fsbid/client/:perdet_seq_num/suggestions/
///
/// Initial position search filters for the client.
pub async fn handle_client_suggestions(
    State(state): State<AppState>,
    auth: RequireRole<CdoOnly>,
    Path(perdet_seq_num): Path<String>,
) -> Result<Json<SuggestionQuery>, AppError> {
    let client = find_client(&state, &auth, &perdet_seq_num).await?;
    let query = suggestions::suggest(
        state.position_counter.as_ref(),
        &auth.user.token,
        client.grade.as_deref().unwrap_or_default(),
        &client.skills,
    )
    .await;
    Ok(Json(query))
}

/// GET /api/v1/fsbid/client/:perdet_seq_num/classifications/
pub async fn handle_get_classifications(
    State(state): State<AppState>,
    auth: RequireRole<CdoOnly>,
    Path(perdet_seq_num): Path<String>,
) -> Json<Option<Vec<String>>> {
    Json(
        classifications::get_client_classification(
            &state.fsbid,
            &state.config.tp_api_url,
            &auth.user.token,
            &perdet_seq_num,
        )
        .await,
    )
}

/// PUT /api/v1/fsbid/client/:perdet_seq_num/classifications/
pub async fn handle_insert_classifications(
    State(state): State<AppState>,
    auth: RequireRole<CdoOnly>,
    Path(perdet_seq_num): Path<String>,
    Json(change): Json<ClassificationChange>,
) -> Result<Json<Option<Vec<String>>>, AppError> {
    let te_ids = require_te_ids(&change)?;
    Ok(Json(
        classifications::insert_client_classification(
            &state.fsbid,
            &state.config.tp_api_url,
            &auth.user.token,
            &perdet_seq_num,
            &te_ids,
        )
        .await,
    ))
}

/// DELETE /api/v1/fsbid/client/:perdet_seq_num/classifications/
pub async fn handle_delete_classifications(
    State(state): State<AppState>,
    auth: RequireRole<CdoOnly>,
    Path(perdet_seq_num): Path<String>,
    Json(change): Json<ClassificationChange>,
) -> Result<Json<Option<Vec<String>>>, AppError> {
    let te_ids = require_te_ids(&change)?;
    Ok(Json(
        classifications::delete_client_classification(
            &state.fsbid,
            &state.config.tp_api_url,
            &auth.user.token,
            &perdet_seq_num,
            &te_ids,
        )
        .await,
    ))
}

fn require_te_ids(change: &ClassificationChange) -> Result<Vec<String>, AppError> {
    let te_ids = change.te_ids();
    if te_ids.is_empty() {
        return Err(AppError::Validation("te_id cannot be empty".to_string()));
    }
    Ok(te_ids)
}
