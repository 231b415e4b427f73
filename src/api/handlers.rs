// Request handlers for API endpoints

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    Extension,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::api::responses::{ApiError, HealthResponse};
use crate::api::AppState;
use crate::core::models::{Identity, Item, MovementRecord};

// Wire DTOs use camelCase to match the public JSON contract.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: Identity,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveStockRequest {
    pub sku: String,
    pub name: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueStockRequest {
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse {
    pub items: Vec<Item>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementView {
    pub id: i64,
    pub item_id: i64,
    pub user_id: Option<i64>,
    pub kind: crate::core::models::MovementKind,
    pub quantity: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub sku: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl From<MovementRecord> for MovementView {
    fn from(r: MovementRecord) -> Self {
        Self {
            id: r.movement.id,
            item_id: r.movement.item_id,
            user_id: r.movement.user_id,
            kind: r.movement.kind,
            quantity: r.movement.quantity,
            created_at: r.movement.created_at,
            sku: r.sku,
            name: r.name,
            username: r.username,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MovementsResponse {
    pub movements: Vec<MovementView>,
}

#[derive(Debug, Deserialize)]
pub struct MovementsQuery {
    pub limit: Option<i64>,
}

/// POST /auth/register
pub async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let session = state
        .auth
        .register(&request.username, &request.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token: session.token,
            user: session.user,
        }),
    ))
}

/// POST /auth/login
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let session = state.auth.login(&request.username, &request.password).await?;

    Ok(Json(AuthResponse {
        token: session.token,
        user: session.user,
    }))
}

/// GET /items
pub async fn list_items_handler(
    State(state): State<AppState>,
) -> Result<Json<ItemsResponse>, ApiError> {
    let items = state.engine.list_items().await?;
    Ok(Json(ItemsResponse { items }))
}

/// POST /items
///
/// Receipts are recorded without user attribution; only issues carry the
/// acting user.
pub async fn receive_stock_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ReceiveStockRequest>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let request_id = request_id(&headers);
    info!(
        sku = %request.sku,
        quantity = request.quantity,
        request_id = %request_id,
        "Received stock receipt request"
    );

    let item = state
        .engine
        .receive_stock(&request.sku, &request.name, request.quantity, None)
        .await
        .map_err(|e| {
            warn!(error = %e, sku = %request.sku, request_id = %request_id, "Receipt rejected");
            ApiError::from_ledger_error_with_id(e, request_id.clone())
        })?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// POST /items/:id/issue
pub async fn issue_stock_handler(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
    headers: HeaderMap,
    Extension(identity): Extension<Identity>,
    Json(request): Json<IssueStockRequest>,
) -> Result<Json<Item>, ApiError> {
    let request_id = request_id(&headers);
    info!(
        item_id = item_id,
        quantity = request.quantity,
        user_id = identity.id,
        request_id = %request_id,
        "Received stock issue request"
    );

    let item = state
        .engine
        .issue_stock(item_id, request.quantity, Some(&identity))
        .await
        .map_err(|e| {
            warn!(error = %e, item_id = item_id, request_id = %request_id, "Issue rejected");
            ApiError::from_ledger_error_with_id(e, request_id.clone())
        })?;

    Ok(Json(item))
}

/// GET /transactions?limit=
pub async fn list_movements_handler(
    State(state): State<AppState>,
    Query(query): Query<MovementsQuery>,
) -> Result<Json<MovementsResponse>, ApiError> {
    let movements = state.engine.list_movements(query.limit).await?;
    Ok(Json(MovementsResponse {
        movements: movements.into_iter().map(MovementView::from).collect(),
    }))
}

/// GET /healthz
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, ApiError> {
    match state.store.ping().await {
        Ok(()) => Ok(Json(HealthResponse {
            status: "ok".to_string(),
            store: "ok".to_string(),
        })),
        Err(e) => {
            error!(error = %e, "Health check failed: store unreachable");
            Err(ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "store unreachable".to_string(),
            ))
        }
    }
}

/// Extract request ID from headers or generate one
fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
