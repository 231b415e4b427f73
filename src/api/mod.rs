// Axum web server layer

use axum::{
    error_handling::HandleErrorLayer,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    routing::{get, post},
    BoxError, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub mod handlers;
pub mod responses;

use crate::auth::AuthService;
use crate::config::Config;
use crate::ledger::LedgerEngine;
use crate::store::LedgerStore;
use responses::ApiError;

/// Application state containing all shared dependencies
///
/// All components are wrapped in Arc for shared ownership across async
/// tasks. The engine and auth service never see HTTP types; this layer
/// translates between the wire and their plain-value interfaces.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LedgerEngine>,
    pub auth: Arc<AuthService>,
    pub store: Arc<dyn LedgerStore>,
    pub config: Arc<Config>,
}

/// Bearer-auth middleware for the protected routes
///
/// Verifies the `Authorization: Bearer` credential and sets the resulting
/// `Identity` in request extensions for handlers to use.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let identity = state.auth.verify_bearer(header)?;
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Create the Axum router with all routes and middleware
///
/// `/healthz` and the `/auth/*` endpoints bypass the auth middleware; the
/// item and movement routes require a verified bearer credential.
pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/healthz", get(handlers::health_handler))
        .route("/auth/register", post(handlers::register_handler))
        .route("/auth/login", post(handlers::login_handler));

    let protected = Router::new()
        .route(
            "/items",
            get(handlers::list_items_handler).post(handlers::receive_stock_handler),
        )
        .route("/items/:id/issue", post(handlers::issue_stock_handler))
        .route("/transactions", get(handlers::list_movements_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let body_limit = state.config.body_size_limit_bytes;
    let timeout_secs = state.config.request_timeout_secs;

    // Timeout errors must be converted back into responses before they
    // reach hyper, hence the HandleErrorLayer in front of the timeout.
    let timeout_stack = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|e: BoxError| async move {
            let status = if e.is::<tower::timeout::error::Elapsed>() {
                StatusCode::REQUEST_TIMEOUT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string())
        }))
        .timeout(Duration::from_secs(timeout_secs))
        .into_inner();

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(timeout_stack)
        .with_state(state)
}
