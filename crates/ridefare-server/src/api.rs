//! HTTP API routes and handlers.
//!
//! - `estimate` - Orchestrated trip estimates
//! - `fare` - Direct fare calculation from known inputs
//! - `rates` - The active rate schedule
//! - `health` - Service health checks
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub mod error;
pub mod estimate;
pub mod fare;
pub mod health;
pub mod openapi;
pub mod rates;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                - Health check
/// /api
/// ├── /estimate          - Trip estimate with distance and county lookups
/// ├── /fare              - Fare from caller-supplied mileage and county
/// ├── /rates             - Active rate schedule
/// └── /openapi.json      - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .route("/estimate", post(estimate::get_estimate))
                .route("/fare", post(fare::calculate_fare))
                .route("/rates", get(rates::get_rates))
                .route("/openapi.json", get(openapi::get_openapi_spec)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
