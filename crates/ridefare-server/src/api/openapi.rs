//! OpenAPI specification for the ridefare API.
//!
//! Consumed by the mobile client's generated TypeScript bindings.

use axum::Json;
use ridefare_core::{
    CountyInfo, CountySource, DistanceInfo, DistanceSource, FareBreakdown, RateSchedule,
    TemporalFlags, WeekendAfterHours, WheelchairType,
};
use utoipa::OpenApi;

use super::error::ErrorResponse;
use super::estimate::{EstimateRequest, EstimateResponse, TripDetails};
use super::fare::{FareRequest, FareResponse};
use super::health::HealthResponse;
use super::rates::{HolidayDate, RatesResponse};

/// Serve the OpenAPI specification as JSON at `/api/openapi.json`.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// The OpenAPI specification as pretty JSON, for the gen-openapi binary.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for ridefare.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ridefare API",
        version = "0.1.0",
        description = r#"
# ridefare API

Fare quotes for non-emergency medical transportation.

## Pricing

A fare is a per-leg base rate (standard or bariatric) plus per-mile charges,
with flat surcharges for weekends, after-hours pickups, holidays, emergencies,
wheelchair rental and trips spanning two counties outside the reference
county. Veterans receive a percentage discount on the subtotal.

## Estimated quotes

Distances and counties come from a maps provider. When a lookup fails the
quote is still produced from documented fallbacks and `is_estimated` is set;
show such quotes as approximate.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local ridefare server")
    ),
    tags(
        (name = "system", description = "Health checks"),
        (name = "pricing", description = "Fare estimates and the rate schedule")
    ),
    paths(
        super::health::health_check,
        super::estimate::get_estimate,
        super::fare::calculate_fare,
        super::rates::get_rates,
    ),
    components(
        schemas(
            // Error types
            ErrorResponse,
            // Health types
            HealthResponse,
            // Pricing types
            EstimateRequest,
            EstimateResponse,
            TripDetails,
            FareRequest,
            FareResponse,
            FareBreakdown,
            DistanceInfo,
            DistanceSource,
            CountyInfo,
            CountySource,
            TemporalFlags,
            WheelchairType,
            // Rate types
            RatesResponse,
            RateSchedule,
            WeekendAfterHours,
            HolidayDate,
        )
    )
)]
pub struct ApiDoc;
