//! Trip estimate API endpoint.
//!
//! Resolves distance and county through the configured maps provider, then
//! prices the trip. Provider outages never fail the request; the quote is
//! flagged `is_estimated` instead.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use chrono_tz::Tz;
use ridefare_core::{
    parse_pickup_time, CountyInfo, CountySource, DistanceInfo, Estimate, FareBreakdown,
    TemporalFlags, TripPricingRequest, WheelchairType,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::state::SharedState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Rider and schedule details shared by the estimate and fare endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TripDetails {
    /// Whether the vehicle brings the client back (two legs).
    #[serde(default)]
    #[schema(example = false)]
    pub is_round_trip: bool,

    /// Pickup time. An RFC 3339 instant is converted to the service
    /// timezone; a naive `YYYY-MM-DDTHH:MM[:SS]` is taken as local.
    #[schema(example = "2025-03-11T10:30:00")]
    pub pickup_date_time: String,

    /// Client weight in pounds; the configured default applies when absent.
    #[serde(default)]
    #[schema(example = 180.0)]
    pub client_weight_lbs: Option<f64>,

    /// Emergency trip.
    #[serde(default)]
    pub is_emergency: bool,

    /// Client is a veteran.
    #[serde(default)]
    pub is_veteran: bool,

    /// Wheelchair requirement.
    #[serde(default)]
    pub wheelchair_type: WheelchairType,

    /// Client brings their own wheelchair.
    #[serde(default)]
    pub client_provides_wheelchair: bool,
}

impl TripDetails {
    /// Convert into a core request, resolving the pickup time in `tz`.
    pub(crate) fn into_request(self, tz: Tz) -> ApiResult<TripPricingRequest> {
        let pickup_date_time = parse_pickup_time(&self.pickup_date_time, tz)?;
        if let Some(weight) = self.client_weight_lbs {
            if !weight.is_finite() {
                return Err(ApiError::invalid_input("client_weight_lbs must be a finite number"));
            }
        }

        Ok(TripPricingRequest {
            is_round_trip: self.is_round_trip,
            client_weight_lbs: self.client_weight_lbs,
            is_emergency: self.is_emergency,
            is_veteran: self.is_veteran,
            wheelchair_type: self.wheelchair_type,
            client_provides_wheelchair: self.client_provides_wheelchair,
            ..TripPricingRequest::new(pickup_date_time)
        })
    }
}

/// Request body for an estimate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "pickup_address": "1492 Neil Ave, Columbus, OH 43201",
    "destination_address": "410 W 10th Ave, Columbus, OH 43210",
    "is_round_trip": true,
    "pickup_date_time": "2025-03-11T10:30:00",
    "client_weight_lbs": 180.0,
    "is_veteran": true
}))]
pub struct EstimateRequest {
    /// Pickup address.
    #[serde(default)]
    pub pickup_address: Option<String>,

    /// Destination address.
    #[serde(default)]
    pub destination_address: Option<String>,

    /// One-way driving miles, if already known; skips the distance lookup.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "12.5")]
    pub trip_distance_miles: Option<Decimal>,

    /// County classification, if already known; skips geocoding.
    #[serde(default)]
    pub county_info: Option<CountyInfo>,

    /// Rider and schedule details.
    #[serde(flatten)]
    pub trip: TripDetails,
}

/// A priced quote.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EstimateResponse {
    /// Quote identifier, time-ordered.
    pub quote_id: Uuid,

    /// When the quote was computed (RFC 3339).
    #[schema(example = "2025-03-11T14:30:02.117Z")]
    pub computed_at_utc: String,

    /// Itemized fare.
    pub breakdown: FareBreakdown,

    /// Mileages the quote was priced with.
    pub distance: DistanceInfo,

    /// County classification used.
    pub county: CountyInfo,

    /// How the county classification was obtained.
    pub county_source: CountySource,

    /// Surcharge flags for the pickup time.
    pub temporal: TemporalFlags,

    /// Whether any input came from a fallback or heuristic; show the quote
    /// as approximate when set.
    pub is_estimated: bool,
}

impl From<Estimate> for EstimateResponse {
    fn from(estimate: Estimate) -> Self {
        Self {
            quote_id: Uuid::now_v7(),
            computed_at_utc: Utc::now().to_rfc3339(),
            breakdown: estimate.breakdown,
            distance: estimate.distance,
            county: estimate.county,
            county_source: estimate.county_source,
            temporal: estimate.temporal,
            is_estimated: estimate.is_estimated,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Estimate the fare for a trip.
#[utoipa::path(
    post,
    path = "/estimate",
    tag = "pricing",
    operation_id = "getEstimate",
    summary = "Estimate a trip fare",
    description = "Looks up driving distance and county for the addresses, \
        then prices the trip. Supplying `trip_distance_miles` or `county_info` \
        skips the corresponding lookup. If a lookup fails, a documented \
        fallback is used and `is_estimated` is set.",
    request_body = EstimateRequest,
    responses(
        (status = 200, description = "Quote computed", body = EstimateResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 422, description = "Request body does not match the schema", body = ErrorResponse)
    )
)]
pub async fn get_estimate(
    State(state): State<SharedState>,
    payload: Result<Json<EstimateRequest>, JsonRejection>,
) -> ApiResult<Json<EstimateResponse>> {
    let Json(body) = payload?;

    let mut request = body.trip.into_request(state.config.service_area.tz())?;
    request.pickup_address = body.pickup_address;
    request.destination_address = body.destination_address;
    request.trip_distance_miles = body.trip_distance_miles;
    request.county_info = body.county_info;

    let estimate = state.estimator.get_estimate(&request).await?;
    Ok(Json(estimate.into()))
}
