//! Direct fare calculation endpoint.
//!
//! Prices a trip from caller-supplied mileage and county information with no
//! external lookups. Useful for re-pricing a stored quote or for back-office
//! tools that already know the route.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use ridefare_core::{check_supplied_miles, CountyInfo, FareBreakdown, TemporalFlags};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::estimate::TripDetails;
use crate::state::SharedState;

/// Request body for a direct fare calculation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "pickup_date_time": "2025-03-15T11:00:00",
    "is_round_trip": true,
    "client_weight_lbs": 320.0,
    "trip_distance_miles": "10",
    "county_info": {"is_in_reference_county": true, "counties_out": 0}
}))]
pub struct FareRequest {
    /// One-way trip miles.
    #[schema(value_type = String, example = "12.5")]
    pub trip_distance_miles: Decimal,

    /// Depot travel miles; only charged when `counties_out` is 2.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "0")]
    pub dead_mileage_miles: Option<Decimal>,

    /// County classification; defaults to in-county with no crossings.
    #[serde(default)]
    pub county_info: Option<CountyInfo>,

    /// Rider and schedule details.
    #[serde(flatten)]
    pub trip: TripDetails,
}

/// A computed fare.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FareResponse {
    /// Itemized fare.
    pub breakdown: FareBreakdown,
    /// Surcharge flags for the pickup time.
    pub temporal: TemporalFlags,
}

/// Calculate a fare without external lookups.
#[utoipa::path(
    post,
    path = "/fare",
    tag = "pricing",
    operation_id = "calculateFare",
    summary = "Calculate a fare from known inputs",
    description = "Runs the fare calculator directly on the supplied mileage \
        and county classification. No maps provider is consulted.",
    request_body = FareRequest,
    responses(
        (status = 200, description = "Fare computed", body = FareResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 422, description = "Request body does not match the schema", body = ErrorResponse)
    )
)]
pub async fn calculate_fare(
    State(state): State<SharedState>,
    payload: Result<Json<FareRequest>, JsonRejection>,
) -> ApiResult<Json<FareResponse>> {
    let Json(body) = payload?;

    let max_miles = state.config.distance.max_miles;
    let trip_miles =
        check_supplied_miles("trip_distance_miles", body.trip_distance_miles, max_miles)?;
    let dead_miles = check_supplied_miles(
        "dead_mileage_miles",
        body.dead_mileage_miles.unwrap_or(Decimal::ZERO),
        max_miles,
    )?;
    let county = body.county_info.unwrap_or_default();
    county.validate()?;

    let request = body.trip.into_request(state.config.service_area.tz())?;
    let calculator = state.estimator.calculator();
    let temporal = calculator.temporal().classify(request.pickup_date_time);
    let breakdown = calculator.calculate_with_flags(
        &request,
        &county,
        &temporal,
        trip_miles,
        dead_miles,
    );

    Ok(Json(FareResponse {
        breakdown,
        temporal,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fare_request_defaults() {
        let json = r#"{"pickup_date_time": "2025-03-11T10:00:00", "trip_distance_miles": "4.2"}"#;
        let request: FareRequest = serde_json::from_str(json).unwrap();
        assert!(request.county_info.is_none());
        assert!(request.dead_mileage_miles.is_none());
        assert_eq!(request.trip_distance_miles, Decimal::new(42, 1));
    }
}
