//! Active rate schedule endpoint.

use axum::extract::State;
use axum::Json;
use chrono::{Datelike, NaiveDate, Utc};
use ridefare_core::temporal::to_local;
use ridefare_core::{RateSchedule, WeekendAfterHours};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::SharedState;

/// A holiday as it falls in a given year.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HolidayDate {
    /// Holiday name.
    #[schema(example = "Thanksgiving")]
    pub name: String,
    /// Calendar date.
    #[schema(value_type = String, example = "2025-11-27")]
    pub date: NaiveDate,
}

/// The pricing rules currently in force.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RatesResponse {
    /// Every monetary constant.
    pub rates: RateSchedule,

    /// Hour business hours begin (local).
    #[schema(example = 8)]
    pub business_day_start_hour: u32,

    /// Hour after-hours pricing begins (local).
    #[schema(example = 18)]
    pub evening_threshold_hour: u32,

    /// Whether weekend and after-hours surcharges stack.
    pub weekend_after_hours: WeekendAfterHours,

    /// County billed at the in-county rate.
    #[schema(example = "Franklin County")]
    pub reference_county: String,

    /// IANA timezone pickups are evaluated in.
    #[schema(example = "America/New_York")]
    pub timezone: String,

    /// Holidays for the current local year.
    pub holidays: Vec<HolidayDate>,
}

/// Get the active rate schedule.
#[utoipa::path(
    get,
    path = "/rates",
    tag = "pricing",
    operation_id = "getRates",
    summary = "Get the active rate schedule",
    description = "Returns the rates, surcharges, business hours and this \
        year's holiday calendar used for every quote.",
    responses(
        (status = 200, description = "Rate schedule", body = RatesResponse)
    )
)]
pub async fn get_rates(State(state): State<SharedState>) -> Json<RatesResponse> {
    let config = &state.config;
    let year = to_local(Utc::now(), config.service_area.tz()).year();

    let holidays = config
        .temporal
        .holidays
        .iter()
        .filter_map(|rule| {
            rule.date_in(year).map(|date| HolidayDate {
                name: rule.name().to_string(),
                date,
            })
        })
        .collect();

    Json(RatesResponse {
        rates: config.rates.clone(),
        business_day_start_hour: config.temporal.business_day_start_hour,
        evening_threshold_hour: config.temporal.evening_threshold_hour,
        weekend_after_hours: config.temporal.weekend_after_hours,
        reference_county: config.service_area.reference_county.clone(),
        timezone: config.service_area.timezone.clone(),
        holidays,
    })
}
