//! Shared pricing types and OpenAPI schemas.
//!
//! Every value here is constructed fresh for one pricing request and
//! discarded afterwards; nothing is persisted across calls.

use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{FareError, Result};

/// Wheelchair requirement for a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WheelchairType {
    /// No wheelchair needed.
    #[default]
    None,
    /// Manual wheelchair.
    Manual,
    /// Power wheelchair.
    Power,
    /// Transport chair.
    Transport,
    /// Wheelchair provided at pickup.
    Provided,
}

/// Everything the engine needs to price one trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "is_round_trip": true,
    "pickup_address": "1492 Neil Ave, Columbus, OH 43201",
    "destination_address": "410 W 10th Ave, Columbus, OH 43210",
    "pickup_date_time": "2025-03-11T10:30:00",
    "client_weight_lbs": 180.0,
    "is_emergency": false,
    "is_veteran": true,
    "wheelchair_type": "manual",
    "client_provides_wheelchair": false
}))]
pub struct TripPricingRequest {
    /// Whether the vehicle brings the client back (two legs).
    #[serde(default)]
    pub is_round_trip: bool,

    /// Pickup address.
    #[serde(default)]
    pub pickup_address: Option<String>,

    /// Destination address.
    #[serde(default)]
    pub destination_address: Option<String>,

    /// Pre-resolved one-way driving distance; skips the distance lookup.
    #[serde(default)]
    pub trip_distance_miles: Option<Decimal>,

    /// Pre-resolved county information; skips the county lookup.
    #[serde(default)]
    pub county_info: Option<CountyInfo>,

    /// Pickup in local civil time of the service area.
    #[schema(value_type = String, example = "2025-03-11T10:30:00")]
    pub pickup_date_time: NaiveDateTime,

    /// Client weight; the configured default applies when absent.
    #[serde(default)]
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

impl TripPricingRequest {
    /// A one-way, flag-free request picked up at `pickup_date_time`.
    #[must_use]
    pub const fn new(pickup_date_time: NaiveDateTime) -> Self {
        Self {
            is_round_trip: false,
            pickup_address: None,
            destination_address: None,
            trip_distance_miles: None,
            county_info: None,
            pickup_date_time,
            client_weight_lbs: None,
            is_emergency: false,
            is_veteran: false,
            wheelchair_type: WheelchairType::None,
            client_provides_wheelchair: false,
        }
    }

    /// Set both addresses.
    #[must_use]
    pub fn with_addresses(
        mut self,
        pickup: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        self.pickup_address = Some(pickup.into());
        self.destination_address = Some(destination.into());
        self
    }

    /// Number of legs: 2 for a round trip, otherwise 1.
    #[must_use]
    pub const fn legs(&self) -> u8 {
        if self.is_round_trip {
            2
        } else {
            1
        }
    }

    /// Whether the client rents a wheelchair from the operator.
    #[must_use]
    pub const fn needs_wheelchair_rental(&self) -> bool {
        !matches!(self.wheelchair_type, WheelchairType::None) && !self.client_provides_wheelchair
    }

    /// Both addresses, if both are present and non-blank.
    #[must_use]
    pub fn addresses(&self) -> Option<(&str, &str)> {
        let pickup = self.pickup_address.as_deref().map(str::trim)?;
        let destination = self.destination_address.as_deref().map(str::trim)?;
        if pickup.is_empty() || destination.is_empty() {
            None
        } else {
            Some((pickup, destination))
        }
    }
}

/// Where each trip endpoint lies relative to the reference county.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CountyInfo {
    /// Both endpoints are inside the reference county.
    #[schema(example = true)]
    pub is_in_reference_county: bool,

    /// Endpoints outside the reference county (0-2); a non-reference county
    /// shared by both endpoints counts once.
    #[schema(example = 0, minimum = 0, maximum = 2)]
    pub counties_out: u8,
}

impl Default for CountyInfo {
    /// In the reference county, no county crossings.
    fn default() -> Self {
        Self {
            is_in_reference_county: true,
            counties_out: 0,
        }
    }
}

impl CountyInfo {
    /// Classify a trip from the resolved county of each endpoint.
    ///
    /// Inputs are compared after [`normalize_county`].
    #[must_use]
    pub fn from_counties(reference: &str, pickup: &str, destination: &str) -> Self {
        let reference = normalize_county(reference);
        let pickup = normalize_county(pickup);
        let destination = normalize_county(destination);

        let pickup_out = pickup != reference;
        let destination_out = destination != reference;

        let mut counties_out = 0;
        if pickup_out {
            counties_out += 1;
        }
        if destination_out && destination != pickup {
            counties_out += 1;
        }

        Self {
            is_in_reference_county: !pickup_out && !destination_out,
            counties_out,
        }
    }

    /// Whether the trip crosses enough counties for the county surcharge
    /// and dead mileage.
    #[must_use]
    pub const fn is_multi_county(&self) -> bool {
        self.counties_out >= 2
    }

    /// Check a caller-supplied classification.
    ///
    /// # Errors
    ///
    /// Returns [`FareError::InvalidInput`] if `counties_out` exceeds 2, or if
    /// `is_in_reference_county` disagrees with `counties_out` being zero.
    pub fn validate(&self) -> Result<()> {
        if self.counties_out > 2 {
            return Err(FareError::InvalidInput(format!(
                "counties_out must be between 0 and 2, got {}",
                self.counties_out
            )));
        }
        if self.is_in_reference_county != (self.counties_out == 0) {
            return Err(FareError::InvalidInput(format!(
                "is_in_reference_county is {} but counties_out is {}",
                self.is_in_reference_county, self.counties_out
            )));
        }
        Ok(())
    }
}

/// Lowercase a county name and drop a trailing administrative suffix, so
/// "Franklin County" and "franklin" compare equal.
#[must_use]
pub fn normalize_county(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    for suffix in [" county", " parish", " borough"] {
        if let Some(stripped) = lowered.strip_suffix(suffix) {
            return stripped.trim_end().to_string();
        }
    }
    lowered
}

/// Itemized fare. Every money field is rounded to cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "base_price": "50.00",
    "base_rate_per_leg": "50.00",
    "is_bariatric": false,
    "legs": 1,
    "trip_distance_price": "37.50",
    "dead_mileage_price": "0.00",
    "distance_price": "37.50",
    "county_surcharge": "0.00",
    "weekend_surcharge": "0.00",
    "after_hours_surcharge": "0.00",
    "emergency_surcharge": "0.00",
    "holiday_surcharge": "0.00",
    "wheelchair_surcharge": "0.00",
    "subtotal": "87.50",
    "veteran_discount": "0.00",
    "total": "87.50"
}))]
pub struct FareBreakdown {
    /// Base rate per leg times legs.
    pub base_price: Decimal,
    /// Standard or bariatric rate.
    pub base_rate_per_leg: Decimal,
    /// Client weight at or above the bariatric threshold.
    pub is_bariatric: bool,
    /// 1 or 2.
    pub legs: u8,
    /// Trip miles times per-mile rate times legs.
    pub trip_distance_price: Decimal,
    /// Depot travel priced at the dead-mileage rate.
    pub dead_mileage_price: Decimal,
    /// Trip plus dead mileage.
    pub distance_price: Decimal,
    /// Multi-county surcharge.
    pub county_surcharge: Decimal,
    /// Weekend surcharge.
    pub weekend_surcharge: Decimal,
    /// After-hours surcharge.
    pub after_hours_surcharge: Decimal,
    /// Emergency surcharge.
    pub emergency_surcharge: Decimal,
    /// Holiday surcharge.
    pub holiday_surcharge: Decimal,
    /// Wheelchair rental fee.
    pub wheelchair_surcharge: Decimal,
    /// Sum before the veteran discount.
    pub subtotal: Decimal,
    /// Percentage of the subtotal.
    pub veteran_discount: Decimal,
    /// Subtotal minus discount.
    pub total: Decimal,
}

/// Round a money amount to cents, half away from zero, always carrying
/// exactly two decimal places.
#[must_use]
pub fn round_cents(value: Decimal) -> Decimal {
    let mut cents = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    cents.rescale(2);
    cents
}
