//! # ridefare-core
//!
//! Fare pricing engine for non-emergency medical transportation trips.
//!
//! This crate provides:
//! - A pure fare calculator driven by an injected rate schedule
//! - Weekend, after-hours and holiday classification of pickup times
//! - Distance and dead-mileage resolution with nominal fallbacks
//! - County classification against a reference county
//! - An estimate service that ties the above together
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`fare`] - The fare calculator
//! - [`estimate`] - Orchestration of lookups and pricing
//! - [`temporal`] - Pickup time classification and holiday rules
//! - [`distance`] - Distance capability and mileage resolution
//! - [`county`] - Geocoding capability and county classification
//! - [`providers`] - Built-in capability implementations
//! - [`config`] - Rate schedule and service configuration
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Shared types and OpenAPI schemas

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod config;
pub mod county;
pub mod distance;
pub mod error;
pub mod estimate;
pub mod fare;
pub mod providers;
pub mod temporal;
pub mod types;

// Re-export primary types for convenience
pub use config::{
    default_holidays, is_valid_timezone, Config, ConfigError, ConfigResult, DistanceConfig,
    HolidayRule, MapsConfig, RateSchedule, ServerConfig, ServiceAreaConfig, TemporalPolicy,
    WeekendAfterHours,
};
pub use county::{
    ApproximateCountyMatcher, CountyClassification, CountyClassifier, CountySource, Geocoder,
};
pub use distance::{
    check_supplied_miles, meters_to_miles, DistanceProvider, DistanceResolver, DistanceSource,
    Measurement, ResolvedDistance,
};
pub use error::{FareError, PricingError, Result};
pub use estimate::{DistanceInfo, Estimate, EstimateService};
pub use fare::FareCalculator;
#[cfg(any(test, feature = "mock-providers"))]
pub use providers::mock::{MockDistanceProvider, MockGeocoder};
pub use providers::OfflineMaps;
pub use temporal::{parse_pickup_time, TemporalFlags, TemporalRules};
pub use types::{round_cents, CountyInfo, FareBreakdown, TripPricingRequest, WheelchairType};
