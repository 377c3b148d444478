//! Trip distance and dead-mileage resolution.
//!
//! Driving distances come from an injected [`DistanceProvider`]. A failed
//! measurement never fails the quote: the configured nominal mileage is
//! substituted and the result is marked estimated.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::error::{FareError, Result};
use crate::types::round_cents;

/// Largest single mileage accepted when none is configured.
pub const DEFAULT_MAX_MILES: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Miles per meter.
pub const MILES_PER_METER: f64 = 0.000_621_371;

/// Convert a provider distance in meters to miles.
#[must_use]
pub fn meters_to_miles(meters: f64) -> f64 {
    meters * MILES_PER_METER
}

/// Check a caller-supplied mileage against `0..=max_miles`.
///
/// # Errors
///
/// Returns [`FareError::InvalidInput`] naming `field` if `miles` is negative
/// or above `max_miles`.
pub fn check_supplied_miles(field: &str, miles: Decimal, max_miles: Decimal) -> Result<Decimal> {
    if miles < Decimal::ZERO {
        return Err(FareError::InvalidInput(format!(
            "{field} must not be negative, got {miles}"
        )));
    }
    if miles > max_miles {
        return Err(FareError::InvalidInput(format!(
            "{field} must not exceed {max_miles} miles, got {miles}"
        )));
    }
    Ok(miles)
}

/// A single driving measurement, normalized to miles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Driving distance in miles.
    pub miles: f64,
    /// Human-readable driving time, when the provider reports one.
    pub duration_text: Option<String>,
}

/// Capability: measure the driving distance between two addresses.
///
/// Adapters should bound each call with a timeout.
#[async_trait]
pub trait DistanceProvider: Send + Sync {
    /// Measure the driving route from `origin` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`FareError::DistanceUnavailable`] if the route cannot be measured.
    async fn measure(&self, origin: &str, destination: &str) -> Result<Measurement>;
}

/// How a mileage figure was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DistanceSource {
    /// Supplied by the caller.
    Supplied,
    /// Measured by the distance provider.
    Measured,
    /// Nominal fallback after a provider failure.
    Fallback,
    /// Not applicable (no dead mileage for local trips).
    NotApplicable,
}

/// A resolved mileage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDistance {
    /// Miles, rounded to hundredths.
    pub miles: Decimal,
    /// Driving time text from the provider.
    pub duration_text: Option<String>,
    /// Where `miles` came from.
    pub source: DistanceSource,
}

impl ResolvedDistance {
    /// Zero miles, not applicable.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            miles: Decimal::ZERO,
            duration_text: None,
            source: DistanceSource::NotApplicable,
        }
    }

    /// Miles supplied by the caller.
    #[must_use]
    pub const fn supplied(miles: Decimal) -> Self {
        Self {
            miles,
            duration_text: None,
            source: DistanceSource::Supplied,
        }
    }

    /// Whether a fallback contributed to this figure.
    #[must_use]
    pub fn is_estimated(&self) -> bool {
        self.source == DistanceSource::Fallback
    }
}

/// Resolves trip and dead mileage through a [`DistanceProvider`].
#[derive(Clone)]
pub struct DistanceResolver {
    provider: Arc<dyn DistanceProvider>,
    depot_address: String,
    fallback_miles: Decimal,
    max_miles: Decimal,
}

impl DistanceResolver {
    /// Create a resolver.
    ///
    /// # Arguments
    ///
    /// * `provider` - Distance capability
    /// * `depot_address` - Where vehicles start and end their day
    /// * `fallback_miles` - Nominal miles substituted for each failed measurement
    pub fn new(
        provider: Arc<dyn DistanceProvider>,
        depot_address: impl Into<String>,
        fallback_miles: Decimal,
    ) -> Self {
        Self {
            provider,
            depot_address: depot_address.into(),
            fallback_miles,
            max_miles: DEFAULT_MAX_MILES,
        }
    }

    /// Override the largest accepted mileage.
    #[must_use]
    pub const fn with_max_miles(mut self, max_miles: Decimal) -> Self {
        self.max_miles = max_miles;
        self
    }

    /// The largest accepted mileage.
    #[must_use]
    pub const fn max_miles(&self) -> Decimal {
        self.max_miles
    }

    /// A trip distance supplied by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`FareError::InvalidInput`] if `miles` is negative or above
    /// the configured maximum.
    pub fn supplied(&self, miles: Decimal) -> Result<ResolvedDistance> {
        check_supplied_miles("trip_distance_miles", miles, self.max_miles)
            .map(ResolvedDistance::supplied)
    }

    /// One-way driving distance from pickup to destination.
    pub async fn resolve_trip_distance(&self, pickup: &str, destination: &str) -> ResolvedDistance {
        self.measure_or_fallback(pickup, destination).await
    }

    /// Depot travel for a multi-county trip.
    ///
    /// Round trips return to the pickup point, so the vehicle drives
    /// depot → pickup twice. One-way trips drive depot → pickup and
    /// destination → depot.
    pub async fn resolve_dead_mileage(
        &self,
        pickup: &str,
        destination: &str,
        is_round_trip: bool,
    ) -> ResolvedDistance {
        let outbound = self.measure_or_fallback(&self.depot_address, pickup).await;

        let (miles, estimated) = if is_round_trip {
            (outbound.miles * Decimal::from(2), outbound.is_estimated())
        } else {
            let inbound = self.measure_or_fallback(destination, &self.depot_address).await;
            (
                outbound.miles + inbound.miles,
                outbound.is_estimated() || inbound.is_estimated(),
            )
        };

        debug!(%miles, estimated, is_round_trip, "resolved dead mileage");

        ResolvedDistance {
            miles,
            duration_text: None,
            source: if estimated {
                DistanceSource::Fallback
            } else {
                DistanceSource::Measured
            },
        }
    }

    async fn measure_or_fallback(&self, origin: &str, destination: &str) -> ResolvedDistance {
        match self.measure(origin, destination).await {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(
                    error = %err,
                    origin,
                    destination,
                    fallback_miles = %self.fallback_miles,
                    "distance lookup failed, using nominal mileage"
                );
                ResolvedDistance {
                    miles: self.fallback_miles,
                    duration_text: None,
                    source: DistanceSource::Fallback,
                }
            }
        }
    }

    async fn measure(&self, origin: &str, destination: &str) -> Result<ResolvedDistance> {
        let measurement = self.provider.measure(origin, destination).await?;

        let miles = Decimal::from_f64(measurement.miles)
            .filter(|m| *m >= Decimal::ZERO && *m <= self.max_miles)
            .ok_or_else(|| {
                FareError::DistanceUnavailable(format!(
                    "provider returned an invalid distance: {}",
                    measurement.miles
                ))
            })?;

        Ok(ResolvedDistance {
            miles: round_cents(miles),
            duration_text: measurement.duration_text,
            source: DistanceSource::Measured,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockDistanceProvider;
    use rust_decimal_macros::dec;

    const DEPOT: &str = "Depot";

    fn resolver(provider: MockDistanceProvider) -> DistanceResolver {
        DistanceResolver::new(Arc::new(provider), DEPOT, dec!(10))
    }

    #[test]
    fn test_meters_to_miles() {
        let miles = meters_to_miles(16_093.44);
        assert!((miles - 10.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_trip_distance_measured() {
        let provider = MockDistanceProvider::new().with_route("A", "B", 12.3456);
        let resolved = resolver(provider).resolve_trip_distance("A", "B").await;
        assert_eq!(resolved.miles, dec!(12.35));
        assert_eq!(resolved.source, DistanceSource::Measured);
        assert!(!resolved.is_estimated());
    }

    #[tokio::test]
    async fn test_trip_distance_falls_back() {
        let resolved = resolver(MockDistanceProvider::new())
            .resolve_trip_distance("A", "B")
            .await;
        assert_eq!(resolved.miles, dec!(10));
        assert!(resolved.is_estimated());
    }

    #[tokio::test]
    async fn test_negative_distance_is_rejected() {
        let provider = MockDistanceProvider::new().with_route("A", "B", -3.0);
        let resolved = resolver(provider).resolve_trip_distance("A", "B").await;
        assert_eq!(resolved.source, DistanceSource::Fallback);
    }

    #[tokio::test]
    async fn test_implausible_distance_falls_back() {
        let provider = MockDistanceProvider::new().with_route("A", "B", 4.0e30);
        let resolved = resolver(provider).resolve_trip_distance("A", "B").await;
        assert_eq!(resolved.miles, dec!(10));
        assert_eq!(resolved.source, DistanceSource::Fallback);

        let provider = MockDistanceProvider::new().with_route("A", "B", 60.0);
        let resolved = resolver(provider)
            .with_max_miles(dec!(50))
            .resolve_trip_distance("A", "B")
            .await;
        assert!(resolved.is_estimated());
    }

    #[test]
    fn test_supplied_miles_bounds() {
        let resolver = resolver(MockDistanceProvider::new());
        assert_eq!(resolver.max_miles(), DEFAULT_MAX_MILES);
        assert_eq!(resolver.supplied(dec!(0)).unwrap().miles, dec!(0));
        assert_eq!(resolver.supplied(dec!(1000)).unwrap().source, DistanceSource::Supplied);
        assert!(matches!(resolver.supplied(dec!(-0.01)), Err(FareError::InvalidInput(_))));
        assert!(matches!(
            resolver.supplied(dec!(30000000000000000000000000000)),
            Err(FareError::InvalidInput(_))
        ));
        assert!(check_supplied_miles("dead_mileage_miles", dec!(1000.01), dec!(1000)).is_err());
    }

    #[tokio::test]
    async fn test_dead_mileage_one_way() {
        let provider = MockDistanceProvider::new()
            .with_route(DEPOT, "A", 20.0)
            .with_route("B", DEPOT, 35.5);
        let resolved = resolver(provider).resolve_dead_mileage("A", "B", false).await;
        assert_eq!(resolved.miles, dec!(55.5));
        assert_eq!(resolved.source, DistanceSource::Measured);
    }

    #[tokio::test]
    async fn test_dead_mileage_round_trip_doubles_outbound() {
        let provider = MockDistanceProvider::new()
            .with_route(DEPOT, "A", 20.0)
            .with_route("B", DEPOT, 99.0);
        let resolved = resolver(provider).resolve_dead_mileage("A", "B", true).await;
        assert_eq!(resolved.miles, dec!(40));
    }

    #[tokio::test]
    async fn test_dead_mileage_partial_fallback_is_estimated() {
        let provider = MockDistanceProvider::new().with_route(DEPOT, "A", 20.0);
        let resolved = resolver(provider).resolve_dead_mileage("A", "B", false).await;
        assert_eq!(resolved.miles, dec!(30));
        assert!(resolved.is_estimated());
    }
}
