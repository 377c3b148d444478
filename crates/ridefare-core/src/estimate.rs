//! Estimate orchestration.
//!
//! Resolves the inputs the calculator needs, in order:
//!
//! 1. trip distance (skipped when the caller supplies one),
//! 2. county classification (skipped when supplied, in-county without addresses),
//! 3. dead mileage (only for trips crossing two or more counties),
//!
//! then hands everything to [`FareCalculator`]. Provider failures degrade to
//! fallbacks and set `is_estimated`; they never fail the estimate.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::config::Config;
use crate::county::{
    ApproximateCountyMatcher, CountyClassification, CountyClassifier, CountySource, Geocoder,
};
use crate::distance::{DistanceProvider, DistanceResolver, DistanceSource, ResolvedDistance};
use crate::error::{FareError, Result};
use crate::fare::FareCalculator;
use crate::temporal::{TemporalFlags, TemporalRules};
use crate::types::{CountyInfo, FareBreakdown, TripPricingRequest};

/// The mileages an estimate was priced with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DistanceInfo {
    /// One-way trip miles.
    #[schema(value_type = String, example = "12.50")]
    pub trip_miles: Decimal,
    /// Depot travel miles (zero unless multi-county).
    #[schema(value_type = String, example = "0")]
    pub dead_miles: Decimal,
    /// Driving time reported by the provider.
    pub duration_text: Option<String>,
    /// Where `trip_miles` came from.
    pub trip_source: DistanceSource,
    /// Where `dead_miles` came from.
    pub dead_source: DistanceSource,
    /// Whether either figure is a fallback.
    pub is_estimated: bool,
}

impl DistanceInfo {
    fn new(trip: ResolvedDistance, dead: ResolvedDistance) -> Self {
        Self {
            is_estimated: trip.is_estimated() || dead.is_estimated(),
            trip_miles: trip.miles,
            dead_miles: dead.miles,
            duration_text: trip.duration_text,
            trip_source: trip.source,
            dead_source: dead.source,
        }
    }
}

/// A priced trip with the inputs that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Estimate {
    /// Itemized fare.
    pub breakdown: FareBreakdown,
    /// Mileages used.
    pub distance: DistanceInfo,
    /// County classification used.
    pub county: CountyInfo,
    /// How `county` was obtained.
    pub county_source: CountySource,
    /// Temporal flags of the pickup.
    pub temporal: TemporalFlags,
    /// Whether any input came from a fallback or heuristic.
    pub is_estimated: bool,
}

/// Produces [`Estimate`]s from trip requests.
#[derive(Clone)]
pub struct EstimateService {
    calculator: FareCalculator,
    counties: CountyClassifier,
    distances: DistanceResolver,
}

impl EstimateService {
    /// Assemble a service from its parts.
    #[must_use]
    pub const fn new(
        calculator: FareCalculator,
        counties: CountyClassifier,
        distances: DistanceResolver,
    ) -> Self {
        Self {
            calculator,
            counties,
            distances,
        }
    }

    /// Build a service from configuration and the two map capabilities.
    pub fn from_config(
        config: &Config,
        distance_provider: Arc<dyn DistanceProvider>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        let area = &config.service_area;
        let calculator = FareCalculator::new(
            config.rates.clone(),
            TemporalRules::new(config.temporal.clone()),
        );
        let counties = CountyClassifier::new(geocoder, area.reference_county.clone())
            .with_approximate_fallback(ApproximateCountyMatcher::new(&area.approximate_cities));
        let distances = DistanceResolver::new(
            distance_provider,
            area.depot_address.clone(),
            config.distance.fallback_miles,
        )
        .with_max_miles(config.distance.max_miles);
        Self::new(calculator, counties, distances)
    }

    /// The calculator used for pricing.
    #[must_use]
    pub const fn calculator(&self) -> &FareCalculator {
        &self.calculator
    }

    /// Price a trip.
    ///
    /// # Errors
    ///
    /// Returns [`FareError::InvalidInput`] if the supplied distance is
    /// negative or above the configured maximum, if the supplied county
    /// classification is inconsistent, or if no distance is supplied and
    /// either address is missing. Provider outages never produce an error.
    #[instrument(skip_all, fields(round_trip = request.is_round_trip))]
    pub async fn get_estimate(&self, request: &TripPricingRequest) -> Result<Estimate> {
        let addresses = request.addresses();
        if let Some(info) = &request.county_info {
            info.validate()?;
        }

        let trip = match (request.trip_distance_miles, addresses) {
            (Some(miles), _) => self.distances.supplied(miles)?,
            (None, Some((pickup, destination))) => {
                self.distances
                    .resolve_trip_distance(pickup, destination)
                    .await
            }
            (None, None) => {
                return Err(FareError::InvalidInput(
                    "pickup and destination addresses are required without a trip distance"
                        .to_string(),
                ));
            }
        };

        let classification = match (request.county_info, addresses) {
            (Some(info), _) => CountyClassification::supplied(info),
            (None, Some((pickup, destination))) => {
                self.counties.classify(pickup, destination).await
            }
            (None, None) => CountyClassification::unaddressed(),
        };

        let dead = match addresses {
            Some((pickup, destination)) if classification.info.is_multi_county() => {
                self.distances
                    .resolve_dead_mileage(pickup, destination, request.is_round_trip)
                    .await
            }
            _ => ResolvedDistance::none(),
        };

        let temporal = self.calculator.temporal().classify(request.pickup_date_time);
        let breakdown = self.calculator.calculate_with_flags(
            request,
            &classification.info,
            &temporal,
            trip.miles,
            dead.miles,
        );

        let distance = DistanceInfo::new(trip, dead);
        let is_estimated = distance.is_estimated || classification.source.is_estimated();

        info!(
            total = %breakdown.total,
            counties_out = classification.info.counties_out,
            is_estimated,
            "estimate computed"
        );

        Ok(Estimate {
            breakdown,
            distance,
            county: classification.info,
            county_source: classification.source,
            temporal,
            is_estimated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::{MockDistanceProvider, MockGeocoder};
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;

    const DEPOT: &str = "5050 Bradenton Ave, Dublin, OH 43017";
    const HOME: &str = "1 Home St, Columbus, OH";
    const CLINIC: &str = "2 Clinic Rd, Columbus, OH";
    const NORTH: &str = "3 North Ave, Delaware, OH";
    const EAST: &str = "4 East Blvd, Newark, OH";

    fn weekday_morning() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 11)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn distances() -> MockDistanceProvider {
        MockDistanceProvider::new()
            .with_route(HOME, CLINIC, 12.5)
            .with_route(NORTH, EAST, 25.0)
            .with_route(DEPOT, NORTH, 18.0)
            .with_route(EAST, DEPOT, 22.0)
    }

    fn geocoder() -> MockGeocoder {
        MockGeocoder::new()
            .with_county(HOME, "Franklin County")
            .with_county(CLINIC, "Franklin County")
            .with_county(NORTH, "Delaware County")
            .with_county(EAST, "Licking County")
    }

    fn service(distances: &MockDistanceProvider, geocoder: &MockGeocoder) -> EstimateService {
        let mut config = Config::default();
        config.service_area.depot_address = DEPOT.to_string();
        config.service_area.approximate_cities = Vec::new();
        EstimateService::from_config(
            &config,
            Arc::new(distances.clone()),
            Arc::new(geocoder.clone()),
        )
    }

    #[tokio::test]
    async fn test_local_trip_fully_resolved() {
        let (d, g) = (distances(), geocoder());
        let request = TripPricingRequest::new(weekday_morning()).with_addresses(HOME, CLINIC);

        let estimate = service(&d, &g).get_estimate(&request).await.unwrap();

        assert_eq!(estimate.distance.trip_miles, dec!(12.5));
        assert_eq!(estimate.distance.trip_source, DistanceSource::Measured);
        assert_eq!(estimate.distance.dead_source, DistanceSource::NotApplicable);
        assert_eq!(estimate.county_source, CountySource::Geocoded);
        assert_eq!(estimate.breakdown.total, dec!(87.50));
        assert!(!estimate.is_estimated);
        assert_eq!(d.calls(), 1);
        assert_eq!(g.calls(), 2);
    }

    #[tokio::test]
    async fn test_multi_county_resolves_dead_mileage() {
        let (d, g) = (distances(), geocoder());
        let request = TripPricingRequest::new(weekday_morning()).with_addresses(NORTH, EAST);

        let estimate = service(&d, &g).get_estimate(&request).await.unwrap();

        assert_eq!(estimate.county.counties_out, 2);
        assert_eq!(estimate.distance.dead_miles, dec!(40));
        assert_eq!(estimate.breakdown.county_surcharge, dec!(50));
        assert_eq!(estimate.breakdown.dead_mileage_price, dec!(160));
        // 50 base + 25 × 4 trip + 160 dead + 50 county
        assert_eq!(estimate.breakdown.total, dec!(360));
        assert_eq!(d.calls(), 3);
    }

    #[tokio::test]
    async fn test_supplied_distance_skips_lookup() {
        let (d, g) = (distances(), geocoder());
        let mut request = TripPricingRequest::new(weekday_morning()).with_addresses(HOME, CLINIC);
        request.trip_distance_miles = Some(dec!(7));

        let estimate = service(&d, &g).get_estimate(&request).await.unwrap();

        assert_eq!(estimate.distance.trip_source, DistanceSource::Supplied);
        assert_eq!(estimate.breakdown.trip_distance_price, dec!(21));
        assert_eq!(d.calls(), 0);
    }

    #[tokio::test]
    async fn test_supplied_county_skips_geocoding() {
        let (d, g) = (distances(), geocoder());
        let mut request = TripPricingRequest::new(weekday_morning()).with_addresses(HOME, CLINIC);
        request.county_info = Some(CountyInfo {
            is_in_reference_county: false,
            counties_out: 1,
        });

        let estimate = service(&d, &g).get_estimate(&request).await.unwrap();

        assert_eq!(estimate.county_source, CountySource::Supplied);
        assert_eq!(estimate.breakdown.trip_distance_price, dec!(50));
        assert_eq!(g.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_addresses_with_distance_defaults_in_county() {
        let (d, g) = (distances(), geocoder());
        let mut request = TripPricingRequest::new(weekday_morning());
        request.trip_distance_miles = Some(dec!(10));

        let estimate = service(&d, &g).get_estimate(&request).await.unwrap();

        assert_eq!(estimate.county, CountyInfo::default());
        assert_eq!(estimate.county_source, CountySource::Unaddressed);
        assert_eq!(estimate.breakdown.total, dec!(80));
        assert!(!estimate.is_estimated);
        assert_eq!(d.calls() + g.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_addresses_no_distance_is_invalid() {
        let (d, g) = (distances(), geocoder());
        let request = TripPricingRequest::new(weekday_morning());
        let result = service(&d, &g).get_estimate(&request).await;
        assert!(matches!(result, Err(FareError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_negative_supplied_distance_is_invalid() {
        let (d, g) = (distances(), geocoder());
        let mut request = TripPricingRequest::new(weekday_morning()).with_addresses(HOME, CLINIC);
        request.trip_distance_miles = Some(dec!(-1));
        let result = service(&d, &g).get_estimate(&request).await;
        assert!(matches!(result, Err(FareError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_oversized_supplied_distance_is_invalid() {
        let (d, g) = (distances(), geocoder());
        let mut request = TripPricingRequest::new(weekday_morning());
        request.is_round_trip = true;
        request.trip_distance_miles = Some(dec!(30000000000000000000000000000));

        let result = service(&d, &g).get_estimate(&request).await;

        assert!(matches!(result, Err(FareError::InvalidInput(_))));
        assert_eq!(d.calls(), 0);
    }

    #[tokio::test]
    async fn test_inconsistent_supplied_county_is_invalid() {
        let (d, g) = (distances(), geocoder());
        for (is_in_reference_county, counties_out) in [(true, 7), (true, 2), (false, 3)] {
            let mut request =
                TripPricingRequest::new(weekday_morning()).with_addresses(HOME, CLINIC);
            request.county_info = Some(CountyInfo {
                is_in_reference_county,
                counties_out,
            });

            let result = service(&d, &g).get_estimate(&request).await;
            assert!(matches!(result, Err(FareError::InvalidInput(_))));
        }
        assert_eq!(d.calls() + g.calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_outages_produce_flagged_estimate() {
        let d = MockDistanceProvider::new();
        let g = MockGeocoder::new().failing();
        let request = TripPricingRequest::new(weekday_morning()).with_addresses(NORTH, EAST);

        let estimate = service(&d, &g).get_estimate(&request).await.unwrap();

        assert!(estimate.is_estimated);
        assert!(estimate.distance.is_estimated);
        assert_eq!(estimate.distance.trip_miles, dec!(10));
        assert_eq!(estimate.county_source, CountySource::Assumed);
        assert_eq!(estimate.breakdown.dead_mileage_price, Decimal::ZERO);
        assert_eq!(estimate.breakdown.total, dec!(80));
    }

    #[tokio::test]
    async fn test_approximate_county_flags_estimate() {
        let d = distances();
        let g = MockGeocoder::new().failing();
        let mut config = Config::default();
        config.service_area.approximate_cities = vec!["Columbus".to_string()];
        let service = EstimateService::from_config(&config, Arc::new(d), Arc::new(g));

        let request = TripPricingRequest::new(weekday_morning()).with_addresses(HOME, CLINIC);
        let estimate = service.get_estimate(&request).await.unwrap();

        assert_eq!(estimate.county_source, CountySource::Approximate);
        assert!(estimate.county.is_in_reference_county);
        assert!(estimate.is_estimated);
    }

    #[tokio::test]
    async fn test_temporal_flags_reported() {
        let (d, g) = (distances(), geocoder());
        let pickup = NaiveDate::from_ymd_opt(2025, 12, 25)
            .unwrap()
            .and_hms_opt(19, 0, 0)
            .unwrap();
        let request = TripPricingRequest::new(pickup).with_addresses(HOME, CLINIC);

        let estimate = service(&d, &g).get_estimate(&request).await.unwrap();

        assert!(estimate.temporal.is_holiday);
        assert!(estimate.temporal.is_after_hours);
        assert_eq!(estimate.breakdown.holiday_surcharge, dec!(100));
        assert_eq!(estimate.breakdown.after_hours_surcharge, dec!(40));
    }
}
