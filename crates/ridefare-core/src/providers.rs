//! Built-in capability implementations.
//!
//! [`OfflineMaps`] stands in when no maps provider is configured: every
//! lookup fails, so every estimate is priced from the documented fallbacks
//! and flagged as estimated.

use async_trait::async_trait;

use crate::county::Geocoder;
use crate::distance::{DistanceProvider, Measurement};
use crate::error::{FareError, Result};

/// A maps provider with no backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineMaps;

#[async_trait]
impl DistanceProvider for OfflineMaps {
    async fn measure(&self, _origin: &str, _destination: &str) -> Result<Measurement> {
        Err(FareError::DistanceUnavailable(
            "no maps provider configured".to_string(),
        ))
    }
}

#[async_trait]
impl Geocoder for OfflineMaps {
    async fn county_of(&self, _address: &str) -> Result<Option<String>> {
        Err(FareError::GeocodingUnavailable(
            "no maps provider configured".to_string(),
        ))
    }
}

/// Table-driven providers for tests and local development.
#[cfg(any(test, feature = "mock-providers"))]
pub mod mock {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::{async_trait, DistanceProvider, FareError, Geocoder, Measurement, Result};

    /// Distances keyed by `(origin, destination)`; unknown routes fail.
    #[derive(Debug, Clone, Default)]
    pub struct MockDistanceProvider {
        routes: HashMap<(String, String), f64>,
        calls: Arc<AtomicUsize>,
    }

    impl MockDistanceProvider {
        /// An empty table.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a one-directional route.
        #[must_use]
        pub fn with_route(mut self, origin: &str, destination: &str, miles: f64) -> Self {
            self.routes
                .insert((origin.to_string(), destination.to_string()), miles);
            self
        }

        /// Number of `measure` calls so far, shared across clones.
        #[must_use]
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DistanceProvider for MockDistanceProvider {
        async fn measure(&self, origin: &str, destination: &str) -> Result<Measurement> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.routes
                .get(&(origin.to_string(), destination.to_string()))
                .map(|miles| Measurement {
                    miles: *miles,
                    duration_text: Some(format!("{} mins", (miles * 2.0).round())),
                })
                .ok_or_else(|| {
                    FareError::DistanceUnavailable(format!("no route {origin} -> {destination}"))
                })
        }
    }

    /// Counties keyed by address; unknown addresses have no county.
    #[derive(Debug, Clone, Default)]
    pub struct MockGeocoder {
        counties: HashMap<String, String>,
        failing: bool,
        calls: Arc<AtomicUsize>,
    }

    impl MockGeocoder {
        /// An empty table.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Map `address` to `county`.
        #[must_use]
        pub fn with_county(mut self, address: &str, county: &str) -> Self {
            self.counties
                .insert(address.to_string(), county.to_string());
            self
        }

        /// Make every lookup fail.
        #[must_use]
        pub fn failing(mut self) -> Self {
            self.failing = true;
            self
        }

        /// Number of `county_of` calls so far, shared across clones.
        #[must_use]
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Geocoder for MockGeocoder {
        async fn county_of(&self, address: &str) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing {
                return Err(FareError::GeocodingUnavailable("mock outage".to_string()));
            }
            Ok(self.counties.get(address).cloned())
        }
    }
}
