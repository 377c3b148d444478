//! Application state shared across handlers.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ridefare_core::{
    Config, DistanceProvider, EstimateService, FareError, Geocoder, OfflineMaps,
};
use tracing::{error, info, warn};

use crate::maps::GoogleMapsClient;

/// Shared, immutable application state.
pub type SharedState = Arc<AppState>;

/// Everything a request handler needs.
pub struct AppState {
    /// Configuration loaded at startup.
    pub config: Config,
    /// Estimate service built from `config`.
    pub estimator: EstimateService,
    /// Whether a live maps provider is wired in.
    pub maps_online: bool,
}

impl AppState {
    /// Load configuration from `path` (or the default locations) and build
    /// state from it.
    ///
    /// # Errors
    ///
    /// Returns a [`FareError`] configuration error if the file is missing,
    /// unreadable or invalid, or an error if the maps client cannot be created.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = Config::load(path).map_err(|err| {
            let err = FareError::from(err);
            error!(code = err.error_code(), error = %err, "configuration rejected");
            err
        })?;
        Self::from_config(config)
    }

    /// Build state from `config`, using Google Maps when an API key is set
    /// and the offline provider otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the maps client cannot be created.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let has_key = config
            .maps
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty());

        if !has_key {
            warn!("no maps API key configured, every estimate will use fallbacks");
            let mut state =
                Self::with_providers(config, Arc::new(OfflineMaps), Arc::new(OfflineMaps));
            state.maps_online = false;
            return Ok(state);
        }

        let timeout = Duration::from_secs(config.distance.provider_timeout_secs);
        let client = Arc::new(GoogleMapsClient::new(&config.maps, timeout)?);
        info!(base_url = %config.maps.base_url, "using Google Maps provider");

        let distances: Arc<dyn DistanceProvider> = client.clone();
        Ok(Self::with_providers(config, distances, client))
    }

    /// Build state with explicit capability implementations.
    pub fn with_providers(
        config: Config,
        distances: Arc<dyn DistanceProvider>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        let estimator = EstimateService::from_config(&config, distances, geocoder);
        Self {
            config,
            estimator,
            maps_online: true,
        }
    }

    /// Wrap in an [`Arc`] for the router.
    #[must_use]
    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}
