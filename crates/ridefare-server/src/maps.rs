//! Google Maps adapters for the distance and geocoding capabilities.
//!
//! Response parsing lives in pure functions so it can be tested without
//! network access.

use std::time::Duration;

use async_trait::async_trait;
use ridefare_core::distance::{meters_to_miles, DistanceProvider, Measurement};
use ridefare_core::{FareError, Geocoder, MapsConfig, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use url::Url;

const DISTANCE_MATRIX_PATH: &str = "/maps/api/distancematrix/json";
const GEOCODE_PATH: &str = "/maps/api/geocode/json";
const COUNTY_COMPONENT: &str = "administrative_area_level_2";

/// Distance Matrix API response.
#[derive(Debug, Clone, Deserialize)]
pub struct DistanceMatrixResponse {
    /// Top-level status, `OK` on success.
    pub status: String,
    /// Provider error text.
    #[serde(default)]
    pub error_message: Option<String>,
    /// One row per origin.
    #[serde(default)]
    pub rows: Vec<DistanceMatrixRow>,
}

/// One origin's results.
#[derive(Debug, Clone, Deserialize)]
pub struct DistanceMatrixRow {
    /// One element per destination.
    #[serde(default)]
    pub elements: Vec<DistanceMatrixElement>,
}

/// One origin/destination pair.
#[derive(Debug, Clone, Deserialize)]
pub struct DistanceMatrixElement {
    /// Element status, `OK` when a route was found.
    pub status: String,
    /// Route length.
    pub distance: Option<ValueText>,
    /// Driving time.
    pub duration: Option<ValueText>,
}

/// A numeric value with its display text.
#[derive(Debug, Clone, Deserialize)]
pub struct ValueText {
    /// Meters for distances, seconds for durations.
    pub value: f64,
    /// Display text, e.g. "23 mins".
    pub text: String,
}

/// Geocoding API response.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResponse {
    /// Top-level status, `OK` or `ZERO_RESULTS` on success.
    pub status: String,
    /// Provider error text.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Matches, best first.
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

/// One geocoding match.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResult {
    /// Administrative components of the address.
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
}

/// One administrative component.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressComponent {
    /// Full name, e.g. "Franklin County".
    pub long_name: String,
    /// Component types.
    #[serde(default)]
    pub types: Vec<String>,
}

/// Extract the single measurement from a one-by-one distance matrix.
///
/// # Errors
///
/// Returns [`FareError::DistanceUnavailable`] unless both the response and
/// its first element have status `OK` and a distance.
pub fn parse_distance_matrix(response: &DistanceMatrixResponse) -> Result<Measurement> {
    if response.status != "OK" {
        return Err(FareError::DistanceUnavailable(provider_status(
            &response.status,
            response.error_message.as_deref(),
        )));
    }

    let element = response
        .rows
        .first()
        .and_then(|row| row.elements.first())
        .ok_or_else(|| FareError::DistanceUnavailable("empty distance matrix".to_string()))?;

    if element.status != "OK" {
        return Err(FareError::DistanceUnavailable(format!(
            "route status {}",
            element.status
        )));
    }

    let distance = element
        .distance
        .as_ref()
        .ok_or_else(|| FareError::DistanceUnavailable("route has no distance".to_string()))?;

    Ok(Measurement {
        miles: meters_to_miles(distance.value),
        duration_text: element.duration.as_ref().map(|d| d.text.clone()),
    })
}

/// Extract the county name from a geocoding response.
///
/// `ZERO_RESULTS`, or a match without a county component, yields `None`.
///
/// # Errors
///
/// Returns [`FareError::GeocodingUnavailable`] for any other non-`OK` status.
pub fn parse_county(response: &GeocodeResponse) -> Result<Option<String>> {
    match response.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(None),
        status => {
            return Err(FareError::GeocodingUnavailable(provider_status(
                status,
                response.error_message.as_deref(),
            )))
        }
    }

    Ok(response.results.first().and_then(|result| {
        result
            .address_components
            .iter()
            .find(|component| component.types.iter().any(|t| t == COUNTY_COMPONENT))
            .map(|component| component.long_name.clone())
    }))
}

fn provider_status(status: &str, message: Option<&str>) -> String {
    message.map_or_else(
        || format!("provider status {status}"),
        |message| format!("provider status {status}: {message}"),
    )
}

/// Google Maps client implementing both map capabilities.
#[derive(Clone)]
pub struct GoogleMapsClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl std::fmt::Debug for GoogleMapsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleMapsClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl GoogleMapsClient {
    /// Create a client with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`FareError::ConfigValidationError`] if the API key is missing
    /// or the base URL does not parse, and [`FareError::Internal`] if the
    /// HTTP client cannot be built.
    pub fn new(config: &MapsConfig, timeout: Duration) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                FareError::ConfigValidationError("maps.api_key: required".to_string())
            })?;

        let base_url = Url::parse(&config.base_url).map_err(|e| {
            FareError::ConfigValidationError(format!("maps.base_url: {e}"))
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FareError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> std::result::Result<Url, String> {
        let mut url = self.base_url.join(path).map_err(|e| e.to_string())?;
        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> std::result::Result<T, String> {
        // Drop the URL from errors; it carries the API key.
        self.client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| e.without_url().to_string())?
            .json::<T>()
            .await
            .map_err(|e| e.without_url().to_string())
    }
}

#[async_trait]
impl DistanceProvider for GoogleMapsClient {
    async fn measure(&self, origin: &str, destination: &str) -> Result<Measurement> {
        let url = self
            .endpoint(
                DISTANCE_MATRIX_PATH,
                &[
                    ("origins", origin),
                    ("destinations", destination),
                    ("units", "imperial"),
                ],
            )
            .map_err(FareError::DistanceUnavailable)?;

        let response: DistanceMatrixResponse =
            self.get_json(url).await.map_err(FareError::DistanceUnavailable)?;
        let measurement = parse_distance_matrix(&response)?;

        debug!(miles = measurement.miles, "distance matrix lookup succeeded");
        Ok(measurement)
    }
}

#[async_trait]
impl Geocoder for GoogleMapsClient {
    async fn county_of(&self, address: &str) -> Result<Option<String>> {
        let url = self
            .endpoint(GEOCODE_PATH, &[("address", address)])
            .map_err(FareError::GeocodingUnavailable)?;

        let response: GeocodeResponse =
            self.get_json(url).await.map_err(FareError::GeocodingUnavailable)?;
        let county = parse_county(&response)?;

        debug!(county = ?county, "geocoding lookup succeeded");
        Ok(county)
    }
}
