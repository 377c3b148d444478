//! County classification of trip endpoints.
//!
//! Each address is resolved to its county through an injected [`Geocoder`].
//! When geocoding fails for either endpoint the classifier falls back, in
//! order, to:
//!
//! 1. an approximate match of the address against city names known to lie
//!    in the reference county (only if such names are configured), then
//! 2. the conservative default: in the reference county, no crossings.
//!
//! Neither fallback ever blocks a quote.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::error::Result;
use crate::types::CountyInfo;

/// Capability: resolve an address to its administrative county.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// County name for `address`, or `None` if the address has no known county.
    ///
    /// # Errors
    ///
    /// Returns [`FareError::GeocodingUnavailable`](crate::error::FareError::GeocodingUnavailable)
    /// if the lookup itself failed.
    async fn county_of(&self, address: &str) -> Result<Option<String>>;
}

/// How a [`CountyInfo`] was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CountySource {
    /// Supplied by the caller.
    Supplied,
    /// Both endpoints geocoded.
    Geocoded,
    /// City-name heuristic; may be wrong.
    Approximate,
    /// Conservative default after every lookup failed.
    Assumed,
    /// No addresses given; the trip is priced as in-county.
    Unaddressed,
}

impl CountySource {
    /// Whether the classification is less than authoritative.
    #[must_use]
    pub const fn is_estimated(self) -> bool {
        matches!(self, Self::Approximate | Self::Assumed)
    }
}

/// A county classification with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountyClassification {
    /// The classification.
    pub info: CountyInfo,
    /// How it was obtained.
    pub source: CountySource,
}

impl CountyClassification {
    /// In the reference county, no crossings, by assumption.
    #[must_use]
    pub fn assumed() -> Self {
        Self {
            info: CountyInfo::default(),
            source: CountySource::Assumed,
        }
    }

    /// In the reference county, no crossings, because there was nothing to
    /// look up.
    #[must_use]
    pub fn unaddressed() -> Self {
        Self {
            info: CountyInfo::default(),
            source: CountySource::Unaddressed,
        }
    }

    /// Caller-supplied classification.
    #[must_use]
    pub const fn supplied(info: CountyInfo) -> Self {
        Self {
            info,
            source: CountySource::Supplied,
        }
    }
}

/// Separators between address segments.
static ADDRESS_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,\n]").expect("static regex is valid"));

/// Approximate county matcher based on city names.
///
/// Addresses naming one of the configured cities are placed in the
/// reference county; all other addresses are placed in a single shared
/// "outside" county. Two outside endpoints therefore count as one crossing,
/// so this heuristic can never trigger the multi-county surcharge on its own.
#[derive(Debug, Clone)]
pub struct ApproximateCountyMatcher {
    pattern: Regex,
}

/// Label for addresses the heuristic places outside the reference county.
const OUTSIDE_REFERENCE: &str = "outside reference county";

impl ApproximateCountyMatcher {
    /// Build a matcher. Returns `None` if `cities` has no usable names.
    #[must_use]
    pub fn new<S: AsRef<str>>(cities: &[S]) -> Option<Self> {
        let alternatives: Vec<String> = cities
            .iter()
            .map(|c| c.as_ref().trim())
            .filter(|c| !c.is_empty())
            .map(regex::escape)
            .collect();
        if alternatives.is_empty() {
            return None;
        }

        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|"))).ok()?;
        Some(Self { pattern })
    }

    /// Whether `address` names a reference-county city.
    ///
    /// The first comma-separated segment (usually the street line) is
    /// skipped when there are others, so "12 Columbus St, Newark" does not
    /// match "Columbus".
    #[must_use]
    pub fn is_in_reference_county(&self, address: &str) -> bool {
        let segments: Vec<&str> = ADDRESS_TOKEN.split(address).collect();
        let locality = if segments.len() > 1 {
            &segments[1..]
        } else {
            &segments[..]
        };
        locality.iter().any(|segment| self.pattern.is_match(segment))
    }

    fn county_label<'a>(&self, address: &str, reference: &'a str) -> &'a str {
        if self.is_in_reference_county(address) {
            reference
        } else {
            OUTSIDE_REFERENCE
        }
    }
}

/// Classifies trips against the reference county.
#[derive(Clone)]
pub struct CountyClassifier {
    geocoder: Arc<dyn Geocoder>,
    reference_county: String,
    approximate: Option<ApproximateCountyMatcher>,
}

impl CountyClassifier {
    /// Create a classifier without the approximate fallback.
    pub fn new(geocoder: Arc<dyn Geocoder>, reference_county: impl Into<String>) -> Self {
        Self {
            geocoder,
            reference_county: reference_county.into(),
            approximate: None,
        }
    }

    /// Enable the approximate city-name fallback.
    #[must_use]
    pub fn with_approximate_fallback(mut self, matcher: Option<ApproximateCountyMatcher>) -> Self {
        self.approximate = matcher;
        self
    }

    /// The reference county name.
    #[must_use]
    pub fn reference_county(&self) -> &str {
        &self.reference_county
    }

    /// Classify a trip. Never fails; see the module docs for fallbacks.
    pub async fn classify(&self, pickup: &str, destination: &str) -> CountyClassification {
        match self.geocode_both(pickup, destination).await {
            Ok((pickup_county, destination_county)) => {
                let info = CountyInfo::from_counties(
                    &self.reference_county,
                    &pickup_county,
                    &destination_county,
                );
                debug!(
                    %pickup_county,
                    %destination_county,
                    counties_out = info.counties_out,
                    "classified trip counties"
                );
                CountyClassification {
                    info,
                    source: CountySource::Geocoded,
                }
            }
            Err(reason) => self.fallback(pickup, destination, &reason),
        }
    }

    async fn geocode_both(
        &self,
        pickup: &str,
        destination: &str,
    ) -> std::result::Result<(String, String), String> {
        let pickup_county = self.geocode(pickup).await?;
        let destination_county = self.geocode(destination).await?;
        Ok((pickup_county, destination_county))
    }

    async fn geocode(&self, address: &str) -> std::result::Result<String, String> {
        match self.geocoder.county_of(address).await {
            Ok(Some(county)) if !county.trim().is_empty() => Ok(county),
            Ok(_) => Err(format!("no county found for '{address}'")),
            Err(err) => Err(err.to_string()),
        }
    }

    fn fallback(&self, pickup: &str, destination: &str, reason: &str) -> CountyClassification {
        if let Some(matcher) = &self.approximate {
            let reference = self.reference_county.as_str();
            let info = CountyInfo::from_counties(
                reference,
                matcher.county_label(pickup, reference),
                matcher.county_label(destination, reference),
            );
            warn!(
                reason,
                counties_out = info.counties_out,
                "county lookup failed, using approximate city match"
            );
            return CountyClassification {
                info,
                source: CountySource::Approximate,
            };
        }

        warn!(reason, "county lookup failed, assuming reference county");
        CountyClassification::assumed()
    }
}
