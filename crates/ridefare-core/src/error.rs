//! Unified error types for the ridefare core library.
//!
//! [`FareError`] covers every failure mode a pricing request or the startup
//! configuration can hit. Configuration loading has its own
//! [`ConfigError`](crate::config::ConfigError) which converts into it.
//!
//! Provider failures ([`FareError::DistanceUnavailable`] and
//! [`FareError::GeocodingUnavailable`]) are produced by the capability
//! adapters but absorbed by the estimate orchestrator, which substitutes a
//! documented fallback and flags the quote as estimated. Only
//! [`FareError::InvalidInput`] is expected to reach a caller of
//! [`EstimateService::get_estimate`](crate::estimate::EstimateService::get_estimate).
//!
//! # Example
//!
//! ```rust
//! use ridefare_core::error::{FareError, Result};
//!
//! fn check_weight(weight_lbs: f64) -> Result<f64> {
//!     if weight_lbs < 0.0 {
//!         return Err(FareError::InvalidInput("weight cannot be negative".into()));
//!     }
//!     Ok(weight_lbs)
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for all ridefare operations.
#[derive(Debug, Error)]
pub enum FareError {
    // =========================================================================
    // PROVIDER ERRORS
    // =========================================================================
    /// The distance provider could not measure a route.
    #[error("Distance lookup unavailable: {0}")]
    DistanceUnavailable(String),

    /// The geocoding provider could not resolve an address to a county.
    #[error("Geocoding unavailable: {0}")]
    GeocodingUnavailable(String),

    // =========================================================================
    // REQUEST ERRORS
    // =========================================================================
    /// The pricing request is malformed.
    #[error("Invalid pricing request: {0}")]
    InvalidInput(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // INTERNAL ERRORS
    // =========================================================================
    /// An unexpected internal failure.
    #[error("Internal pricing error: {0}")]
    Internal(String),
}

/// A specialized [`Result`] type for ridefare operations.
pub type Result<T> = std::result::Result<T, FareError>;

/// The error type returned across the estimate boundary.
pub type PricingError = FareError;

impl FareError {
    /// Returns `true` if this error came from an external capability.
    #[inline]
    #[must_use]
    pub const fn is_provider_error(&self) -> bool {
        matches!(
            self,
            Self::DistanceUnavailable(_) | Self::GeocodingUnavailable(_)
        )
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns `true` if retrying the whole request may succeed.
    ///
    /// The core never retries by itself; callers may.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        self.is_provider_error()
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::ConfigParseError(_) | Self::ConfigValidationError(_) => 422,
            Self::ConfigNotFound(_) | Self::Internal(_) => 500,
            Self::DistanceUnavailable(_) | Self::GeocodingUnavailable(_) => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::DistanceUnavailable(_) => "DISTANCE_UNAVAILABLE",
            Self::GeocodingUnavailable(_) => "GEOCODING_UNAVAILABLE",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::config::ConfigError> for FareError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path),
            ConfigError::ParseError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
