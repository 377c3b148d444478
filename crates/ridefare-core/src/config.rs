//! Pricing configuration management.
//!
//! Handles loading and validating the ridefare configuration:
//! - Rate schedule (base rates, per-mile rates, surcharges, discounts)
//! - Temporal policy (business hours, holiday calendar)
//! - Service area (reference county, depot, timezone)
//! - Distance fallback and maps provider settings
//!
//! Configuration is layered with the `config` crate: built-in defaults, then
//! an optional TOML file, then `RIDEFARE_*` environment variables using `__`
//! as the section separator (e.g. `RIDEFARE_MAPS__API_KEY`).

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Weekday};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::distance::DEFAULT_MAX_MILES;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "RIDEFARE_CONFIG";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "RIDEFARE";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A source could not be read or deserialized.
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] ::config::ConfigError),

    /// A single field holds an invalid value.
    #[error("Invalid value for '{field}': {message}")]
    ValidationError {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields are invalid.
    #[error("{} configuration errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// =============================================================================
// RATE SCHEDULE
// =============================================================================

/// Every monetary constant the fare calculator uses.
///
/// Injected into [`FareCalculator`](crate::fare::FareCalculator) at
/// construction; alternate schedules can be priced side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct RateSchedule {
    /// Base fare per leg for standard clients.
    #[schema(example = "50")]
    pub standard_rate: Decimal,

    /// Base fare per leg for bariatric clients.
    #[schema(example = "150")]
    pub bariatric_rate: Decimal,

    /// Weight (lbs) at or above which a client is bariatric.
    #[schema(example = 300.0)]
    pub bariatric_threshold_lbs: f64,

    /// Weight assumed when the client profile has none.
    #[schema(example = 200.0)]
    pub default_client_weight_lbs: f64,

    /// Per-mile rate when both endpoints are in the reference county.
    #[schema(example = "3.00")]
    pub in_county_rate_per_mile: Decimal,

    /// Per-mile rate otherwise.
    #[schema(example = "4.00")]
    pub out_of_county_rate_per_mile: Decimal,

    /// Flat per-mile rate for depot travel.
    #[schema(example = "4.00")]
    pub dead_mileage_rate_per_mile: Decimal,

    /// Flat fee when the trip crosses two or more counties.
    #[schema(example = "50")]
    pub county_surcharge: Decimal,

    /// Flat fee for Saturday/Sunday pickups.
    #[schema(example = "40")]
    pub weekend_surcharge: Decimal,

    /// Flat fee for pickups outside business hours.
    #[schema(example = "40")]
    pub after_hours_surcharge: Decimal,

    /// Flat fee for emergency trips.
    #[schema(example = "40")]
    pub emergency_surcharge: Decimal,

    /// Flat fee for holiday pickups.
    #[schema(example = "100")]
    pub holiday_surcharge: Decimal,

    /// Flat fee for renting a wheelchair.
    #[schema(example = "25")]
    pub wheelchair_rental_fee: Decimal,

    /// Fraction of the subtotal discounted for veterans.
    #[schema(example = "0.20")]
    pub veteran_discount_rate: Decimal,
}

impl Default for RateSchedule {
    fn default() -> Self {
        Self {
            standard_rate: dec!(50),
            bariatric_rate: dec!(150),
            bariatric_threshold_lbs: 300.0,
            default_client_weight_lbs: 200.0,
            in_county_rate_per_mile: dec!(3.00),
            out_of_county_rate_per_mile: dec!(4.00),
            dead_mileage_rate_per_mile: dec!(4.00),
            county_surcharge: dec!(50),
            weekend_surcharge: dec!(40),
            after_hours_surcharge: dec!(40),
            emergency_surcharge: dec!(40),
            holiday_surcharge: dec!(100),
            wheelchair_rental_fee: dec!(25),
            veteran_discount_rate: dec!(0.20),
        }
    }
}

impl RateSchedule {
    fn validate_into(&self, errors: &mut Vec<ConfigError>) {
        let money = [
            ("rates.standard_rate", self.standard_rate),
            ("rates.bariatric_rate", self.bariatric_rate),
            ("rates.in_county_rate_per_mile", self.in_county_rate_per_mile),
            ("rates.out_of_county_rate_per_mile", self.out_of_county_rate_per_mile),
            ("rates.dead_mileage_rate_per_mile", self.dead_mileage_rate_per_mile),
            ("rates.county_surcharge", self.county_surcharge),
            ("rates.weekend_surcharge", self.weekend_surcharge),
            ("rates.after_hours_surcharge", self.after_hours_surcharge),
            ("rates.emergency_surcharge", self.emergency_surcharge),
            ("rates.holiday_surcharge", self.holiday_surcharge),
            ("rates.wheelchair_rental_fee", self.wheelchair_rental_fee),
        ];
        for (field, value) in money {
            if value < Decimal::ZERO {
                errors.push(invalid(field, "must not be negative"));
            }
        }

        if self.veteran_discount_rate < Decimal::ZERO || self.veteran_discount_rate > Decimal::ONE {
            errors.push(invalid(
                "rates.veteran_discount_rate",
                "must be between 0 and 1",
            ));
        }
        if !self.bariatric_threshold_lbs.is_finite() || self.bariatric_threshold_lbs <= 0.0 {
            errors.push(invalid(
                "rates.bariatric_threshold_lbs",
                "must be a positive number",
            ));
        }
        if !self.default_client_weight_lbs.is_finite() || self.default_client_weight_lbs < 0.0 {
            errors.push(invalid(
                "rates.default_client_weight_lbs",
                "must be a non-negative number",
            ));
        }
    }
}

// =============================================================================
// TEMPORAL POLICY
// =============================================================================

/// Whether weekend pickups outside business hours pay both surcharges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WeekendAfterHours {
    /// Weekend and after-hours surcharges both apply when both hold.
    #[default]
    Stack,
    /// Weekend pickups never pay the after-hours surcharge.
    WeekendExempt,
}

/// A declarative holiday rule evaluated against a calendar year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HolidayRule {
    /// Same month and day every year.
    Fixed {
        /// Display name.
        name: String,
        /// Month (1-12).
        month: u32,
        /// Day of month.
        day: u32,
    },
    /// The nth occurrence of a weekday in a month (e.g. 4th Thursday).
    NthWeekday {
        /// Display name.
        name: String,
        /// Month (1-12).
        month: u32,
        /// Weekday, e.g. `"Thu"` or `"thursday"`.
        weekday: Weekday,
        /// Occurrence (1-5).
        nth: u8,
    },
    /// The last occurrence of a weekday in a month (e.g. last Monday).
    LastWeekday {
        /// Display name.
        name: String,
        /// Month (1-12).
        month: u32,
        /// Weekday, e.g. `"Mon"`.
        weekday: Weekday,
    },
}

impl HolidayRule {
    /// Display name of the holiday.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Fixed { name, .. }
            | Self::NthWeekday { name, .. }
            | Self::LastWeekday { name, .. } => name,
        }
    }

    fn fixed(name: &str, month: u32, day: u32) -> Self {
        Self::Fixed {
            name: name.to_string(),
            month,
            day,
        }
    }

    fn nth(name: &str, month: u32, weekday: Weekday, nth: u8) -> Self {
        Self::NthWeekday {
            name: name.to_string(),
            month,
            weekday,
            nth,
        }
    }

    fn validate_into(&self, index: usize, errors: &mut Vec<ConfigError>) {
        let field = format!("temporal.holidays[{index}]");
        match self {
            // 2024 is a leap year, so Feb 29 is accepted.
            Self::Fixed { month, day, .. } => {
                if NaiveDate::from_ymd_opt(2024, *month, *day).is_none() {
                    errors.push(invalid(&field, "month/day is not a calendar date"));
                }
            }
            Self::NthWeekday { month, nth, .. } => {
                if !(1..=12).contains(month) {
                    errors.push(invalid(&field, "month must be between 1 and 12"));
                }
                if !(1..=5).contains(nth) {
                    errors.push(invalid(&field, "nth must be between 1 and 5"));
                }
            }
            Self::LastWeekday { month, .. } => {
                if !(1..=12).contains(month) {
                    errors.push(invalid(&field, "month must be between 1 and 12"));
                }
            }
        }
    }
}

/// The default holiday calendar.
#[must_use]
pub fn default_holidays() -> Vec<HolidayRule> {
    vec![
        HolidayRule::fixed("New Year's Day", 1, 1),
        HolidayRule::nth("Martin Luther King Jr. Day", 1, Weekday::Mon, 3),
        HolidayRule::nth("Presidents' Day", 2, Weekday::Mon, 3),
        HolidayRule::LastWeekday {
            name: "Memorial Day".to_string(),
            month: 5,
            weekday: Weekday::Mon,
        },
        HolidayRule::fixed("Juneteenth", 6, 19),
        HolidayRule::fixed("Independence Day", 7, 4),
        HolidayRule::nth("Labor Day", 9, Weekday::Mon, 1),
        HolidayRule::fixed("Veterans Day", 11, 11),
        HolidayRule::nth("Thanksgiving", 11, Weekday::Thu, 4),
        HolidayRule::fixed("Christmas Eve", 12, 24),
        HolidayRule::fixed("Christmas Day", 12, 25),
    ]
}

/// Business-hours and holiday policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalPolicy {
    /// Hour (0-23) business hours begin; earlier pickups are after-hours.
    pub business_day_start_hour: u32,

    /// Hour at or after which pickups are after-hours.
    pub evening_threshold_hour: u32,

    /// How weekend and after-hours surcharges interact.
    pub weekend_after_hours: WeekendAfterHours,

    /// Holiday calendar.
    pub holidays: Vec<HolidayRule>,
}

/// Default evening threshold: pickups at 18:00 or later are after-hours.
pub const DEFAULT_EVENING_THRESHOLD_HOUR: u32 = 18;

/// Default start of business hours.
pub const DEFAULT_BUSINESS_DAY_START_HOUR: u32 = 8;

impl Default for TemporalPolicy {
    fn default() -> Self {
        Self {
            business_day_start_hour: DEFAULT_BUSINESS_DAY_START_HOUR,
            evening_threshold_hour: DEFAULT_EVENING_THRESHOLD_HOUR,
            weekend_after_hours: WeekendAfterHours::default(),
            holidays: default_holidays(),
        }
    }
}

impl TemporalPolicy {
    fn validate_into(&self, errors: &mut Vec<ConfigError>) {
        if self.business_day_start_hour > 23 {
            errors.push(invalid(
                "temporal.business_day_start_hour",
                "must be between 0 and 23",
            ));
        }
        if self.evening_threshold_hour > 24 {
            errors.push(invalid(
                "temporal.evening_threshold_hour",
                "must be at most 24",
            ));
        }
        if self.business_day_start_hour >= self.evening_threshold_hour {
            errors.push(invalid(
                "temporal.evening_threshold_hour",
                "must be later than business_day_start_hour",
            ));
        }
        for (index, rule) in self.holidays.iter().enumerate() {
            rule.validate_into(index, errors);
        }
    }
}

// =============================================================================
// SERVICE AREA, DISTANCE, MAPS, SERVER
// =============================================================================

/// The home service area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceAreaConfig {
    /// County billed at the in-county rate.
    pub reference_county: String,

    /// Address vehicles depart from and return to.
    pub depot_address: String,

    /// IANA timezone pickups are evaluated in.
    pub timezone: String,

    /// City names inside the reference county, used only when geocoding
    /// fails. Empty disables the approximate match.
    pub approximate_cities: Vec<String>,
}

impl Default for ServiceAreaConfig {
    fn default() -> Self {
        Self {
            reference_county: "Franklin County".to_string(),
            depot_address: "5050 Bradenton Ave, Dublin, OH 43017".to_string(),
            timezone: "America/New_York".to_string(),
            approximate_cities: [
                "Columbus",
                "Bexley",
                "Canal Winchester",
                "Dublin",
                "Gahanna",
                "Grandview Heights",
                "Grove City",
                "Groveport",
                "Hilliard",
                "New Albany",
                "Reynoldsburg",
                "Upper Arlington",
                "Westerville",
                "Whitehall",
                "Worthington",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        }
    }
}

impl ServiceAreaConfig {
    /// The configured timezone.
    ///
    /// Falls back to UTC if the name does not parse; [`Config::validate`]
    /// rejects such names at startup.
    #[must_use]
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }
}

/// Distance lookup fallback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    /// Nominal miles substituted for each failed measurement.
    pub fallback_miles: Decimal,

    /// Largest single mileage accepted. Supplied figures above it are
    /// rejected; measurements above it fall back.
    pub max_miles: Decimal,

    /// Upper bound for a single provider request.
    pub provider_timeout_secs: u64,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            fallback_miles: dec!(10),
            max_miles: DEFAULT_MAX_MILES,
            provider_timeout_secs: 10,
        }
    }
}

/// Maps provider credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapsConfig {
    /// API key; without one every lookup uses the documented fallbacks.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL of the maps web services.
    pub base_url: String,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://maps.googleapis.com".to_string(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind.
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

// =============================================================================
// TOP-LEVEL CONFIG
// =============================================================================

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rate schedule.
    pub rates: RateSchedule,
    /// Business hours and holidays.
    pub temporal: TemporalPolicy,
    /// Reference county, depot and timezone.
    pub service_area: ServiceAreaConfig,
    /// Distance fallback.
    pub distance: DistanceConfig,
    /// Maps provider.
    pub maps: MapsConfig,
    /// HTTP listener.
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from an optional file plus environment overrides,
    /// then validate it.
    ///
    /// A missing file is only an error when `path` was given explicitly.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or validation fails.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let (file, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match std::env::var(CONFIG_PATH_ENV) {
                Ok(p) => (PathBuf::from(p), true),
                Err(_) => (default_config_path(), false),
            },
        };

        if required && !file.exists() {
            return Err(ConfigError::NotFound(file));
        }

        let config: Self = ::config::Config::builder()
            .add_source(::config::File::from(file).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed or validation fails.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = ::config::Config::builder()
            .add_source(::config::File::from_str(
                content,
                ::config::FileFormat::Toml,
            ))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check every field, reporting all violations together.
    ///
    /// # Errors
    ///
    /// Returns the single violation, or [`ConfigError::MultipleValidationErrors`].
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        self.rates.validate_into(&mut errors);
        self.temporal.validate_into(&mut errors);

        if self.service_area.reference_county.trim().is_empty() {
            errors.push(invalid(
                "service_area.reference_county",
                "must not be empty",
            ));
        }
        if self.service_area.depot_address.trim().is_empty() {
            errors.push(invalid("service_area.depot_address", "must not be empty"));
        }
        if !is_valid_timezone(&self.service_area.timezone) {
            errors.push(invalid(
                "service_area.timezone",
                "must be an IANA timezone name",
            ));
        }
        if self.distance.fallback_miles <= Decimal::ZERO {
            errors.push(invalid("distance.fallback_miles", "must be positive"));
        }
        if self.distance.max_miles < self.distance.fallback_miles {
            errors.push(invalid(
                "distance.max_miles",
                "must be at least distance.fallback_miles",
            ));
        }
        if self.distance.provider_timeout_secs == 0 {
            errors.push(invalid(
                "distance.provider_timeout_secs",
                "must be at least 1",
            ));
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }
}

/// Returns `true` if `name` is a known IANA timezone.
#[must_use]
pub fn is_valid_timezone(name: &str) -> bool {
    name.parse::<Tz>().is_ok()
}

/// Default configuration file location.
///
/// On Linux: `/etc/ridefare/config.toml`.
/// Elsewhere: the platform config directory.
#[must_use]
pub fn default_config_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/etc/ridefare/config.toml")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "ridefare").map_or_else(
            || PathBuf::from("config.toml"),
            |dirs| dirs.config_dir().join("config.toml"),
        )
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rates.standard_rate, dec!(50));
        assert_eq!(config.rates.veteran_discount_rate, dec!(0.20));
        assert_eq!(config.temporal.evening_threshold_hour, 18);
        assert_eq!(config.temporal.weekend_after_hours, WeekendAfterHours::Stack);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [rates]
            holiday_surcharge = 120

            [service_area]
            reference_county = "Delaware County"
            "#,
        )
        .unwrap();

        assert_eq!(config.rates.holiday_surcharge, dec!(120));
        assert_eq!(config.rates.standard_rate, dec!(50));
        assert_eq!(config.service_area.reference_county, "Delaware County");
        assert_eq!(config.service_area.timezone, "America/New_York");
    }

    #[test]
    fn test_holiday_rules_from_toml() {
        let config = Config::from_toml_str(
            r#"
            [temporal]
            weekend_after_hours = "weekend_exempt"

            [[temporal.holidays]]
            kind = "fixed"
            name = "Founders Day"
            month = 3
            day = 2

            [[temporal.holidays]]
            kind = "nth_weekday"
            name = "Thanksgiving"
            month = 11
            weekday = "Thu"
            nth = 4
            "#,
        )
        .unwrap();

        assert_eq!(
            config.temporal.weekend_after_hours,
            WeekendAfterHours::WeekendExempt
        );
        assert_eq!(config.temporal.holidays.len(), 2);
        assert_eq!(config.temporal.holidays[1].name(), "Thanksgiving");
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = Config::default();
        config.rates.standard_rate = dec!(-1);
        config.rates.veteran_discount_rate = dec!(1.5);
        config.temporal.evening_threshold_hour = 7;
        config.service_area.timezone = "Mars/Olympus".to_string();

        match config.validate() {
            Err(ConfigError::MultipleValidationErrors(errors)) => {
                assert_eq!(errors.len(), 4);
            }
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn test_max_miles_below_fallback_rejected() {
        let mut config = Config::default();
        config.distance.max_miles = dec!(5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_invalid_holiday_date_rejected() {
        let mut config = Config::default();
        config.temporal.holidays = vec![HolidayRule::fixed("Nope", 2, 30)];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[distance]\nfallback_miles = 12.5").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.distance.fallback_miles, dec!(12.5));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = Config::load(Some(Path::new("/nonexistent/ridefare.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_timezone_validation() {
        assert!(is_valid_timezone("America/Chicago"));
        assert!(!is_valid_timezone("Not/AZone"));
    }

    #[test]
    fn test_api_key_never_serialized() {
        let mut config = Config::default();
        config.maps.api_key = Some("secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
