//! The fare calculator.
//!
//! A pure, synchronous function of the request, the county classification,
//! and two mileages. Intermediate amounts are kept at full precision and
//! every field is rounded to cents once, at the end.
//!
//! ```text
//! base      = rate_per_leg × legs            (bariatric or standard)
//! trip      = trip_miles × per_mile × legs   (in- or out-of-county rate)
//! dead      = dead_miles × dead_rate         (multi-county trips only)
//! subtotal  = base + trip + dead + county + weekend + after_hours
//!           + holiday + emergency + wheelchair
//! discount  = subtotal × veteran_rate        (veterans only)
//! total     = subtotal − discount
//! ```

use rust_decimal::Decimal;
use tracing::debug;

use crate::config::RateSchedule;
use crate::temporal::{TemporalFlags, TemporalRules};
use crate::types::{round_cents, CountyInfo, FareBreakdown, TripPricingRequest};

/// Prices trips against an injected [`RateSchedule`].
///
/// Holds no mutable state; a single instance may be shared across threads.
#[derive(Debug, Clone)]
pub struct FareCalculator {
    rates: RateSchedule,
    temporal: TemporalRules,
}

impl FareCalculator {
    /// Create a calculator.
    #[must_use]
    pub const fn new(rates: RateSchedule, temporal: TemporalRules) -> Self {
        Self { rates, temporal }
    }

    /// The rate schedule in effect.
    #[must_use]
    pub const fn rates(&self) -> &RateSchedule {
        &self.rates
    }

    /// The temporal rules in effect.
    #[must_use]
    pub const fn temporal(&self) -> &TemporalRules {
        &self.temporal
    }

    /// Whether a client of `weight_lbs` pays the bariatric rate.
    ///
    /// Absent, negative, or non-finite weights use the configured default.
    #[must_use]
    pub fn is_bariatric(&self, weight_lbs: Option<f64>) -> bool {
        let weight = weight_lbs
            .filter(|w| w.is_finite() && *w >= 0.0)
            .unwrap_or(self.rates.default_client_weight_lbs);
        weight >= self.rates.bariatric_threshold_lbs
    }

    /// Price a trip, classifying the pickup time with the configured rules.
    #[must_use]
    pub fn calculate(
        &self,
        request: &TripPricingRequest,
        county: &CountyInfo,
        trip_distance_miles: Decimal,
        dead_mileage_miles: Decimal,
    ) -> FareBreakdown {
        let flags = self.temporal.classify(request.pickup_date_time);
        self.calculate_with_flags(request, county, &flags, trip_distance_miles, dead_mileage_miles)
    }

    /// Price a trip with precomputed temporal flags.
    ///
    /// Negative mileages are treated as zero. Dead mileage is ignored unless
    /// the trip crosses two or more counties. Mileages are expected to have
    /// passed [`check_supplied_miles`](crate::distance::check_supplied_miles).
    #[must_use]
    pub fn calculate_with_flags(
        &self,
        request: &TripPricingRequest,
        county: &CountyInfo,
        flags: &TemporalFlags,
        trip_distance_miles: Decimal,
        dead_mileage_miles: Decimal,
    ) -> FareBreakdown {
        let rates = &self.rates;
        let legs = request.legs();
        let leg_count = Decimal::from(legs);

        let is_bariatric = self.is_bariatric(request.client_weight_lbs);
        let base_rate_per_leg = if is_bariatric {
            rates.bariatric_rate
        } else {
            rates.standard_rate
        };
        let base_price = base_rate_per_leg * leg_count;

        let price_per_mile = if county.is_in_reference_county {
            rates.in_county_rate_per_mile
        } else {
            rates.out_of_county_rate_per_mile
        };
        let trip_distance_price = non_negative(trip_distance_miles) * price_per_mile * leg_count;

        let multi_county = county.is_multi_county();
        let dead_mileage_price = if multi_county {
            non_negative(dead_mileage_miles) * rates.dead_mileage_rate_per_mile
        } else {
            Decimal::ZERO
        };
        let distance_price = trip_distance_price + dead_mileage_price;

        let county_surcharge = fee(multi_county, rates.county_surcharge);
        let weekend_surcharge = fee(flags.is_weekend, rates.weekend_surcharge);
        let after_hours_surcharge = fee(flags.is_after_hours, rates.after_hours_surcharge);
        let holiday_surcharge = fee(flags.is_holiday, rates.holiday_surcharge);
        let emergency_surcharge = fee(request.is_emergency, rates.emergency_surcharge);
        let wheelchair_surcharge =
            fee(request.needs_wheelchair_rental(), rates.wheelchair_rental_fee);

        let subtotal = base_price
            + distance_price
            + county_surcharge
            + weekend_surcharge
            + after_hours_surcharge
            + holiday_surcharge
            + emergency_surcharge
            + wheelchair_surcharge;

        let veteran_discount = fee(request.is_veteran, subtotal * rates.veteran_discount_rate);
        let total = subtotal - veteran_discount;

        debug!(
            legs,
            is_bariatric,
            counties_out = county.counties_out,
            %subtotal,
            %veteran_discount,
            %total,
            "calculated fare"
        );

        FareBreakdown {
            base_price: round_cents(base_price),
            base_rate_per_leg: round_cents(base_rate_per_leg),
            is_bariatric,
            legs,
            trip_distance_price: round_cents(trip_distance_price),
            dead_mileage_price: round_cents(dead_mileage_price),
            distance_price: round_cents(distance_price),
            county_surcharge: round_cents(county_surcharge),
            weekend_surcharge: round_cents(weekend_surcharge),
            after_hours_surcharge: round_cents(after_hours_surcharge),
            emergency_surcharge: round_cents(emergency_surcharge),
            holiday_surcharge: round_cents(holiday_surcharge),
            wheelchair_surcharge: round_cents(wheelchair_surcharge),
            subtotal: round_cents(subtotal),
            veteran_discount: round_cents(veteran_discount),
            total: round_cents(total),
        }
    }
}

fn fee(applies: bool, amount: Decimal) -> Decimal {
    if applies {
        amount
    } else {
        Decimal::ZERO
    }
}

fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TemporalPolicy, WeekendAfterHours};
    use crate::types::WheelchairType;
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    /// Tuesday 10:00, not a holiday.
    fn weekday_morning() -> NaiveDateTime {
        at(2025, 3, 11, 10)
    }

    fn calculator() -> FareCalculator {
        FareCalculator::new(
            RateSchedule::default(),
            TemporalRules::new(TemporalPolicy::default()),
        )
    }

    fn in_county() -> CountyInfo {
        CountyInfo::default()
    }

    fn request(pickup: NaiveDateTime, weight: f64) -> TripPricingRequest {
        TripPricingRequest {
            client_weight_lbs: Some(weight),
            ..TripPricingRequest::new(pickup)
        }
    }

    #[test]
    fn test_one_way_in_county_weekday() {
        let fare = calculator().calculate(
            &request(weekday_morning(), 250.0),
            &in_county(),
            dec!(12.5),
            Decimal::ZERO,
        );

        assert_eq!(fare.legs, 1);
        assert!(!fare.is_bariatric);
        assert_eq!(fare.base_price, dec!(50));
        assert_eq!(fare.trip_distance_price, dec!(37.50));
        assert_eq!(fare.distance_price, dec!(37.50));
        assert_eq!(fare.weekend_surcharge, Decimal::ZERO);
        assert_eq!(fare.after_hours_surcharge, Decimal::ZERO);
        assert_eq!(fare.total, dec!(87.50));
    }

    #[test]
    fn test_round_trip_bariatric_saturday() {
        let mut req = request(at(2025, 3, 15, 11), 320.0);
        req.is_round_trip = true;

        let fare = calculator().calculate(&req, &in_county(), dec!(10), Decimal::ZERO);

        assert_eq!(fare.legs, 2);
        assert!(fare.is_bariatric);
        assert_eq!(fare.base_rate_per_leg, dec!(150));
        assert_eq!(fare.base_price, dec!(300));
        assert_eq!(fare.trip_distance_price, dec!(60));
        assert_eq!(fare.weekend_surcharge, dec!(40));
        assert_eq!(fare.total, dec!(400));
    }

    #[test]
    fn test_round_trip_doubles_base_price() {
        let calc = calculator();
        let one_way = calc.calculate(
            &request(weekday_morning(), 180.0),
            &in_county(),
            dec!(5),
            Decimal::ZERO,
        );
        let mut round = request(weekday_morning(), 180.0);
        round.is_round_trip = true;
        let round_trip = calc.calculate(&round, &in_county(), dec!(5), Decimal::ZERO);

        assert_eq!(round_trip.base_price, one_way.base_price * dec!(2));
        assert_eq!(round_trip.trip_distance_price, one_way.trip_distance_price * dec!(2));
    }

    #[test]
    fn test_bariatric_threshold_is_inclusive() {
        let calc = calculator();
        assert!(!calc.is_bariatric(Some(299.0)));
        assert!(calc.is_bariatric(Some(300.0)));

        let base_rate = |weight| {
            calc.calculate(
                &request(weekday_morning(), weight),
                &in_county(),
                Decimal::ZERO,
                Decimal::ZERO,
            )
            .base_rate_per_leg
        };
        assert_eq!(base_rate(299.0), dec!(50));
        assert_eq!(base_rate(300.0), dec!(150));
    }

    #[test]
    fn test_missing_or_invalid_weight_uses_default() {
        let calc = calculator();
        assert!(!calc.is_bariatric(None));
        assert!(!calc.is_bariatric(Some(-400.0)));
        assert!(!calc.is_bariatric(Some(f64::NAN)));
    }

    #[test]
    fn test_pickup_outside_single_crossing() {
        let county = CountyInfo {
            is_in_reference_county: false,
            counties_out: 1,
        };
        let fare = calculator().calculate(
            &request(at(2025, 3, 11, 14), 200.0),
            &county,
            dec!(20),
            dec!(30),
        );

        assert_eq!(fare.county_surcharge, Decimal::ZERO);
        assert_eq!(fare.trip_distance_price, dec!(80));
        assert_eq!(fare.dead_mileage_price, Decimal::ZERO);
        assert_eq!(fare.total, dec!(130));
    }

    #[test]
    fn test_multi_county_dead_mileage_and_surcharge() {
        let county = CountyInfo {
            is_in_reference_county: false,
            counties_out: 2,
        };
        let fare = calculator().calculate(
            &request(weekday_morning(), 200.0),
            &county,
            dec!(25),
            dec!(40),
        );

        assert_eq!(fare.county_surcharge, dec!(50));
        assert_eq!(fare.trip_distance_price, dec!(100));
        assert_eq!(fare.dead_mileage_price, dec!(160));
        assert_eq!(fare.distance_price, dec!(260));
        assert_eq!(fare.total, dec!(360));
    }

    #[test]
    fn test_emergency_veteran_holiday() {
        let mut req = request(at(2025, 7, 4, 10), 200.0);
        req.is_emergency = true;
        req.is_veteran = true;

        let fare = calculator().calculate(&req, &in_county(), dec!(10), Decimal::ZERO);

        assert_eq!(fare.holiday_surcharge, dec!(100));
        assert_eq!(fare.emergency_surcharge, dec!(40));
        assert_eq!(fare.subtotal, dec!(220));
        assert_eq!(fare.veteran_discount, dec!(44));
        assert_eq!(fare.total, dec!(176));
        assert_eq!(fare.total, fare.subtotal * dec!(0.8));
    }

    #[test]
    fn test_client_provided_wheelchair_not_charged() {
        let mut req = request(weekday_morning(), 200.0);
        req.wheelchair_type = WheelchairType::Manual;
        req.client_provides_wheelchair = true;
        req.is_emergency = true;

        let fare = calculator().calculate(&req, &in_county(), dec!(3), Decimal::ZERO);
        assert_eq!(fare.wheelchair_surcharge, Decimal::ZERO);
    }

    #[test]
    fn test_wheelchair_rental_charged() {
        let mut req = request(weekday_morning(), 200.0);
        req.wheelchair_type = WheelchairType::Power;

        let fare = calculator().calculate(&req, &in_county(), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(fare.wheelchair_surcharge, dec!(25));
        assert_eq!(fare.total, dec!(75));
    }

    #[test]
    fn test_no_wheelchair_never_charged() {
        let mut req = request(weekday_morning(), 200.0);
        req.client_provides_wheelchair = false;
        let fare = calculator().calculate(&req, &in_county(), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(fare.wheelchair_surcharge, Decimal::ZERO);
    }

    #[test]
    fn test_zero_distance_is_base_plus_surcharges() {
        let req = request(at(2025, 3, 15, 6), 200.0);
        let fare = calculator().calculate(&req, &in_county(), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(fare.distance_price, Decimal::ZERO);
        assert_eq!(fare.total, dec!(130));
    }

    #[test]
    fn test_weekend_after_hours_policy_respected() {
        let policy = TemporalPolicy {
            weekend_after_hours: WeekendAfterHours::WeekendExempt,
            ..TemporalPolicy::default()
        };
        let calc = FareCalculator::new(RateSchedule::default(), TemporalRules::new(policy));
        let fare = calc.calculate(
            &request(at(2025, 3, 15, 6), 200.0),
            &in_county(),
            Decimal::ZERO,
            Decimal::ZERO,
        );
        assert_eq!(fare.weekend_surcharge, dec!(40));
        assert_eq!(fare.after_hours_surcharge, Decimal::ZERO);
        assert_eq!(fare.total, dec!(90));
    }

    #[test]
    fn test_rounding_happens_once_at_the_end() {
        let mut req = request(weekday_morning(), 200.0);
        req.is_veteran = true;
        // 1.115 mi × 3 = 3.345; subtotal 53.345; discount 10.669; total 42.676
        let fare = calculator().calculate(&req, &in_county(), dec!(1.115), Decimal::ZERO);
        assert_eq!(fare.trip_distance_price, dec!(3.35));
        assert_eq!(fare.subtotal, dec!(53.35));
        assert_eq!(fare.veteran_discount, dec!(10.67));
        assert_eq!(fare.total, dec!(42.68));
    }

    #[test]
    fn test_rounding_is_idempotent() {
        let calc = calculator();
        let req = request(weekday_morning(), 200.0);
        let first = calc.calculate(&req, &in_county(), dec!(12.34), Decimal::ZERO);
        let again = calc.calculate(&req, &in_county(), round_cents(dec!(12.340)), Decimal::ZERO);
        assert_eq!(first, again);
        assert_eq!(round_cents(first.total), first.total);
    }

    #[test]
    fn test_deterministic() {
        let calc = calculator();
        let mut req = request(at(2025, 11, 27, 19), 310.0);
        req.is_round_trip = true;
        req.is_veteran = true;
        let county = CountyInfo {
            is_in_reference_county: false,
            counties_out: 2,
        };
        let a = calc.calculate(&req, &county, dec!(17.3), dec!(22.9));
        let b = calc.calculate(&req, &county, dec!(17.3), dec!(22.9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_negative_miles_clamped() {
        let fare = calculator().calculate(
            &request(weekday_morning(), 200.0),
            &in_county(),
            dec!(-5),
            dec!(-5),
        );
        assert_eq!(fare.trip_distance_price, Decimal::ZERO);
        assert_eq!(fare.total, dec!(50));
    }

    #[test]
    fn test_every_field_non_negative() {
        let calc = calculator();
        let counties = [
            CountyInfo::default(),
            CountyInfo {
                is_in_reference_county: false,
                counties_out: 1,
            },
            CountyInfo {
                is_in_reference_county: false,
                counties_out: 2,
            },
        ];
        for round_trip in [false, true] {
            for veteran in [false, true] {
                for county in &counties {
                    let mut req = request(at(2025, 12, 27, 21), 350.0);
                    req.is_round_trip = round_trip;
                    req.is_veteran = veteran;
                    req.is_emergency = true;
                    req.wheelchair_type = WheelchairType::Transport;
                    let fare = calc.calculate(&req, county, dec!(9.99), dec!(-14.2));
                    let amounts = [
                        fare.base_price,
                        fare.base_rate_per_leg,
                        fare.trip_distance_price,
                        fare.dead_mileage_price,
                        fare.distance_price,
                        fare.county_surcharge,
                        fare.weekend_surcharge,
                        fare.after_hours_surcharge,
                        fare.emergency_surcharge,
                        fare.holiday_surcharge,
                        fare.wheelchair_surcharge,
                        fare.subtotal,
                        fare.veteran_discount,
                        fare.total,
                    ];
                    for amount in amounts {
                        assert!(amount >= Decimal::ZERO, "negative amount in {fare:?}");
                    }
                    assert!(fare.total <= fare.subtotal);
                }
            }
        }
    }

    #[test]
    fn test_alternate_rate_schedule() {
        let rates = RateSchedule {
            standard_rate: dec!(65),
            in_county_rate_per_mile: dec!(2.50),
            ..RateSchedule::default()
        };
        let calc = FareCalculator::new(rates, TemporalRules::new(TemporalPolicy::default()));
        let fare = calc.calculate(
            &request(weekday_morning(), 200.0),
            &in_county(),
            dec!(10),
            Decimal::ZERO,
        );
        assert_eq!(fare.total, dec!(90));
    }
}
