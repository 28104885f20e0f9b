//! Distance surcharge rules.
//!
//! Short trips are charged per kilometre at the short-haul rate. Beyond the
//! short-haul limit the surcharge continues from the limit's cost at the
//! cheaper long-haul rate, so the function is continuous at the limit.

/// Distance (km) up to which the short-haul rate applies.
pub const SHORT_HAUL_LIMIT_KM: f64 = 25.0;
/// Per-kilometre rate up to the short-haul limit.
pub const SHORT_HAUL_RATE_PER_KM: f64 = 8.0;
/// Per-kilometre rate beyond the short-haul limit.
pub const LONG_HAUL_RATE_PER_KM: f64 = 4.0;

/// Travel surcharge for a trip of `distance_km`.
pub fn travel_cost(distance_km: f64) -> f64 {
    if distance_km <= SHORT_HAUL_LIMIT_KM {
        distance_km * SHORT_HAUL_RATE_PER_KM
    } else {
        SHORT_HAUL_LIMIT_KM * SHORT_HAUL_RATE_PER_KM
            + (distance_km - SHORT_HAUL_LIMIT_KM) * LONG_HAUL_RATE_PER_KM
    }
}

/// Rule-based price: the provider's base rate plus the travel surcharge.
pub fn expected_price(distance_km: f64, base_rate: f64) -> f64 {
    base_rate + travel_cost(distance_km)
}
