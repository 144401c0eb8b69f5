//! Utility functions and helpers

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Absolute distance between `price` and `reference`, as a percentage of `reference`.
///
/// A negative `reference` gives a negative result, which passes any non-negative
/// proximity threshold.
pub fn percentage_distance(price: f64, reference: f64) -> f64 {
    (reference - price).abs() / reference * 100.0
}
