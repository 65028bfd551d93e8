/// Two prices closer than this are the same price.
pub const PRICE_EPSILON: f64 = 0.01;

/// Round to 2 decimal places: multiply by 100, round to nearest integer
/// (half away from zero), divide by 100.
///
/// Applied after every arithmetic combination step, not only at display
/// time, so repeated additions cannot accumulate float drift. Non-finite
/// input collapses to 0.0 — the parse layer already treats unparseable
/// numbers as zero and the aggregation layer must never see NaN.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 100.0).round() / 100.0
}

/// True when two already-rounded prices differ by less than [`PRICE_EPSILON`].
pub fn prices_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < PRICE_EPSILON
}
