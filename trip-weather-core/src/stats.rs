//! Small numeric helpers shared by the analyzer and the aggregator.

/// Round `value` to `decimals` places, ties to even.
///
/// `round_to(0.125, 2) == 0.12`, `round_to(0.375, 2) == 0.38`.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10_f64.powi(decimals as i32);
    (value * scale).round_ties_even() / scale
}

/// Arithmetic mean of the present values, `None` when nothing is present.
pub fn mean_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0_u32), |(sum, count), v| (sum + v, count + 1));

    (count > 0).then(|| sum / f64::from(count))
}

/// `round(temperature / hours)`, ties to even. `None` when `hours` is zero.
pub fn rating(avg_temperature: f64, avg_precip_free_hours: f64) -> Option<i64> {
    if avg_precip_free_hours == 0.0 {
        return None;
    }

    let ratio = avg_temperature / avg_precip_free_hours;
    ratio.is_finite().then(|| ratio.round_ties_even() as i64)
}
