//! Average rating aggregation, computed on demand from stored reviews.

/// Rounds a raw average to one decimal place.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Arithmetic mean of `ratings` rounded to one decimal place.
///
/// A book with no reviews has an average of 0.
pub fn average(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: i64 = ratings.iter().map(|rating| i64::from(*rating)).sum();
    round_to_tenth(sum as f64 / ratings.len() as f64)
}
