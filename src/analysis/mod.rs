/// Analysis of stored forecasts.
///
/// # Module structure
///
/// - `aggregates` - latest forecast per day, rolling average temperature,
///   top-N locations by metric

pub mod aggregates;
