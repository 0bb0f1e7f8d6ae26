//! Pure aggregation helpers.
//!
//! Ratio helpers never return NaN or infinity: an empty denominator yields a
//! neutral value (0 for rates and averages, 50 for sentiment). Callers and
//! downstream prompts rely on that convention.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::{Application, ApplicationStatus, Communication, Sentiment};

/// Neutral sentiment reported when no rated communication exists.
pub const NEUTRAL_SENTIMENT: f64 = 50.0;

/// `numerator / denominator * 100`, or 0 when the denominator is 0.
pub fn compute_rate(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64 * 100.0
}

/// Round half away from zero to one decimal place.
pub fn round_one_decimal(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 10.0).round() / 10.0
}

/// `sum / max(count, 1)`.
pub fn average(sum: f64, count: usize) -> f64 {
    sum / count.max(1) as f64
}

/// Share of non-negative interactions as a percentage, 50 when `total` is 0.
pub fn sentiment_score(total: usize, negative: usize) -> f64 {
    if total == 0 {
        return NEUTRAL_SENTIMENT;
    }
    total.saturating_sub(negative) as f64 / total as f64 * 100.0
}

pub fn group_by<'a, T, K, F>(items: &'a [T], key_fn: F) -> BTreeMap<K, Vec<&'a T>>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut groups: BTreeMap<K, Vec<&T>> = BTreeMap::new();
    for item in items {
        groups.entry(key_fn(item)).or_default().push(item);
    }
    groups
}

pub fn group_count<T, K, F>(items: &[T], key_fn: F) -> BTreeMap<K, usize>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(key_fn(item)).or_insert(0) += 1;
    }
    counts
}

pub fn count_where<T, F>(items: &[T], predicate: F) -> usize
where
    F: Fn(&T) -> bool,
{
    items.iter().filter(|item| predicate(item)).count()
}

/// Sum `metric` over the items that satisfy `predicate`.
pub fn reduce_metric<T, P, M>(items: &[T], predicate: P, metric: M) -> f64
where
    P: Fn(&T) -> bool,
    M: Fn(&T) -> f64,
{
    items
        .iter()
        .filter(|item| predicate(item))
        .map(metric)
        .sum()
}

/// Enrolled share of `applications`, rounded to one decimal.
pub fn conversion_rate(applications: &[Application]) -> f64 {
    let enrolled = count_where(applications, |application| {
        application.status == ApplicationStatus::Enrolled
    });
    round_one_decimal(compute_rate(enrolled, applications.len()))
}

/// Counts keyed by status label, every status present even when zero.
pub fn status_breakdown(applications: &[Application]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = ApplicationStatus::ordered()
        .into_iter()
        .map(|status| (status.label().to_string(), 0))
        .collect();
    for (label, count) in group_count(applications, |application| application.status.label()) {
        counts.insert(label.to_string(), count);
    }
    counts
}

/// Mean counselor response time over communications that carry one, in hours.
pub fn average_response_hours(communications: &[Communication]) -> f64 {
    let timed = count_where(communications, |entry| entry.response_time_hours.is_some());
    let total = reduce_metric(
        communications,
        |entry| entry.response_time_hours.is_some(),
        |entry| entry.response_time_hours.unwrap_or(0.0),
    );
    round_one_decimal(average(total, timed))
}

pub fn communication_sentiment(communications: &[Communication]) -> f64 {
    let rated = count_where(communications, |entry| entry.sentiment.is_some());
    let negative = count_where(communications, |entry| {
        entry.sentiment == Some(Sentiment::Negative)
    });
    round_one_decimal(sentiment_score(rated, negative))
}

/// Counts per calendar month (`YYYY-MM`) in ascending order.
pub fn monthly_trend<T, F>(items: &[T], date_fn: F) -> BTreeMap<String, usize>
where
    F: Fn(&T) -> Option<DateTime<Utc>>,
{
    let mut trend = BTreeMap::new();
    for moment in items.iter().filter_map(date_fn) {
        *trend.entry(moment.format("%Y-%m").to_string()).or_insert(0) += 1;
    }
    trend
}
