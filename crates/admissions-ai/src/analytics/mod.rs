pub mod aggregate;
pub mod filter;

pub use aggregate::{
    average, compute_rate, conversion_rate, group_by, group_count, reduce_metric,
    round_one_decimal, sentiment_score,
};
pub use filter::{apply, Candidate, Criteria, Selector};
