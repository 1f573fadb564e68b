//! Stats module - filtering, aggregation, memoization

mod aggregator;
mod cache;

pub use aggregator::{AggregateResult, Aggregator, FilterCriteria, US_JURISDICTIONS};
pub use cache::AggregateCache;
