//! Dashboard analytics over normalized execution logs.

pub mod aggregator;
pub mod labels;

#[cfg(test)]
mod test_properties;

pub use aggregator::{
    AnalyticsAccumulator, AnalyticsOptions, AnalyticsResult, aggregate, aggregate_documents,
};
pub use labels::Locale;
