#![forbid(unsafe_code)]

//! Aigent dashboard backend (agd): the data side of a lead-generation site
//! whose "aigent" automation writes execution logs in many shapes.
//!
//! 1. **Parsing**: tolerant duration and date parsers ([`parse`])
//! 2. **Normalization**: heterogeneous log documents into [`records::LogEntry`]
//! 3. **Analytics**: windowed counts, daily trend, time saved, popular kits
//! 4. **Catalogs**: equipment and antenna documents mapped to dashboard views
//! 5. **Storage & HTTP**: SQLite collections and a thin JSON API (feature-gated)
//!
//! # Library usage
//!
//! ```rust,no_run
//! use aigent_dashboard::prelude::*;
//!
//! let docs = vec![serde_json::json!({"currentDate": "15/03/2024 10:30:00", "ExecutionTime": "1h 30m"})];
//! let result = aggregate_documents(&docs, chrono::Utc::now(), &chrono::Local, &AnalyticsOptions::default());
//! println!("{}", result.totals.entries);
//! ```

pub mod prelude;

pub mod analytics;
pub mod core;
pub mod dashboard;
pub mod parse;
pub mod records;
#[cfg(feature = "server")]
pub mod server;
#[cfg(feature = "sqlite")]
pub mod store;
