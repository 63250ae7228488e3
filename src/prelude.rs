//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use aigent_dashboard::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{AgdError, Result};

// Parsing & normalization
pub use crate::parse::{parse_date, parse_date_in, parse_duration_minutes, parse_duration_str};
pub use crate::records::{LogEntry, normalize_document, normalize_document_in};

// Analytics
pub use crate::analytics::{
    AnalyticsOptions, AnalyticsResult, Locale, aggregate, aggregate_documents,
};

// Catalogs
pub use crate::dashboard::{AntennaView, EquipmentView, antenna_view, equipment_view};

// Storage
#[cfg(feature = "sqlite")]
pub use crate::store::{DocumentStore, StoreHandle};
