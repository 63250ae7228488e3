//! Record normalization: heterogeneous stored documents into canonical entries.

pub mod fields;
pub mod normalizer;

pub use normalizer::{LogEntry, normalize_all, normalize_document, normalize_document_in};
