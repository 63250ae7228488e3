//! Document storage: SQLite collections, the shared handle, JSONL transfer.

pub mod handle;
pub mod jsonl;
pub mod sqlite;

pub use handle::StoreHandle;
pub use sqlite::{CollectionCount, DocumentStore, StoredDocument, new_document_id};
