pub mod database;
pub mod document_store;

pub use database::Database;
pub use document_store::SqliteDocumentStore;
