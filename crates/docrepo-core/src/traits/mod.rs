//! Core traits for document store behavior.

mod store;
mod transaction;

pub use store::{DocumentStore, DocumentStream};
pub use transaction::Transaction;
