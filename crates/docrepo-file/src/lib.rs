//! docrepo-file - Filesystem-backed document store.
//!
//! Each document is a JSON file under
//! `<root>/collections/<collection>/<encoded id>.json`. Writes are serialised
//! through an exclusive lock on `<root>/store.lock`, which a transaction holds
//! from `begin` until it is committed, rolled back or dropped.

mod eval;
mod store;
mod transaction;

pub use store::FileStore;
pub use transaction::FileTransaction;
