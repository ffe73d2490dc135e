//! docrepo - Generic data access over schemaless document stores.
//!
//! Declare an entity once with [`Entity::fields`], pick a collection with
//! [`EntityConfig`], and get uniform CRUD, patch, batch writes and
//! cursor-paginated search for it:
//!
//! - [`Loader`]: read-only access (`all`, `load`, `exist`, `find_in`)
//! - [`Repository`]: single-document writes with optimistic concurrency
//! - [`Searcher`]: filter-driven search with keyset pagination
//! - [`BatchWriter`] / [`StreamWriter`]: transactional multi-document writes
//! - [`Exporter`]: line-oriented collection export
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chrono::{DateTime, Utc};
//! use docrepo::{Entity, EntityConfig, Field, ID_TAG, Outcome, Repository};
//! use docrepo_core::DocumentStore;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Default)]
//! struct User {
//!     #[serde(skip)]
//!     id: String,
//!     name: String,
//!     version: i32,
//!     #[serde(skip)]
//!     updated_at: Option<DateTime<Utc>>,
//! }
//!
//! impl Entity for User {
//!     fn fields() -> Vec<Field<Self>> {
//!         vec![
//!             Field::text("id", |u: &Self| &u.id, |u: &mut Self, v| u.id = v)
//!                 .tag(ID_TAG)
//!                 .ignored(),
//!             Field::other("name"),
//!             Field::integer("version", |u: &Self| u.version, |u: &mut Self, v| u.version = v),
//!             Field::timestamp("updated_at", |u: &Self| u.updated_at, |u: &mut Self, v| {
//!                 u.updated_at = v
//!             })
//!             .ignored(),
//!         ]
//!     }
//! }
//!
//! async fn rename<S: DocumentStore>(store: Arc<S>) -> docrepo::Result<()> {
//!     let config = EntityConfig::new("users")?
//!         .version("version")
//!         .updated_at("updated_at");
//!     let users: Repository<User, S> = Repository::new(store, config)?;
//!
//!     let mut user = User { name: "ada".into(), ..Default::default() };
//!     users.create(&mut user).await?;
//!
//!     user.name = "Ada".into();
//!     match users.update(&mut user).await? {
//!         Outcome::Applied => println!("now at version {}", user.version),
//!         Outcome::Conflict => println!("someone else changed it"),
//!         Outcome::Unaffected => println!("gone"),
//!     }
//!     Ok(())
//! }
//! ```

mod accessor;
mod batch;
mod codec;
mod config;
mod descriptor;
mod export;
mod loader;
mod outcome;
mod repository;
mod schema;
pub mod search;
mod stream_writer;

pub use batch::{BatchResult, BatchWriter};
pub use codec::version_text;
pub use config::EntityConfig;
pub use descriptor::Descriptor;
pub use export::{Exporter, TransformFn};
pub use loader::{Loader, MapFn};
pub use outcome::Outcome;
pub use repository::Repository;
pub use schema::{Entity, Field, FieldKind, ID_TAG, IntegerKind, VersionInt};
pub use search::{Criteria, SearchPage, Searcher, parse_sort};
pub use stream_writer::{StreamWriter, WriteMode};

pub use docrepo_core::{Error, Result};
