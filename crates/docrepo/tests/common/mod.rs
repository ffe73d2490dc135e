#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use docrepo::{Entity, EntityConfig, Field, ID_TAG};
use docrepo_file::FileStore;

/// Versioned test entity. `name` is stored as `full_name`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    pub age: i64,
    pub version: i32,
    #[serde(skip)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(id: &str, name: &str, age: i64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            age,
            ..Default::default()
        }
    }
}

impl Entity for User {
    fn fields() -> Vec<Field<Self>> {
        vec![
            Field::text("id", |u: &Self| &u.id, |u: &mut Self, v| u.id = v)
                .tag(ID_TAG)
                .ignored(),
            Field::text("name", |u: &Self| &u.name, |u: &mut Self, v| u.name = v).wire("full_name"),
            Field::other("age"),
            Field::integer("version", |u: &Self| u.version, |u: &mut Self, v| u.version = v),
            Field::timestamp("created_at", |u: &Self| u.created_at, |u: &mut Self, v| {
                u.created_at = v
            })
            .ignored(),
            Field::timestamp("updated_at", |u: &Self| u.updated_at, |u: &mut Self, v| {
                u.updated_at = v
            })
            .ignored(),
        ]
    }
}

/// Unversioned test entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(skip)]
    pub key: String,
    pub body: String,
}

impl Entity for Note {
    fn fields() -> Vec<Field<Self>> {
        vec![
            Field::text("key", |n: &Self| &n.key, |n: &mut Self, v| n.key = v)
                .tag(ID_TAG)
                .ignored(),
            Field::other("body"),
        ]
    }
}

pub fn user_config() -> EntityConfig {
    EntityConfig::new("users")
        .unwrap()
        .created_at("created_at")
        .updated_at("updated_at")
        .version("version")
}

pub fn note_config() -> EntityConfig {
    EntityConfig::new("notes").unwrap()
}

/// A file store in a fresh temporary directory.
pub fn temp_store() -> (TempDir, Arc<FileStore>) {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileStore::new(temp_dir.path()));
    (temp_dir, store)
}
