//! Entity schema declaration.
//!
//! An [`Entity`] lists its fields once as [`Field`] values. Each field carries
//! a typed accessor pair, so the resolver can later bind identifiers, versions
//! and timestamps without inspecting the type at run time.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Tag marking the identifier field of an entity.
pub const ID_TAG: &str = "_id";

/// A type that can be stored as a document.
///
/// `fields` must describe every serialized field; `rename` has to match any
/// `#[serde(rename)]` on the struct so the wire table lines up with the
/// serialized payload.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Field declarations, in struct order.
    fn fields() -> Vec<Field<Self>>;

    /// Name used in logs and configuration errors.
    fn entity_name() -> &'static str {
        let name = std::any::type_name::<Self>();
        name.rsplit("::").next().unwrap_or(name)
    }
}

/// Signed integer widths accepted for version fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerKind {
    I8,
    I16,
    I32,
    I64,
}

impl fmt::Display for IntegerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntegerKind::I8 => "i8",
            IntegerKind::I16 => "i16",
            IntegerKind::I32 => "i32",
            IntegerKind::I64 => "i64",
        };
        f.write_str(name)
    }
}

/// An integer type usable as an optimistic-concurrency version.
pub trait VersionInt: Copy + Send + Sync + 'static {
    const KIND: IntegerKind;

    fn to_i64(self) -> i64;

    /// `None` if the value does not fit this width.
    fn from_i64(value: i64) -> Option<Self>;
}

macro_rules! version_int {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl VersionInt for $ty {
                const KIND: IntegerKind = IntegerKind::$kind;

                fn to_i64(self) -> i64 {
                    i64::from(self)
                }

                fn from_i64(value: i64) -> Option<Self> {
                    <$ty>::try_from(value).ok()
                }
            }
        )*
    };
}

version_int!(i8 => I8, i16 => I16, i32 => I32, i64 => I64);

/// The storage kind of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Timestamp,
    Integer(IntegerKind),
    Other,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Text => f.write_str("string"),
            FieldKind::Timestamp => f.write_str("nullable timestamp"),
            FieldKind::Integer(kind) => write!(f, "integer ({})", kind),
            FieldKind::Other => f.write_str("untyped value"),
        }
    }
}

pub(crate) type IntGetter<E> = Arc<dyn Fn(&E) -> i64 + Send + Sync>;
pub(crate) type IntSetter<E> = Arc<dyn Fn(&mut E, i64) -> bool + Send + Sync>;

pub(crate) enum Access<E> {
    Text {
        get: fn(&E) -> &str,
        set: fn(&mut E, String),
    },
    Timestamp {
        get: fn(&E) -> Option<DateTime<Utc>>,
        set: fn(&mut E, Option<DateTime<Utc>>),
    },
    Integer {
        kind: IntegerKind,
        get: IntGetter<E>,
        set: IntSetter<E>,
    },
    Other,
}

impl<E> Access<E> {
    pub(crate) fn kind(&self) -> FieldKind {
        match self {
            Access::Text { .. } => FieldKind::Text,
            Access::Timestamp { .. } => FieldKind::Timestamp,
            Access::Integer { kind, .. } => FieldKind::Integer(*kind),
            Access::Other => FieldKind::Other,
        }
    }
}

/// One declared field of an entity.
pub struct Field<E> {
    pub(crate) name: String,
    pub(crate) serde_name: Option<String>,
    pub(crate) wire_name: Option<String>,
    pub(crate) tags: Vec<String>,
    pub(crate) ignored: bool,
    pub(crate) access: Access<E>,
}

impl<E> Field<E> {
    fn with_access(name: impl Into<String>, access: Access<E>) -> Self {
        Self {
            name: name.into(),
            serde_name: None,
            wire_name: None,
            tags: Vec::new(),
            ignored: false,
            access,
        }
    }

    /// A string field. Eligible as the identifier.
    pub fn text(name: impl Into<String>, get: fn(&E) -> &str, set: fn(&mut E, String)) -> Self {
        Self::with_access(name, Access::Text { get, set })
    }

    /// A nullable timestamp. Eligible as created-at or updated-at.
    pub fn timestamp(
        name: impl Into<String>,
        get: fn(&E) -> Option<DateTime<Utc>>,
        set: fn(&mut E, Option<DateTime<Utc>>),
    ) -> Self {
        Self::with_access(name, Access::Timestamp { get, set })
    }

    /// A signed integer. Eligible as the version.
    pub fn integer<I: VersionInt>(
        name: impl Into<String>,
        get: fn(&E) -> I,
        set: fn(&mut E, I),
    ) -> Self
    where
        E: 'static,
    {
        let getter: IntGetter<E> = Arc::new(move |entity: &E| get(entity).to_i64());
        let setter: IntSetter<E> = Arc::new(move |entity: &mut E, value: i64| {
            match I::from_i64(value) {
                Some(value) => {
                    set(entity, value);
                    true
                }
                None => false,
            }
        });
        Self::with_access(
            name,
            Access::Integer {
                kind: I::KIND,
                get: getter,
                set: setter,
            },
        )
    }

    /// Any other serialized field. Appears in the wire table only.
    pub fn other(name: impl Into<String>) -> Self {
        Self::with_access(name, Access::Other)
    }

    /// The serialized key, when serde renames the field.
    pub fn rename(mut self, serde_name: impl Into<String>) -> Self {
        self.serde_name = Some(serde_name.into());
        self
    }

    /// The store-native field name, when it differs from the serialized key.
    pub fn wire(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = Some(wire_name.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Mark the field as not stored in the payload.
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.access.kind()
    }

    /// The key serde writes for this field.
    pub fn json_name(&self) -> &str {
        self.serde_name.as_deref().unwrap_or(&self.name)
    }

    /// The key used in the stored payload.
    pub fn store_name(&self) -> &str {
        self.wire_name.as_deref().unwrap_or_else(|| self.json_name())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }
}

impl<E> fmt::Debug for Field<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("json", &self.json_name())
            .field("wire", &self.store_name())
            .field("kind", &self.kind())
            .field("tags", &self.tags)
            .field("ignored", &self.ignored)
            .finish()
    }
}
