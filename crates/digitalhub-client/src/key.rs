// crates/digitalhub-client/src/key.rs
// ============================================================================
// Module: Entity Keys
// Description: Parsing and formatting of `store://` entity keys.
// Purpose: Locate entities by composite identifier.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Keys take three shapes:
//! - `store://{project}` for projects;
//! - `store://{project}/{type}/{kind}/{name}[:{id}]` for versioned entities,
//!   where a missing id means "latest";
//! - `store://{project}/{type}/{kind}/{id}` for tasks and runs.
//!
//! Kinds may contain `+` and `:` (`python+job:run`), so the version separator
//! is only looked for in the last segment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use crate::entity::EntityType;
use crate::error::ClientError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Scheme prefix shared by every entity key.
pub const STORE_SCHEME: &str = "store://";

// ============================================================================
// SECTION: Key Types
// ============================================================================

/// Key of an entity living inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey {
    /// Owning project.
    pub project: String,
    /// Entity family.
    pub entity_type: EntityType,
    /// Entity kind.
    pub kind: String,
    /// Entity name (equal to the id for tasks and runs).
    pub name: String,
    /// Version id; `None` selects the latest version.
    pub id: Option<String>,
}

/// Composite entity identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// `store://{project}`.
    Project(String),
    /// Key of a context entity.
    Context(ContextKey),
}

impl EntityKey {
    /// Returns the project the key points into.
    #[must_use]
    pub fn project(&self) -> &str {
        match self {
            Self::Project(name) => name,
            Self::Context(key) => &key.project,
        }
    }

    /// Returns the entity family.
    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        match self {
            Self::Project(_) => EntityType::Project,
            Self::Context(key) => key.entity_type,
        }
    }

    /// Returns true when the string carries the store scheme.
    #[must_use]
    pub fn is_key(candidate: &str) -> bool {
        candidate.starts_with(STORE_SCHEME)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project(name) => write!(f, "{STORE_SCHEME}{name}"),
            Self::Context(key) => {
                write!(
                    f,
                    "{STORE_SCHEME}{}/{}/{}/{}",
                    key.project, key.entity_type, key.kind, key.name
                )?;
                match (&key.id, key.entity_type.is_versioned()) {
                    (Some(id), true) => write!(f, ":{id}"),
                    _ => Ok(()),
                }
            }
        }
    }
}

impl FromStr for EntityKey {
    type Err = ClientError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let rest = raw
            .strip_prefix(STORE_SCHEME)
            .ok_or_else(|| ClientError::InvalidKey(format!("missing {STORE_SCHEME} prefix: {raw}")))?;
        let segments: Vec<&str> = rest.split('/').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(ClientError::InvalidKey(format!("empty key segment: {raw}")));
        }
        match segments.as_slice() {
            [project] => Ok(Self::Project((*project).to_string())),
            [project, entity_type, kind, last] => {
                let entity_type = EntityType::parse(entity_type)
                    .filter(|entity_type| *entity_type != EntityType::Project)
                    .ok_or_else(|| {
                        ClientError::InvalidKey(format!("unknown entity type in key: {raw}"))
                    })?;
                let (name, id) = if entity_type.is_versioned() {
                    split_version(last, raw)?
                } else {
                    ((*last).to_string(), Some((*last).to_string()))
                };
                Ok(Self::Context(ContextKey {
                    project: (*project).to_string(),
                    entity_type,
                    kind: (*kind).to_string(),
                    name,
                    id,
                }))
            }
            _ => Err(ClientError::InvalidKey(format!("unexpected key shape: {raw}"))),
        }
    }
}

/// Splits `name[:id]`, rejecting empty names or ids.
fn split_version(segment: &str, raw: &str) -> Result<(String, Option<String>), ClientError> {
    match segment.split_once(':') {
        None => Ok((segment.to_string(), None)),
        Some((name, id)) if !name.is_empty() && !id.is_empty() && !id.contains(':') => {
            Ok((name.to_string(), Some(id.to_string())))
        }
        Some(_) => Err(ClientError::InvalidKey(format!("invalid version suffix: {raw}"))),
    }
}

// ============================================================================
// SECTION: Entity References
// ============================================================================

/// Ways to address an entity in get/delete calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    /// A full key.
    Key(EntityKey),
    /// A name inside a project, optionally pinned to a version id.
    Name {
        /// Owning project.
        project: String,
        /// Entity name.
        name: String,
        /// Version id; `None` selects the latest version.
        id: Option<String>,
    },
}

impl EntityRef {
    /// References the latest version of `name` in `project`.
    #[must_use]
    pub fn name(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Name {
            project: project.into(),
            name: name.into(),
            id: None,
        }
    }

    /// References a specific version of `name` in `project`.
    #[must_use]
    pub fn version(
        project: impl Into<String>,
        name: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self::Name {
            project: project.into(),
            name: name.into(),
            id: Some(id.into()),
        }
    }

    /// Interprets `identifier` as a key when it has the store scheme, else as a
    /// name inside `project`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidKey`] when a key-shaped identifier is malformed.
    pub fn parse_in(project: &str, identifier: &str) -> Result<Self, ClientError> {
        if EntityKey::is_key(identifier) {
            Ok(Self::Key(identifier.parse()?))
        } else {
            Ok(Self::name(project, identifier))
        }
    }

    /// Returns the project the reference points into.
    #[must_use]
    pub fn project(&self) -> &str {
        match self {
            Self::Key(key) => key.project(),
            Self::Name {
                project, ..
            } => project,
        }
    }
}

impl From<EntityKey> for EntityRef {
    fn from(key: EntityKey) -> Self {
        Self::Key(key)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => key.fmt(f),
            Self::Name {
                project,
                name,
                id: Some(id),
            } => write!(f, "{project}/{name}:{id}"),
            Self::Name {
                project,
                name,
                id: None,
            } => write!(f, "{project}/{name}"),
        }
    }
}
