// crates/digitalhub-client/src/entity.rs
// ============================================================================
// Module: Entity Model
// Description: Entity types, wire documents, and creation requests.
// Purpose: Represent platform records as opaque, typed handles.
// Dependencies: serde, serde_json, base64
// ============================================================================

//! ## Overview
//! The platform owns every entity invariant. This module only carries the
//! common envelope (`id`, `name`, `kind`, `project`, `metadata`) plus free-form
//! `spec` and `status` maps, and knows how each [`EntityType`] is addressed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::error::ClientError;
use crate::error::ClientResult;
use crate::key::ContextKey;
use crate::key::EntityKey;

// ============================================================================
// SECTION: Entity Types
// ============================================================================

/// Entity families exposed by the platform.
///
/// # Invariants
/// - [`EntityType::as_str`] and [`EntityType::collection`] are stable wire labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityType {
    /// Project container.
    Project,
    /// Generic file artifact.
    Artifact,
    /// Data item (tables, croissant datasets, ...).
    Dataitem,
    /// Trained model.
    Model,
    /// Executable function.
    Function,
    /// Workflow definition.
    Workflow,
    /// Function or workflow action binding.
    Task,
    /// Execution of a task.
    Run,
    /// Secret reference.
    Secret,
    /// Scheduled or lifecycle trigger.
    Trigger,
}

impl EntityType {
    /// Entity types that live inside a project context.
    pub const CONTEXT: [Self; 9] = [
        Self::Artifact,
        Self::Dataitem,
        Self::Model,
        Self::Function,
        Self::Workflow,
        Self::Task,
        Self::Run,
        Self::Secret,
        Self::Trigger,
    ];

    /// Entity types embedded in project export files.
    pub const EMBEDDED: [Self; 5] =
        [Self::Artifact, Self::Dataitem, Self::Model, Self::Function, Self::Workflow];

    /// Returns the singular wire label used in keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Artifact => "artifact",
            Self::Dataitem => "dataitem",
            Self::Model => "model",
            Self::Function => "function",
            Self::Workflow => "workflow",
            Self::Task => "task",
            Self::Run => "run",
            Self::Secret => "secret",
            Self::Trigger => "trigger",
        }
    }

    /// Returns the REST collection name.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Project => "projects",
            Self::Artifact => "artifacts",
            Self::Dataitem => "dataitems",
            Self::Model => "models",
            Self::Function => "functions",
            Self::Workflow => "workflows",
            Self::Task => "tasks",
            Self::Run => "runs",
            Self::Secret => "secrets",
            Self::Trigger => "triggers",
        }
    }

    /// Returns true when entities of this type are addressed by name + version id.
    ///
    /// Tasks and runs carry their id as their name.
    #[must_use]
    pub const fn is_versioned(self) -> bool {
        !matches!(self, Self::Project | Self::Task | Self::Run)
    }

    /// Parses a singular wire label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "project" => Some(Self::Project),
            "artifact" => Some(Self::Artifact),
            "dataitem" => Some(Self::Dataitem),
            "model" => Some(Self::Model),
            "function" => Some(Self::Function),
            "workflow" => Some(Self::Workflow),
            "task" => Some(Self::Task),
            "run" => Some(Self::Run),
            "secret" => Some(Self::Secret),
            "trigger" => Some(Self::Trigger),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Wire Documents
// ============================================================================

/// Entity metadata bag.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Owning project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Entity name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Labels attached to the entity.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Version label assigned by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Whether the entity is embedded in its project document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded: Option<bool>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    /// Fields this client does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Wire representation shared by every entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDocument {
    /// Version-specific identifier.
    #[serde(default)]
    pub id: String,
    /// Entity name.
    pub name: String,
    /// Entity kind (`artifact`, `python`, `python+job:run`, ...).
    pub kind: String,
    /// Owning project; absent for projects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Metadata bag.
    #[serde(default)]
    pub metadata: Metadata,
    /// Kind-specific specification.
    #[serde(default)]
    pub spec: Map<String, Value>,
    /// Backend-reported status.
    #[serde(default)]
    pub status: Map<String, Value>,
    /// Owner as reported by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

// ============================================================================
// SECTION: Entity Handle
// ============================================================================

/// A platform entity of a known type.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Entity family.
    entity_type: EntityType,
    /// Wire document.
    document: EntityDocument,
}

impl Entity {
    /// Wraps a wire document.
    #[must_use]
    pub const fn new(entity_type: EntityType, document: EntityDocument) -> Self {
        Self {
            entity_type,
            document,
        }
    }

    /// Decodes a wire document from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Json`] when the value is not an entity document.
    pub fn from_value(entity_type: EntityType, value: Value) -> ClientResult<Self> {
        let document: EntityDocument = serde_json::from_value(value).map_err(|err| {
            ClientError::Json(format!("invalid {entity_type} document: {err}"))
        })?;
        Ok(Self::new(entity_type, document))
    }

    /// Returns the entity family.
    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Returns the version identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.document.id
    }

    /// Returns the entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.document.name
    }

    /// Returns the entity kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.document.kind
    }

    /// Returns the owning project; a project returns its own name.
    #[must_use]
    pub fn project(&self) -> &str {
        match self.entity_type {
            EntityType::Project => &self.document.name,
            _ => self.document.project.as_deref().unwrap_or_default(),
        }
    }

    /// Returns the composite key locating this exact version.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        match self.entity_type {
            EntityType::Project => EntityKey::Project(self.document.name.clone()),
            entity_type => EntityKey::Context(ContextKey {
                project: self.project().to_string(),
                entity_type,
                kind: self.document.kind.clone(),
                name: self.document.name.clone(),
                id: Some(self.document.id.clone()),
            }),
        }
    }

    /// Returns `{kind}://{project}/{name}:{id}`, the reference tasks use.
    #[must_use]
    pub fn executable_string(&self) -> String {
        format!("{}://{}/{}:{}", self.kind(), self.project(), self.name(), self.id())
    }

    /// Returns the metadata bag.
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.document.metadata
    }

    /// Returns the metadata bag for in-place edits (persist with update/save).
    pub const fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.document.metadata
    }

    /// Returns the spec map.
    #[must_use]
    pub const fn spec(&self) -> &Map<String, Value> {
        &self.document.spec
    }

    /// Returns the spec map for in-place edits.
    pub const fn spec_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.document.spec
    }

    /// Returns the status map.
    #[must_use]
    pub const fn status(&self) -> &Map<String, Value> {
        &self.document.status
    }

    /// Returns a string-valued spec field.
    #[must_use]
    pub fn spec_str(&self, field: &str) -> Option<&str> {
        self.document.spec.get(field).and_then(Value::as_str)
    }

    /// Returns `status.state` when present.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.document.status.get("state").and_then(Value::as_str)
    }

    /// Returns the wire document.
    #[must_use]
    pub const fn document(&self) -> &EntityDocument {
        &self.document
    }

    /// Consumes the handle and returns the wire document.
    #[must_use]
    pub fn into_document(self) -> EntityDocument {
        self.document
    }

    /// Replaces the wire document (used by refresh/save).
    pub(crate) fn replace_document(&mut self, document: EntityDocument) {
        self.document = document;
    }
}

// ============================================================================
// SECTION: Source Code
// ============================================================================

/// Source code attached to functions and workflows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCode {
    /// Inline code in the given language.
    Inline {
        /// Code body.
        code: String,
        /// Language label (`python`, `sql`, ...).
        lang: String,
    },
    /// A local file read and embedded at request time.
    File(PathBuf),
    /// A remote location resolved by the backend (git, http, s3).
    Remote(String),
}

impl SourceCode {
    /// Builds an inline python source.
    #[must_use]
    pub fn python(code: impl Into<String>) -> Self {
        Self::Inline {
            code: code.into(),
            lang: "python".to_string(),
        }
    }

    /// Builds an inline SQL source.
    #[must_use]
    pub fn sql(code: impl Into<String>) -> Self {
        Self::Inline {
            code: code.into(),
            lang: "sql".to_string(),
        }
    }

    /// Renders the `spec.source` object.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] when a local source file cannot be read.
    pub fn to_spec(&self) -> ClientResult<Map<String, Value>> {
        let mut source = Map::new();
        match self {
            Self::Inline {
                code,
                lang,
            } => {
                source.insert("base64".to_string(), Value::String(BASE64.encode(code)));
                source.insert("lang".to_string(), Value::String(lang.clone()));
            }
            Self::File(path) => {
                let bytes = fs::read(path).map_err(|err| ClientError::io(path, err))?;
                source.insert("base64".to_string(), Value::String(BASE64.encode(bytes)));
                source.insert("source".to_string(), Value::String(path.display().to_string()));
                if let Some(lang) = lang_from_path(path) {
                    source.insert("lang".to_string(), Value::String(lang.to_string()));
                }
            }
            Self::Remote(location) => {
                source.insert("source".to_string(), Value::String(location.clone()));
            }
        }
        Ok(source)
    }
}

/// Infers a language label from a file extension.
fn lang_from_path(path: &Path) -> Option<&'static str> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("py") => Some("python"),
        Some("sql") => Some("sql"),
        Some("sh") => Some("bash"),
        _ => None,
    }
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Request payload for creating an entity.
///
/// # Invariants
/// - `secret_value` is never serialized into the entity document.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRequest {
    /// Entity family.
    pub(crate) entity_type: EntityType,
    /// Document to send; `id` may be empty to request a generated id.
    pub(crate) document: EntityDocument,
    /// Deferred source attachment.
    pub(crate) source: Option<SourceCode>,
    /// Secret value stored after creation.
    pub(crate) secret_value: Option<String>,
}

impl EntityRequest {
    /// Starts a request for an entity of the given type, name, and kind.
    #[must_use]
    pub fn new(entity_type: EntityType, name: impl Into<String>, kind: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            entity_type,
            document: EntityDocument {
                id: String::new(),
                name: name.clone(),
                kind: kind.into(),
                project: None,
                metadata: Metadata {
                    name: Some(name),
                    ..Metadata::default()
                },
                spec: Map::new(),
                status: Map::new(),
                user: None,
            },
            source: None,
            secret_value: None,
        }
    }

    /// Starts a project request.
    #[must_use]
    pub fn project(name: impl Into<String>) -> Self {
        Self::new(EntityType::Project, name, "project")
    }

    /// Starts an artifact request with a storage path.
    #[must_use]
    pub fn artifact(name: impl Into<String>, kind: impl Into<String>, path: &str) -> Self {
        Self::new(EntityType::Artifact, name, kind).with_spec("path", path)
    }

    /// Starts a dataitem request with a storage path.
    #[must_use]
    pub fn dataitem(name: impl Into<String>, kind: impl Into<String>, path: &str) -> Self {
        Self::new(EntityType::Dataitem, name, kind).with_spec("path", path)
    }

    /// Starts a model request with a storage path.
    #[must_use]
    pub fn model(name: impl Into<String>, kind: impl Into<String>, path: &str) -> Self {
        Self::new(EntityType::Model, name, kind).with_spec("path", path)
    }

    /// Starts a function request.
    #[must_use]
    pub fn function(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::new(EntityType::Function, name, kind)
    }

    /// Starts a workflow request.
    #[must_use]
    pub fn workflow(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::new(EntityType::Workflow, name, kind)
    }

    /// Starts a secret request carrying the value to store.
    #[must_use]
    pub fn secret(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut request = Self::new(EntityType::Secret, name, "secret");
        request.secret_value = Some(value.into());
        request
    }

    /// Starts a trigger request.
    #[must_use]
    pub fn trigger(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::new(EntityType::Trigger, name, kind)
    }

    /// Returns the entity family.
    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Returns the requested name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.document.name
    }

    /// Returns the requested kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.document.kind
    }

    /// Returns the requested description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.document.metadata.description.as_deref()
    }

    /// Returns the secret value carried by the request.
    #[must_use]
    pub fn secret_value(&self) -> Option<&str> {
        self.secret_value.as_deref()
    }

    /// Pins the identifier instead of letting the client generate one.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.document.id = id.into();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.document.metadata.description = Some(description.into());
        self
    }

    /// Sets the labels.
    #[must_use]
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.document.metadata.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the entity as embedded in its project document.
    #[must_use]
    pub const fn embedded(mut self, embedded: bool) -> Self {
        self.document.metadata.embedded = Some(embedded);
        self
    }

    /// Sets a spec field.
    #[must_use]
    pub fn with_spec(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.document.spec.insert(field.to_string(), value.into());
        self
    }

    /// Attaches source code, resolved when the request is sent.
    #[must_use]
    pub fn with_source(mut self, source: SourceCode) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the entry point inside the attached source.
    #[must_use]
    pub fn with_handler(self, handler: &str) -> Self {
        self.with_source_field("handler", handler)
    }

    /// Sets the function invoked once when a serving runtime starts.
    #[must_use]
    pub fn with_init_function(self, init_function: &str) -> Self {
        self.with_source_field("init_function", init_function)
    }

    /// Sets a field inside `spec.source`, creating the object when missing.
    fn with_source_field(mut self, field: &str, value: &str) -> Self {
        let entry =
            self.document.spec.entry("source".to_string()).or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(source) = entry {
            source.insert(field.to_string(), Value::String(value.to_string()));
        }
        self
    }

    /// Finalizes the wire document for `project`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] when attached source files cannot be read.
    pub(crate) fn into_document(self, project: Option<&str>) -> ClientResult<EntityDocument> {
        let mut document = self.document;
        if document.id.is_empty() {
            document.id = match self.entity_type {
                EntityType::Project => document.name.clone(),
                _ => uuid::Uuid::new_v4().to_string(),
            };
        }
        if let Some(project) = project {
            document.project = Some(project.to_string());
            document.metadata.project = Some(project.to_string());
        }
        if let Some(source) = self.source {
            let rendered = source.to_spec()?;
            let entry =
                document.spec.entry("source".to_string()).or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(existing) = entry {
                for (field, value) in rendered {
                    existing.insert(field, value);
                }
            }
        }
        Ok(document)
    }
}
