// crates/digitalhub-stub/src/store.rs
// ============================================================================
// Module: Stub Store
// Description: In-memory projects, entities, secrets, and uploaded files.
// Purpose: Back the stub HTTP routes with deterministic state.
// Dependencies: axum, serde_json, time
// ============================================================================

//! ## Overview
//! Documents are kept as raw JSON so the stub never shares types with the
//! client it exercises. Every stored entity carries a monotonically increasing
//! sequence number; "latest version" and "newest first" are defined by it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::StubOptions;

// ============================================================================
// SECTION: Collections
// ============================================================================

/// Context collections served under `/api/v1/-/{project}`.
pub(crate) const COLLECTIONS: [&str; 9] = [
    "artifacts",
    "dataitems",
    "models",
    "functions",
    "workflows",
    "tasks",
    "runs",
    "secrets",
    "triggers",
];

/// Returns the singular entity type label of a collection.
pub(crate) fn singular(collection: &str) -> &str {
    collection.strip_suffix('s').unwrap_or(collection)
}

/// Tasks and runs are not versioned by name.
pub(crate) fn is_versioned(collection: &str) -> bool {
    !matches!(collection, "tasks" | "runs")
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Error reply with an HTTP status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ApiError {
    /// Response status.
    pub(crate) status: StatusCode,
    /// Message returned as `{"error": message}`.
    pub(crate) message: String,
}

impl ApiError {
    /// 404 reply.
    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    /// 409 reply.
    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    /// 400 reply.
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Deferred completion of a run, advanced by reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Pending {
    /// Reads left before the run settles.
    pub(crate) polls: u32,
    /// State reported once settled.
    pub(crate) final_state: String,
}

/// A stored context entity.
#[derive(Debug, Clone)]
pub(crate) struct Stored {
    /// Collection name.
    pub(crate) collection: String,
    /// Owning project.
    pub(crate) project: String,
    /// Insertion sequence number.
    pub(crate) seq: u64,
    /// Wire document.
    pub(crate) doc: Value,
    /// Deferred run completion.
    pub(crate) pending: Option<Pending>,
}

impl Stored {
    /// Returns a string field of the document.
    pub(crate) fn field(&self, name: &str) -> Option<&str> {
        self.doc.get(name).and_then(Value::as_str)
    }

    /// Returns a string field of the document spec.
    pub(crate) fn spec_field(&self, name: &str) -> Option<&str> {
        self.doc.get("spec").and_then(|spec| spec.get(name)).and_then(Value::as_str)
    }

    /// Returns the executable string this task or run points at.
    pub(crate) fn executable(&self) -> Option<&str> {
        self.spec_field("function").or_else(|| self.spec_field("workflow"))
    }

    /// Returns `{kind}://{project}/{name}:{id}`.
    pub(crate) fn executable_string(&self) -> String {
        format!(
            "{}://{}/{}:{}",
            self.field("kind").unwrap_or_default(),
            self.project,
            self.field("name").unwrap_or_default(),
            self.field("id").unwrap_or_default()
        )
    }
}

/// Filters accepted by list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ListQuery {
    /// Exact name.
    pub(crate) name: Option<String>,
    /// Exact kind.
    pub(crate) kind: Option<String>,
    /// Executable string referenced by tasks/runs.
    pub(crate) function: Option<String>,
    /// Return every version.
    pub(crate) all_versions: bool,
}

// ============================================================================
// SECTION: Platform State
// ============================================================================

/// Whole stub state, guarded by one mutex.
#[derive(Debug)]
pub(crate) struct Platform {
    /// Behavior knobs.
    pub(crate) options: StubOptions,
    /// `host:port` the stub listens on.
    pub(crate) host: String,
    /// Projects by name.
    projects: BTreeMap<String, Value>,
    /// Context entities.
    pub(crate) entities: Vec<Stored>,
    /// Secret values by `(project, name)`.
    secrets: BTreeMap<(String, String), String>,
    /// Uploaded files by storage path.
    files: BTreeMap<String, Vec<u8>>,
    /// Service calls received per run id.
    pub(crate) service_calls: BTreeMap<String, u32>,
    /// Last issued sequence number.
    seq: u64,
}

impl Platform {
    /// Creates empty state.
    pub(crate) fn new(options: StubOptions, host: String) -> Self {
        Self {
            options,
            host,
            projects: BTreeMap::new(),
            entities: Vec::new(),
            secrets: BTreeMap::new(),
            files: BTreeMap::new(),
            service_calls: BTreeMap::new(),
            seq: 0,
        }
    }

    /// Issues the next sequence number.
    pub(crate) const fn next_seq(&mut self) -> u64 {
        self.seq = self.seq.saturating_add(1);
        self.seq
    }

    // ------------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------------

    /// Creates a project.
    pub(crate) fn create_project(&mut self, mut body: Value) -> Result<Value, ApiError> {
        let name = required(&body, "name")?.to_string();
        if self.projects.contains_key(&name) {
            return Err(ApiError::conflict(format!("project {name} exists")));
        }
        set_field(&mut body, "id", Value::String(name.clone()));
        stamp(&mut body, None, &name);
        self.projects.insert(name, body.clone());
        Ok(body)
    }

    /// Fetches a project.
    pub(crate) fn get_project(&self, name: &str) -> Result<Value, ApiError> {
        self.projects.get(name).cloned().ok_or_else(|| ApiError::not_found(format!("project {name}")))
    }

    /// Lists projects by name.
    pub(crate) fn list_projects(&self) -> Vec<Value> {
        self.projects.values().cloned().collect()
    }

    /// Replaces a project document.
    pub(crate) fn update_project(&mut self, name: &str, mut body: Value) -> Result<Value, ApiError> {
        let created = created_of(&self.get_project(name)?);
        if required(&body, "name")? != name {
            return Err(ApiError::bad_request("project name mismatch"));
        }
        stamp(&mut body, created, name);
        self.projects.insert(name.to_string(), body.clone());
        Ok(body)
    }

    /// Deletes a project; `cascade` drops everything it owns.
    pub(crate) fn delete_project(&mut self, name: &str, cascade: bool) -> Result<(), ApiError> {
        if self.projects.remove(name).is_none() {
            return Err(ApiError::not_found(format!("project {name}")));
        }
        if cascade {
            self.entities.retain(|stored| stored.project != name);
            self.secrets.retain(|(project, _), _| project != name);
            let prefix = format!("{name}/");
            self.files.retain(|path, _| !path.starts_with(&prefix));
        }
        Ok(())
    }

    /// Fails with 404 unless the project exists.
    pub(crate) fn require_project(&self, project: &str) -> Result<(), ApiError> {
        self.get_project(project).map(|_| ())
    }

    // ------------------------------------------------------------------------
    // Context entities
    // ------------------------------------------------------------------------

    /// Creates a context entity; runs start executing immediately.
    pub(crate) fn create_entity(
        &mut self,
        project: &str,
        collection: &str,
        mut body: Value,
    ) -> Result<Value, ApiError> {
        self.require_project(project)?;
        let id = required(&body, "id")?.to_string();
        required(&body, "name")?;
        required(&body, "kind")?;
        if self.find(project, collection, &id).is_some() {
            return Err(ApiError::conflict(format!("{} {id} exists", singular(collection))));
        }
        set_field(&mut body, "project", Value::String(project.to_string()));
        stamp(&mut body, None, project);
        let pending = if collection == "runs" { self.start_run(project, &mut body, false) } else { None };
        self.insert(project, collection, body.clone(), pending);
        Ok(body)
    }

    /// Stores a finalized document.
    pub(crate) fn insert(&mut self, project: &str, collection: &str, doc: Value, pending: Option<Pending>) {
        let seq = self.next_seq();
        self.entities.push(Stored {
            collection: collection.to_string(),
            project: project.to_string(),
            seq,
            doc,
            pending,
        });
    }

    /// Returns the position of an entity by id.
    pub(crate) fn find(&self, project: &str, collection: &str, id: &str) -> Option<usize> {
        self.entities.iter().position(|stored| {
            stored.project == project && stored.collection == collection && stored.field("id") == Some(id)
        })
    }

    /// Lists entities newest first.
    pub(crate) fn list_entities(&self, project: &str, collection: &str, query: &ListQuery) -> Vec<Value> {
        let mut matches: Vec<&Stored> = self
            .entities
            .iter()
            .filter(|stored| stored.project == project && stored.collection == collection)
            .filter(|stored| query.name.as_deref().is_none_or(|name| stored.field("name") == Some(name)))
            .filter(|stored| query.kind.as_deref().is_none_or(|kind| stored.field("kind") == Some(kind)))
            .filter(|stored| {
                query.function.as_deref().is_none_or(|function| stored.executable() == Some(function))
            })
            .collect();
        matches.sort_by(|left, right| right.seq.cmp(&left.seq));
        if !query.all_versions && is_versioned(collection) {
            let mut seen = BTreeSet::new();
            matches.retain(|stored| seen.insert(stored.field("name").unwrap_or_default().to_string()));
        }
        matches.into_iter().map(|stored| stored.doc.clone()).collect()
    }

    /// Returns the newest entity of a name.
    pub(crate) fn latest(&self, project: &str, collection: &str, name: &str) -> Option<&Stored> {
        self.entities
            .iter()
            .filter(|stored| {
                stored.project == project
                    && stored.collection == collection
                    && stored.field("name") == Some(name)
            })
            .max_by_key(|stored| stored.seq)
    }

    /// Fetches an entity; reading a pending run advances it.
    pub(crate) fn get_entity(&mut self, project: &str, collection: &str, id: &str) -> Result<Value, ApiError> {
        let position = self
            .find(project, collection, id)
            .ok_or_else(|| ApiError::not_found(format!("{} {id}", singular(collection))))?;
        let stored = &mut self.entities[position];
        if let Some(pending) = stored.pending.as_mut() {
            pending.polls = pending.polls.saturating_sub(1);
            if pending.polls == 0 {
                let state = pending.final_state.clone();
                set_state(&mut stored.doc, &state);
                stored.pending = None;
            }
        }
        Ok(stored.doc.clone())
    }

    /// Replaces an entity document.
    pub(crate) fn update_entity(
        &mut self,
        project: &str,
        collection: &str,
        id: &str,
        mut body: Value,
    ) -> Result<Value, ApiError> {
        let position = self
            .find(project, collection, id)
            .ok_or_else(|| ApiError::not_found(format!("{} {id}", singular(collection))))?;
        if required(&body, "id")? != id {
            return Err(ApiError::bad_request("entity id mismatch"));
        }
        let stored = &mut self.entities[position];
        let created = created_of(&stored.doc);
        set_field(&mut body, "project", Value::String(project.to_string()));
        stamp(&mut body, created, project);
        stored.doc = body.clone();
        Ok(body)
    }

    /// Deletes one entity version.
    pub(crate) fn delete_entity(
        &mut self,
        project: &str,
        collection: &str,
        id: &str,
        cascade: bool,
    ) -> Result<(), ApiError> {
        let position = self
            .find(project, collection, id)
            .ok_or_else(|| ApiError::not_found(format!("{} {id}", singular(collection))))?;
        let removed = self.entities.remove(position);
        self.after_delete(&removed, cascade);
        Ok(())
    }

    /// Deletes every version of a name.
    pub(crate) fn delete_by_name(
        &mut self,
        project: &str,
        collection: &str,
        name: &str,
        cascade: bool,
    ) -> Result<(), ApiError> {
        let (removed, kept): (Vec<Stored>, Vec<Stored>) =
            std::mem::take(&mut self.entities).into_iter().partition(|stored| {
                stored.project == project
                    && stored.collection == collection
                    && stored.field("name") == Some(name)
            });
        self.entities = kept;
        if removed.is_empty() {
            return Err(ApiError::not_found(format!("{} {name}", singular(collection))));
        }
        for stored in &removed {
            self.after_delete(stored, cascade);
        }
        Ok(())
    }

    /// Applies cascade rules and drops secret values.
    fn after_delete(&mut self, removed: &Stored, cascade: bool) {
        match removed.collection.as_str() {
            "secrets" => {
                let name = removed.field("name").unwrap_or_default().to_string();
                self.secrets.remove(&(removed.project.clone(), name));
            }
            "functions" | "workflows" if cascade => {
                let executable = removed.executable_string();
                self.entities.retain(|stored| {
                    !(matches!(stored.collection.as_str(), "tasks" | "runs")
                        && stored.executable() == Some(executable.as_str()))
                });
            }
            "tasks" if cascade => {
                let task = task_string(removed);
                self.entities.retain(|stored| {
                    !(stored.collection == "runs" && stored.spec_field("task") == Some(task.as_str()))
                });
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------------

    /// Describes where an entity file should be uploaded.
    pub(crate) fn upload_target(
        &self,
        project: &str,
        collection: &str,
        id: &str,
        filename: &str,
    ) -> Result<Value, ApiError> {
        self.require_project(project)?;
        if filename.is_empty() || filename.contains('/') {
            return Err(ApiError::bad_request("invalid filename"));
        }
        let path = format!("{project}/{collection}/{id}/{filename}");
        Ok(json!({
            "url": format!("http://{}/files/{path}", self.host),
            "path": format!("s3://stub/{path}"),
        }))
    }

    /// Stores uploaded bytes.
    pub(crate) fn put_file(&mut self, path: &str, bytes: Vec<u8>) {
        self.files.insert(path.to_string(), bytes);
    }

    /// Returns uploaded bytes.
    pub(crate) fn get_file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.get(path).cloned()
    }

    // ------------------------------------------------------------------------
    // Secrets
    // ------------------------------------------------------------------------

    /// Reads the requested secret values; unknown keys are omitted.
    pub(crate) fn read_secrets(&self, project: &str, keys: &[&str]) -> Result<Value, ApiError> {
        self.require_project(project)?;
        let mut values = Map::new();
        for key in keys {
            if let Some(value) = self.secrets.get(&(project.to_string(), (*key).to_string())) {
                values.insert((*key).to_string(), Value::String(value.clone()));
            }
        }
        Ok(Value::Object(values))
    }

    /// Writes secret values.
    pub(crate) fn write_secrets(&mut self, project: &str, body: &Value) -> Result<(), ApiError> {
        self.require_project(project)?;
        let entries =
            body.as_object().ok_or_else(|| ApiError::bad_request("secret data must be an object"))?;
        for (name, value) in entries {
            let value =
                value.as_str().ok_or_else(|| ApiError::bad_request("secret values must be strings"))?;
            self.secrets.insert((project.to_string(), name.clone()), value.to_string());
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Returns latest versions matching name and types, tagged with `entity_type`.
    pub(crate) fn search(&self, project: &str, name: Option<&str>, types: &[&str]) -> Result<Vec<Value>, ApiError> {
        self.require_project(project)?;
        let mut hits = Vec::new();
        for collection in COLLECTIONS {
            let label = singular(collection);
            if !types.is_empty() && !types.contains(&label) {
                continue;
            }
            let query = ListQuery {
                name: name.map(str::to_string),
                ..ListQuery::default()
            };
            for mut doc in self.list_entities(project, collection, &query) {
                set_field(&mut doc, "entity_type", Value::String(label.to_string()));
                hits.push(doc);
            }
        }
        Ok(hits)
    }
}

// ============================================================================
// SECTION: Document Helpers
// ============================================================================

/// Returns a required non-empty string field.
pub(crate) fn required<'a>(body: &'a Value, field: &str) -> Result<&'a str, ApiError> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("missing field {field}")))
}

/// Sets a top-level field on an object document.
pub(crate) fn set_field(doc: &mut Value, field: &str, value: Value) {
    if let Value::Object(object) = doc {
        object.insert(field.to_string(), value);
    }
}

/// Returns the mutable object under `field`, creating it when missing.
pub(crate) fn object_mut<'a>(doc: &'a mut Value, field: &str) -> Option<&'a mut Map<String, Value>> {
    let object = doc.as_object_mut()?;
    let entry = object.entry(field.to_string()).or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    entry.as_object_mut()
}

/// Sets `status.state`.
pub(crate) fn set_state(doc: &mut Value, state: &str) {
    if let Some(status) = object_mut(doc, "status") {
        status.insert("state".to_string(), Value::String(state.to_string()));
    }
}

/// Returns `metadata.created`.
fn created_of(doc: &Value) -> Option<String> {
    doc.get("metadata").and_then(|metadata| metadata.get("created")).and_then(Value::as_str).map(str::to_string)
}

/// Sets project and timestamps in `metadata`.
fn stamp(doc: &mut Value, created: Option<String>, project: &str) {
    let now = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    if let Some(metadata) = object_mut(doc, "metadata") {
        metadata.insert("project".to_string(), Value::String(project.to_string()));
        metadata.insert("created".to_string(), Value::String(created.unwrap_or_else(|| now.clone())));
        metadata.insert("updated".to_string(), Value::String(now));
    }
}

/// Returns `{task kind}://{project}/{name}:{id}` of a stored task.
pub(crate) fn task_string(task: &Stored) -> String {
    let kind = task.field("kind").unwrap_or_default();
    let reference = task.executable().and_then(|exec| exec.split_once("://")).map_or("", |(_, rest)| rest);
    format!("{kind}://{reference}")
}
