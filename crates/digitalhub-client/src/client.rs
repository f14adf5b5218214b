// crates/digitalhub-client/src/client.rs
// ============================================================================
// Module: Platform Client
// Description: Blocking REST client for DigitalHub entity collections.
// Purpose: Create, read, list, version, update, and delete entities.
// Dependencies: reqwest, serde_json, url, tracing
// ============================================================================

//! ## Overview
//! [`PlatformClient`] talks to `/api/v1/projects` and
//! `/api/v1/-/{project}/{collection}`. Responses are size-capped and non-success
//! statuses fail closed: 404 becomes [`ClientError::NotFound`], 409 becomes
//! [`ClientError::Conflict`], everything else [`ClientError::Http`].
//!
//! Project, runtime, secret, logging, and import/export operations live in
//! sibling modules as further `impl PlatformClient` blocks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use reqwest::Method;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::config::ClientConfig;
use crate::entity::Entity;
use crate::entity::EntityDocument;
use crate::entity::EntityRequest;
use crate::entity::EntityType;
use crate::error::ClientError;
use crate::error::ClientResult;
use crate::key::EntityKey;
use crate::key::EntityRef;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum response body accepted from the backend.
pub const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// Page size requested from list endpoints.
pub const LIST_PAGE_SIZE: usize = 100;

/// Maximum characters of an error body kept in [`ClientError::Http`].
const ERROR_PREVIEW_CHARS: usize = 512;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Options for delete calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Delete every version sharing the entity name.
    pub delete_all_versions: bool,
    /// Also delete dependent entities (tasks, runs, files).
    pub cascade: bool,
}

impl DeleteOptions {
    /// Deletes a single version without touching dependents.
    #[must_use]
    pub const fn single() -> Self {
        Self {
            delete_all_versions: false,
            cascade: false,
        }
    }

    /// Deletes every version of the name.
    #[must_use]
    pub const fn all_versions(mut self) -> Self {
        self.delete_all_versions = true;
        self
    }

    /// Sets cascade behavior.
    #[must_use]
    pub const fn cascade(mut self, cascade: bool) -> Self {
        self.cascade = cascade;
        self
    }
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            delete_all_versions: false,
            cascade: true,
        }
    }
}

/// Filters applied to list calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Restrict to a kind.
    pub kind: Option<String>,
    /// Restrict to a name.
    pub name: Option<String>,
    /// Restrict runs/tasks to a function or workflow executable string.
    pub function: Option<String>,
    /// Return every version instead of the latest per name.
    pub all_versions: bool,
}

impl ListFilter {
    /// Restricts the list to a kind.
    #[must_use]
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    /// Renders query parameters.
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(kind) = &self.kind {
            query.push(("kind", kind.clone()));
        }
        if let Some(name) = &self.name {
            query.push(("name", name.clone()));
        }
        if let Some(function) = &self.function {
            query.push(("function", function.clone()));
        }
        let versions = if self.all_versions { "all" } else { "latest" };
        query.push(("versions", versions.to_string()));
        query
    }
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Paged list response.
#[derive(Debug, Deserialize)]
struct Page {
    /// Entries on this page.
    #[serde(default)]
    content: Vec<Value>,
    /// True when no further pages exist.
    #[serde(default)]
    last: Option<bool>,
}

impl Page {
    /// Returns true when paging stops after this page.
    ///
    /// A `last` marker is authoritative; servers that omit it are done once a
    /// page comes back shorter than `size`.
    fn is_final(&self, size: usize) -> bool {
        self.last.unwrap_or(self.content.len() < size)
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking DigitalHub REST client.
#[derive(Clone)]
pub struct PlatformClient {
    /// Reqwest client instance.
    http: Client,
    /// Backend base URL.
    endpoint: Url,
    /// Optional bearer token.
    access_token: Option<String>,
}

impl std::fmt::Debug for PlatformClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl PlatformClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when the endpoint is not an absolute
    /// http(s) URL, or [`ClientError::Transport`] when the HTTP client cannot be
    /// constructed.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|err| ClientError::Config(format!("invalid endpoint {}: {err}", config.endpoint)))?;
        if !matches!(endpoint.scheme(), "http" | "https") || endpoint.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "endpoint must be an http(s) base url: {}",
                config.endpoint
            )));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|err| ClientError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            endpoint,
            access_token: config.access_token,
        })
    }

    /// Returns the backend base URL.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    // ------------------------------------------------------------------------
    // Context entity CRUD
    // ------------------------------------------------------------------------

    /// Creates an entity inside `project`.
    ///
    /// Secrets carrying a value have it stored right after creation.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request is rejected or the response is invalid.
    pub fn create(&self, project: &str, request: EntityRequest) -> ClientResult<Entity> {
        if request.entity_type == EntityType::Project {
            return self.new_project(request);
        }
        let entity_type = request.entity_type;
        let secret_value = request.secret_value.clone();
        let document = request.into_document(Some(project))?;
        let entity = self.create_document(entity_type, &document)?;
        if let Some(value) = secret_value {
            self.set_secret_value(&entity, &value)?;
        }
        Ok(entity)
    }

    /// Posts a finalized document to its collection.
    pub(crate) fn create_document(
        &self,
        entity_type: EntityType,
        document: &EntityDocument,
    ) -> ClientResult<Entity> {
        let project = document
            .project
            .as_deref()
            .ok_or_else(|| ClientError::Protocol(format!("{entity_type} document without project")))?;
        let body = serde_json::to_value(document)?;
        let value = self.send(
            Method::POST,
            &["-", project, entity_type.collection()],
            &[],
            Some(&body),
        )?;
        tracing::debug!(entity_type = %entity_type, name = %document.name, "entity created");
        Entity::from_value(entity_type, value)
    }

    /// Fetches an entity by key or by name (latest or pinned version).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidKey`] when the key names another entity
    /// type, [`ClientError::NotFound`] when nothing matches.
    pub fn get(&self, entity_type: EntityType, target: &EntityRef) -> ClientResult<Entity> {
        if entity_type == EntityType::Project {
            return self.get_project(target.project());
        }
        let (project, name, id) = resolve_ref(entity_type, target)?;
        match id {
            Some(id) => self.get_by_id(entity_type, &project, &id),
            None => self.get_latest(entity_type, &project, &name),
        }
    }

    /// Fetches an entity by version id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when the id does not exist.
    pub fn get_by_id(&self, entity_type: EntityType, project: &str, id: &str) -> ClientResult<Entity> {
        let value = self.send(Method::GET, &["-", project, entity_type.collection(), id], &[], None)?;
        Entity::from_value(entity_type, value)
    }

    /// Fetches the latest version of `name`.
    fn get_latest(&self, entity_type: EntityType, project: &str, name: &str) -> ClientResult<Entity> {
        let filter = ListFilter {
            name: Some(name.to_string()),
            ..ListFilter::default()
        };
        self.list_filtered(project, entity_type, &filter)?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::NotFound(format!("{entity_type} {project}/{name}")))
    }

    /// Lists the latest version of every entity of a type in `project`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request or decoding fails.
    pub fn list(&self, project: &str, entity_type: EntityType) -> ClientResult<Vec<Entity>> {
        self.list_filtered(project, entity_type, &ListFilter::default())
    }

    /// Lists entities matching a filter, following pagination.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request or decoding fails.
    pub fn list_filtered(
        &self,
        project: &str,
        entity_type: EntityType,
        filter: &ListFilter,
    ) -> ClientResult<Vec<Entity>> {
        let base_query = filter.query();
        let values = self.fetch_pages(&["-", project, entity_type.collection()], &base_query)?;
        values.into_iter().map(|value| Entity::from_value(entity_type, value)).collect()
    }

    /// Lists every version of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request or decoding fails.
    pub fn get_versions(
        &self,
        project: &str,
        entity_type: EntityType,
        name: &str,
    ) -> ClientResult<Vec<Entity>> {
        let filter = ListFilter {
            name: Some(name.to_string()),
            all_versions: true,
            ..ListFilter::default()
        };
        self.list_filtered(project, entity_type, &filter)
    }

    /// Persists local edits of an existing entity and returns the stored copy.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when the entity no longer exists.
    pub fn update(&self, entity: &Entity) -> ClientResult<Entity> {
        if entity.entity_type() == EntityType::Project {
            return self.update_project(entity);
        }
        let entity_type = entity.entity_type();
        let body = serde_json::to_value(entity.document())?;
        let value = self.send(
            Method::PUT,
            &["-", entity.project(), entity_type.collection(), entity.id()],
            &[],
            Some(&body),
        )?;
        Entity::from_value(entity_type, value)
    }

    /// Saves the entity: `update` overwrites the stored version, otherwise a
    /// new version is created from the local document.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the backend rejects the write.
    pub fn save(&self, entity: &mut Entity, update: bool) -> ClientResult<()> {
        let stored = if update {
            self.update(entity)?
        } else {
            let mut document = entity.document().clone();
            document.id = match entity.entity_type() {
                EntityType::Project => document.name.clone(),
                _ => uuid::Uuid::new_v4().to_string(),
            };
            self.create_document(entity.entity_type(), &document)?
        };
        entity.replace_document(stored.into_document());
        Ok(())
    }

    /// Reloads the entity from the backend in place.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when the entity no longer exists.
    pub fn refresh(&self, entity: &mut Entity) -> ClientResult<()> {
        let fresh = match entity.entity_type() {
            EntityType::Project => self.get_project(entity.name())?,
            entity_type => self.get_by_id(entity_type, entity.project(), entity.id())?,
        };
        entity.replace_document(fresh.into_document());
        Ok(())
    }

    /// Deletes an entity addressed by key or name.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when nothing matches.
    pub fn delete(
        &self,
        entity_type: EntityType,
        target: &EntityRef,
        options: DeleteOptions,
    ) -> ClientResult<()> {
        if entity_type == EntityType::Project {
            return self.delete_project(target.project(), options.cascade);
        }
        let (project, name, id) = resolve_ref(entity_type, target)?;
        let cascade = ("cascade", options.cascade.to_string());
        if options.delete_all_versions && entity_type.is_versioned() {
            self.send(
                Method::DELETE,
                &["-", &project, entity_type.collection()],
                &[("name", name), cascade],
                None,
            )?;
            return Ok(());
        }
        let id = match id {
            Some(id) => id,
            None => self.get_latest(entity_type, &project, &name)?.id().to_string(),
        };
        self.send(Method::DELETE, &["-", &project, entity_type.collection(), &id], &[cascade], None)?;
        Ok(())
    }

    /// Deletes the exact version held by `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when the entity no longer exists.
    pub fn delete_entity(&self, entity: &Entity, options: DeleteOptions) -> ClientResult<()> {
        self.delete(entity.entity_type(), &EntityRef::Key(entity.key()), options)
    }

    // ------------------------------------------------------------------------
    // HTTP plumbing
    // ------------------------------------------------------------------------

    /// Builds `{endpoint}/api/v1/{segments...}` with per-segment encoding.
    pub(crate) fn api_url(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::Config("endpoint cannot be a base url".to_string()))?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);
        Ok(url)
    }

    /// Attaches the bearer token when configured.
    pub(crate) fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        }
    }

    /// Returns the underlying HTTP client.
    pub(crate) const fn http(&self) -> &Client {
        &self.http
    }

    /// Sends an API request and decodes a JSON body (`Null` when empty).
    pub(crate) fn send(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> ClientResult<Value> {
        let url = self.api_url(segments)?;
        let target = format!("{method} {}", url.path());
        let mut builder = self.authorize(self.http.request(method, url)).header(ACCEPT, "application/json");
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            let payload = serde_json::to_vec(body)?;
            builder = builder.header(CONTENT_TYPE, "application/json").body(payload);
        }
        let response = builder.send().map_err(|err| ClientError::Transport(err.to_string()))?;
        let status = response.status();
        let bytes = read_limited(response)?;
        check_status(status, &bytes, &target)?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes)
            .map_err(|err| ClientError::Protocol(format!("invalid json from {target}: {err}")))
    }

    /// Fetches every page of a list endpoint.
    pub(crate) fn fetch_pages(
        &self,
        segments: &[&str],
        base_query: &[(&'static str, String)],
    ) -> ClientResult<Vec<Value>> {
        let mut items = Vec::new();
        let mut page = 0usize;
        loop {
            let mut query: Vec<(&str, String)> = base_query.to_vec();
            query.push(("page", page.to_string()));
            query.push(("size", LIST_PAGE_SIZE.to_string()));
            let value = self.send(Method::GET, segments, &query, None)?;
            let parsed = match value {
                Value::Array(content) => Page {
                    content,
                    last: Some(true),
                },
                other => serde_json::from_value(other)
                    .map_err(|err| ClientError::Protocol(format!("invalid page payload: {err}")))?,
            };
            let done = parsed.is_final(LIST_PAGE_SIZE);
            items.extend(parsed.content);
            if done {
                return Ok(items);
            }
            page = page.saturating_add(1);
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves a reference into `(project, name, id)` for a context entity type.
fn resolve_ref(
    entity_type: EntityType,
    target: &EntityRef,
) -> ClientResult<(String, String, Option<String>)> {
    match target {
        EntityRef::Key(EntityKey::Context(key)) => {
            if key.entity_type != entity_type {
                return Err(ClientError::InvalidKey(format!(
                    "expected a {entity_type} key, got {}",
                    key.entity_type
                )));
            }
            Ok((key.project.clone(), key.name.clone(), key.id.clone()))
        }
        EntityRef::Key(EntityKey::Project(name)) => {
            Err(ClientError::InvalidKey(format!("expected a {entity_type} key, got project {name}")))
        }
        EntityRef::Name {
            project,
            name,
            id,
        } => {
            let id = if entity_type.is_versioned() { id.clone() } else { Some(name.clone()) };
            Ok((project.clone(), name.clone(), id))
        }
    }
}

/// Reads a response body, enforcing [`MAX_RESPONSE_BYTES`].
pub(crate) fn read_limited(response: reqwest::blocking::Response) -> ClientResult<Vec<u8>> {
    if let Some(length) = response.content_length() {
        let length = usize::try_from(length).unwrap_or(usize::MAX);
        if length > MAX_RESPONSE_BYTES {
            return Err(ClientError::ResponseTooLarge {
                actual: length,
                limit: MAX_RESPONSE_BYTES,
            });
        }
    }
    let bytes = response.bytes().map_err(|err| ClientError::Transport(err.to_string()))?;
    if bytes.len() > MAX_RESPONSE_BYTES {
        return Err(ClientError::ResponseTooLarge {
            actual: bytes.len(),
            limit: MAX_RESPONSE_BYTES,
        });
    }
    Ok(bytes.to_vec())
}

/// Maps non-success statuses onto [`ClientError`] variants.
fn check_status(status: StatusCode, body: &[u8], target: &str) -> ClientResult<()> {
    if status.is_success() {
        return Ok(());
    }
    let preview: String = String::from_utf8_lossy(body).trim().chars().take(ERROR_PREVIEW_CHARS).collect();
    match status {
        StatusCode::NOT_FOUND => Err(ClientError::NotFound(format!("{target}: {preview}"))),
        StatusCode::CONFLICT => Err(ClientError::Conflict(format!("{target}: {preview}"))),
        _ => Err(ClientError::Http {
            status: status.as_u16(),
            body: preview,
        }),
    }
}

#[cfg(test)]
mod tests;
