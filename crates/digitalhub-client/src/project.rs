// crates/digitalhub-client/src/project.rs
// ============================================================================
// Module: Projects
// Description: Project CRUD, search, and the project-scoped client view.
// Purpose: Address context entities through their owning project.
// Dependencies: reqwest, serde_json
// ============================================================================

//! ## Overview
//! Projects are addressed by name (their id equals their name). A
//! [`ProjectScope`] borrows the client and binds a project name so context
//! operations can take bare names or full keys.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use reqwest::Method;
use serde_json::Value;

use crate::client::DeleteOptions;
use crate::client::ListFilter;
use crate::client::PlatformClient;
use crate::entity::Entity;
use crate::entity::EntityRequest;
use crate::entity::EntityType;
use crate::error::ClientError;
use crate::error::ClientResult;
use crate::key::EntityRef;

// ============================================================================
// SECTION: Project Operations
// ============================================================================

impl PlatformClient {
    /// Creates a project.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Conflict`] when the project already exists.
    pub fn new_project(&self, request: EntityRequest) -> ClientResult<Entity> {
        if request.entity_type != EntityType::Project {
            return Err(ClientError::Config(format!(
                "expected a project request, got {}",
                request.entity_type
            )));
        }
        let document = request.into_document(None)?;
        let body = serde_json::to_value(&document)?;
        let value = self.send(Method::POST, &["projects"], &[], Some(&body))?;
        tracing::debug!(project = %document.name, "project created");
        Entity::from_value(EntityType::Project, value)
    }

    /// Fetches a project by name.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when the project does not exist.
    pub fn get_project(&self, name: &str) -> ClientResult<Entity> {
        let value = self.send(Method::GET, &["projects", name], &[], None)?;
        Entity::from_value(EntityType::Project, value)
    }

    /// Fetches a project, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] for any failure other than a missing project.
    pub fn get_or_create_project(&self, name: &str) -> ClientResult<Entity> {
        match self.get_project(name) {
            Ok(project) => Ok(project),
            Err(err) if err.is_not_found() => self.new_project(EntityRequest::project(name)),
            Err(err) => Err(err),
        }
    }

    /// Lists every visible project.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request or decoding fails.
    pub fn list_projects(&self) -> ClientResult<Vec<Entity>> {
        self.fetch_pages(&["projects"], &[])?
            .into_iter()
            .map(|value| Entity::from_value(EntityType::Project, value))
            .collect()
    }

    /// Persists a project document.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when the project does not exist.
    pub fn update_project(&self, project: &Entity) -> ClientResult<Entity> {
        let body = serde_json::to_value(project.document())?;
        let value = self.send(Method::PUT, &["projects", project.name()], &[], Some(&body))?;
        Entity::from_value(EntityType::Project, value)
    }

    /// Deletes a project; `cascade` also removes every entity it owns.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when the project does not exist.
    pub fn delete_project(&self, name: &str, cascade: bool) -> ClientResult<()> {
        self.send(Method::DELETE, &["projects", name], &[("cascade", cascade.to_string())], None)?;
        tracing::debug!(project = name, cascade, "project deleted");
        Ok(())
    }

    /// Searches a project by name and entity type.
    ///
    /// An empty `types` slice searches every type.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] when a hit lacks a known `entity_type`.
    pub fn search_entity(
        &self,
        project: &str,
        name: Option<&str>,
        types: &[EntityType],
    ) -> ClientResult<Vec<Entity>> {
        let mut query: Vec<(&'static str, String)> = Vec::new();
        if let Some(name) = name {
            query.push(("name", name.to_string()));
        }
        if !types.is_empty() {
            let labels: Vec<&str> = types.iter().map(|entity_type| entity_type.as_str()).collect();
            query.push(("types", labels.join(",")));
        }
        self.fetch_pages(&["-", project, "search"], &query)?
            .into_iter()
            .map(search_hit)
            .collect()
    }

    /// Returns a view bound to `project`.
    #[must_use]
    pub fn project(&self, project: impl Into<String>) -> ProjectScope<'_> {
        ProjectScope {
            client: self,
            name: project.into(),
        }
    }
}

/// Decodes a search hit carrying its `entity_type` next to the document.
fn search_hit(mut value: Value) -> ClientResult<Entity> {
    let label = value
        .as_object_mut()
        .and_then(|object| object.remove("entity_type"))
        .and_then(|label| label.as_str().map(str::to_string))
        .ok_or_else(|| ClientError::Protocol("search hit without entity_type".to_string()))?;
    let entity_type = EntityType::parse(&label)
        .ok_or_else(|| ClientError::Protocol(format!("unknown entity_type in search hit: {label}")))?;
    Entity::from_value(entity_type, value)
}

// ============================================================================
// SECTION: Project Scope
// ============================================================================

/// Client view bound to one project.
#[derive(Debug, Clone)]
pub struct ProjectScope<'a> {
    /// Underlying client.
    client: &'a PlatformClient,
    /// Project name.
    name: String,
}

impl<'a> ProjectScope<'a> {
    /// Returns the project name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the underlying client.
    #[must_use]
    pub const fn client(&self) -> &'a PlatformClient {
        self.client
    }

    /// Fetches the project entity.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when the project does not exist.
    pub fn entity(&self) -> ClientResult<Entity> {
        self.client.get_project(&self.name)
    }

    /// Creates an entity in this project.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the backend rejects the request.
    pub fn new_entity(&self, request: EntityRequest) -> ClientResult<Entity> {
        self.client.create(&self.name, request)
    }

    /// Fetches an entity by key or name.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when nothing matches.
    pub fn get(&self, entity_type: EntityType, identifier: &str) -> ClientResult<Entity> {
        let target = EntityRef::parse_in(&self.name, identifier)?;
        self.client.get(entity_type, &target)
    }

    /// Fetches a pinned version by name and id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when the version does not exist.
    pub fn get_version(&self, entity_type: EntityType, name: &str, id: &str) -> ClientResult<Entity> {
        self.client.get(entity_type, &EntityRef::version(self.name.as_str(), name, id))
    }

    /// Lists the latest version of every entity of a type.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request fails.
    pub fn list(&self, entity_type: EntityType) -> ClientResult<Vec<Entity>> {
        self.client.list(&self.name, entity_type)
    }

    /// Lists entities matching a filter.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request fails.
    pub fn list_filtered(&self, entity_type: EntityType, filter: &ListFilter) -> ClientResult<Vec<Entity>> {
        self.client.list_filtered(&self.name, entity_type, filter)
    }

    /// Lists every version of a name.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request fails.
    pub fn get_versions(&self, entity_type: EntityType, name: &str) -> ClientResult<Vec<Entity>> {
        self.client.get_versions(&self.name, entity_type, name)
    }

    /// Deletes an entity by key or name.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when nothing matches.
    pub fn delete(
        &self,
        entity_type: EntityType,
        identifier: &str,
        options: DeleteOptions,
    ) -> ClientResult<()> {
        let target = EntityRef::parse_in(&self.name, identifier)?;
        self.client.delete(entity_type, &target, options)
    }

    /// Searches this project.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request fails.
    pub fn search(&self, name: Option<&str>, types: &[EntityType]) -> ClientResult<Vec<Entity>> {
        self.client.search_entity(&self.name, name, types)
    }

    /// Exports an entity of this project into `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the write fails.
    pub fn export(&self, entity: &Entity, dir: &Path) -> ClientResult<PathBuf> {
        self.client.export(entity, dir)
    }

    /// Imports an exported entity file into this project.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the file is invalid or the create fails.
    pub fn import(&self, path: &Path) -> ClientResult<Entity> {
        self.client.import_into(&self.name, path)
    }

    /// Exports the project with its embedded entities into `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when reading or writing fails.
    pub fn export_project(&self, dir: &Path) -> ClientResult<PathBuf> {
        self.client.export_project(&self.name, dir)
    }

    /// Reads a secret value by secret name.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when no value is stored.
    pub fn read_secret(&self, name: &str) -> ClientResult<String> {
        let secret = self.get(EntityType::Secret, name)?;
        self.client.read_secret_value(&secret)
    }
}
