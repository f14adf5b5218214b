// crates/digitalhub-client/src/transfer.rs
// ============================================================================
// Module: Import / Export
// Description: YAML export files for entities and whole projects.
// Purpose: Move entity definitions between backends or across deletions.
// Dependencies: serde, serde_yaml
// ============================================================================

//! ## Overview
//! Entity exports are single YAML documents named
//! `{entity_type}-{name}-{id}.yaml`. Project exports are named
//! `project-{name}.yaml` and embed the latest version of each artifact,
//! dataitem, model, function, and workflow under its collection name inside
//! `spec`. Imports recreate the documents remotely with their exported ids
//! unless asked to reset them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::client::PlatformClient;
use crate::entity::Entity;
use crate::entity::EntityDocument;
use crate::entity::EntityType;
use crate::error::ClientError;
use crate::error::ClientResult;

// ============================================================================
// SECTION: File Format
// ============================================================================

/// On-disk export envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExportFile {
    /// Singular entity type label.
    entity_type: String,
    /// Exported document.
    #[serde(flatten)]
    document: EntityDocument,
}

impl ExportFile {
    /// Reads and decodes an export file.
    fn read(path: &Path) -> ClientResult<(EntityType, EntityDocument)> {
        let raw = fs::read_to_string(path).map_err(|err| ClientError::io(path, err))?;
        let file: Self = serde_yaml::from_str(&raw)?;
        let entity_type = EntityType::parse(&file.entity_type).ok_or_else(|| {
            ClientError::Yaml(format!("unknown entity_type {} in {}", file.entity_type, path.display()))
        })?;
        Ok((entity_type, file.document))
    }

    /// Encodes and writes the envelope into `dir` under `file_name`.
    fn write(&self, dir: &Path, file_name: &str) -> ClientResult<PathBuf> {
        fs::create_dir_all(dir).map_err(|err| ClientError::io(dir, err))?;
        let path = dir.join(file_name);
        let yaml = serde_yaml::to_string(self)?;
        fs::write(&path, yaml).map_err(|err| ClientError::io(&path, err))?;
        Ok(path)
    }
}

/// Returns the export file name of an entity.
#[must_use]
pub fn export_file_name(entity: &Entity) -> String {
    match entity.entity_type() {
        EntityType::Project => format!("project-{}.yaml", entity.name()),
        entity_type => format!("{entity_type}-{}-{}.yaml", entity.name(), entity.id()),
    }
}

// ============================================================================
// SECTION: Operations
// ============================================================================

impl PlatformClient {
    /// Writes an entity export file into `dir` and returns its path.
    ///
    /// Projects are exported with their embedded entities.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] or [`ClientError::Yaml`] when writing fails.
    pub fn export(&self, entity: &Entity, dir: &Path) -> ClientResult<PathBuf> {
        if entity.entity_type() == EntityType::Project {
            return self.export_project(entity.name(), dir);
        }
        let file = ExportFile {
            entity_type: entity.entity_type().as_str().to_string(),
            document: entity.document().clone(),
        };
        let path = file.write(dir, &export_file_name(entity))?;
        tracing::debug!(path = %path.display(), "entity exported");
        Ok(path)
    }

    /// Recreates the entity described by an export file in its original project.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Conflict`] when the exported version still exists.
    pub fn import(&self, path: &Path) -> ClientResult<Entity> {
        let (entity_type, document) = ExportFile::read(path)?;
        if entity_type == EntityType::Project {
            return self.import_project(path, false);
        }
        self.create_document(entity_type, &document)
    }

    /// Recreates an exported entity inside `project`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the file is invalid or the create fails.
    pub fn import_into(&self, project: &str, path: &Path) -> ClientResult<Entity> {
        let (entity_type, mut document) = ExportFile::read(path)?;
        if entity_type == EntityType::Project {
            return Err(ClientError::Config(format!(
                "{} holds a project export; use import_project",
                path.display()
            )));
        }
        document.project = Some(project.to_string());
        document.metadata.project = Some(project.to_string());
        self.create_document(entity_type, &document)
    }

    /// Exports a project and the latest version of its embeddable entities.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when listing or writing fails.
    pub fn export_project(&self, name: &str, dir: &Path) -> ClientResult<PathBuf> {
        let project = self.get_project(name)?;
        let mut document = project.document().clone();
        for entity_type in EntityType::EMBEDDED {
            let entities = self.list(name, entity_type)?;
            let embedded: Vec<Value> = entities
                .into_iter()
                .map(|entity| serde_json::to_value(entity.into_document()))
                .collect::<Result<_, _>>()?;
            document.spec.insert(entity_type.collection().to_string(), Value::Array(embedded));
        }
        let file = ExportFile {
            entity_type: EntityType::Project.as_str().to_string(),
            document,
        };
        let path = file.write(dir, &export_file_name(&project))?;
        tracing::debug!(path = %path.display(), "project exported");
        Ok(path)
    }

    /// Recreates a project and its embedded entities from an export file.
    ///
    /// With `reset_id` every embedded entity receives a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Conflict`] when the project already exists.
    pub fn import_project(&self, path: &Path, reset_id: bool) -> ClientResult<Entity> {
        let mut document = read_project(path)?;
        let embedded = take_embedded(&mut document);
        let project_name = document.name.clone();
        let body = serde_json::to_value(&document)?;
        let value = self.send(reqwest::Method::POST, &["projects"], &[], Some(&body))?;
        let project = Entity::from_value(EntityType::Project, value)?;
        for (entity_type, item) in embedded {
            let mut child = embedded_document(&project_name, entity_type, item)?;
            if reset_id {
                child.id = uuid::Uuid::new_v4().to_string();
            }
            self.create_document(entity_type, &child)?;
        }
        tracing::debug!(project = %project_name, reset_id, "project imported");
        Ok(project)
    }

    /// Makes the backend match a project export file.
    ///
    /// A missing project is imported. An existing one is overwritten with the
    /// file's document, and each embedded entity version is updated when its
    /// id exists or created otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when reading, fetching, or writing fails.
    pub fn load_project(&self, path: &Path) -> ClientResult<Entity> {
        let mut document = read_project(path)?;
        match self.get_project(&document.name) {
            Ok(_) => {}
            Err(err) if err.is_not_found() => return self.import_project(path, false),
            Err(err) => return Err(err),
        }
        let embedded = take_embedded(&mut document);
        let project_name = document.name.clone();
        let project = self.update_project(&Entity::new(EntityType::Project, document))?;
        for (entity_type, item) in embedded {
            let child = embedded_document(&project_name, entity_type, item)?;
            match self.get_by_id(entity_type, &project_name, &child.id) {
                Ok(_) => {
                    self.update(&Entity::new(entity_type, child))?;
                }
                Err(err) if err.is_not_found() => {
                    self.create_document(entity_type, &child)?;
                }
                Err(err) => return Err(err),
            }
        }
        tracing::debug!(project = %project_name, "project loaded");
        Ok(project)
    }
}

// ============================================================================
// SECTION: Project Files
// ============================================================================

/// Reads an export file that must hold a project.
fn read_project(path: &Path) -> ClientResult<EntityDocument> {
    let (entity_type, document) = ExportFile::read(path)?;
    if entity_type != EntityType::Project {
        return Err(ClientError::Config(format!(
            "{} holds a {entity_type} export, not a project",
            path.display()
        )));
    }
    Ok(document)
}

/// Moves the embedded entity arrays out of a project `spec`.
fn take_embedded(document: &mut EntityDocument) -> Vec<(EntityType, Value)> {
    let mut embedded = Vec::new();
    for entity_type in EntityType::EMBEDDED {
        if let Some(Value::Array(items)) = document.spec.remove(entity_type.collection()) {
            embedded.extend(items.into_iter().map(|item| (entity_type, item)));
        }
    }
    embedded
}

/// Decodes one embedded entity and binds it to `project`.
fn embedded_document(project: &str, entity_type: EntityType, item: Value) -> ClientResult<EntityDocument> {
    let mut child: EntityDocument = serde_json::from_value(item)
        .map_err(|err| ClientError::Yaml(format!("invalid embedded {entity_type}: {err}")))?;
    child.project = Some(project.to_string());
    child.metadata.project = Some(project.to_string());
    Ok(child)
}
