// crates/digitalhub-client/src/log.rs
// ============================================================================
// Module: Material Logging
// Description: Upload local material and register it as an artifact,
//              dataitem, or model version.
// Purpose: One-call "log" helpers for material entities.
// Dependencies: reqwest, sha2, serde_json, csv
// ============================================================================

//! ## Overview
//! Logging a file:
//! 1. optionally drops every existing version of the name;
//! 2. asks the backend for an upload target for a fresh entity id;
//! 3. uploads the bytes;
//! 4. creates the entity with `spec.path` pointing at the upload and
//!    `status.files` describing it, in state `READY`.
//!
//! Each call therefore adds exactly one version under the name. In-memory
//! [`Table`]s are serialized to CSV before upload.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use sha2::Digest;
use sha2::Sha256;

use crate::client::DeleteOptions;
use crate::client::PlatformClient;
use crate::client::read_limited;
use crate::entity::Entity;
use crate::entity::EntityRequest;
use crate::entity::EntityType;
use crate::error::ClientError;
use crate::error::ClientResult;
use crate::key::EntityRef;
use crate::project::ProjectScope;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Material to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    /// A local file.
    File(PathBuf),
    /// In-memory bytes uploaded under `filename`.
    Bytes {
        /// File name recorded in the entity.
        filename: String,
        /// Content.
        bytes: Vec<u8>,
    },
    /// An in-memory table uploaded as CSV under `filename`.
    Table {
        /// File name recorded in the entity.
        filename: String,
        /// Rows to serialize.
        table: Table,
    },
}

impl LogSource {
    /// Builds a file source.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Builds an in-memory source.
    #[must_use]
    pub fn bytes(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Builds a table source uploaded as `data.csv`.
    #[must_use]
    pub fn table(table: Table) -> Self {
        Self::Table {
            filename: TABLE_FILENAME.to_string(),
            table,
        }
    }

    /// Resolves the file name and content.
    fn load(&self) -> ClientResult<(String, Vec<u8>)> {
        match self {
            Self::File(path) => {
                let bytes = fs::read(path).map_err(|err| ClientError::io(path, err))?;
                Ok((file_name(path)?, bytes))
            }
            Self::Bytes {
                filename,
                bytes,
            } => Ok((filename.clone(), bytes.clone())),
            Self::Table {
                filename,
                table,
            } => Ok((filename.clone(), table.to_csv()?)),
        }
    }
}

/// File name of uploaded tables.
const TABLE_FILENAME: &str = "data.csv";

/// Column-named rows held in memory.
///
/// # Invariants
/// - Every row has exactly one cell per column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Column names.
    columns: Vec<String>,
    /// Row cells, in column order.
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Starts an empty table with the given columns.
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Parses CSV with a header line.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Csv`] when the input is not valid CSV or rows
    /// differ in length.
    pub fn from_csv(bytes: &[u8]) -> ClientResult<Self> {
        let mut reader = csv::Reader::from_reader(bytes);
        let columns = reader.headers()?.iter().map(str::to_string).collect();
        let rows = reader
            .records()
            .map(|record| record.map(|record| record.iter().map(str::to_string).collect()))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            columns,
            rows,
        })
    }

    /// Appends a row.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Csv`] when the row width differs from the columns.
    pub fn push_row<I, S>(&mut self, cells: I) -> ClientResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let row: Vec<String> = cells.into_iter().map(Into::into).collect();
        if row.len() != self.columns.len() {
            return Err(ClientError::Csv(format!(
                "row has {} cells, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Returns the column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the rows, cells in column order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when the table holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Serializes the header and rows as CSV.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Csv`] when a record cannot be written.
    pub fn to_csv(&self) -> ClientResult<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.into_inner().map_err(|err| ClientError::Csv(err.to_string()))
    }
}

/// Extracts a UTF-8 file name from a path.
fn file_name(path: &Path) -> ClientResult<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| ClientError::Config(format!("source path has no file name: {}", path.display())))
}

/// Options shared by every log helper.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Delete every existing version of the name before logging.
    pub drop_existing: bool,
    /// Description recorded in metadata.
    pub description: Option<String>,
    /// Labels recorded in metadata.
    pub labels: Vec<String>,
}

impl LogOptions {
    /// Options that drop existing versions first.
    #[must_use]
    pub fn drop_existing() -> Self {
        Self {
            drop_existing: true,
            ..Self::default()
        }
    }
}

/// Upload target returned by the backend.
#[derive(Debug, Deserialize)]
struct UploadTarget {
    /// Absolute URL accepting a `PUT` of the bytes.
    url: String,
    /// Storage path recorded as `spec.path`.
    path: String,
}

// ============================================================================
// SECTION: Logging
// ============================================================================

impl PlatformClient {
    /// Uploads material and registers it as a new version.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] for non-material entity types, or any
    /// transport, upload, or create failure.
    pub fn log_entity(
        &self,
        project: &str,
        entity_type: EntityType,
        name: &str,
        kind: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        if !matches!(entity_type, EntityType::Artifact | EntityType::Dataitem | EntityType::Model) {
            return Err(ClientError::Config(format!("cannot log a {entity_type}")));
        }
        if options.drop_existing {
            let target = EntityRef::name(project, name);
            match self.delete(entity_type, &target, DeleteOptions::single().all_versions()) {
                Ok(()) => {}
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
        }
        let (filename, bytes) = source.load()?;
        let id = uuid::Uuid::new_v4().to_string();
        let target = self.upload_target(project, entity_type, &id, &filename)?;
        self.upload(&target.url, bytes.clone())?;

        let mut request = EntityRequest::new(entity_type, name, kind)
            .with_id(id)
            .with_labels(options.labels.clone())
            .with_spec("path", target.path.as_str());
        if let Some(description) = &options.description {
            request = request.with_description(description.clone());
        }
        let mut document = request.into_document(Some(project))?;
        document.status.insert(
            "files".to_string(),
            json!([{
                "path": filename,
                "name": filename,
                "size": bytes.len(),
                "hash": sha256_label(&bytes),
            }]),
        );
        document.status.insert("state".to_string(), Value::String("READY".to_string()));
        let entity = self.create_document(entity_type, &document)?;
        tracing::debug!(entity_type = %entity_type, name, kind, "material logged");
        Ok(entity)
    }

    /// Logs an artifact of the given kind.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_artifact(
        &self,
        project: &str,
        name: &str,
        kind: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        self.log_entity(project, EntityType::Artifact, name, kind, source, options)
    }

    /// Logs an `artifact`-kind artifact.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_generic_artifact(
        &self,
        project: &str,
        name: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        self.log_artifact(project, name, "artifact", source, options)
    }

    /// Logs a dataitem of the given kind.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_dataitem(
        &self,
        project: &str,
        name: &str,
        kind: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        self.log_entity(project, EntityType::Dataitem, name, kind, source, options)
    }

    /// Logs a `table` dataitem.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_table(
        &self,
        project: &str,
        name: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        self.log_dataitem(project, name, "table", source, options)
    }

    /// Logs a `croissant` dataitem from its metadata document.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_croissant(
        &self,
        project: &str,
        name: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        self.log_dataitem(project, name, "croissant", source, options)
    }

    /// Logs a `dataitem`-kind dataitem.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_generic_dataitem(
        &self,
        project: &str,
        name: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        self.log_dataitem(project, name, "dataitem", source, options)
    }

    /// Logs a model of the given kind.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_model(
        &self,
        project: &str,
        name: &str,
        kind: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        self.log_entity(project, EntityType::Model, name, kind, source, options)
    }

    /// Logs a `model`-kind model.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_generic_model(
        &self,
        project: &str,
        name: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        self.log_model(project, name, "model", source, options)
    }

    /// Logs a `huggingface` model.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_huggingface(
        &self,
        project: &str,
        name: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        self.log_model(project, name, "huggingface", source, options)
    }

    /// Logs a `sklearn` model.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_sklearn(
        &self,
        project: &str,
        name: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        self.log_model(project, name, "sklearn", source, options)
    }

    /// Logs an `mlflow` model.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_mlflow(
        &self,
        project: &str,
        name: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        self.log_model(project, name, "mlflow", source, options)
    }

    /// Requests an upload target for a not-yet-created entity version.
    fn upload_target(
        &self,
        project: &str,
        entity_type: EntityType,
        id: &str,
        filename: &str,
    ) -> ClientResult<UploadTarget> {
        let value = self.send(
            Method::GET,
            &["-", project, entity_type.collection(), id, "files", "upload"],
            &[("filename", filename.to_string())],
            None,
        )?;
        serde_json::from_value(value)
            .map_err(|err| ClientError::Protocol(format!("invalid upload target: {err}")))
    }

    /// Uploads bytes to an upload target.
    fn upload(&self, url: &str, bytes: Vec<u8>) -> ClientResult<()> {
        let response = self
            .authorize(self.http().put(url))
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .map_err(|err| ClientError::Transport(err.to_string()))?;
        let status = response.status();
        let body = read_limited(response)?;
        if status.is_success() {
            return Ok(());
        }
        Err(ClientError::Http {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).trim().to_string(),
        })
    }
}

/// Renders the `sha256:{hex}` digest label recorded in file info.
#[must_use]
pub fn sha256_label(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    format!("sha256:{hex}")
}

// ============================================================================
// SECTION: Project Scope
// ============================================================================

impl ProjectScope<'_> {
    /// Logs an artifact of the given kind into this project.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_artifact(
        &self,
        name: &str,
        kind: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        self.client().log_artifact(self.name(), name, kind, source, options)
    }

    /// Logs an `artifact`-kind artifact into this project.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_generic_artifact(
        &self,
        name: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        self.client().log_generic_artifact(self.name(), name, source, options)
    }

    /// Logs a dataitem of the given kind into this project.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_dataitem(
        &self,
        name: &str,
        kind: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        self.client().log_dataitem(self.name(), name, kind, source, options)
    }

    /// Logs a `table` dataitem into this project.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_table(&self, name: &str, source: &LogSource, options: &LogOptions) -> ClientResult<Entity> {
        self.client().log_table(self.name(), name, source, options)
    }

    /// Logs a `croissant` dataitem into this project.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_croissant(
        &self,
        name: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        self.client().log_croissant(self.name(), name, source, options)
    }

    /// Logs a `dataitem`-kind dataitem into this project.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_generic_dataitem(
        &self,
        name: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        self.client().log_generic_dataitem(self.name(), name, source, options)
    }

    /// Logs a model of the given kind into this project.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_model(
        &self,
        name: &str,
        kind: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        self.client().log_model(self.name(), name, kind, source, options)
    }

    /// Logs a `model`-kind model into this project.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_generic_model(
        &self,
        name: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        self.client().log_generic_model(self.name(), name, source, options)
    }

    /// Logs a `huggingface` model into this project.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_huggingface(
        &self,
        name: &str,
        source: &LogSource,
        options: &LogOptions,
    ) -> ClientResult<Entity> {
        self.client().log_huggingface(self.name(), name, source, options)
    }

    /// Logs a `sklearn` model into this project.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_sklearn(&self, name: &str, source: &LogSource, options: &LogOptions) -> ClientResult<Entity> {
        self.client().log_sklearn(self.name(), name, source, options)
    }

    /// Logs an `mlflow` model into this project.
    ///
    /// # Errors
    ///
    /// See [`PlatformClient::log_entity`].
    pub fn log_mlflow(&self, name: &str, source: &LogSource, options: &LogOptions) -> ClientResult<Entity> {
        self.client().log_mlflow(self.name(), name, source, options)
    }
}
