// system-tests/src/crud/log.rs
// ============================================================================
// Module: Log Case
// Description: Material logging helpers and drop-existing semantics.
// Purpose: Upload files and in-memory tables as material versions.
// Dependencies: digitalhub-client, tracing
// ============================================================================

//! ## Overview
//! Every helper is called in both the client and project-scoped forms and the
//! resulting version counts are checked. Sources are bundled with the crate so
//! the case does not depend on the working directory.

use digitalhub_client::ClientResult;
use digitalhub_client::DeleteOptions;
use digitalhub_client::Entity;
use digitalhub_client::EntityRef;
use digitalhub_client::EntityType;
use digitalhub_client::LogOptions;
use digitalhub_client::LogSource;
use digitalhub_client::Table;
use digitalhub_client::sha256_label;
use serde_json::Value;

use super::ignore_not_found;
use crate::context::SuiteContext;
use crate::ensure_eq;
use crate::failure::TestFailure;
use crate::failure::TestResult;
use crate::runner::NamedTest;
use crate::runner::TestCase;

/// Sample table uploaded by most helpers.
const SAMPLE_CSV: &[u8] = include_bytes!("../../data/sample.csv");
/// Croissant metadata uploaded by `log_croissant`.
const CROISSANT_JSON: &[u8] = include_bytes!("../../data/croissant/metadata.json");
/// Name every logged version shares.
const NAME: &str = "test";

/// Material logging case.
pub struct LogCase<'a> {
    /// Suite context.
    context: &'a SuiteContext,
    /// Sample table source.
    csv: LogSource,
    /// Croissant metadata source.
    croissant: LogSource,
    /// Sample table parsed into memory.
    table: LogSource,
    /// Sample table assembled row by row.
    built_table: LogSource,
}

impl LogCase<'_> {
    /// Deletes every version of [`NAME`], tolerating absence.
    fn clear(&self, entity_type: EntityType) -> ClientResult<()> {
        let target = EntityRef::name(self.context.project_name(), NAME);
        ignore_not_found(self.context.client().delete(entity_type, &target, DeleteOptions::single().all_versions()))
    }

    /// Fails unless [`NAME`] has `expected` versions.
    fn ensure_versions(&self, entity_type: EntityType, expected: usize) -> TestResult {
        let versions = self.context.client().get_versions(self.context.project_name(), entity_type, NAME)?;
        ensure_eq!(versions.len(), expected);
        Ok(())
    }

    /// Fails unless the first recorded file carries the digest of `bytes`.
    fn ensure_digest(entity: &Entity, bytes: &[u8]) -> TestResult {
        let hash = entity
            .status()
            .get("files")
            .and_then(|files| files.get(0))
            .and_then(|file| file.get("hash"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        ensure_eq!(hash, sha256_label(bytes));
        Ok(())
    }

    fn drop_existing(&self) -> TestResult {
        let client = self.context.client();
        let project = self.context.project_name();
        for (entity_type, kind) in
            [(EntityType::Dataitem, "dataitem"), (EntityType::Artifact, "artifact"), (EntityType::Model, "model")]
        {
            self.clear(entity_type)?;
            client.log_entity(project, entity_type, NAME, kind, &self.csv, &LogOptions::default())?;
            client.log_entity(project, entity_type, NAME, kind, &self.csv, &LogOptions::default())?;
            self.ensure_versions(entity_type, 2)?;
            client.log_entity(project, entity_type, NAME, kind, &self.csv, &LogOptions::drop_existing())?;
            self.ensure_versions(entity_type, 1)?;
            self.clear(entity_type)?;
        }
        Ok(())
    }

    fn log_methods(&self) -> TestResult {
        let client = self.context.client();
        let scope = self.context.project();
        let project = self.context.project_name();
        let options = LogOptions::default();
        let csv = &self.csv;
        for entity_type in [EntityType::Artifact, EntityType::Dataitem, EntityType::Model] {
            self.clear(entity_type)?;
        }

        let artifact = client.log_artifact(project, NAME, "artifact", csv, &options)?;
        Self::ensure_digest(&artifact, SAMPLE_CSV)?;
        client.log_generic_artifact(project, NAME, csv, &options)?;
        scope.log_artifact(NAME, "artifact", csv, &options)?;
        scope.log_generic_artifact(NAME, csv, &options)?;
        self.ensure_versions(EntityType::Artifact, 4)?;
        self.clear(EntityType::Artifact)?;

        let table = &self.table;
        client.log_table(project, NAME, csv, &options)?;
        client.log_table(project, NAME, table, &options)?;
        client.log_table(project, NAME, &self.built_table, &options)?;
        client.log_dataitem(project, NAME, "dataitem", csv, &options)?;
        client.log_dataitem(project, NAME, "table", table, &options)?;
        let croissant = client.log_croissant(project, NAME, &self.croissant, &options)?;
        Self::ensure_digest(&croissant, CROISSANT_JSON)?;
        client.log_generic_dataitem(project, NAME, csv, &options)?;
        scope.log_table(NAME, csv, &options)?;
        scope.log_table(NAME, table, &options)?;
        scope.log_table(NAME, &self.built_table, &options)?;
        scope.log_dataitem(NAME, "dataitem", csv, &options)?;
        scope.log_dataitem(NAME, "table", table, &options)?;
        scope.log_generic_dataitem(NAME, csv, &options)?;
        scope.log_croissant(NAME, &self.croissant, &options)?;
        self.ensure_versions(EntityType::Dataitem, 14)?;
        self.clear(EntityType::Dataitem)?;

        for kind in ["model", "huggingface", "sklearn", "mlflow"] {
            client.log_model(project, NAME, kind, csv, &options)?;
        }
        client.log_generic_model(project, NAME, csv, &options)?;
        client.log_huggingface(project, NAME, csv, &options)?;
        client.log_sklearn(project, NAME, csv, &options)?;
        client.log_mlflow(project, NAME, csv, &options)?;
        for kind in ["model", "huggingface", "sklearn", "mlflow"] {
            scope.log_model(NAME, kind, csv, &options)?;
        }
        scope.log_generic_model(NAME, csv, &options)?;
        scope.log_huggingface(NAME, csv, &options)?;
        scope.log_sklearn(NAME, csv, &options)?;
        scope.log_mlflow(NAME, csv, &options)?;
        self.ensure_versions(EntityType::Model, 16)?;
        self.clear(EntityType::Model)?;
        Ok(())
    }
}

impl TestCase for LogCase<'_> {
    fn tests(&self) -> Vec<NamedTest<'_>> {
        vec![
            NamedTest::new("test_drop_existing", || self.drop_existing()),
            NamedTest::new("test_log_methods", || self.log_methods()),
        ]
    }
}

/// Rebuilds the parsed sample one row at a time.
fn assemble(parsed: &Table) -> ClientResult<Table> {
    let mut built = Table::new(parsed.columns().iter().cloned());
    for row in parsed.rows() {
        built.push_row(row.iter().cloned())?;
    }
    Ok(built)
}

/// Builds the log case.
///
/// # Errors
///
/// Returns [`TestFailure::Client`] when the bundled sample is not valid CSV.
pub fn build(context: &SuiteContext) -> Result<Box<dyn TestCase + '_>, TestFailure> {
    let parsed = Table::from_csv(SAMPLE_CSV)?;
    let built = assemble(&parsed)?;
    Ok(Box::new(LogCase {
        context,
        csv: LogSource::bytes("sample.csv", SAMPLE_CSV),
        croissant: LogSource::bytes("metadata.json", CROISSANT_JSON),
        table: LogSource::table(parsed),
        built_table: LogSource::table(built),
    }))
}
