// system-tests/src/crud/secret.rs
// ============================================================================
// Module: Secret Case
// Description: Secret lifecycle and value tests.
// Purpose: Cover secret values next to the usual entity operations.
// Dependencies: digitalhub-client, tracing
// ============================================================================

use digitalhub_client::DeleteOptions;
use digitalhub_client::EntityRef;
use digitalhub_client::EntityRequest;
use digitalhub_client::EntityType;

use super::description;
use super::ensure_empty;
use super::ensure_exported;
use super::fixtures::EXPORT_DESCRIPTION;
use super::fixtures::PROJECT_DESCRIPTION;
use super::fixtures::SECRETS;
use super::fixtures::UPDATED_DESCRIPTION;
use super::remove_export;
use crate::context::SuiteContext;
use crate::ensure_eq;
use crate::failure::TestFailure;
use crate::failure::TestResult;
use crate::runner::NamedTest;
use crate::runner::TestCase;

/// Value written by the overwrite test.
const UPDATED_VALUE: &str = "updated-value";

/// Secret lifecycle case.
pub struct SecretCase<'a> {
    /// Suite context.
    context: &'a SuiteContext,
}

impl SecretCase<'_> {
    /// Request for the first secret.
    fn first_request() -> EntityRequest {
        let (name, value) = SECRETS[0];
        EntityRequest::secret(name, value)
    }

    fn create_delete(&self) -> TestResult {
        let client = self.context.client();
        let scope = self.context.project();
        let project = self.context.project_name();
        for (name, value) in SECRETS {
            let secret = client.create(project, EntityRequest::secret(name, value))?;
            ensure_eq!(secret.name(), name);
            ensure_eq!(client.read_secret_value(&secret)?, value);
            client.delete_entity(&secret, DeleteOptions::default())?;

            let secret = client.create(project, EntityRequest::secret(name, value))?;
            client.delete(
                EntityType::Secret,
                &EntityRef::version(project, secret.name(), secret.id()),
                DeleteOptions::default(),
            )?;

            let secret = scope.new_entity(EntityRequest::secret(name, value))?;
            scope.delete(EntityType::Secret, &secret.key().to_string(), DeleteOptions::default())?;
        }
        ensure_empty(self.context, EntityType::Secret)
    }

    fn get(&self) -> TestResult {
        let client = self.context.client();
        let project = self.context.project_name();
        for (name, value) in SECRETS {
            let created = client.create(project, EntityRequest::secret(name, value))?;
            let by_name = client.get(EntityType::Secret, &EntityRef::version(project, created.name(), created.id()))?;
            ensure_eq!(by_name.id(), created.id());
            let by_key = client.get(EntityType::Secret, &EntityRef::Key(created.key()))?;
            ensure_eq!(by_key.id(), created.id());
            client.delete_entity(&created, DeleteOptions::default())?;
        }
        Ok(())
    }

    fn import_export(&self) -> TestResult {
        let client = self.context.client();
        let secret = client
            .create(self.context.project_name(), Self::first_request().with_description(EXPORT_DESCRIPTION))?;
        let path = client.export(&secret, &self.context.export_dir())?;
        ensure_exported(&path)?;
        client.delete_entity(&secret, DeleteOptions::default())?;

        let imported = client.import(&path)?;
        ensure_eq!(imported.name(), SECRETS[0].0);
        ensure_eq!(imported.kind(), "secret");
        ensure_eq!(description(&imported), EXPORT_DESCRIPTION);

        client.delete_entity(&imported, DeleteOptions::default())?;
        remove_export(&path)
    }

    fn project_integration(&self) -> TestResult {
        let scope = self.context.project();
        let mut secret = scope.new_entity(Self::first_request())?;
        let key = secret.key().to_string();

        let retrieved = scope.get(EntityType::Secret, &key)?;
        ensure_eq!(retrieved.id(), secret.id());
        ensure_eq!(scope.read_secret(secret.name())?, SECRETS[0].1);

        secret.metadata_mut().description = Some(PROJECT_DESCRIPTION.to_string());
        let updated = self.context.client().update(&secret)?;
        ensure_eq!(description(&updated), PROJECT_DESCRIPTION);

        scope.delete(EntityType::Secret, &key, DeleteOptions::default())?;
        Ok(())
    }

    fn secret_value_operations(&self) -> TestResult {
        let client = self.context.client();
        let secret = client.create(self.context.project_name(), Self::first_request())?;
        ensure_eq!(client.read_secret_value(&secret)?, SECRETS[0].1);

        client.set_secret_value(&secret, UPDATED_VALUE)?;
        ensure_eq!(client.read_secret_value(&secret)?, UPDATED_VALUE);

        client.delete_entity(&secret, DeleteOptions::default())?;
        Ok(())
    }

    fn update_refresh(&self) -> TestResult {
        ensure_empty(self.context, EntityType::Secret)?;
        let client = self.context.client();
        let mut secret = client.create(self.context.project_name(), Self::first_request())?;

        secret.metadata_mut().description = Some(UPDATED_DESCRIPTION.to_string());
        client.save(&mut secret, true)?;

        let refreshed = client.get(EntityType::Secret, &EntityRef::Key(secret.key()))?;
        ensure_eq!(description(&refreshed), UPDATED_DESCRIPTION);

        client.refresh(&mut secret)?;
        ensure_eq!(description(&secret), UPDATED_DESCRIPTION);

        client.delete_entity(&secret, DeleteOptions::default())?;
        Ok(())
    }
}

impl TestCase for SecretCase<'_> {
    fn tests(&self) -> Vec<NamedTest<'_>> {
        vec![
            NamedTest::new("test_create_delete", || self.create_delete()),
            NamedTest::new("test_get", || self.get()),
            NamedTest::new("test_import_export", || self.import_export()),
            NamedTest::new("test_project_integration", || self.project_integration()),
            NamedTest::new("test_secret_value_operations", || self.secret_value_operations()),
            NamedTest::new("test_update_refresh", || self.update_refresh()),
        ]
    }
}

/// Builds the secret case, removing leftover secrets first.
///
/// # Errors
///
/// Never fails; leftover cleanup errors are logged and ignored.
pub fn build(context: &SuiteContext) -> Result<Box<dyn TestCase + '_>, TestFailure> {
    let scope = context.project();
    for (name, _) in SECRETS {
        if let Err(err) = scope.delete(EntityType::Secret, name, DeleteOptions::default()) {
            tracing::debug!(secret = name, error = %err, "no leftover secret removed");
        }
    }
    Ok(Box::new(SecretCase {
        context,
    }))
}
