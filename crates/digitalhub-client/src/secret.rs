// crates/digitalhub-client/src/secret.rs
// ============================================================================
// Module: Secret Values
// Description: Read and write secret values behind secret entities.
// Purpose: Keep secret material out of entity documents.
// Dependencies: reqwest, serde_json
// ============================================================================

//! ## Overview
//! Secret entities only carry metadata. Values live behind
//! `/api/v1/-/{project}/secrets/data`, keyed by secret name.

use reqwest::Method;
use serde_json::Map;
use serde_json::Value;

use crate::client::PlatformClient;
use crate::entity::Entity;
use crate::entity::EntityType;
use crate::error::ClientError;
use crate::error::ClientResult;

impl PlatformClient {
    /// Reads the value stored for a secret.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when no value is stored, or
    /// [`ClientError::Config`] when `secret` is not a secret entity.
    pub fn read_secret_value(&self, secret: &Entity) -> ClientResult<String> {
        ensure_secret(secret)?;
        let value = self.send(
            Method::GET,
            &["-", secret.project(), "secrets", "data"],
            &[("keys", secret.name().to_string())],
            None,
        )?;
        value
            .get(secret.name())
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ClientError::NotFound(format!("secret value {}", secret.name())))
    }

    /// Stores (or overwrites) the value of a secret.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the backend rejects the write.
    pub fn set_secret_value(&self, secret: &Entity, value: &str) -> ClientResult<()> {
        ensure_secret(secret)?;
        let mut body = Map::new();
        body.insert(secret.name().to_string(), Value::String(value.to_string()));
        self.send(
            Method::PUT,
            &["-", secret.project(), "secrets", "data"],
            &[],
            Some(&Value::Object(body)),
        )?;
        Ok(())
    }
}

/// Rejects handles of other entity types.
fn ensure_secret(entity: &Entity) -> ClientResult<()> {
    if entity.entity_type() == EntityType::Secret {
        Ok(())
    } else {
        Err(ClientError::Config(format!("{} is not a secret", entity.key())))
    }
}
