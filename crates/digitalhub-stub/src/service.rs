// crates/digitalhub-stub/src/service.rs
// ============================================================================
// Module: Service Emulation
// Description: Responses of services exposed by serve runs.
// Purpose: Let tests invoke serve runs and await their readiness.
// Dependencies: axum, serde_json
// ============================================================================

//! ## Overview
//! A service answers only while its serve run exists and is `RUNNING`. The
//! first [`crate::StubOptions::service_warmup`] calls answer 503 to emulate a
//! starting container. `POST /v2/models/{name}/infer` answers with a V2
//! inference response sized to the request; every other call echoes the
//! request back as JSON.

use axum::http::StatusCode;
use serde_json::Value;
use serde_json::json;

use crate::store::ApiError;
use crate::store::Platform;

impl Platform {
    /// Handles a call to the service of run `run_id`.
    pub(crate) fn service_call(
        &mut self,
        run_id: &str,
        method: &str,
        path: &str,
        query: Option<&str>,
        body: &[u8],
    ) -> Result<(StatusCode, Value), ApiError> {
        let serving = self.entities.iter().any(|stored| {
            stored.collection == "runs"
                && stored.field("id") == Some(run_id)
                && stored.doc.get("status").and_then(|status| status.get("state")).and_then(Value::as_str)
                    == Some("RUNNING")
                && stored.doc.get("status").and_then(|status| status.get("service")).is_some()
        });
        if !serving {
            return Err(ApiError::not_found(format!("no service for run {run_id}")));
        }
        let calls = self.service_calls.entry(run_id.to_string()).or_insert(0);
        *calls = calls.saturating_add(1);
        if *calls <= self.options.service_warmup {
            return Ok((StatusCode::SERVICE_UNAVAILABLE, json!({ "error": "service starting" })));
        }

        let payload: Value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(body).map_err(|err| ApiError::bad_request(format!("invalid json body: {err}")))?
        };
        let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();
        if let ["v2", "models", model, "infer"] = segments.as_slice() {
            return infer(model, &payload).map(|value| (StatusCode::OK, value));
        }
        Ok((
            StatusCode::OK,
            json!({
                "run": run_id,
                "method": method,
                "path": format!("/{}", segments.join("/")),
                "query": query.unwrap_or_default(),
                "body": payload,
            }),
        ))
    }
}

/// Builds a V2 inference response with one prediction per input row.
fn infer(model: &str, payload: &Value) -> Result<Value, ApiError> {
    let input = payload
        .get("inputs")
        .and_then(Value::as_array)
        .and_then(|inputs| inputs.first())
        .ok_or_else(|| ApiError::bad_request("inference request without inputs"))?;
    let declared = input
        .get("shape")
        .and_then(Value::as_array)
        .and_then(|shape| shape.first())
        .and_then(Value::as_i64)
        .and_then(|rows| usize::try_from(rows).ok());
    let rows = match declared {
        Some(rows) => rows,
        None => input.get("data").and_then(Value::as_array).map_or(0, Vec::len),
    };
    Ok(json!({
        "model_name": model,
        "outputs": [{
            "name": "output-0",
            "shape": [rows],
            "datatype": "INT64",
            "data": vec![0; rows],
        }],
    }))
}
