// crates/digitalhub-stub/src/server.rs
// ============================================================================
// Module: Stub Server
// Description: Axum routes and the background server thread.
// Purpose: Serve the platform REST contract over loopback HTTP.
// Dependencies: axum, tokio
// ============================================================================

//! ## Overview
//! The server binds `127.0.0.1:0`, runs a current-thread tokio runtime on its
//! own OS thread, and shuts down when the [`PlatformStub`] handle drops.
//! Context routes are dispatched by hand from one wildcard route so
//! `search` and `secrets/data` never compete with `{collection}/{id}`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::thread;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::OriginalUri;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::any;
use axum::routing::get;
use serde_json::Value;
use serde_json::json;
use tokio::runtime::Builder;
use tokio::sync::oneshot;

use crate::StubError;
use crate::StubOptions;
use crate::store::ApiError;
use crate::store::COLLECTIONS;
use crate::store::ListQuery;
use crate::store::Platform;

// ============================================================================
// SECTION: Handle
// ============================================================================

/// Shared handler state.
#[derive(Clone)]
struct StubState {
    /// Platform state.
    platform: Arc<Mutex<Platform>>,
    /// Required bearer token.
    access_token: Option<String>,
}

impl StubState {
    /// Locks the platform state.
    fn lock(&self) -> Result<MutexGuard<'_, Platform>, ApiError> {
        self.platform.lock().map_err(|_| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "stub state poisoned".to_string(),
        })
    }

    /// Checks the bearer token when one is configured.
    fn authorize(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        let Some(expected) = &self.access_token else {
            return Ok(());
        };
        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        if presented == Some(expected.as_str()) {
            Ok(())
        } else {
            Err(ApiError {
                status: StatusCode::UNAUTHORIZED,
                message: "missing or invalid bearer token".to_string(),
            })
        }
    }
}

/// Running stub server; dropping it stops the server.
pub struct PlatformStub {
    /// `http://host:port`.
    base_url: String,
    /// Shutdown signal.
    shutdown: Option<oneshot::Sender<()>>,
    /// Server thread.
    join: Option<thread::JoinHandle<()>>,
    /// Platform state for inspection.
    platform: Arc<Mutex<Platform>>,
}

impl PlatformStub {
    /// Returns the base URL to configure clients with.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the bytes uploaded under a storage path (`{project}/...`).
    #[must_use]
    pub fn uploaded_file(&self, path: &str) -> Option<Vec<u8>> {
        self.platform.lock().ok().and_then(|platform| platform.get_file(path))
    }

    /// Returns the number of stored entities across all projects.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.platform.lock().map_or(0, |platform| platform.entities.len())
    }
}

impl Drop for PlatformStub {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Starts the stub on a loopback port.
///
/// # Errors
///
/// Returns [`StubError::Bind`] when no listener can be opened.
pub fn spawn_platform_stub(options: StubOptions) -> Result<PlatformStub, StubError> {
    let listener = StdTcpListener::bind("127.0.0.1:0").map_err(|err| StubError::Bind(err.to_string()))?;
    listener.set_nonblocking(true).map_err(|err| StubError::Bind(err.to_string()))?;
    let addr = listener.local_addr().map_err(|err| StubError::Bind(err.to_string()))?;
    let host = addr.to_string();
    let base_url = format!("http://{host}");

    let access_token = options.access_token.clone();
    let platform = Arc::new(Mutex::new(Platform::new(options, host)));
    let state = StubState {
        platform: Arc::clone(&platform),
        access_token,
    };
    let app = router(state);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = thread::Builder::new()
        .name("digitalhub-stub".to_string())
        .spawn(move || {
            let Ok(runtime) = Builder::new_current_thread().enable_all().build() else {
                return;
            };
            runtime.block_on(async move {
                let Ok(listener) = tokio::net::TcpListener::from_std(listener) else {
                    return;
                };
                let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                });
                let _ = server.await;
            });
        })
        .map_err(|err| StubError::Spawn(err.to_string()))?;
    Ok(PlatformStub {
        base_url,
        shutdown: Some(shutdown_tx),
        join: Some(join),
        platform,
    })
}

// ============================================================================
// SECTION: Routes
// ============================================================================

/// Builds the router.
fn router(state: StubState) -> Router {
    Router::new()
        .route("/api/v1/projects", get(list_projects).post(create_project))
        .route("/api/v1/projects/{name}", get(get_project).put(update_project).delete(delete_project))
        .route("/api/v1/-/{project}/{*rest}", any(context_api))
        .route("/files/{*path}", get(download_file).put(upload_file))
        .route("/services/{*rest}", any(service))
        .with_state(state)
}

/// Handler result.
type Reply = Result<Response, ApiError>;

/// Wraps a JSON body with a status.
fn reply(status: StatusCode, body: Value) -> Reply {
    Ok((status, Json(body)).into_response())
}

/// Parses a JSON request body.
fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|err| ApiError::bad_request(format!("invalid json: {err}")))?;
    if value.is_object() { Ok(value) } else { Err(ApiError::bad_request("body must be an object")) }
}

/// Reads `cascade`, defaulting to false.
fn cascade(query: &HashMap<String, String>) -> bool {
    query.get("cascade").is_some_and(|value| value == "true")
}

/// Slices a paged response.
fn page(items: Vec<Value>, query: &HashMap<String, String>) -> Value {
    let size = query.get("size").and_then(|size| size.parse::<usize>().ok()).filter(|size| *size > 0);
    let number = query.get("page").and_then(|page| page.parse::<usize>().ok()).unwrap_or(0);
    let total = items.len();
    let Some(size) = size else {
        return json!({ "content": items, "last": true, "totalElements": total });
    };
    let start = number.saturating_mul(size).min(total);
    let end = start.saturating_add(size).min(total);
    let content: Vec<Value> = items.into_iter().skip(start).take(end - start).collect();
    json!({ "content": content, "last": end >= total, "totalElements": total })
}

async fn list_projects(
    State(state): State<StubState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Reply {
    state.authorize(&headers)?;
    let projects = state.lock()?.list_projects();
    reply(StatusCode::OK, page(projects, &query))
}

async fn create_project(State(state): State<StubState>, headers: HeaderMap, body: Bytes) -> Reply {
    state.authorize(&headers)?;
    let body = parse_body(&body)?;
    let created = state.lock()?.create_project(body)?;
    reply(StatusCode::OK, created)
}

async fn get_project(
    State(state): State<StubState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Reply {
    state.authorize(&headers)?;
    let project = state.lock()?.get_project(&name)?;
    reply(StatusCode::OK, project)
}

async fn update_project(
    State(state): State<StubState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    body: Bytes,
) -> Reply {
    state.authorize(&headers)?;
    let body = parse_body(&body)?;
    let updated = state.lock()?.update_project(&name, body)?;
    reply(StatusCode::OK, updated)
}

async fn delete_project(
    State(state): State<StubState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Reply {
    state.authorize(&headers)?;
    state.lock()?.delete_project(&name, cascade(&query))?;
    reply(StatusCode::OK, json!({ "deleted": name }))
}

/// Dispatches `/api/v1/-/{project}/...`.
async fn context_api(
    State(state): State<StubState>,
    method: Method,
    headers: HeaderMap,
    Path((project, rest)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Reply {
    state.authorize(&headers)?;
    let segments: Vec<&str> = rest.split('/').filter(|segment| !segment.is_empty()).collect();
    let mut platform = state.lock()?;
    match (method.as_str(), segments.as_slice()) {
        ("GET", ["search"]) => {
            let types: Vec<&str> = query
                .get("types")
                .map(|types| types.split(',').filter(|label| !label.is_empty()).collect())
                .unwrap_or_default();
            let hits = platform.search(&project, query.get("name").map(String::as_str), &types)?;
            reply(StatusCode::OK, page(hits, &query))
        }
        ("GET", ["secrets", "data"]) => {
            let keys: Vec<&str> = query.get("keys").map(|keys| keys.split(',').collect()).unwrap_or_default();
            reply(StatusCode::OK, platform.read_secrets(&project, &keys)?)
        }
        ("PUT", ["secrets", "data"]) => {
            platform.write_secrets(&project, &parse_body(&body)?)?;
            reply(StatusCode::OK, Value::Null)
        }
        (_, [collection, ..]) if !COLLECTIONS.contains(collection) => {
            Err(ApiError::not_found(format!("unknown collection {collection}")))
        }
        ("GET", [collection]) => {
            platform.require_project(&project)?;
            let filter = ListQuery {
                name: query.get("name").cloned(),
                kind: query.get("kind").cloned(),
                function: query.get("function").cloned(),
                all_versions: query.get("versions").is_some_and(|versions| versions == "all"),
            };
            let items = platform.list_entities(&project, collection, &filter);
            reply(StatusCode::OK, page(items, &query))
        }
        ("POST", [collection]) => {
            let created = platform.create_entity(&project, collection, parse_body(&body)?)?;
            reply(StatusCode::OK, created)
        }
        ("DELETE", [collection]) => {
            let name = query.get("name").ok_or_else(|| ApiError::bad_request("missing name"))?;
            platform.delete_by_name(&project, collection, name, cascade(&query))?;
            reply(StatusCode::OK, json!({ "deleted": name }))
        }
        ("GET", [collection, id]) => reply(StatusCode::OK, platform.get_entity(&project, collection, id)?),
        ("PUT", [collection, id]) => {
            let updated = platform.update_entity(&project, collection, id, parse_body(&body)?)?;
            reply(StatusCode::OK, updated)
        }
        ("DELETE", [collection, id]) => {
            platform.delete_entity(&project, collection, id, cascade(&query))?;
            reply(StatusCode::OK, json!({ "deleted": id }))
        }
        ("GET", [collection, id, "files", "upload"]) => {
            let filename = query.get("filename").map(String::as_str).unwrap_or_default();
            reply(StatusCode::OK, platform.upload_target(&project, collection, id, filename)?)
        }
        _ => Err(ApiError {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: format!("{method} /{rest} not supported"),
        }),
    }
}

async fn upload_file(
    State(state): State<StubState>,
    headers: HeaderMap,
    Path(path): Path<String>,
    body: Bytes,
) -> Reply {
    state.authorize(&headers)?;
    state.lock()?.put_file(&path, body.to_vec());
    reply(StatusCode::OK, json!({ "path": path, "size": body.len() }))
}

async fn download_file(
    State(state): State<StubState>,
    headers: HeaderMap,
    Path(path): Path<String>,
) -> Reply {
    state.authorize(&headers)?;
    let bytes = state.lock()?.get_file(&path).ok_or_else(|| ApiError::not_found(format!("file {path}")))?;
    Ok((StatusCode::OK, bytes).into_response())
}

/// Dispatches `/services/{run id}[/{path}]`.
async fn service(
    State(state): State<StubState>,
    method: Method,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    Path(rest): Path<String>,
    body: Bytes,
) -> Reply {
    state.authorize(&headers)?;
    let rest = rest.trim_start_matches('/');
    let (run, path) = rest.split_once('/').unwrap_or((rest, ""));
    let (status, value) = state.lock()?.service_call(run, method.as_str(), path, uri.query(), &body)?;
    reply(status, value)
}
