// crates/digitalhub-client/src/lib.rs
// ============================================================================
// Module: DigitalHub Client Library
// Description: Blocking REST client for the DigitalHub MLOps platform.
// Purpose: Manage projects, material and executable entities, runs, and services.
// Dependencies: reqwest, serde, serde_json, serde_yaml, sha2, csv, thiserror, tracing
// ============================================================================

//! ## Overview
//! The client is a transport and shape layer. Entities are opaque handles over
//! a common wire document; the backend owns storage, versioning, execution, and
//! serving. Entry point is [`PlatformClient`]; [`ProjectScope`] binds a project
//! name for shorter call sites.
//! Invariants:
//! - Responses are capped at [`MAX_RESPONSE_BYTES`].
//! - Waiting is always bounded by a [`PollPolicy`].
//! - Secret values never travel inside entity documents.
//!
//! Security posture: backend responses are untrusted input and are decoded
//! with typed errors; bearer tokens are redacted from debug output.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod key;
pub mod log;
pub mod pipeline;
pub mod poll;
pub mod project;
pub mod runtime;
pub mod secret;
pub mod transfer;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::DeleteOptions;
pub use client::LIST_PAGE_SIZE;
pub use client::ListFilter;
pub use client::MAX_RESPONSE_BYTES;
pub use client::PlatformClient;
pub use config::ClientConfig;
pub use config::DEFAULT_ENDPOINT;
pub use entity::Entity;
pub use entity::EntityDocument;
pub use entity::EntityRequest;
pub use entity::EntityType;
pub use entity::Metadata;
pub use entity::SourceCode;
pub use error::ClientError;
pub use error::ClientResult;
pub use key::ContextKey;
pub use key::EntityKey;
pub use key::EntityRef;
pub use log::LogOptions;
pub use log::LogSource;
pub use log::Table;
pub use log::sha256_label;
pub use pipeline::ContainerKind;
pub use pipeline::ParamSource;
pub use pipeline::Pipeline;
pub use pipeline::PipelineDefinition;
pub use pipeline::PipelineError;
pub use pipeline::Step;
pub use pipeline::StepRef;
pub use poll::PollPolicy;
pub use poll::Probe;
pub use poll::poll_until;
pub use project::ProjectScope;
pub use reqwest::Method;
pub use runtime::InvokeRequest;
pub use runtime::InvokeResponse;
pub use runtime::RunOptions;
pub use runtime::RunState;
pub use runtime::action_of;
pub use runtime::task_string;
pub use transfer::export_file_name;
