// crates/digitalhub-client/src/client/tests.rs
// ============================================================================
// Module: Platform Client Tests
// Description: Unit tests for paged list responses.
// Purpose: Ensure paging follows the server's `last` marker.
// Dependencies: digitalhub-client, serde_json
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use serde_json::json;

use super::Page;

fn page(value: serde_json::Value) -> Page {
    serde_json::from_value(value).unwrap()
}

#[test]
fn short_pages_continue_while_the_server_reports_more() {
    let capped = page(json!({ "content": [{ "id": "a" }, { "id": "b" }], "last": false }));
    assert!(!capped.is_final(100));
}

#[test]
fn last_marker_ends_paging_even_on_full_pages() {
    let full = page(json!({ "content": [{ "id": "a" }, { "id": "b" }], "last": true }));
    assert!(full.is_final(2));
}

#[test]
fn pages_without_a_marker_end_when_short() {
    let short = page(json!({ "content": [{ "id": "a" }] }));
    assert!(short.is_final(2));
    let full = page(json!({ "content": [{ "id": "a" }, { "id": "b" }] }));
    assert!(!full.is_final(2));
    assert!(page(json!({})).is_final(2));
}
