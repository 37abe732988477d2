#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-ID project fetching.
//!
//! Provides the [`Fetcher`] trait the crawl engine drives, and
//! [`HttpFetcher`](http::HttpFetcher), which issues one bounded-time GET
//! against the Scratch projects API per ID.
//!
//! A fetch never fails from the caller's point of view: every error is
//! collapsed into [`FetchOutcome::Absent`] so that one bad ID cannot abort a
//! crawl. [`FetchError`] exists only to describe *why* an ID was absent in
//! the logs.

pub mod http;

use scratch_top_models::{FetchOutcome, Record};

pub use http::HttpFetcher;

/// Reasons a single fetch did not produce a record.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request failed at the transport level (connect, timeout, body).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP status {0}")]
    Status(reqwest::StatusCode),

    /// The payload is missing a required field or has the wrong type.
    #[error("payload missing '{0}'")]
    MissingField(&'static str),
}

/// Fetches a single project by ID.
///
/// Implementations must be `Send + Sync` so one instance can be shared by
/// every in-flight fetch of a chunk. They must issue at most one request
/// per call and must not retry.
pub trait Fetcher: Send + Sync {
    /// Fetches `id`, mapping every failure to [`FetchOutcome::Absent`].
    fn fetch(&self, id: u64) -> impl std::future::Future<Output = FetchOutcome> + Send;
}

/// Maps a project payload to a [`Record`] tagged with the requested `id`.
///
/// Any `id` echoed inside the payload is ignored.
///
/// # Errors
///
/// Returns [`FetchError::MissingField`] if `title`, `author.username`, or a
/// non-negative integer `stats.views` is missing.
pub fn parse_project(id: u64, body: &serde_json::Value) -> Result<Record, FetchError> {
    let title = body
        .pointer("/title")
        .and_then(serde_json::Value::as_str)
        .ok_or(FetchError::MissingField("title"))?;

    let creator = body
        .pointer("/author/username")
        .and_then(serde_json::Value::as_str)
        .ok_or(FetchError::MissingField("author.username"))?;

    let views = body
        .pointer("/stats/views")
        .and_then(serde_json::Value::as_u64)
        .ok_or(FetchError::MissingField("stats.views"))?;

    Ok(Record {
        id,
        title: title.to_owned(),
        creator: creator.to_owned(),
        views,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_payload_fields() {
        let body = serde_json::json!({
            "id": 104,
            "title": "Pong Starter",
            "author": { "id": 5, "username": "griffpatch" },
            "stats": { "views": 1_234_567, "loves": 10, "favorites": 3 }
        });

        let record = parse_project(104, &body).unwrap();
        assert_eq!(
            record,
            Record {
                id: 104,
                title: "Pong Starter".to_owned(),
                creator: "griffpatch".to_owned(),
                views: 1_234_567,
            }
        );
    }

    #[test]
    fn uses_requested_id_not_payload_id() {
        let body = serde_json::json!({
            "id": 999,
            "title": "Mismatch",
            "author": { "username": "someone" },
            "stats": { "views": 3 }
        });

        assert_eq!(parse_project(42, &body).unwrap().id, 42);
    }

    #[test]
    fn rejects_missing_fields() {
        let cases = [
            (
                serde_json::json!({ "author": { "username": "a" }, "stats": { "views": 1 } }),
                "title",
            ),
            (
                serde_json::json!({ "title": "t", "author": {}, "stats": { "views": 1 } }),
                "author.username",
            ),
            (
                serde_json::json!({ "title": "t", "author": { "username": "a" } }),
                "stats.views",
            ),
        ];

        for (body, field) in cases {
            let err = parse_project(1, &body).unwrap_err();
            assert!(matches!(err, FetchError::MissingField(f) if f == field));
        }
    }

    #[test]
    fn rejects_wrongly_typed_fields() {
        let negative = serde_json::json!({
            "title": "t", "author": { "username": "a" }, "stats": { "views": -5 }
        });
        let stringly = serde_json::json!({
            "title": "t", "author": { "username": "a" }, "stats": { "views": "12" }
        });
        let numeric_title = serde_json::json!({
            "title": 7, "author": { "username": "a" }, "stats": { "views": 12 }
        });

        assert!(parse_project(1, &negative).is_err());
        assert!(parse_project(1, &stringly).is_err());
        assert!(parse_project(1, &numeric_title).is_err());
        assert!(parse_project(1, &serde_json::Value::Null).is_err());
    }
}
