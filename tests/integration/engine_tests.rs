//! Typed engine client against mocked endpoints.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use httpmock::prelude::*;
use movemint::MoveMintError;
use movemint::api::UploadProgress;
use movemint::engine::{ANALYSIS_STAGES, MetadataRequest};
use movemint::progress::{ProgressTracker, SubStageStatus};
use movemint::session::{AnalysisStatus, LicenseConfig};
use serde_json::json;
use tempfile::TempDir;

use super::fixture::engine;

fn license() -> LicenseConfig {
    LicenseConfig {
        license_type: "commercial-remix".to_string(),
        commercial_use: true,
        derivatives_allowed: true,
        attribution_required: true,
        royalty_percentage: 5.0,
        minting_fee: None,
        territory: None,
    }
}

#[test]
fn health_reports_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/health");
        then.status(200).json_body(json!({ "status": "healthy", "version": "2.0.1" }));
    });

    let health = engine(&server).health().unwrap();
    assert!(health.is_healthy());
    assert_eq!(health.version.as_deref(), Some("2.0.1"));
}

#[test]
fn upload_sends_multipart_and_reports_bytes() {
    let dir = TempDir::new().unwrap();
    let video = dir.path().join("routine.mp4");
    std::fs::write(&video, b"fake-dance-video-bytes").unwrap();

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/videos")
            .header_exists("content-type")
            .body_includes("fake-dance-video-bytes")
            .body_includes("routine.mp4");
        then.status(201).json_body(json!({
            "videoId": "vid-42",
            "fileName": "routine.mp4",
            "fileSize": 22
        }));
    });

    let sent = Arc::new(AtomicU64::new(0));
    let progress: UploadProgress = {
        let sent = Arc::clone(&sent);
        Arc::new(move |bytes: u64, _total: u64| {
            sent.store(bytes, Ordering::SeqCst);
        })
    };

    let response = engine(&server).upload_video(&video, Some(progress)).unwrap();
    mock.assert();
    assert_eq!(response.video_id, "vid-42");
    assert_eq!(sent.load(Ordering::SeqCst), 22);
}

#[test]
fn upload_rejects_empty_video_id() {
    let dir = TempDir::new().unwrap();
    let video = dir.path().join("routine.mp4");
    std::fs::write(&video, b"bytes").unwrap();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/videos");
        then.status(200).json_body(json!({ "videoId": "  " }));
    });

    let err = engine(&server).upload_video(&video, None).unwrap_err();
    assert!(matches!(err, MoveMintError::Api(_)));
}

#[test]
fn templates_unwrap_list() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/licenses/templates");
        then.status(200).json_body(json!({
            "templates": [{
                "id": "cc-by",
                "name": "Attribution",
                "config": { "licenseType": "cc-by", "royaltyPercentage": 0 }
            }]
        }));
    });

    let templates = engine(&server).license_templates().unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].config.license_type, "cc-by");
    assert!(templates[0].config.attribution_required);
}

#[test]
fn prepare_metadata_validates_before_sending() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/api/metadata/prepare");
        then.status(200).json_body(json!({ "metadataUri": "ipfs://meta" }));
    });

    let mut bad = license();
    bad.royalty_percentage = 150.0;
    let request = MetadataRequest {
        video_id: "vid-1".to_string(),
        title: "Spin".to_string(),
        description: None,
        license: bad,
    };
    assert!(engine(&server).prepare_metadata(&request).is_err());
    mock.assert_calls(0);

    let request = MetadataRequest {
        license: license(),
        ..request
    };
    let prepared = engine(&server).prepare_metadata(&request).unwrap();
    assert_eq!(prepared.metadata_uri, "ipfs://meta");
    mock.assert_calls(1);
}

#[test]
fn wait_for_analysis_completes_operation() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/analysis/vid-7");
        then.status(200).json_body(json!({
            "videoId": "vid-7",
            "status": "completed",
            "progress": 100,
            "results": { "poses": 31 }
        }));
    });

    let mut tracker = ProgressTracker::default();
    let state = engine(&server)
        .wait_for_analysis(
            "vid-7",
            &mut tracker,
            "analysis",
            Duration::from_millis(5),
            Duration::from_secs(2),
        )
        .unwrap();

    assert_eq!(state.status, AnalysisStatus::Completed);
    assert_eq!(state.results.unwrap()["poses"], 31);
    let op = tracker.get("analysis").unwrap();
    assert!(op.is_terminal());
    assert_eq!(op.percentage, 100.0);
}

#[test]
fn wait_for_analysis_times_out_while_processing() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/api/analysis/vid-8");
        then.status(200).json_body(json!({
            "videoId": "vid-8",
            "status": "processing",
            "progress": 40
        }));
    });

    let mut tracker = ProgressTracker::default();
    let err = engine(&server)
        .wait_for_analysis(
            "vid-8",
            &mut tracker,
            "analysis",
            Duration::from_millis(10),
            Duration::from_millis(60),
        )
        .unwrap_err();

    assert!(matches!(err, MoveMintError::Timeout(_)));
    assert!(mock.calls() >= 2);
    let op = tracker.get("analysis").unwrap();
    assert!(op.is_terminal());
    assert!(op.error.as_deref().is_some_and(|e| e.contains("vid-8")));
    // queued was skipped and counts as done
    assert_eq!(op.sub_stages[0].name, ANALYSIS_STAGES[0]);
    assert_eq!(op.sub_stages[0].status, SubStageStatus::Completed);
}

#[test]
fn wait_for_analysis_surfaces_engine_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/analysis/vid-9");
        then.status(200).json_body(json!({
            "videoId": "vid-9",
            "status": "failed",
            "error": "no dancer detected"
        }));
    });

    let mut tracker = ProgressTracker::default();
    let err = engine(&server)
        .wait_for_analysis(
            "vid-9",
            &mut tracker,
            "analysis",
            Duration::from_millis(5),
            Duration::from_secs(1),
        )
        .unwrap_err();

    assert!(err.to_string().contains("no dancer detected"));
    assert_eq!(
        tracker.get("analysis").unwrap().error.as_deref(),
        Some("no dancer detected")
    );
}

#[test]
fn invalid_video_id_never_hits_the_network() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/api/analysis");
        then.status(200);
    });

    let err = engine(&server).start_analysis("../etc/passwd").unwrap_err();
    assert!(matches!(err, MoveMintError::ValidationFailed(_)));
    mock.assert_calls(0);
}
