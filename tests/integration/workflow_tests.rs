//! End-to-end CLI runs: upload, analyze and resume against a mock engine.

use httpmock::prelude::*;
use serde_json::json;

use super::fixture::TestFixture;

fn mock_upload(fixture: &TestFixture, video_id: &str) {
    let body = json!({ "videoId": video_id });
    fixture.server.mock(|when, then| {
        when.method(POST).path("/api/videos");
        then.status(201).json_body(body);
    });
}

fn mock_analysis_completed(fixture: &TestFixture, video_id: &str) {
    let started = json!({ "videoId": video_id, "status": "pending" });
    let finished = json!({
        "videoId": video_id,
        "status": "completed",
        "progress": 100,
        "results": { "danceStyle": "krump" }
    });
    fixture.server.mock(|when, then| {
        when.method(POST)
            .path("/api/analysis")
            .json_body(json!({ "videoId": video_id }));
        then.status(202).json_body(started);
    });
    fixture.server.mock(|when, then| {
        when.method(GET).path(format!("/api/analysis/{video_id}"));
        then.status(200).json_body(finished);
    });
}

#[test]
fn test_health_robot_output() {
    let fixture = TestFixture::new("test_health_robot_output");
    fixture.server.mock(|when, then| {
        when.method(GET).path("/api/health");
        then.status(200).json_body(json!({ "status": "ok", "version": "3.1.0" }));
    });

    let output = fixture.run(&["--robot", "health"]);
    assert!(output.success, "health failed: {}", output.stderr);
    let json = output.json();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["data"]["healthy"], true);
    assert_eq!(json["data"]["version"], "3.1.0");
}

#[test]
fn test_health_failure_carries_action() {
    let fixture = TestFixture::new("test_health_failure_carries_action");
    fixture.server.mock(|when, then| {
        when.method(GET).path("/api/health");
        then.status(500).json_body(json!({ "error": "database offline" }));
    });

    let output = fixture.run(&["--robot", "health"]);
    assert!(!output.success);
    let error = &output.json()["status"]["error"];
    assert_eq!(error["code"], "API_SERVER_ERROR");
    assert_eq!(error["action"], "retry");
}

#[test]
fn test_upload_then_analyze_resumes_at_results() {
    let fixture = TestFixture::new("test_upload_then_analyze_resumes_at_results");
    mock_upload(&fixture, "vid-100");
    mock_analysis_completed(&fixture, "vid-100");
    fixture.video("routine.mp4");

    let upload = fixture.run(&["--robot", "upload", "routine.mp4"]);
    assert!(upload.success, "upload failed: {}", upload.stderr);
    let upload_json = upload.json();
    assert_eq!(upload_json["data"]["video_id"], "vid-100");
    assert_eq!(upload_json["data"]["next_step"], "analysis");
    // progress lines go to stderr in robot mode
    assert!(upload.stderr.contains("\"type\""));

    let analyze = fixture.run(&["--robot", "analyze"]);
    assert!(analyze.success, "analyze failed: {}", analyze.stderr);
    let analyze_json = analyze.json();
    assert_eq!(analyze_json["data"]["status"], "completed");
    assert_eq!(analyze_json["data"]["results"]["danceStyle"], "krump");

    let resume = fixture.run(&["--robot", "session", "resume"]);
    assert!(resume.success, "resume failed: {}", resume.stderr);
    let resume_json = resume.json();
    assert_eq!(resume_json["data"]["step"], "results");
    assert_eq!(resume_json["data"]["video_id"], "vid-100");

    let show = fixture.run(&["--robot", "session", "show"]);
    let session = &show.json()["data"]["session"];
    assert_eq!(session["upload"]["status"], "completed");
    assert_eq!(session["analysis"]["progress"], 100.0);
}

#[test]
fn test_failed_upload_is_recorded() {
    let fixture = TestFixture::new("test_failed_upload_is_recorded");
    fixture.server.mock(|when, then| {
        when.method(POST).path("/api/videos");
        then.status(413).json_body(json!({ "message": "video exceeds 500MB" }));
    });
    fixture.video("huge.mp4");

    let upload = fixture.run(&["upload", "huge.mp4"]);
    assert!(!upload.success);
    assert!(upload.stderr.contains("video exceeds 500MB") || upload.stderr.contains("too large"));

    let show = fixture.run(&["--robot", "session", "show"]);
    assert!(show.success, "show failed: {}", show.stderr);
    let session = &show.json()["data"]["session"];
    assert_eq!(session["upload"]["status"], "failed");
    assert_eq!(show.json()["data"]["resume_step"], "upload");
}

#[test]
fn test_analyze_no_wait_leaves_analysis_step() {
    let fixture = TestFixture::new("test_analyze_no_wait_leaves_analysis_step");
    let body = json!({ "videoId": "vid-5", "status": "processing", "progress": 10 });
    fixture.server.mock(|when, then| {
        when.method(POST).path("/api/analysis");
        then.status(202).json_body(body);
    });

    let output = fixture.run(&["--robot", "analyze", "vid-5", "--no-wait"]);
    assert!(output.success, "analyze failed: {}", output.stderr);
    assert_eq!(output.json()["data"]["status"], "processing");

    let resume = fixture.run(&["--robot", "session", "resume"]);
    assert_eq!(resume.json()["data"]["step"], "analysis");
    assert_eq!(resume.json()["data"]["next"], "movemint analyze vid-5");
}

#[test]
fn test_templates_human_output() {
    let fixture = TestFixture::new("test_templates_human_output");
    fixture.server.mock(|when, then| {
        when.method(GET).path("/api/licenses/templates");
        then.status(200).json_body(json!({
            "templates": [{
                "id": "remix",
                "name": "Commercial Remix",
                "description": "Remix with royalties",
                "config": {
                    "licenseType": "commercial-remix",
                    "commercialUse": true,
                    "derivativesAllowed": true,
                    "royaltyPercentage": 5
                }
            }]
        }));
    });

    let output = fixture.run(&["templates"]);
    assert!(output.success, "templates failed: {}", output.stderr);
    assert!(output.stdout.contains("Commercial Remix"));
    assert!(output.stdout.contains("5%"));
}
