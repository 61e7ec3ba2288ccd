//! Typed client for the Universal Minting Engine endpoints.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError, UploadProgress};
use crate::error::{MoveMintError, Result};
use crate::progress::{OperationOptions, OperationProgress, ProgressTracker, SubStageStatus};
use crate::session::{AnalysisStatus, LicenseConfig};

/// Sub-stages reported by [`MintingEngineClient::wait_for_analysis`].
pub const ANALYSIS_STAGES: [&str; 2] = ["queued", "processing"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl HealthStatus {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.to_ascii_lowercase().as_str(), "ok" | "healthy" | "up")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub video_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisState {
    pub video_id: String,
    pub status: AnalysisStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub config: LicenseConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRequest {
    pub video_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub license: LicenseConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedMetadata {
    pub metadata_uri: String,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateList {
    templates: Vec<LicenseTemplate>,
}

#[derive(Debug)]
pub struct MintingEngineClient {
    api: ApiClient,
}

impl MintingEngineClient {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn health(&self) -> Result<HealthStatus> {
        self.api.get("/api/health")
    }

    pub fn upload_video(&self, path: &Path, progress: Option<UploadProgress>) -> Result<UploadResponse> {
        let response: UploadResponse = self.api.upload_file("/api/videos", "video", path, progress)?;
        if response.video_id.trim().is_empty() {
            return Err(ApiError::invalid_response("upload response has an empty videoId").into());
        }
        info!(video_id = %response.video_id, file = %path.display(), "video uploaded");
        Ok(response)
    }

    pub fn start_analysis(&self, video_id: &str) -> Result<AnalysisState> {
        validate_video_id(video_id)?;
        self.api
            .post("/api/analysis", &serde_json::json!({ "videoId": video_id }))
    }

    pub fn analysis_status(&self, video_id: &str) -> Result<AnalysisState> {
        validate_video_id(video_id)?;
        self.api.get(&format!("/api/analysis/{video_id}"))
    }

    pub fn license_templates(&self) -> Result<Vec<LicenseTemplate>> {
        let list: TemplateList = self.api.get("/api/licenses/templates")?;
        Ok(list.templates)
    }

    pub fn prepare_metadata(&self, request: &MetadataRequest) -> Result<PreparedMetadata> {
        validate_video_id(&request.video_id)?;
        if request.title.trim().is_empty() {
            return Err(MoveMintError::ValidationFailed(
                "NFT title must not be empty".to_string(),
            ));
        }
        request.license.validate()?;
        self.api.post("/api/metadata/prepare", request)
    }

    /// Poll analysis status until it finishes, reporting into `tracker`.
    ///
    /// The operation `op_id` is started if it is not already live. It is
    /// completed on `completed`, failed on `failed`, and failed with a
    /// timeout once `timeout` elapses.
    pub fn wait_for_analysis(
        &self,
        video_id: &str,
        tracker: &mut ProgressTracker,
        op_id: &str,
        interval: Duration,
        timeout: Duration,
    ) -> Result<AnalysisState> {
        validate_video_id(video_id)?;
        if tracker.get(op_id).is_none_or(OperationProgress::is_terminal) {
            tracker.start(
                op_id,
                OperationOptions::new(format!("Analyzing {video_id}")).with_sub_stages(ANALYSIS_STAGES),
            )?;
        }

        let deadline = Instant::now() + timeout;
        loop {
            let state = match self.analysis_status(video_id) {
                Ok(state) => state,
                Err(err) => {
                    tracker.fail(op_id, &err.to_string())?;
                    return Err(err);
                }
            };
            debug!(video_id, status = ?state.status, progress = state.progress, "analysis poll");

            match state.status {
                AnalysisStatus::Completed => {
                    tracker.complete(op_id, Some("Analysis complete"))?;
                    return Ok(state);
                }
                AnalysisStatus::Failed => {
                    let reason = state
                        .error
                        .clone()
                        .unwrap_or_else(|| "analysis failed".to_string());
                    tracker.fail(op_id, &reason)?;
                    return Err(MoveMintError::ValidationFailed(format!(
                        "analysis of {video_id} failed: {reason}"
                    )));
                }
                AnalysisStatus::Pending => {
                    ensure_sub_stage(tracker, op_id, ANALYSIS_STAGES[0])?;
                }
                AnalysisStatus::Processing => {
                    ensure_sub_stage(tracker, op_id, ANALYSIS_STAGES[1])?;
                    tracker.update_sub_stage(op_id, ANALYSIS_STAGES[1], state.progress)?;
                }
            }

            let now = Instant::now();
            if now >= deadline {
                let message = format!("analysis of {video_id} did not finish within {timeout:?}");
                tracker.fail(op_id, &message)?;
                return Err(MoveMintError::Timeout(message));
            }
            std::thread::sleep(interval.min(deadline - now));
        }
    }
}

fn ensure_sub_stage(tracker: &mut ProgressTracker, op_id: &str, name: &str) -> Result<()> {
    let op = tracker
        .get(op_id)
        .ok_or_else(|| MoveMintError::UnknownOperation(op_id.to_string()))?;
    let Some(index) = op.sub_stages.iter().position(|s| s.name == name) else {
        return Err(MoveMintError::UnknownSubStage {
            operation_id: op_id.to_string(),
            sub_stage: name.to_string(),
        });
    };
    if matches!(
        op.sub_stages[index].status,
        SubStageStatus::Active | SubStageStatus::Completed
    ) {
        return Ok(());
    }
    // Engines may go straight to processing; skipped stages count as done.
    let skipped: Vec<String> = op.sub_stages[..index]
        .iter()
        .filter(|s| s.status == SubStageStatus::Pending)
        .map(|s| s.name.clone())
        .collect();
    for stage in &skipped {
        tracker.complete_sub_stage(op_id, stage)?;
    }
    tracker.start_sub_stage(op_id, name).map(|_| ())
}

fn validate_video_id(video_id: &str) -> Result<()> {
    let valid = !video_id.is_empty()
        && video_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(MoveMintError::ValidationFailed(format!(
            "invalid video id '{video_id}'"
        )))
    }
}
