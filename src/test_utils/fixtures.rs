//! Sample workflow records for tests.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use crate::session::{
    AnalysisSession, AnalysisStatus, LicenseConfig, LicenseSession, MintingSession, MintingStatus,
    UploadSession, UploadStatus, WorkflowSession,
};

/// Isolated directory for file-backed stores and fake videos.
pub struct TempWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl TempWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        Self { temp_dir, root }
    }

    /// Write a small fake video file and return its path.
    pub fn video(&self, name: &str) -> PathBuf {
        let path = self.root.join(name);
        std::fs::write(&path, b"\x00\x00\x00\x18ftypmp42fake-dance-video").expect("Failed to write video");
        path
    }
}

impl Default for TempWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

pub fn license_config() -> LicenseConfig {
    LicenseConfig {
        license_type: "commercial-remix".to_string(),
        commercial_use: true,
        derivatives_allowed: true,
        attribution_required: true,
        royalty_percentage: 5.0,
        minting_fee: Some("0.01".to_string()),
        territory: None,
    }
}

pub fn workflow_session(now: DateTime<Utc>) -> WorkflowSession {
    WorkflowSession::new(now)
}

pub fn completed_upload(video_id: &str) -> UploadSession {
    UploadSession {
        file_name: "routine.mp4".to_string(),
        file_size: 4_194_304,
        video_id: Some(video_id.to_string()),
        status: UploadStatus::Completed,
        progress: 100.0,
        uploaded_at: Some(Utc::now()),
    }
}

pub fn completed_analysis(video_id: &str) -> AnalysisSession {
    AnalysisSession {
        video_id: video_id.to_string(),
        status: AnalysisStatus::Completed,
        progress: 100.0,
        results: Some(serde_json::json!({ "danceStyle": "hip-hop", "confidence": 0.92 })),
        error: None,
        started_at: Some(Utc::now()),
        completed_at: Some(Utc::now()),
    }
}

pub fn license_session(video_id: &str) -> LicenseSession {
    LicenseSession {
        video_id: video_id.to_string(),
        license_config: license_config(),
        template_id: Some("commercial-remix".to_string()),
        configured_at: Some(Utc::now()),
    }
}

pub fn minting_session(video_id: &str) -> MintingSession {
    MintingSession {
        video_id: video_id.to_string(),
        nft_title: "Rooftop Freestyle".to_string(),
        license_config: license_config(),
        nft_description: Some("One take, golden hour".to_string()),
        status: MintingStatus::Preparing,
        transaction_hash: None,
        token_id: None,
        started_at: Some(Utc::now()),
    }
}
