//! Persisted workflow session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MoveMintError, Result};

/// Step of the upload → analysis → license → minting workflow.
///
/// Variants are declared in workflow order, so `Ord` follows the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStep {
    Upload,
    Analysis,
    Results,
    License,
    Minting,
    Complete,
}

impl WorkflowStep {
    pub const ALL: [Self; 6] = [
        Self::Upload,
        Self::Analysis,
        Self::Results,
        Self::License,
        Self::Minting,
        Self::Complete,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Analysis => "analysis",
            Self::Results => "results",
            Self::License => "license",
            Self::Minting => "minting",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowStep {
    type Err = MoveMintError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == wanted)
            .ok_or_else(|| {
                MoveMintError::ValidationFailed(format!(
                    "invalid workflow step: {s} (expected upload, analysis, results, license, minting, or complete)"
                ))
            })
    }
}

/// Which nested record of a [`WorkflowSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubSessionKind {
    Upload,
    Analysis,
    License,
    Minting,
}

impl SubSessionKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Analysis => "analysis",
            Self::License => "license",
            Self::Minting => "minting",
        }
    }

    /// Step the workflow is on while this record is being filled in.
    #[must_use]
    pub const fn step(&self) -> WorkflowStep {
        match self {
            Self::Upload => WorkflowStep::Upload,
            Self::Analysis => WorkflowStep::Analysis,
            Self::License => WorkflowStep::License,
            Self::Minting => WorkflowStep::Minting,
        }
    }
}

impl std::fmt::Display for SubSessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    #[default]
    Pending,
    Uploading,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MintingStatus {
    #[default]
    Preparing,
    Pending,
    Confirmed,
    Failed,
}

/// Licensing and royalty terms attached to a minted performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseConfig {
    pub license_type: String,
    #[serde(default)]
    pub commercial_use: bool,
    #[serde(default)]
    pub derivatives_allowed: bool,
    #[serde(default = "default_true")]
    pub attribution_required: bool,
    /// Percentage of secondary revenue paid to the creator (0-100).
    #[serde(default)]
    pub royalty_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minting_fee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub territory: Option<String>,
}

const fn default_true() -> bool {
    true
}

impl LicenseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.license_type.trim().is_empty() {
            return Err(MoveMintError::ValidationFailed(
                "licenseType must not be empty".to_string(),
            ));
        }
        if !self.royalty_percentage.is_finite() || !(0.0..=100.0).contains(&self.royalty_percentage) {
            return Err(MoveMintError::ValidationFailed(format!(
                "royaltyPercentage must be between 0 and 100, got {}",
                self.royalty_percentage
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    pub file_name: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(default)]
    pub status: UploadStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl UploadSession {
    pub fn validate(&self) -> Result<()> {
        require_non_empty("upload.fileName", &self.file_name)?;
        if self.status == UploadStatus::Completed {
            match &self.video_id {
                Some(id) => require_non_empty("upload.videoId", id)?,
                None => {
                    return Err(MoveMintError::ValidationFailed(
                        "completed upload is missing videoId".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSession {
    pub video_id: String,
    #[serde(default)]
    pub status: AnalysisStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnalysisSession {
    pub fn validate(&self) -> Result<()> {
        require_non_empty("analysis.videoId", &self.video_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseSession {
    pub video_id: String,
    pub license_config: LicenseConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configured_at: Option<DateTime<Utc>>,
}

impl LicenseSession {
    pub fn validate(&self) -> Result<()> {
        require_non_empty("license.videoId", &self.video_id)?;
        self.license_config.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintingSession {
    pub video_id: String,
    pub nft_title: String,
    pub license_config: LicenseConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nft_description: Option<String>,
    #[serde(default)]
    pub status: MintingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl MintingSession {
    pub fn validate(&self) -> Result<()> {
        require_non_empty("minting.videoId", &self.video_id)?;
        require_non_empty("minting.nftTitle", &self.nft_title)?;
        self.license_config.validate()
    }
}

/// Everything persisted about one pass through the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSession {
    pub session_id: String,
    pub current_step: WorkflowStep,
    pub started_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadSession>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisSession>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<LicenseSession>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minting: Option<MintingSession>,
}

impl WorkflowSession {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            current_step: WorkflowStep::Upload,
            started_at: now,
            last_updated_at: now,
            upload: None,
            analysis: None,
            license: None,
            minting: None,
        }
    }

    /// Top-level required fields only; nested records are checked separately.
    pub fn validate(&self) -> Result<()> {
        require_non_empty("sessionId", &self.session_id)?;
        if self.last_updated_at < self.started_at {
            return Err(MoveMintError::ValidationFailed(
                "lastUpdatedAt is earlier than startedAt".to_string(),
            ));
        }
        Ok(())
    }

    /// Drop nested records that fail their own validation. Returns the kinds
    /// that were dropped.
    pub fn prune_invalid_sub_sessions(&mut self) -> Vec<SubSessionKind> {
        let mut dropped = Vec::new();
        if self.upload.as_ref().is_some_and(|s| s.validate().is_err()) {
            self.upload = None;
            dropped.push(SubSessionKind::Upload);
        }
        if self.analysis.as_ref().is_some_and(|s| s.validate().is_err()) {
            self.analysis = None;
            dropped.push(SubSessionKind::Analysis);
        }
        if self.license.as_ref().is_some_and(|s| s.validate().is_err()) {
            self.license = None;
            dropped.push(SubSessionKind::License);
        }
        if self.minting.as_ref().is_some_and(|s| s.validate().is_err()) {
            self.minting = None;
            dropped.push(SubSessionKind::Minting);
        }
        dropped
    }

    #[must_use]
    pub const fn has_sub_session(&self, kind: SubSessionKind) -> bool {
        match kind {
            SubSessionKind::Upload => self.upload.is_some(),
            SubSessionKind::Analysis => self.analysis.is_some(),
            SubSessionKind::License => self.license.is_some(),
            SubSessionKind::Minting => self.minting.is_some(),
        }
    }

    pub fn clear_sub_session(&mut self, kind: SubSessionKind) {
        match kind {
            SubSessionKind::Upload => self.upload = None,
            SubSessionKind::Analysis => self.analysis = None,
            SubSessionKind::License => self.license = None,
            SubSessionKind::Minting => self.minting = None,
        }
    }

    /// Step a resumed workflow should land on, derived from what has actually
    /// been recorded rather than trusting `current_step` alone.
    #[must_use]
    pub fn resume_step(&self) -> WorkflowStep {
        if let Some(minting) = &self.minting {
            return if minting.status == MintingStatus::Confirmed {
                WorkflowStep::Complete
            } else {
                WorkflowStep::Minting
            };
        }
        if self.license.is_some() {
            return WorkflowStep::Minting;
        }
        if let Some(analysis) = &self.analysis {
            return match analysis.status {
                AnalysisStatus::Completed => {
                    if self.current_step >= WorkflowStep::License {
                        WorkflowStep::License
                    } else {
                        WorkflowStep::Results
                    }
                }
                _ => WorkflowStep::Analysis,
            };
        }
        match &self.upload {
            Some(upload) if upload.status == UploadStatus::Completed => WorkflowStep::Analysis,
            _ => WorkflowStep::Upload,
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MoveMintError::ValidationFailed(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}
