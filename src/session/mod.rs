//! Workflow session persistence.
//!
//! A [`WorkflowSession`] survives restarts so an interrupted
//! upload → analysis → license → minting run can be resumed. Loading is
//! forgiving:
//!
//! - expired sessions (idle longer than `max_age`, 24h by default) are discarded
//! - malformed JSON or missing required fields count as "no session" and the
//!   stored value is removed
//! - a nested record that fails validation is dropped on its own; the rest of
//!   the workflow survives
//!
//! None of these cases surface as errors to the caller.

mod types;

use std::sync::Arc;

use chrono::TimeDelta;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{MoveMintError, Result};
use crate::storage::KeyValueStore;

pub use types::{
    AnalysisSession, AnalysisStatus, LicenseConfig, LicenseSession, MintingSession, MintingStatus,
    SubSessionKind, UploadSession, UploadStatus, WorkflowSession, WorkflowStep,
};

/// Storage key holding the serialized session.
pub const SESSION_KEY: &str = "movemint_workflow_session";

/// Idle time after which a session is discarded.
#[must_use]
pub fn default_max_age() -> TimeDelta {
    TimeDelta::hours(24)
}

/// Session record with nested records left untyped, so one bad nested record
/// does not sink the whole session.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    session_id: String,
    current_step: WorkflowStep,
    started_at: chrono::DateTime<chrono::Utc>,
    last_updated_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    upload: Option<Value>,
    #[serde(default)]
    analysis: Option<Value>,
    #[serde(default)]
    license: Option<Value>,
    #[serde(default)]
    minting: Option<Value>,
}

impl StoredSession {
    fn into_session(self) -> (WorkflowSession, Vec<SubSessionKind>) {
        let mut dropped = Vec::new();
        let mut session = WorkflowSession {
            session_id: self.session_id,
            current_step: self.current_step,
            started_at: self.started_at,
            last_updated_at: self.last_updated_at,
            upload: nested(self.upload, SubSessionKind::Upload, &mut dropped),
            analysis: nested(self.analysis, SubSessionKind::Analysis, &mut dropped),
            license: nested(self.license, SubSessionKind::License, &mut dropped),
            minting: nested(self.minting, SubSessionKind::Minting, &mut dropped),
        };
        dropped.extend(session.prune_invalid_sub_sessions());
        (session, dropped)
    }
}

fn nested<T: serde::de::DeserializeOwned>(
    value: Option<Value>,
    kind: SubSessionKind,
    dropped: &mut Vec<SubSessionKind>,
) -> Option<T> {
    match value {
        None | Some(Value::Null) => None,
        Some(value) => match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(sub_session = %kind, error = %e, "dropping malformed sub-session");
                dropped.push(kind);
                None
            }
        },
    }
}

/// Reads and writes the workflow session through a [`KeyValueStore`].
pub struct SessionService {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    max_age: TimeDelta,
}

impl SessionService {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, max_age: TimeDelta) -> Self {
        Self {
            store,
            clock,
            max_age,
        }
    }

    /// Service on the system clock with the default 24h expiry.
    pub fn with_store(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(store, Arc::new(SystemClock), default_max_age())
    }

    #[must_use]
    pub const fn max_age(&self) -> TimeDelta {
        self.max_age
    }

    /// Begin a fresh session, replacing whatever was stored.
    pub fn start_session(&self) -> Result<WorkflowSession> {
        let session = WorkflowSession::new(self.clock.now());
        info!(session_id = %session.session_id, "starting workflow session");
        self.write(&session)?;
        Ok(session)
    }

    /// The stored session, or `None` when there is none, it expired, or it
    /// could not be read.
    pub fn load_session(&self) -> Option<WorkflowSession> {
        let raw = match self.store.get(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "failed to read workflow session");
                return None;
            }
        };

        let stored: StoredSession = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "discarding corrupted workflow session");
                self.discard();
                return None;
            }
        };

        let (session, dropped) = stored.into_session();

        if let Err(e) = session.validate() {
            warn!(error = %e, "discarding invalid workflow session");
            self.discard();
            return None;
        }

        if self.is_expired(&session) {
            info!(
                session_id = %session.session_id,
                last_updated_at = %session.last_updated_at,
                "workflow session expired"
            );
            self.discard();
            return None;
        }

        if !dropped.is_empty() {
            let kinds: Vec<&str> = dropped.iter().map(SubSessionKind::as_str).collect();
            warn!(dropped = ?kinds, "removed invalid sub-sessions");
            if let Err(e) = self.write(&session) {
                warn!(error = %e, "failed to write pruned workflow session");
            }
        }

        debug!(session_id = %session.session_id, step = %session.current_step, "loaded workflow session");
        Some(session)
    }

    /// Persist `session`, stamping `last_updated_at`.
    pub fn save_session(&self, mut session: WorkflowSession) -> Result<WorkflowSession> {
        session.last_updated_at = self.clock.now();
        if session.last_updated_at < session.started_at {
            session.started_at = session.last_updated_at;
        }
        session.validate()?;
        self.write(&session)?;
        Ok(session)
    }

    /// Set the current step of the active session.
    pub fn update_step(&self, step: WorkflowStep) -> Result<WorkflowSession> {
        let mut session = self.load_session().ok_or(MoveMintError::NoActiveSession)?;
        debug!(from = %session.current_step, to = %step, "updating workflow step");
        session.current_step = step;
        self.save_session(session)
    }

    pub fn save_upload(&self, upload: UploadSession) -> Result<WorkflowSession> {
        upload.validate()?;
        self.modify(|session| {
            session.current_step = session.current_step.max(WorkflowStep::Upload);
            session.upload = Some(upload);
        })
    }

    pub fn save_analysis(&self, analysis: AnalysisSession) -> Result<WorkflowSession> {
        analysis.validate()?;
        let step = if analysis.status == AnalysisStatus::Completed {
            WorkflowStep::Results
        } else {
            WorkflowStep::Analysis
        };
        self.modify(|session| {
            session.current_step = session.current_step.max(step);
            session.analysis = Some(analysis);
        })
    }

    pub fn save_license(&self, license: LicenseSession) -> Result<WorkflowSession> {
        license.validate()?;
        self.modify(|session| {
            session.current_step = session.current_step.max(WorkflowStep::License);
            session.license = Some(license);
        })
    }

    pub fn save_minting(&self, minting: MintingSession) -> Result<WorkflowSession> {
        minting.validate()?;
        let step = if minting.status == MintingStatus::Confirmed {
            WorkflowStep::Complete
        } else {
            WorkflowStep::Minting
        };
        self.modify(|session| {
            session.current_step = session.current_step.max(step);
            session.minting = Some(minting);
        })
    }

    #[must_use]
    pub fn upload(&self) -> Option<UploadSession> {
        self.load_session().and_then(|s| s.upload)
    }

    #[must_use]
    pub fn analysis(&self) -> Option<AnalysisSession> {
        self.load_session().and_then(|s| s.analysis)
    }

    #[must_use]
    pub fn license(&self) -> Option<LicenseSession> {
        self.load_session().and_then(|s| s.license)
    }

    #[must_use]
    pub fn minting(&self) -> Option<MintingSession> {
        self.load_session().and_then(|s| s.minting)
    }

    /// Remove one nested record. A missing session is not an error.
    pub fn clear_sub_session(&self, kind: SubSessionKind) -> Result<()> {
        let Some(mut session) = self.load_session() else {
            return Ok(());
        };
        if !session.has_sub_session(kind) {
            return Ok(());
        }
        session.clear_sub_session(kind);
        self.save_session(session)?;
        debug!(sub_session = %kind, "cleared sub-session");
        Ok(())
    }

    /// Remove the stored session entirely.
    pub fn clear_session(&self) -> Result<()> {
        self.store.remove(SESSION_KEY)?;
        info!("cleared workflow session");
        Ok(())
    }

    #[must_use]
    pub fn has_active_session(&self) -> bool {
        self.load_session().is_some()
    }

    /// Time since the active session started.
    #[must_use]
    pub fn session_age(&self) -> Option<TimeDelta> {
        self.load_session()
            .map(|session| self.clock.now() - session.started_at)
    }

    /// Time left before the active session expires from inactivity.
    #[must_use]
    pub fn time_until_expiry(&self) -> Option<TimeDelta> {
        self.load_session().map(|session| {
            let idle = self.clock.now() - session.last_updated_at;
            self.max_age
                .checked_sub(&idle)
                .unwrap_or(TimeDelta::MAX)
                .max(TimeDelta::zero())
        })
    }

    /// Step a resumed workflow should continue from.
    #[must_use]
    pub fn resume_step(&self) -> Option<WorkflowStep> {
        self.load_session().map(|session| session.resume_step())
    }

    /// Drop the stored session if it is expired or unreadable. Returns `true`
    /// when something was removed.
    pub fn cleanup_expired(&self) -> Result<bool> {
        if self.store.get(SESSION_KEY)?.is_none() {
            return Ok(false);
        }
        match self.load_session() {
            Some(_) => Ok(false),
            // A failed discard leaves the entry behind.
            None => Ok(self.store.get(SESSION_KEY)?.is_none()),
        }
    }

    fn is_expired(&self, session: &WorkflowSession) -> bool {
        self.clock.now() - session.last_updated_at > self.max_age
    }

    fn modify<F>(&self, apply: F) -> Result<WorkflowSession>
    where
        F: FnOnce(&mut WorkflowSession),
    {
        let mut session = self
            .load_session()
            .unwrap_or_else(|| WorkflowSession::new(self.clock.now()));
        apply(&mut session);
        self.save_session(session)
    }

    fn write(&self, session: &WorkflowSession) -> Result<()> {
        let json = serde_json::to_string(session)?;
        self.store.set(SESSION_KEY, &json)
    }

    fn discard(&self) {
        if let Err(e) = self.store.remove(SESSION_KEY) {
            warn!(error = %e, "failed to remove workflow session");
        }
    }
}
