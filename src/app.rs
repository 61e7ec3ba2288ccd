//! Shared state handed to every command.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::api::ApiClient;
use crate::cli::Cli;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::engine::MintingEngineClient;
use crate::error::{MoveMintError, Result};
use crate::session::SessionService;
use crate::storage::FileStore;

pub struct AppContext {
    pub root: PathBuf,
    pub config: Config,
    pub config_path: Option<PathBuf>,
    pub robot_mode: bool,
    pub quiet: bool,
    pub sessions: SessionService,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let root = match &cli.root {
            Some(root) => root.clone(),
            None => std::env::current_dir().map_err(|err| {
                MoveMintError::Config(format!("resolve working directory: {err}"))
            })?,
        };
        let config = Config::load(cli.config.as_deref(), &root)?;
        Self::with_config(root, config, cli.config.clone(), cli.robot, cli.quiet)
    }

    pub fn with_config(
        root: PathBuf,
        config: Config,
        config_path: Option<PathBuf>,
        robot_mode: bool,
        quiet: bool,
    ) -> Result<Self> {
        let session_dir = config.session_dir()?;
        debug!(root = %root.display(), sessions = %session_dir.display(), "app context");
        let store = FileStore::open(&session_dir)?;
        let sessions = SessionService::new(
            Arc::new(store),
            Arc::new(SystemClock),
            config.session_max_age(),
        );
        Ok(Self {
            root,
            config,
            config_path,
            robot_mode,
            quiet,
            sessions,
        })
    }

    /// Engine client built from the `api` and `retry` sections.
    pub fn engine(&self) -> Result<MintingEngineClient> {
        let mut api = ApiClient::new(&self.config.api.base_url, self.config.api.timeout)?
            .with_upload_timeout(self.config.api.upload_timeout)
            .with_retry_policy(self.config.retry_policy())
            .with_token(self.config.api.api_key.clone());
        if let Some(user_agent) = &self.config.api.user_agent {
            api = api.with_user_agent(user_agent)?;
        }
        Ok(MintingEngineClient::new(api))
    }

    /// Resolve a user-supplied path against the project root.
    #[must_use]
    pub fn resolve(&self, path: &std::path::Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
