use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use httpmock::MockServer;
use movemint::api::{ApiClient, RetryPolicy};
use movemint::engine::MintingEngineClient;
use serde_json::Value;
use tempfile::TempDir;

/// Retry policy with millisecond delays so retry tests stay fast.
pub fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
        jitter_factor: 0.0,
    }
}

pub fn api_client(server: &MockServer, max_retries: u32) -> ApiClient {
    ApiClient::new(&server.base_url(), Duration::from_secs(5))
        .unwrap()
        .with_retry_policy(fast_retry(max_retries))
}

pub fn engine(server: &MockServer) -> MintingEngineClient {
    MintingEngineClient::new(api_client(server, 2))
}

/// Output captured from one CLI invocation.
#[derive(Debug)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|err| panic!("stdout is not JSON ({err}):\n{}", self.stdout))
    }
}

/// Isolated project root plus a mock engine for end-to-end CLI runs.
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub session_dir: PathBuf,
    pub server: MockServer,
}

impl TestFixture {
    pub fn new(test_name: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let session_dir = root.join("sessions");
        let server = MockServer::start();

        let config = format!(
            "[api]\nbase_url = \"{}\"\ntimeout = \"5s\"\n\n[retry]\nmax_retries = 1\ninitial_delay = \"1ms\"\nmax_delay = \"5ms\"\n\n[polling]\ninterval = \"10ms\"\ntimeout = \"2s\"\n",
            server.base_url()
        );
        std::fs::write(root.join("config.toml"), config).expect("Failed to write config");

        println!("[FIXTURE] Test: {test_name}");
        println!("[FIXTURE] Root: {}", root.display());
        println!("[FIXTURE] Engine: {}", server.base_url());

        Self {
            temp_dir,
            root,
            session_dir,
            server,
        }
    }

    /// Write a small fake video under the project root.
    pub fn video(&self, name: &str) -> PathBuf {
        let path = self.root.join(name);
        std::fs::write(&path, b"\x00\x00\x00\x18ftypmp42fake-dance-video").expect("Failed to write video");
        path
    }

    pub fn run(&self, args: &[&str]) -> CommandOutput {
        let output = Command::new(env!("CARGO_BIN_EXE_movemint"))
            .env("MOVEMINT_CONFIG", self.root.join("config.toml"))
            .env("MOVEMINT_SESSION_DIR", &self.session_dir)
            .env_remove("MOVEMINT_ROBOT")
            .env_remove("MOVEMINT_API_KEY")
            .env_remove("RUST_LOG")
            .arg("--root")
            .arg(&self.root)
            .args(args)
            .output()
            .expect("Failed to run movemint");

        let result = CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        println!("[RUN] movemint {}", args.join(" "));
        if !result.success {
            println!("[RUN] stderr:\n{}", result.stderr);
        }
        result
    }
}
