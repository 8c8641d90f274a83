//! Common test utilities for Conductor integration tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

/// Isolated home directory holding `.conductor`
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub data_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempdir()?;
        let data_dir = temp_dir.path().join(".conductor");
        std::fs::create_dir_all(&data_dir)?;

        Ok(Self { temp_dir, data_dir })
    }

    pub fn data_file(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("data").join("data.db")
    }

    /// Conductor command with HOME pointed at the test environment and no
    /// keys leaking in from the caller's environment
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_conductor"));
        cmd.env("HOME", self.temp_dir.path());
        cmd.env_remove("OPENROUTER_API_KEY");
        cmd.env_remove("OPENAI_API_KEY");
        cmd.env_remove("SERPAPI_API_KEY");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// Config pointing every agent at `api_base`
    pub fn create_config(&self, api_base: &str) -> anyhow::Result<()> {
        let config = serde_json::json!({
            "providers": {
                "openai": {"api_key": "test-api-key", "api_base": api_base}
            },
            "eval": {"concurrency": 2, "judge_model": "test/judge"}
        });
        std::fs::write(
            self.data_file("config.json"),
            serde_json::to_string_pretty(&config)?,
        )?;
        Ok(())
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
