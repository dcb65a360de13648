//! Shared setup for the HTTP integration tests.
//!
//! Each test app gets its own temp directory and a fake compressor, so no Ghostscript
//! binary is needed.

#![allow(dead_code)]

pub mod fixtures;

use async_trait::async_trait;
use axum_test::{TestResponse, TestServer};
use pdfpress_api::setup::routes::setup_routes;
use pdfpress_api::AppState;
use pdfpress_core::{AuthConfig, BaseConfig, CompressionSettings, Config, ServiceConfig};
use pdfpress_processing::{CompressionError, PdfCompressor, TempStore};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const TEST_PASSWORD: &str = "correct-horse-battery-staple";
pub const DEFAULT_MAX_UPLOAD: usize = 50 * 1024 * 1024;

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    _temp_dir: TempDir,
}

impl TestApp {
    pub fn temp_root(&self) -> &Path {
        self.state.temp_store.root()
    }

    /// Number of files left in the temp directory
    pub fn leftover_files(&self) -> usize {
        std::fs::read_dir(self.temp_root())
            .map(|entries| entries.filter_map(Result::ok).count())
            .unwrap_or(0)
    }
}

/// Copies the input to the output path, like a compressor that changes nothing.
#[derive(Default)]
pub struct CopyCompressor;

#[async_trait]
impl PdfCompressor for CopyCompressor {
    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        _settings: &CompressionSettings,
    ) -> Result<(), CompressionError> {
        tokio::fs::copy(input, output)
            .await
            .map_err(|source| CompressionError::Launch {
                program: "copy".to_string(),
                source,
            })?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "copy"
    }
}

/// Writes a fixed body and records every call.
#[derive(Default)]
pub struct RecordingCompressor {
    pub calls: Mutex<Vec<(PathBuf, CompressionSettings)>>,
}

impl RecordingCompressor {
    pub const OUTPUT: &'static [u8] = b"%PDF-1.4\n%compressed\n%%EOF\n";

    pub fn calls(&self) -> Vec<(PathBuf, CompressionSettings)> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }
}

#[async_trait]
impl PdfCompressor for RecordingCompressor {
    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        settings: &CompressionSettings,
    ) -> Result<(), CompressionError> {
        assert!(input.exists(), "input must be written before compressing");
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push((input.to_path_buf(), *settings));
        // Give concurrent requests a chance to overlap
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        tokio::fs::write(output, Self::OUTPUT)
            .await
            .map_err(CompressionError::ReadOutput)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Fails like a compressor exiting with an error status.
pub struct FailingCompressor;

#[async_trait]
impl PdfCompressor for FailingCompressor {
    async fn compress(
        &self,
        _input: &Path,
        output: &Path,
        _settings: &CompressionSettings,
    ) -> Result<(), CompressionError> {
        // Leave a partial output behind
        let _ = tokio::fs::write(output, b"%PDF-partial").await;
        Err(CompressionError::ExitStatus {
            code: Some(1),
            stderr: "Error: /undefined in /BT".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Reports success without writing anything.
pub struct NoOutputCompressor;

#[async_trait]
impl PdfCompressor for NoOutputCompressor {
    async fn compress(
        &self,
        _input: &Path,
        _output: &Path,
        _settings: &CompressionSettings,
    ) -> Result<(), CompressionError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "no-output"
    }
}

pub struct PanickingCompressor;

#[async_trait]
impl PdfCompressor for PanickingCompressor {
    async fn compress(
        &self,
        _input: &Path,
        _output: &Path,
        _settings: &CompressionSettings,
    ) -> Result<(), CompressionError> {
        panic!("compressor blew up");
    }

    fn name(&self) -> &'static str {
        "panicking"
    }
}

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        password: TEST_PASSWORD.to_string(),
        session_secret: Some("integration-test-session-secret-0123456789".to_string()),
        session_ttl_days: 90,
        cookie_secure: false,
    }
}

pub fn test_config(temp_dir: PathBuf, max_upload_size_bytes: usize, auth: Option<AuthConfig>) -> Config {
    Config(Box::new(ServiceConfig {
        base: BaseConfig {
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            http_concurrency_limit: 64,
            trusted_proxy_count: 0,
            environment: "test".to_string(),
        },
        temp_dir,
        temp_max_age_secs: 3600,
        temp_sweep_interval_secs: 0,
        max_upload_size_bytes,
        ghostscript_path: "gs".to_string(),
        compression_timeout_secs: 120,
        auth,
    }))
}

pub struct TestOptions {
    pub compressor: Arc<dyn PdfCompressor>,
    pub auth: Option<AuthConfig>,
    pub max_upload_size_bytes: usize,
    /// Overrides the temp root; defaults to a fresh directory
    pub temp_root: Option<PathBuf>,
    pub trusted_proxy_count: usize,
    pub production: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            compressor: Arc::new(CopyCompressor),
            auth: None,
            max_upload_size_bytes: DEFAULT_MAX_UPLOAD,
            temp_root: None,
            trusted_proxy_count: 0,
            production: false,
        }
    }
}

pub fn setup_test_app_with(options: TestOptions) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = options
        .temp_root
        .unwrap_or_else(|| temp_dir.path().join("work"));

    let mut config = test_config(root.clone(), options.max_upload_size_bytes, options.auth);
    config.0.base.trusted_proxy_count = options.trusted_proxy_count;
    if options.production {
        config.0.base.environment = "production".to_string();
    }
    let temp_store = Arc::new(TempStore::new(root));
    // A root that cannot be created is a scenario some tests set up on purpose
    let _ = temp_store.ensure_directory();

    let state = Arc::new(AppState::new(config.clone(), temp_store, options.compressor));
    let app = setup_routes(&config, state.clone()).expect("Failed to build router");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        _temp_dir: temp_dir,
    }
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with(TestOptions::default())
}

pub fn setup_test_app_with_compressor(compressor: Arc<dyn PdfCompressor>) -> TestApp {
    setup_test_app_with(TestOptions {
        compressor,
        ..TestOptions::default()
    })
}

pub fn setup_test_app_with_auth() -> TestApp {
    setup_test_app_with(TestOptions {
        auth: Some(test_auth_config()),
        ..TestOptions::default()
    })
}

/// `name=value` part of the response's Set-Cookie header
pub fn session_cookie(response: &TestResponse) -> String {
    let set_cookie = response
        .headers()
        .get("set-cookie")
        .expect("response has no Set-Cookie header")
        .to_str()
        .expect("Set-Cookie is not ASCII");
    set_cookie
        .split(';')
        .next()
        .expect("empty Set-Cookie")
        .trim()
        .to_string()
}

pub async fn login(server: &TestServer, password: &str) -> TestResponse {
    server
        .post("/login")
        .json(&serde_json::json!({ "password": password }))
        .await
}
