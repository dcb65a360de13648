//! Configuration module
//!
//! Process-wide settings are read once at startup into an immutable `Config` and
//! handed to the request handlers through application state.

use std::env;
use std::path::{Path, PathBuf};

const SERVER_PORT: u16 = 8000;
const HTTP_CONCURRENCY_LIMIT: usize = 64;
const TEMP_DIR: &str = "/tmp/pdf-compressor";
const TEMP_MAX_AGE_SECS: u64 = 3600;
const COMPRESSION_TIMEOUT_SECS: u64 = 120;
const OPEN_MAX_UPLOAD_SIZE_MB: usize = 50;
const AUTHENTICATED_MAX_UPLOAD_SIZE_MB: usize = 250;
const SESSION_TTL_DAYS: i64 = 90;
const MAX_SESSION_TTL_DAYS: i64 = 3650;
const MIN_SESSION_SECRET_LEN: usize = 32;

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_host: String,
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub http_concurrency_limit: usize,
    /// Reverse proxies in front of the service; 0 means forwarding headers are ignored
    pub trusted_proxy_count: usize,
    pub environment: String,
}

/// Password gate settings. Present only when authentication is enabled.
#[derive(Clone)]
pub struct AuthConfig {
    pub password: String,
    /// Secret used to sign session tokens; a random one is generated at startup when unset
    pub session_secret: Option<String>,
    pub session_ttl_days: i64,
    pub cookie_secure: bool,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("password", &"<redacted>")
            .field(
                "session_secret",
                &self.session_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("session_ttl_days", &self.session_ttl_days)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

/// Compression service configuration
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub base: BaseConfig,
    // Temp store
    pub temp_dir: PathBuf,
    pub temp_max_age_secs: u64,
    /// Interval between background sweeps of the temp directory. 0 = startup sweep only.
    pub temp_sweep_interval_secs: u64,
    // Upload and compression
    pub max_upload_size_bytes: usize,
    pub ghostscript_path: String,
    pub compression_timeout_secs: u64,
    pub auth: Option<AuthConfig>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ServiceConfig>);

impl Config {
    fn as_service(&self) -> &ServiceConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ServiceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_service().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_env(&self.as_service().base.environment)
    }

    pub fn environment(&self) -> &str {
        &self.as_service().base.environment
    }

    pub fn server_host(&self) -> &str {
        &self.as_service().base.server_host
    }

    pub fn server_port(&self) -> u16 {
        self.as_service().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_service().base.cors_origins
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.as_service().base.http_concurrency_limit
    }

    pub fn trusted_proxy_count(&self) -> usize {
        self.as_service().base.trusted_proxy_count
    }

    pub fn temp_dir(&self) -> &Path {
        &self.as_service().temp_dir
    }

    pub fn temp_max_age_secs(&self) -> u64 {
        self.as_service().temp_max_age_secs
    }

    pub fn temp_sweep_interval_secs(&self) -> u64 {
        self.as_service().temp_sweep_interval_secs
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.as_service().max_upload_size_bytes
    }

    pub fn ghostscript_path(&self) -> &str {
        &self.as_service().ghostscript_path
    }

    pub fn compression_timeout_secs(&self) -> u64 {
        self.as_service().compression_timeout_secs
    }

    pub fn auth_enabled(&self) -> bool {
        self.as_service().auth.is_some()
    }

    pub fn auth(&self) -> Option<&AuthConfig> {
        self.as_service().auth.as_ref()
    }
}

fn is_production_env(environment: &str) -> bool {
    let environment = environment.to_lowercase();
    environment == "production" || environment == "prod"
}

/// `MAX_UPLOAD_SIZE_MB` in bytes; unparsable values fall back to the default.
fn upload_size_bytes(raw: Option<&str>, default_mb: usize) -> Result<usize, anyhow::Error> {
    let mb = raw
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(default_mb);
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("MAX_UPLOAD_SIZE_MB is too large: {}", mb))
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());
        let is_production = is_production_env(&environment);

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            http_concurrency_limit: env::var("HTTP_CONCURRENCY_LIMIT")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(HTTP_CONCURRENCY_LIMIT)
                .max(1),
            trusted_proxy_count: env::var("TRUSTED_PROXY_COUNT")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(0),
            environment,
        };

        let auth = if env_flag("AUTH_ENABLED", true) {
            let password = env::var("APP_PASSWORD")
                .ok()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "APP_PASSWORD must be set when AUTH_ENABLED is true (set AUTH_ENABLED=false for an open instance)"
                    )
                })?;
            Some(AuthConfig {
                password,
                session_secret: env::var("SESSION_SECRET").ok().filter(|s| !s.is_empty()),
                session_ttl_days: env::var("SESSION_TTL_DAYS")
                    .unwrap_or_else(|_| SESSION_TTL_DAYS.to_string())
                    .parse()
                    .unwrap_or(SESSION_TTL_DAYS),
                cookie_secure: env_flag("COOKIE_SECURE", is_production),
            })
        } else {
            None
        };

        let default_upload_mb = if auth.is_some() {
            AUTHENTICATED_MAX_UPLOAD_SIZE_MB
        } else {
            OPEN_MAX_UPLOAD_SIZE_MB
        };

        let config = ServiceConfig {
            base,
            temp_dir: env::var("TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(TEMP_DIR)),
            temp_max_age_secs: env::var("TEMP_MAX_AGE_SECS")
                .unwrap_or_else(|_| TEMP_MAX_AGE_SECS.to_string())
                .parse()
                .unwrap_or(TEMP_MAX_AGE_SECS),
            temp_sweep_interval_secs: env::var("TEMP_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            max_upload_size_bytes: upload_size_bytes(
                env::var("MAX_UPLOAD_SIZE_MB").ok().as_deref(),
                default_upload_mb,
            )?,
            ghostscript_path: env::var("GHOSTSCRIPT_PATH").unwrap_or_else(|_| "gs".to_string()),
            compression_timeout_secs: env::var("COMPRESSION_TIMEOUT_SECS")
                .unwrap_or_else(|_| COMPRESSION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(COMPRESSION_TIMEOUT_SECS),
            auth,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB cannot be 0"));
        }

        if self.compression_timeout_secs == 0 {
            return Err(anyhow::anyhow!("COMPRESSION_TIMEOUT_SECS cannot be 0"));
        }

        if self.ghostscript_path.trim().is_empty() {
            return Err(anyhow::anyhow!("GHOSTSCRIPT_PATH cannot be empty"));
        }

        if self.temp_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("TEMP_DIR cannot be empty"));
        }

        if let Some(auth) = &self.auth {
            if auth.password.is_empty() {
                return Err(anyhow::anyhow!(
                    "APP_PASSWORD cannot be empty when authentication is enabled"
                ));
            }
            if let Some(secret) = &auth.session_secret {
                if secret.len() < MIN_SESSION_SECRET_LEN {
                    return Err(anyhow::anyhow!(
                        "SESSION_SECRET must be at least {} characters long",
                        MIN_SESSION_SECRET_LEN
                    ));
                }
            }
            if auth.session_ttl_days <= 0 || auth.session_ttl_days > MAX_SESSION_TTL_DAYS {
                return Err(anyhow::anyhow!(
                    "SESSION_TTL_DAYS must be between 1 and {}",
                    MAX_SESSION_TTL_DAYS
                ));
            }
        }

        Ok(())
    }
}
