//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size (covers the whole multipart upload)
    pub max_body_size: usize,
    /// Root directory of the artifact namespace
    pub artifact_root: PathBuf,
    /// How long artifacts live before the sweeper reclaims them
    pub retention: Duration,
    /// Interval between retention sweeps
    pub sweep_interval: Duration,
    /// Encoder binary name or path
    pub encoder_binary: String,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            max_body_size: 50 * 1024 * 1024, // 50MB
            artifact_root: std::env::temp_dir().join("vstitch"),
            retention: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(300),
            encoder_binary: "ffmpeg".to_string(),
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            artifact_root: std::env::var("ARTIFACT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_root),
            retention: std::env::var("RETENTION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.retention),
            sweep_interval: std::env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            encoder_binary: std::env::var("FFMPEG_BINARY").unwrap_or(defaults.encoder_binary),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}
