use std::path::PathBuf;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Socket address to bind (default: 0.0.0.0:10000).
    pub bind_addr: String,
    /// Path to the poster template image.
    pub template_path: PathBuf,
    /// Path to the SeetaFace frontal cascade model.
    pub detector_model: PathBuf,
    /// Whether to load the detector at startup.
    pub detector_enabled: bool,
    /// Upper bound on request body size (multipart upload included).
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from `MEDALLION_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("MEDALLION_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:10000".to_string()),
            template_path: std::env::var("MEDALLION_TEMPLATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("assets/template.png")),
            detector_model: std::env::var("MEDALLION_DETECTOR_MODEL")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models/seeta_fd_frontal_v1.0.bin")),
            detector_enabled: std::env::var("MEDALLION_DETECTOR_ENABLED")
                .map(|v| v != "0")
                .unwrap_or(true),
            max_upload_bytes: env_usize("MEDALLION_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
