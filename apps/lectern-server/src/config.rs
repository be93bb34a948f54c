//! Configuration management for Lectern Server

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::ocr::OcrMode;
use crate::retry::BackoffSchedule;
use crate::speech::SpeechBackend;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub speech: SpeechConfig,
    pub ocr: OcrConfig,
    pub cache: CacheConfig,
    pub session: SessionConfig,
    pub document: DocumentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted upload, in megabytes
    pub max_upload_mb: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    pub backend: SpeechBackend,
    /// Synthesizer executable (ignored by the silent backend)
    pub program: PathBuf,
    /// Attempts made by the initial engine start-up
    pub init_attempts: u32,
    pub init_backoff: BackoffSchedule,
    /// Engine failures tolerated inside `recovery_window`
    pub max_recoveries: usize,
    pub recovery_window: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub mode: OcrMode,
    pub tesseract_path: PathBuf,
    pub pdftoppm_path: PathBuf,
    pub language: String,
    pub dpi: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub dir: PathBuf,
    pub max_age_days: u64,
    pub max_size_mb: u64,
    pub cleanup_interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentConfig {
    pub parse_timeout: Duration,
}

fn default_cache_dir() -> PathBuf {
    env::temp_dir().join("pdf_audiobook_cache")
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8501,
                max_upload_mb: 200,
            },
            speech: SpeechConfig {
                backend: SpeechBackend::Espeak,
                program: PathBuf::from("espeak-ng"),
                init_attempts: 3,
                init_backoff: BackoffSchedule::default(),
                max_recoveries: 3,
                recovery_window: Duration::from_secs(60),
            },
            ocr: OcrConfig {
                mode: OcrMode::Document,
                tesseract_path: PathBuf::from("tesseract"),
                pdftoppm_path: PathBuf::from("pdftoppm"),
                language: "eng".to_string(),
                dpi: 300,
            },
            cache: CacheConfig {
                dir: default_cache_dir(),
                max_age_days: 7,
                max_size_mb: 500,
                cleanup_interval: Duration::from_secs(3600),
            },
            session: SessionConfig {
                path: PathBuf::from("lectern_session.json"),
            },
            document: DocumentConfig {
                parse_timeout: Duration::from_secs(30),
            },
        }
    }
}

/// Read and parse an environment variable, keeping `default` when it is
/// unset or unparsable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring unparsable configuration value");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    env::var_os(key).map(PathBuf::from).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let defaults = Config::default();

        let backend = match env::var("LECTERN_TTS_BACKEND")
            .unwrap_or_else(|_| "espeak".to_string())
            .to_lowercase()
            .as_str()
        {
            "say" => SpeechBackend::Say,
            "silent" => SpeechBackend::Silent,
            _ => SpeechBackend::Espeak,
        };
        let default_program = match backend {
            SpeechBackend::Say => PathBuf::from("say"),
            _ => defaults.speech.program.clone(),
        };

        let ocr_mode = match env::var("LECTERN_OCR_MODE") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Unknown OCR mode, using default");
                defaults.ocr.mode
            }),
            Err(_) => defaults.ocr.mode,
        };

        Ok(Config {
            server: ServerConfig {
                host: env::var("LECTERN_HOST").unwrap_or(defaults.server.host),
                port: env_or("LECTERN_PORT", defaults.server.port),
                max_upload_mb: env_or("LECTERN_MAX_UPLOAD_MB", defaults.server.max_upload_mb),
            },
            speech: SpeechConfig {
                backend,
                program: env_path("LECTERN_TTS_PROGRAM", default_program),
                init_attempts: env_or("LECTERN_TTS_INIT_ATTEMPTS", defaults.speech.init_attempts),
                init_backoff: defaults.speech.init_backoff,
                max_recoveries: env_or("LECTERN_TTS_MAX_RECOVERIES", defaults.speech.max_recoveries),
                recovery_window: Duration::from_secs(env_or(
                    "LECTERN_TTS_RECOVERY_WINDOW_SECS",
                    defaults.speech.recovery_window.as_secs(),
                )),
            },
            ocr: OcrConfig {
                mode: ocr_mode,
                tesseract_path: env_path("LECTERN_TESSERACT_PATH", defaults.ocr.tesseract_path),
                pdftoppm_path: env_path("LECTERN_PDFTOPPM_PATH", defaults.ocr.pdftoppm_path),
                language: env::var("LECTERN_OCR_LANGUAGE").unwrap_or(defaults.ocr.language),
                dpi: env_or("LECTERN_OCR_DPI", defaults.ocr.dpi),
            },
            cache: CacheConfig {
                dir: env_path("LECTERN_CACHE_DIR", defaults.cache.dir),
                max_age_days: env_or("LECTERN_CACHE_MAX_AGE_DAYS", defaults.cache.max_age_days),
                max_size_mb: env_or("LECTERN_CACHE_MAX_SIZE_MB", defaults.cache.max_size_mb),
                cleanup_interval: Duration::from_secs(env_or(
                    "LECTERN_CACHE_CLEANUP_INTERVAL_SECS",
                    defaults.cache.cleanup_interval.as_secs(),
                )),
            },
            session: SessionConfig {
                path: env_path("LECTERN_SESSION_PATH", defaults.session.path),
            },
            document: DocumentConfig {
                parse_timeout: Duration::from_secs(env_or(
                    "LECTERN_PARSE_TIMEOUT_SECS",
                    defaults.document.parse_timeout.as_secs(),
                )),
            },
        })
    }
}
