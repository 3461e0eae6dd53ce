//! Configuration schema definitions.
//!
//! Every struct rejects unknown keys so that a typo in an options file fails
//! at load time instead of silently falling back to a default.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root options for an assembled API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerOptions {
    /// Name reported at startup and used as the server identity.
    pub app_name: String,

    /// Listening port; `PORT` in the environment takes precedence.
    pub port: Option<u16>,

    /// Static documentation routes.
    pub swagger: SwaggerConfig,

    /// Authorization header parsing.
    pub authorization: AuthorizationConfig,

    /// Request body parsing.
    pub body_parser: BodyParserConfig,

    /// Media types accepted on top of the built-in formatters.
    pub acceptable: Vec<String>,

    /// Cross-origin resource sharing.
    pub cors: CorsConfig,

    pub logging: LoggingConfig,

    pub metrics: MetricsConfig,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            app_name: "api-server".to_string(),
            port: None,
            swagger: SwaggerConfig::default(),
            authorization: AuthorizationConfig::default(),
            body_parser: BodyParserConfig::default(),
            acceptable: Vec::new(),
            cors: CorsConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

/// Swagger UI and raw API docs serving.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SwaggerConfig {
    /// Serve `/swagger/*` (and `/api-docs/*` when a docs dir is set).
    pub enabled: bool,

    /// Directory holding the swagger UI assets (`index.html` default document).
    pub ui_dir: PathBuf,

    /// Directory served under `/api-docs` (`swagger.json` default document).
    pub api_docs_dir: Option<PathBuf>,
}

impl Default for SwaggerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ui_dir: PathBuf::from("swagger-ui"),
            api_docs_dir: None,
        }
    }
}

/// Authorization header parsing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthorizationConfig {
    /// Accepted schemes (case-insensitive). Any other scheme is rejected.
    pub schemes: Vec<String>,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            schemes: vec!["Basic".to_string(), "Bearer".to_string()],
        }
    }
}

/// Request body parsing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BodyParserConfig {
    /// When false the stage is left out of the pipeline entirely.
    pub enabled: bool,

    /// Maximum buffered body size in bytes.
    pub max_bytes: usize,
}

impl Default for BodyParserConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_bytes: 1024 * 1024, // 1MB
        }
    }
}

/// CORS policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins; `"*"` allows any.
    pub allowed_origins: Vec<String>,

    /// Allowed request headers; empty mirrors the preflight request.
    pub allowed_headers: Vec<String>,

    /// Response headers exposed to scripts.
    pub exposed_headers: Vec<String>,

    pub credentials: bool,

    /// Preflight cache lifetime.
    pub max_age_secs: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_headers: Vec::new(),
            exposed_headers: Vec::new(),
            credentials: false,
            max_age_secs: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins.
    pub level: String,

    /// JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Start the Prometheus exporter.
    pub enabled: bool,

    /// Exporter bind address.
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "0.0.0.0:9464".to_string(),
        }
    }
}
