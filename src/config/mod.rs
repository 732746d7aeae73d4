use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Fact-check and newsroom domains the focused evidence search is restricted to.
pub const DEFAULT_ALLOWED_DOMAINS: &[&str] = &[
    "boomlive.in",
    "altnews.in",
    "factchecker.in",
    "newschecker.in",
    "vishvasnews.com",
    "pib.gov.in",
    "newsmobile.in",
    "thequint.com",
    "indiatoday.in",
    "timesofindia.indiatimes.com",
    "hindustantimes.com",
    "indianexpress.com",
    "thehindu.com",
    "ndtv.com",
    "airnewsalerts.com",
    "ddnews.gov.in",
];

/// Reasoning backends in priority order, as `pipe=model` pairs.
const DEFAULT_BACKENDS: &str = "truthdao-flash-preview=google:gemini-3-flash-preview,\
truthdao-flash-exp=google:gemini-2.0-flash-exp,\
truthdao-flash=google:gemini-1.5-flash,\
truthdao-pro=google:gemini-1.5-pro";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Reasoning backend API.
    pub langbase: LangbaseConfig,
    /// Evidence search API.
    pub search: SearchConfig,
    /// SQLite store.
    pub database: DatabaseConfig,
    /// Log level and format.
    pub logging: LoggingConfig,
    /// Outbound request limits.
    pub request: RequestConfig,
    /// Reasoning backends in fallback order.
    pub backends: BackendConfig,
}

/// Langbase API configuration
#[derive(Debug, Clone)]
pub struct LangbaseConfig {
    /// Bearer token for the Langbase API.
    pub api_key: String,
    /// API root, without a trailing slash.
    pub base_url: String,
}

/// Search provider configuration
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Key sent in the search request body.
    pub api_key: String,
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Domains focused searches are restricted to.
    pub allowed_domains: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file, or `:memory:`.
    pub path: PathBuf,
    /// Pool size.
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Output formatter.
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Output cap for every reasoning call.
    pub max_output_tokens: u32,
}

/// One reasoning backend: the Langbase pipe to run and the model it is bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendDescriptor {
    /// Langbase pipe name.
    pub pipe: String,
    /// Model the pipe is created with, e.g. `google:gemini-1.5-flash`.
    pub model: String,
}

/// Ordered reasoning backend list
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Backends in the order the fallback invoker tries them.
    pub backends: Vec<BackendDescriptor>,
    /// Create (upsert) the backend pipes on startup.
    pub ensure_pipes: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let langbase = LangbaseConfig {
            api_key: env::var("LANGBASE_API_KEY").map_err(|_| AppError::Config {
                message: "LANGBASE_API_KEY is required".to_string(),
            })?,
            base_url: env::var("LANGBASE_BASE_URL")
                .unwrap_or_else(|_| "https://api.langbase.com".to_string()),
        };

        let search = SearchConfig {
            api_key: env::var("SEARCH_API_KEY").map_err(|_| AppError::Config {
                message: "SEARCH_API_KEY is required".to_string(),
            })?,
            base_url: env::var("SEARCH_BASE_URL")
                .unwrap_or_else(|_| "https://api.tavily.com".to_string()),
            allowed_domains: env::var("SEARCH_ALLOWED_DOMAINS")
                .ok()
                .map(|s| parse_list(&s))
                .filter(|domains| !domains.is_empty())
                .unwrap_or_else(default_allowed_domains),
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/truth-dao.db".to_string()),
            ),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
            max_output_tokens: env::var("MAX_OUTPUT_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8192),
        };

        let backends = BackendConfig {
            backends: parse_backends(
                &env::var("REASONING_BACKENDS").unwrap_or_else(|_| DEFAULT_BACKENDS.to_string()),
            )?,
            ensure_pipes: env::var("LANGBASE_ENSURE_PIPES")
                .map(|s| !matches!(s.to_lowercase().as_str(), "false" | "0" | "no"))
                .unwrap_or(true),
        };

        Ok(Config {
            langbase,
            search,
            database,
            logging,
            request,
            backends,
        })
    }
}

/// Parse a comma-separated `pipe=model` list into backend descriptors.
pub fn parse_backends(raw: &str) -> Result<Vec<BackendDescriptor>, AppError> {
    let backends = parse_list(raw)
        .into_iter()
        .map(|entry| match entry.split_once('=') {
            Some((pipe, model)) if !pipe.trim().is_empty() && !model.trim().is_empty() => {
                Ok(BackendDescriptor {
                    pipe: pipe.trim().to_string(),
                    model: model.trim().to_string(),
                })
            }
            _ => Err(AppError::Config {
                message: format!("Invalid REASONING_BACKENDS entry '{}': expected pipe=model", entry),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if backends.is_empty() {
        return Err(AppError::Config {
            message: "REASONING_BACKENDS must name at least one backend".to_string(),
        });
    }

    Ok(backends)
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_allowed_domains() -> Vec<String> {
    DEFAULT_ALLOWED_DOMAINS.iter().map(|d| d.to_string()).collect()
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_output_tokens: 8192,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            backends: parse_backends(DEFAULT_BACKENDS).unwrap_or_default(),
            ensure_pipes: true,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.tavily.com".to_string(),
            allowed_domains: default_allowed_domains(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backends_keeps_order() {
        let backends = parse_backends("a=m1, b=m2 ,c=m3").unwrap();
        assert_eq!(backends.len(), 3);
        assert_eq!(backends[0].pipe, "a");
        assert_eq!(backends[1].model, "m2");
        assert_eq!(backends[2].pipe, "c");
    }

    #[test]
    fn test_parse_backends_rejects_malformed_entry() {
        assert!(parse_backends("a=m1,broken").is_err());
        assert!(parse_backends("=m1").is_err());
        assert!(parse_backends("").is_err());
    }

    #[test]
    fn test_default_backends() {
        let config = BackendConfig::default();
        assert_eq!(config.backends.len(), 4);
        assert_eq!(config.backends[0].model, "google:gemini-3-flash-preview");
        assert!(config.ensure_pipes);
    }

    #[test]
    fn test_default_search_domains() {
        let config = SearchConfig::default();
        assert_eq!(config.allowed_domains.len(), 16);
        assert!(config.allowed_domains.contains(&"pib.gov.in".to_string()));
    }
}
