use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;

use crate::error::{AppError, Result};
use crate::retry::RetryPolicy;

pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "mistralai/mistral-small-24b-instruct-2501";
pub const DEFAULT_SEARCH_API_URL: &str = "https://api.duckduckgo.com/";
pub const DEFAULT_ORIGIN: &str = "http://localhost:5173";

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub openrouter_api_key: String,
    pub openrouter_api_url: String,
    pub model: String,
    /// Sent upstream as `HTTP-Referer`.
    pub site_url: Option<String>,
    /// Sent upstream as `X-Title`.
    pub site_title: Option<String>,
    pub allowed_origin: HeaderValue,
    pub fetch_timeout: Duration,
    pub llm_timeout: Duration,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub max_content_chars: usize,
    /// Bytes of a fetched page read before the rest is discarded.
    pub max_page_bytes: usize,
    /// When set, the system prompt is grounded with a search snippet for this query.
    pub grounding_query: Option<String>,
    pub search_api_url: String,
    pub log_level: String,
    pub log_format: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a validated configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let openrouter_api_key = get("OPENROUTER_API_KEY").ok_or_else(|| {
            AppError::ConfigError("OPENROUTER_API_KEY must be set".to_string())
        })?;

        let openrouter_api_url =
            get("OPENROUTER_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        validate_url("OPENROUTER_API_URL", &openrouter_api_url)?;

        let search_api_url =
            get("SEARCH_API_URL").unwrap_or_else(|| DEFAULT_SEARCH_API_URL.to_string());
        validate_url("SEARCH_API_URL", &search_api_url)?;

        let host = get("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_number::<u16>("PORT", get("PORT"), 8000)?;
        let ip = IpAddr::from_str(&host)
            .map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let origin = get("BACKEND_ORIGIN").unwrap_or_else(|| DEFAULT_ORIGIN.to_string());
        if origin == "*" {
            return Err(AppError::ConfigError(
                "BACKEND_ORIGIN must name a single origin, not '*'".to_string(),
            ));
        }
        let allowed_origin = HeaderValue::from_str(&origin)
            .map_err(|e| AppError::ConfigError(format!("Invalid BACKEND_ORIGIN: {}", e)))?;

        let max_attempts = parse_number::<u32>("LLM_MAX_ATTEMPTS", get("LLM_MAX_ATTEMPTS"), 3)?;
        if max_attempts == 0 {
            return Err(AppError::ConfigError(
                "LLM_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        let retry_base_ms = parse_number::<u64>("LLM_RETRY_BASE_MS", get("LLM_RETRY_BASE_MS"), 1000)?;
        let retry_max_ms = parse_number::<u64>("LLM_RETRY_MAX_MS", get("LLM_RETRY_MAX_MS"), 16_000)?;
        if retry_max_ms < retry_base_ms {
            return Err(AppError::ConfigError(
                "LLM_RETRY_MAX_MS must not be below LLM_RETRY_BASE_MS".to_string(),
            ));
        }

        let max_content_chars =
            parse_number::<usize>("MAX_CONTENT_CHARS", get("MAX_CONTENT_CHARS"), 50_000)?;
        if max_content_chars == 0 {
            return Err(AppError::ConfigError(
                "MAX_CONTENT_CHARS must be at least 1".to_string(),
            ));
        }

        let max_page_bytes =
            parse_number::<usize>("MAX_PAGE_BYTES", get("MAX_PAGE_BYTES"), 5_000_000)?;
        if max_page_bytes == 0 {
            return Err(AppError::ConfigError(
                "MAX_PAGE_BYTES must be at least 1".to_string(),
            ));
        }

        let log_format = get("LOG_FORMAT").unwrap_or_else(|| "pretty".to_string());
        if log_format != "pretty" && log_format != "json" {
            return Err(AppError::ConfigError(format!(
                "LOG_FORMAT must be 'pretty' or 'json', got '{}'",
                log_format
            )));
        }

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            openrouter_api_key,
            openrouter_api_url,
            model: get("OPENROUTER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            site_url: get("OPENROUTER_SITE_URL"),
            site_title: get("OPENROUTER_SITE_TITLE"),
            allowed_origin,
            fetch_timeout: seconds("FETCH_TIMEOUT_SECS", get("FETCH_TIMEOUT_SECS"), 10)?,
            llm_timeout: seconds("LLM_TIMEOUT_SECS", get("LLM_TIMEOUT_SECS"), 30)?,
            request_timeout: seconds("REQUEST_TIMEOUT_SECS", get("REQUEST_TIMEOUT_SECS"), 120)?,
            retry: RetryPolicy::default()
                .with_max_attempts(max_attempts)
                .with_initial_delay(Duration::from_millis(retry_base_ms))
                .with_max_delay(Duration::from_millis(retry_max_ms)),
            max_content_chars,
            max_page_bytes,
            grounding_query: get("GROUNDING_QUERY"),
            search_api_url,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format,
        })
    }
}

fn validate_url(key: &str, value: &str) -> Result<()> {
    reqwest::Url::parse(value)
        .map(|_| ())
        .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", key, e)))
}

fn parse_number<T>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", key, e))),
    }
}

fn seconds(key: &str, value: Option<String>, default: u64) -> Result<Duration> {
    let secs = parse_number::<u64>(key, value, default)?;
    if secs == 0 {
        return Err(AppError::ConfigError(format!("{} must be positive", key)));
    }
    Ok(Duration::from_secs(secs))
}
