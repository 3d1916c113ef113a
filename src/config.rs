use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub app_name: String,
    pub environment: String,
    pub api_base_url: String,
    pub api_prefix: String,
    pub request_timeout_seconds: u64,
    pub session_file: PathBuf,
    pub timezone: Tz,
    pub currency: String,
    pub redirect_delay_ms: u64,
    pub download_dir: PathBuf,
    pub user_agent: String,
    pub http_debug_enabled: bool,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            app_name: env_or("APP_NAME", "Rentdesk"),
            environment: env_or("ENVIRONMENT", "development"),
            api_base_url: normalize_base_url(&env_or("API_BASE_URL", "http://localhost:3001")),
            api_prefix: normalize_prefix(&env_or("API_PREFIX", "/api")),
            request_timeout_seconds: env_parse_or("REQUEST_TIMEOUT_SECONDS", 30),
            session_file: env_opt("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(default_session_file),
            timezone: parse_timezone(env_opt("TIMEZONE").as_deref()),
            currency: env_or("CURRENCY", "EUR").to_ascii_uppercase(),
            redirect_delay_ms: env_parse_or("REDIRECT_DELAY_MS", 1500),
            download_dir: PathBuf::from(env_or("DOWNLOAD_DIR", ".")),
            user_agent: env_or("USER_AGENT", "rentdesk/0.1"),
            http_debug_enabled: env_parse_bool_or("HTTP_DEBUG_ENABLED", false),
        }
    }

    /// Config pointing at an explicit backend, everything else defaulted.
    /// Used by tests and by embedders that do not read the environment.
    pub fn for_base_url(base_url: &str) -> Self {
        Self {
            app_name: "Rentdesk".to_string(),
            environment: "test".to_string(),
            api_base_url: normalize_base_url(base_url),
            api_prefix: String::new(),
            request_timeout_seconds: 5,
            session_file: default_session_file(),
            timezone: Tz::UTC,
            currency: "EUR".to_string(),
            redirect_delay_ms: 1500,
            download_dir: PathBuf::from("."),
            user_agent: "rentdesk/0.1".to_string(),
            http_debug_enabled: false,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.trim().eq_ignore_ascii_case("production")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.max(1))
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    /// Full URL of an API path, e.g. `/payments` → `http://host/api/payments`.
    pub fn endpoint(&self, path: &str) -> String {
        let path = path.trim();
        if path.starts_with('/') {
            format!("{}{}{}", self.api_base_url, self.api_prefix, path)
        } else {
            format!("{}{}/{}", self.api_base_url, self.api_prefix, path)
        }
    }

    /// HTTP request logging is never enabled in production, it dumps bodies.
    pub fn http_debug_runtime(&self) -> bool {
        if self.is_production() {
            return false;
        }
        self.http_debug_enabled
    }
}

fn default_session_file() -> PathBuf {
    env_opt("HOME")
        .map(|home| PathBuf::from(home).join(".rentdesk").join("session"))
        .unwrap_or_else(|| PathBuf::from(".rentdesk-session"))
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    env_opt(key)
        .and_then(|raw| raw.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_parse_bool_or(key: &str, default: bool) -> bool {
    match env_opt(key).as_deref().map(str::to_ascii_lowercase) {
        Some(value) if value == "1" || value == "true" || value == "yes" || value == "on" => true,
        Some(value) if value == "0" || value == "false" || value == "no" || value == "off" => false,
        Some(_) => default,
        None => default,
    }
}

fn parse_timezone(raw: Option<&str>) -> Tz {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(name) => name.parse::<Tz>().unwrap_or_else(|_| {
            tracing::warn!(timezone = name, "Unknown TIMEZONE, falling back to UTC");
            Tz::UTC
        }),
        None => Tz::UTC,
    }
}

fn normalize_base_url(raw: &str) -> String {
    let mut base = raw.trim().to_string();
    while base.ends_with('/') {
        base.pop();
    }
    base
}

fn normalize_prefix(raw: &str) -> String {
    let mut prefix = raw.trim().to_string();
    if prefix.is_empty() || prefix == "/" {
        return String::new();
    }
    if !prefix.starts_with('/') {
        prefix.insert(0, '/');
    }
    while prefix.ends_with('/') && prefix.len() > 1 {
        prefix.pop();
    }
    prefix
}
