use serde::Deserialize;
use std::env;

const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_RUST_LOG: &str = "booking_client=info";
const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_WS_URL: &str = "ws://localhost:8000";
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
const DEFAULT_BREAKER_TIMEOUT_SECONDS: u64 = 60;

// Главная структура конфигурации - контейнер для всех настроек клиента
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub api: ApiConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub rust_log: String,
}

// Адреса бэкенда: REST и WebSocket
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub ws_url: String,
    pub request_timeout_seconds: u64,
}

// Настройки Circuit Breaker
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

// Токен, полученный ранее (например, командой login)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl Config {
    /// Собирает конфигурацию из значений по умолчанию и переменных окружения.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("app.environment", DEFAULT_ENVIRONMENT)?
            .set_default("app.rust_log", DEFAULT_RUST_LOG)?
            .set_default("api.base_url", DEFAULT_API_URL)?
            .set_default("api.ws_url", DEFAULT_WS_URL)?
            .set_default("api.request_timeout_seconds", DEFAULT_REQUEST_TIMEOUT_SECONDS as i64)?
            .set_default("circuit_breaker.failure_threshold", i64::from(DEFAULT_FAILURE_THRESHOLD))?
            .set_default("circuit_breaker.timeout_seconds", DEFAULT_BREAKER_TIMEOUT_SECONDS as i64)?
            .set_override_option("app.environment", env::var("ENVIRONMENT").ok())?
            .set_override_option("app.rust_log", env::var("RUST_LOG").ok())?
            .set_override_option("api.base_url", env::var("API_URL").ok())?
            .set_override_option("api.ws_url", env::var("WS_URL").ok())?
            .set_override_option(
                "api.request_timeout_seconds",
                env::var("REQUEST_TIMEOUT_SECONDS").ok(),
            )?
            .set_override_option(
                "circuit_breaker.failure_threshold",
                env::var("CIRCUIT_BREAKER_FAILURE_THRESHOLD").ok(),
            )?
            .set_override_option(
                "circuit_breaker.timeout_seconds",
                env::var("CIRCUIT_BREAKER_TIMEOUT_SECONDS").ok(),
            )?
            .set_override_option("auth.token", env::var("AUTH_TOKEN").ok())?
            .build()?
            .try_deserialize()
    }

    /// Конфигурация с явными адресами бэкенда, остальное по умолчанию.
    pub fn with_urls(base_url: impl Into<String>, ws_url: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                base_url: base_url.into(),
                ws_url: ws_url.into(),
                request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            },
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            app: AppConfig {
                environment: DEFAULT_ENVIRONMENT.to_string(),
                rust_log: DEFAULT_RUST_LOG.to_string(),
            },
            api: ApiConfig {
                base_url: DEFAULT_API_URL.to_string(),
                ws_url: DEFAULT_WS_URL.to_string(),
                request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: DEFAULT_FAILURE_THRESHOLD,
                timeout_seconds: DEFAULT_BREAKER_TIMEOUT_SECONDS,
            },
            auth: AuthConfig::default(),
        }
    }
}
