use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

const DEFAULT_JWT_SECRET: &str = "change-this-secret";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
///
/// Built once at startup and handed to each component; nothing reads the
/// environment after `load` returns.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
    pub email: EmailConfig,
    pub church: ChurchConfig,
    pub notifications: NotificationThresholds,
    pub scheduler: SchedulerConfig,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("APP_PORT", 3000u16).map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL")
                .ok()
                .filter(|value| !value.trim().is_empty()),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 10u32)?,
        };

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string());
        if environment == AppEnvironment::Production && jwt_secret == DEFAULT_JWT_SECRET {
            return Err(ConfigError::InsecureJwtSecret);
        }
        let auth = AuthConfig {
            jwt_secret,
            token_ttl_hours: parse_var("JWT_EXPIRY_HOURS", 168i64)?,
        };

        let cors = CorsConfig {
            origin: env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3001".to_string()),
        };

        let email = EmailConfig {
            sendgrid_api_key: env::var("SENDGRID_API_KEY")
                .ok()
                .filter(|value| !value.trim().is_empty()),
            from_email: env::var("SENDGRID_FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@dominioncityuyo.org".to_string()),
            from_name: env::var("SENDGRID_FROM_NAME")
                .unwrap_or_else(|_| "Dominion City Uyo".to_string()),
        };

        let church = ChurchConfig {
            name: env::var("CHURCH_NAME")
                .unwrap_or_else(|_| "Dominion City Uyo (Golden Heart)".to_string()),
            receipt_prefix: env::var("RECEIPT_PREFIX").unwrap_or_else(|_| "DCU".to_string()),
        };

        let notifications = NotificationThresholds {
            absence_warning: parse_var("ABSENCE_WARNING_THRESHOLD", 2u32)?,
            absence_critical: parse_var("ABSENCE_CRITICAL_THRESHOLD", 4u32)?,
            tithe_reminder: parse_var("TITHE_REMINDER_THRESHOLD", 2u32)?,
        };

        let scheduler = SchedulerConfig {
            enabled: parse_flag("SCHEDULER_ENABLED", true)?,
        };

        let rate_limit = RateLimitConfig {
            max_requests: parse_var("RATE_LIMIT_MAX", 100u32)?,
            window_ms: parse_var("RATE_LIMIT_TIMEWINDOW", 900_000u64)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            database,
            auth,
            cors,
            email,
            church,
            notifications,
            scheduler,
            rate_limit,
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
            name,
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

fn parse_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { name, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Relational store connection. Without a URL the service keeps its data in memory.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub origin: String,
}

/// Outbound mail provider settings.
#[derive(Clone)]
pub struct EmailConfig {
    pub sendgrid_api_key: Option<String>,
    pub from_email: String,
    pub from_name: String,
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field(
                "sendgrid_api_key",
                &self.sendgrid_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .finish()
    }
}

/// Organisation identity used in message copy and receipt numbers.
#[derive(Debug, Clone)]
pub struct ChurchConfig {
    pub name: String,
    pub receipt_prefix: String,
}

/// Per-organisation dials for the absence and tithe scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationThresholds {
    pub absence_warning: u32,
    pub absence_critical: u32,
    pub tithe_reminder: u32,
}

impl Default for NotificationThresholds {
    fn default() -> Self {
        Self {
            absence_warning: 2,
            absence_critical: 4,
            tithe_reminder: 2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub enabled: bool,
}

/// Per-client request budget for `/api`: `max_requests` within each `window_ms` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_ms: 900_000,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { name: &'static str, value: String },
    InsecureJwtSecret,
    MissingDatabaseUrl,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { name, value } => {
                write!(f, "{name} has an invalid value '{value}'")
            }
            ConfigError::InsecureJwtSecret => {
                write!(f, "JWT_SECRET must be set when APP_ENV is production")
            }
            ConfigError::MissingDatabaseUrl => {
                write!(f, "DATABASE_URL is required for this command")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidValue { .. }
            | ConfigError::InsecureJwtSecret
            | ConfigError::MissingDatabaseUrl => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "DATABASE_URL",
            "JWT_SECRET",
            "ABSENCE_WARNING_THRESHOLD",
            "ABSENCE_CRITICAL_THRESHOLD",
            "TITHE_REMINDER_THRESHOLD",
            "SCHEDULER_ENABLED",
            "RECEIPT_PREFIX",
            "RATE_LIMIT_MAX",
            "RATE_LIMIT_TIMEWINDOW",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.database.url.is_none());
        assert_eq!(config.notifications, NotificationThresholds::default());
        assert_eq!(config.church.receipt_prefix, "DCU");
        assert!(config.scheduler.enabled);
        assert_eq!(config.rate_limit, RateLimitConfig::default());
    }

    #[test]
    fn rate_limit_overrides_are_parsed() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RATE_LIMIT_MAX", "20");
        env::set_var("RATE_LIMIT_TIMEWINDOW", "60000");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.rate_limit.max_requests, 20);
        assert_eq!(config.rate_limit.window_ms, 60_000);
        reset_env();
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        env::remove_var("APP_HOST");
    }

    #[test]
    fn threshold_overrides_are_parsed() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ABSENCE_CRITICAL_THRESHOLD", "6");
        env::set_var("TITHE_REMINDER_THRESHOLD", "3");
        env::set_var("SCHEDULER_ENABLED", "off");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.notifications.absence_critical, 6);
        assert_eq!(config.notifications.tithe_reminder, 3);
        assert!(!config.scheduler.enabled);
        reset_env();
    }

    #[test]
    fn rejects_malformed_threshold() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ABSENCE_WARNING_THRESHOLD", "two");
        match AppConfig::load() {
            Err(ConfigError::InvalidValue { name, .. }) => {
                assert_eq!(name, "ABSENCE_WARNING_THRESHOLD")
            }
            other => panic!("expected invalid value error, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn production_requires_explicit_jwt_secret() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InsecureJwtSecret)
        ));
        reset_env();
    }
}
