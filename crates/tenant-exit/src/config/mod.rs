use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use axum::http::HeaderValue;

use crate::workflows::moveout::collaborators::is_valid_email;

const DEV_SESSION_SECRET: &str = "tenant-exit-development-session-secret";
const DEFAULT_CORS_ORIGIN: &str = "http://127.0.0.1:5500";
/// Thirty days.
pub const MAX_SESSION_TTL_MINUTES: i64 = 60 * 24 * 30;

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

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub notifications: NotificationConfig,
    pub users_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let secret = match env::var("APP_SESSION_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment.is_production() => return Err(ConfigError::MissingSessionSecret),
            _ => DEV_SESSION_SECRET.to_string(),
        };
        let ttl_minutes = parse_number("APP_SESSION_TTL_MINUTES", 480)?;
        if !(1..=MAX_SESSION_TTL_MINUTES).contains(&ttl_minutes) {
            return Err(ConfigError::InvalidSessionTtl {
                minutes: ttl_minutes,
            });
        }
        let cookie_secure = parse_flag("APP_COOKIE_SECURE", environment.is_production())?;

        let blob_root = env::var("APP_BLOB_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/blobs"));
        let public_base_url = env::var("APP_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{host}:{port}/files"));
        let max_upload_bytes = parse_number("APP_MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?;

        let sender = env::var("APP_SENDER_EMAIL")
            .unwrap_or_else(|_| "no-reply@tenant-exit.local".to_string());
        if !is_valid_email(&sender) {
            return Err(ConfigError::InvalidSender { value: sender });
        }
        let smtp = SmtpConfig::from_env()?;
        let cors_origins = parse_origins(
            &env::var("APP_CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGIN.to_string()),
        )?;
        let users_file = env::var("APP_USERS_FILE").ok().map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig {
                host,
                port,
                cors_origins,
            },
            telemetry: TelemetryConfig { log_level },
            session: SessionConfig {
                secret,
                ttl_minutes,
                cookie_secure,
            },
            storage: StorageConfig {
                blob_root,
                public_base_url,
                max_upload_bytes,
            },
            notifications: NotificationConfig { sender, smtp },
            users_file,
        })
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { var }),
        Err(_) => Ok(default),
    }
}

/// Comma-separated browser origins allowed to call the API with credentials.
fn parse_origins(raw: &str) -> Result<Vec<HeaderValue>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            let scheme_ok = origin.starts_with("http://") || origin.starts_with("https://");
            match HeaderValue::from_str(origin) {
                Ok(value) if scheme_ok => Ok(value),
                _ => Err(ConfigError::InvalidCorsOrigin {
                    value: origin.to_string(),
                }),
            }
        })
        .collect()
}

fn parse_flag(var: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(var) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { var }),
        },
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<HeaderValue>,
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

/// Cookie-backed session settings.
#[derive(Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_minutes: i64,
    pub cookie_secure: bool,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("ttl_minutes", &self.ttl_minutes)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

/// Where uploaded documents land and how their URLs are formed.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub blob_root: PathBuf,
    pub public_base_url: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub sender: String,
    /// Relay for outbound mail. `None` keeps messages in the service log.
    pub smtp: Option<SmtpConfig>,
}

/// Transport security for the SMTP relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    StartTls,
    Tls,
    Plain,
}

impl SmtpSecurity {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "starttls" => Some(Self::StartTls),
            "tls" | "smtps" => Some(Self::Tls),
            "none" | "plain" => Some(Self::Plain),
            _ => None,
        }
    }

    fn default_port(self) -> u16 {
        match self {
            Self::StartTls => 587,
            Self::Tls => 465,
            Self::Plain => 25,
        }
    }
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
    pub credentials: Option<(String, String)>,
}

impl SmtpConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let host = match env::var("APP_SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => host.trim().to_string(),
            _ => return Ok(None),
        };
        let security = match env::var("APP_SMTP_SECURITY") {
            Ok(raw) => SmtpSecurity::parse(&raw).ok_or(ConfigError::InvalidSmtpSecurity)?,
            Err(_) => SmtpSecurity::StartTls,
        };
        let port = parse_number("APP_SMTP_PORT", security.default_port())?;
        let credentials = match (env::var("APP_SMTP_USERNAME"), env::var("APP_SMTP_PASSWORD")) {
            (Ok(username), Ok(password)) => Some((username, password)),
            (Err(_), Err(_)) => None,
            _ => return Err(ConfigError::IncompleteSmtpCredentials),
        };

        Ok(Some(Self {
            host,
            port,
            security,
            credentials,
        }))
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field(
                "username",
                &self.credentials.as_ref().map(|(username, _)| username),
            )
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { var: &'static str },
    InvalidFlag { var: &'static str },
    MissingSessionSecret,
    MissingUsersFile,
    InvalidSessionTtl { minutes: i64 },
    InvalidCorsOrigin { value: String },
    InvalidSender { value: String },
    InvalidSmtpSecurity,
    IncompleteSmtpCredentials,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { var } => write!(f, "{var} must be a positive number"),
            ConfigError::InvalidFlag { var } => write!(f, "{var} must be true or false"),
            ConfigError::MissingSessionSecret => {
                write!(f, "APP_SESSION_SECRET is required in production")
            }
            ConfigError::MissingUsersFile => {
                write!(f, "APP_USERS_FILE is required in production")
            }
            ConfigError::InvalidSessionTtl { minutes } => write!(
                f,
                "APP_SESSION_TTL_MINUTES must be between 1 and {MAX_SESSION_TTL_MINUTES}, got {minutes}"
            ),
            ConfigError::InvalidCorsOrigin { value } => {
                write!(f, "APP_CORS_ORIGINS entry '{value}' is not an http(s) origin")
            }
            ConfigError::InvalidSender { value } => {
                write!(f, "APP_SENDER_EMAIL '{value}' is not a valid address")
            }
            ConfigError::InvalidSmtpSecurity => {
                write!(f, "APP_SMTP_SECURITY must be starttls, tls, or none")
            }
            ConfigError::IncompleteSmtpCredentials => write!(
                f,
                "APP_SMTP_USERNAME and APP_SMTP_PASSWORD must be set together"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidFlag { .. }
            | ConfigError::MissingSessionSecret
            | ConfigError::MissingUsersFile
            | ConfigError::InvalidSessionTtl { .. }
            | ConfigError::InvalidCorsOrigin { .. }
            | ConfigError::InvalidSender { .. }
            | ConfigError::InvalidSmtpSecurity
            | ConfigError::IncompleteSmtpCredentials => None,
        }
    }
}

/// Serialises tests that mutate process environment variables.
#[cfg(test)]
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock, PoisonError};

    static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
    GUARD
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}
