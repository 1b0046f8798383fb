use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use url::Url;

use crate::application::domain::{ConflictMode, GroupId, PageId};
use crate::application::mapping::UploadConfiguration;

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
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub portal: PortalSettings,
    pub uploads: UploadConfiguration,
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

        let base_url = env::var("ATS_BASE_URL").unwrap_or_else(|_| format!("http://{host}:{port}/"));
        let base_url = parse_base_url(&base_url)?;
        let fe_user_group = env::var("ATS_FE_USER_GROUP")
            .ok()
            .and_then(|value| GroupId::from_setting(&value));
        let login_page = env::var("ATS_LOGIN_PAGE")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "login".to_string());

        let defaults = UploadConfiguration::default();
        let upload_folder = env::var("ATS_UPLOAD_FOLDER").unwrap_or(defaults.upload_folder);
        let conflict_mode = match env::var("ATS_UPLOAD_CONFLICT_MODE") {
            Ok(value) => ConflictMode::parse(&value)
                .ok_or(ConfigError::InvalidConflictMode { value })?,
            Err(_) => defaults.conflict_mode,
        };
        let allowed_file_extensions = env::var("ATS_ALLOWED_FILE_EXTENSIONS")
            .map(|raw| UploadConfiguration::parse_extensions(&raw))
            .unwrap_or(defaults.allowed_file_extensions);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            portal: PortalSettings {
                base_url,
                fe_user_group,
                login_page: PageId(login_page),
            },
            uploads: UploadConfiguration {
                upload_folder,
                conflict_mode,
                allowed_file_extensions,
            },
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidBaseUrl {
        value: raw.to_string(),
        source,
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::BaseUrlNotHierarchical {
            value: raw.to_string(),
        });
    }
    Ok(url)
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Access and redirect settings of the application form plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalSettings {
    /// Absolute base every generated URL is resolved against.
    pub base_url: Url,
    /// Group required for access; `None` admits any authenticated user.
    pub fe_user_group: Option<GroupId>,
    pub login_page: PageId,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidBaseUrl {
        value: String,
        source: url::ParseError,
    },
    BaseUrlNotHierarchical {
        value: String,
    },
    InvalidConflictMode {
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidBaseUrl { value, .. } => {
                write!(f, "ATS_BASE_URL '{value}' is not an absolute URL")
            }
            ConfigError::BaseUrlNotHierarchical { value } => {
                write!(f, "ATS_BASE_URL '{value}' cannot be used as a base URL")
            }
            ConfigError::InvalidConflictMode { value } => write!(
                f,
                "ATS_UPLOAD_CONFLICT_MODE '{value}' must be one of rename, replace, cancel"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidBaseUrl { source, .. } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::BaseUrlNotHierarchical { .. }
            | ConfigError::InvalidConflictMode { .. } => None,
        }
    }
}
