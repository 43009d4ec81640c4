use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

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

/// Top-level configuration for the screening service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub data: DataConfig,
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

        let catalog_path = env::var("APP_CATALOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/programs.csv"));
        let taxonomy = match (
            optional_path("APP_TAXONOMY_DETAIL_PATH"),
            optional_path("APP_TAXONOMY_MID_PATH"),
        ) {
            (Some(detail_to_mid), Some(mid_to_main)) => Some(TaxonomyPaths {
                detail_to_mid,
                mid_to_main,
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTaxonomy),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            data: DataConfig {
                catalog_path,
                score_bands_path: optional_path("APP_SCORE_BANDS_PATH"),
                taxonomy,
                expert_notes_path: optional_path("APP_EXPERT_NOTES_PATH"),
                university_summary_path: optional_path("APP_UNIVERSITY_SUMMARY_PATH"),
            },
        })
    }
}

fn optional_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
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

/// Locations of the datasets loaded once at startup.
#[derive(Debug, Clone)]
pub struct DataConfig {
    pub catalog_path: PathBuf,
    pub score_bands_path: Option<PathBuf>,
    pub taxonomy: Option<TaxonomyPaths>,
    pub expert_notes_path: Option<PathBuf>,
    pub university_summary_path: Option<PathBuf>,
}

/// Pair of lookup tables replacing the built-in category taxonomy.
#[derive(Debug, Clone)]
pub struct TaxonomyPaths {
    pub detail_to_mid: PathBuf,
    pub mid_to_main: PathBuf,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    IncompleteTaxonomy,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::IncompleteTaxonomy => write!(
                f,
                "APP_TAXONOMY_DETAIL_PATH and APP_TAXONOMY_MID_PATH must be set together"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::IncompleteTaxonomy => None,
            ConfigError::InvalidHost { source } => Some(source),
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
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_CATALOG_PATH",
            "APP_SCORE_BANDS_PATH",
            "APP_TAXONOMY_DETAIL_PATH",
            "APP_TAXONOMY_MID_PATH",
            "APP_EXPERT_NOTES_PATH",
            "APP_UNIVERSITY_SUMMARY_PATH",
        ] {
            env::remove_var(key);
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
        assert_eq!(config.data.catalog_path, PathBuf::from("data/programs.csv"));
        assert!(config.data.score_bands_path.is_none());
        assert!(config.data.taxonomy.is_none());
        assert!(config.data.university_summary_path.is_none());
    }

    #[test]
    fn university_summary_path_is_optional() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_UNIVERSITY_SUMMARY_PATH", "data/university_summaries.csv");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.data.university_summary_path,
            Some(PathBuf::from("data/university_summaries.csv"))
        );

        env::set_var("APP_UNIVERSITY_SUMMARY_PATH", "  ");
        let config = AppConfig::load().expect("blank path loads");
        assert!(config.data.university_summary_path.is_none());
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
        reset_env();
    }

    #[test]
    fn taxonomy_paths_must_come_in_pairs() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_TAXONOMY_DETAIL_PATH", "data/detail_to_mid.csv");
        let error = AppConfig::load().expect_err("half a taxonomy is rejected");
        assert!(matches!(error, ConfigError::IncompleteTaxonomy));

        env::set_var("APP_TAXONOMY_MID_PATH", "data/mid_to_main.csv");
        let config = AppConfig::load().expect("both paths load");
        let taxonomy = config.data.taxonomy.expect("taxonomy configured");
        assert_eq!(taxonomy.mid_to_main, PathBuf::from("data/mid_to_main.csv"));
        reset_env();
    }
}
