use once_cell::sync::Lazy;
use std::{fs, path::PathBuf};
use thiserror::Error;

use crawlq_core::coordinator::CoordinatorConfig;

use super::{
    models::{
        Config, ConfigMetadata, DEFAULT_MAX_CONNECTIONS, DEFAULT_SERVER_HOST,
        DEFAULT_SERVER_PORT, DatabaseConfig, ServerConfig,
    },
    sources::{EnvConfig, FileConfig},
    validation::{self, ConfigGuardRailError, ConfigWarnings},
};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("crawlq.toml"),
        PathBuf::from("config/crawlq.toml"),
    ]
});

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let env_config = EnvConfig::gather();
        let (file_config, config_path) = self.load_file_config(&env_config)?;
        let (config, warnings) = compose_config(
            file_config,
            env_config,
            config_path,
            env_file_loaded,
        )?;

        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let source = ConfigPathSource {
            explicit: self.options.config_path.clone(),
            env: env_config.config_path.clone(),
            default: DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
                .cloned(),
        };

        let Some((path, provenance)) = source.resolved_path() else {
            return Ok((None, None));
        };

        if !path.exists() {
            if provenance.is_explicit() {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents =
            fs::read_to_string(&path).map_err(|err| ConfigLoadError::Io {
                path: path.clone(),
                source: err,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
                path: path.clone(),
                source: err,
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

/// Merges the sources: environment over file over defaults.
fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
    env_file_loaded: bool,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if config_path.is_none() {
        warnings.push_with_hint(
            "No crawlq.toml detected; using environment variables and defaults",
            "Pass --config or set CRAWLQ_CONFIG to load a configuration file",
        );
    }
    for invalid in &env.invalid {
        warnings.push_with_hint(
            format!("{} has unparseable value '{}'", invalid.name, invalid.raw),
            "The file value or built-in default is used instead",
        );
    }

    let FileConfig {
        server: file_server,
        database: file_database,
        coordinator: file_coordinator,
    } = file_config.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
        port: env
            .server_port
            .or(file_server.port)
            .unwrap_or(DEFAULT_SERVER_PORT),
    };

    let database = DatabaseConfig {
        url: env.database_url.or_else(|| {
            file_database.url.filter(|value| !value.trim().is_empty())
        }),
        max_connections: env
            .database_max_connections
            .or(file_database.max_connections)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS),
    };

    let defaults = CoordinatorConfig::default();
    let coordinator = CoordinatorConfig {
        domain_cooldown_secs: env
            .domain_cooldown_seconds
            .or(file_coordinator.domain_cooldown_seconds)
            .unwrap_or(defaults.domain_cooldown_secs),
        max_consecutive_failures: env
            .max_domain_failures
            .or(file_coordinator.max_domain_failures)
            .unwrap_or(defaults.max_consecutive_failures),
        pause_duration_secs: env
            .domain_pause_seconds
            .or(file_coordinator.domain_pause_seconds)
            .unwrap_or(defaults.pause_duration_secs),
        worker_timeout_secs: env
            .worker_timeout_seconds
            .or(file_coordinator.worker_timeout_seconds)
            .unwrap_or(defaults.worker_timeout_secs),
        min_domains_per_worker: env
            .min_domains_per_worker
            .or(file_coordinator.min_domains_per_worker)
            .unwrap_or(defaults.min_domains_per_worker),
        max_domains_per_worker: env
            .max_domains_per_worker
            .or(file_coordinator.max_domains_per_worker)
            .unwrap_or(defaults.max_domains_per_worker),
    };

    let config = Config {
        server,
        database,
        coordinator,
        metadata: ConfigMetadata {
            config_path,
            env_file_loaded,
        },
    };

    let guard_warnings = validation::apply_guard_rails(&config)?;
    warnings.extend(guard_warnings);

    Ok((config, warnings))
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug, Default)]
struct ConfigPathSource {
    explicit: Option<PathBuf>,
    env: Option<PathBuf>,
    default: Option<PathBuf>,
}

impl ConfigPathSource {
    fn resolved_path(&self) -> Option<(PathBuf, ConfigPathProvenance)> {
        if let Some(path) = &self.explicit {
            return Some((path.clone(), ConfigPathProvenance::Explicit));
        }
        if let Some(path) = &self.env {
            return Some((path.clone(), ConfigPathProvenance::Env));
        }
        if let Some(path) = &self.default {
            return Some((path.clone(), ConfigPathProvenance::Default));
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigPathProvenance {
    Explicit,
    Env,
    Default,
}

impl ConfigPathProvenance {
    fn is_explicit(self) -> bool {
        matches!(
            self,
            ConfigPathProvenance::Explicit | ConfigPathProvenance::Env
        )
    }
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}
