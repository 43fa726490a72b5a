use serde::{Deserialize, Serialize};
use std::{path::PathBuf, str::FromStr};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub coordinator: FileCoordinatorConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCoordinatorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_cooldown_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_domain_failures: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_pause_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_timeout_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_domains_per_worker: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_domains_per_worker: Option<usize>,
}

/// A variable that was set but could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidEnvVar {
    pub name: &'static str,
    pub raw: String,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub database_url: Option<String>,
    pub database_max_connections: Option<u32>,
    pub domain_cooldown_seconds: Option<u64>,
    pub max_domain_failures: Option<u32>,
    pub domain_pause_seconds: Option<u64>,
    pub worker_timeout_seconds: Option<u64>,
    pub min_domains_per_worker: Option<usize>,
    pub max_domains_per_worker: Option<usize>,
    pub invalid: Vec<InvalidEnvVar>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut invalid = Vec::new();

        let server_port = parse_var(&lookup, "SERVER_PORT", &mut invalid);
        let database_max_connections =
            parse_var(&lookup, "DATABASE_MAX_CONNECTIONS", &mut invalid);
        let domain_cooldown_seconds =
            parse_var(&lookup, "DOMAIN_COOLDOWN_SECONDS", &mut invalid);
        let max_domain_failures =
            parse_var(&lookup, "MAX_DOMAIN_FAILURES", &mut invalid);
        let domain_pause_seconds =
            parse_var(&lookup, "DOMAIN_PAUSE_SECONDS", &mut invalid);
        let worker_timeout_seconds =
            parse_var(&lookup, "WORKER_TIMEOUT_SECONDS", &mut invalid);
        let min_domains_per_worker =
            parse_var(&lookup, "MIN_DOMAINS_PER_WORKER", &mut invalid);
        let max_domains_per_worker =
            parse_var(&lookup, "MAX_DOMAINS_PER_WORKER", &mut invalid);

        Self {
            config_path: non_empty(&lookup, "CRAWLQ_CONFIG").map(PathBuf::from),
            server_host: non_empty(&lookup, "SERVER_HOST"),
            server_port,
            database_url: non_empty(&lookup, "DATABASE_URL"),
            database_max_connections,
            domain_cooldown_seconds,
            max_domain_failures,
            domain_pause_seconds,
            worker_timeout_seconds,
            min_domains_per_worker,
            max_domains_per_worker,
            invalid,
        }
    }
}

fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|value| !value.trim().is_empty())
}

fn parse_var<F, T>(
    lookup: &F,
    name: &'static str,
    invalid: &mut Vec<InvalidEnvVar>,
) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = non_empty(lookup, name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            invalid.push(InvalidEnvVar { name, raw });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> EnvConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn numeric_values_are_parsed() {
        let env = env(&[
            ("SERVER_PORT", "9090"),
            ("MAX_DOMAIN_FAILURES", " 5 "),
            ("MAX_DOMAINS_PER_WORKER", "3"),
        ]);
        assert_eq!(env.server_port, Some(9090));
        assert_eq!(env.max_domain_failures, Some(5));
        assert_eq!(env.max_domains_per_worker, Some(3));
        assert!(env.invalid.is_empty());
    }

    #[test]
    fn unparseable_values_are_recorded() {
        let env = env(&[
            ("SERVER_PORT", "eighty"),
            ("DOMAIN_COOLDOWN_SECONDS", "-1"),
        ]);
        assert_eq!(env.server_port, None);
        assert_eq!(env.domain_cooldown_seconds, None);
        assert_eq!(
            env.invalid,
            vec![
                InvalidEnvVar {
                    name: "SERVER_PORT",
                    raw: "eighty".into(),
                },
                InvalidEnvVar {
                    name: "DOMAIN_COOLDOWN_SECONDS",
                    raw: "-1".into(),
                },
            ]
        );
    }

    #[test]
    fn blank_values_count_as_unset() {
        let env = env(&[("DATABASE_URL", "  "), ("SERVER_HOST", "")]);
        assert_eq!(env.database_url, None);
        assert_eq!(env.server_host, None);
    }

    #[test]
    fn file_config_accepts_partial_tables() {
        let file: FileConfig = toml::from_str(
            r#"
            [coordinator]
            domain_cooldown_seconds = 30
            "#,
        )
        .unwrap();
        assert_eq!(file.coordinator.domain_cooldown_seconds, Some(30));
        assert_eq!(file.coordinator.max_domain_failures, None);
        assert!(file.server.host.is_none());
    }
}
