use thiserror::Error;

use super::models::Config;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigGuardRailError {
    #[error("MAX_DOMAIN_FAILURES must be at least 1")]
    ZeroFailureThreshold,
    #[error("MAX_DOMAINS_PER_WORKER must be at least 1")]
    ZeroMaxDomains,
    #[error(
        "MIN_DOMAINS_PER_WORKER ({min}) exceeds MAX_DOMAINS_PER_WORKER ({max})"
    )]
    DomainRange { min: usize, max: usize },
    #[error("DATABASE_MAX_CONNECTIONS must be at least 1")]
    ZeroConnections,
    #[error("database URL must use postgres:// or postgresql://")]
    UnsupportedDatabaseScheme,
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();
    let coordinator = &config.coordinator;

    if coordinator.max_consecutive_failures == 0 {
        return Err(ConfigGuardRailError::ZeroFailureThreshold);
    }
    if coordinator.max_domains_per_worker == 0 {
        return Err(ConfigGuardRailError::ZeroMaxDomains);
    }
    if coordinator.min_domains_per_worker > coordinator.max_domains_per_worker
    {
        return Err(ConfigGuardRailError::DomainRange {
            min: coordinator.min_domains_per_worker,
            max: coordinator.max_domains_per_worker,
        });
    }
    if config.database.max_connections == 0 {
        return Err(ConfigGuardRailError::ZeroConnections);
    }

    match config.database.url.as_deref() {
        Some(url)
            if !(url.starts_with("postgres://")
                || url.starts_with("postgresql://")) =>
        {
            return Err(ConfigGuardRailError::UnsupportedDatabaseScheme);
        }
        Some(_) => {}
        None => warnings.push_with_hint(
            "DATABASE_URL not configured",
            "Set DATABASE_URL or add a [database] url to crawlq.toml",
        ),
    }

    if coordinator.min_domains_per_worker == 0 {
        warnings.push_with_hint(
            "MIN_DOMAINS_PER_WORKER is 0; workers will never acquire domains",
            "Set MIN_DOMAINS_PER_WORKER to at least 1",
        );
    }

    if coordinator.domain_cooldown_secs == 0 {
        warnings.push(
            "DOMAIN_COOLDOWN_SECONDS is 0; domains may be drawn back to back",
        );
    }

    if coordinator.worker_timeout_secs <= coordinator.domain_cooldown_secs {
        warnings.push_with_hint(
            "WORKER_TIMEOUT_SECONDS does not exceed DOMAIN_COOLDOWN_SECONDS",
            "Workers waiting out a cooldown may be evicted before they can draw again",
        );
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        let mut config = Config::default();
        config.database.url = Some("postgres://crawlq@localhost/crawlq".into());
        config
    }

    #[test]
    fn defaults_pass_without_warnings() {
        let warnings = apply_guard_rails(&valid()).unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let mut config = valid();
        config.coordinator.max_consecutive_failures = 0;
        assert_eq!(
            apply_guard_rails(&config).unwrap_err(),
            ConfigGuardRailError::ZeroFailureThreshold
        );
    }

    #[test]
    fn inverted_domain_range_is_rejected() {
        let mut config = valid();
        config.coordinator.min_domains_per_worker = 3;
        config.coordinator.max_domains_per_worker = 2;
        assert_eq!(
            apply_guard_rails(&config).unwrap_err(),
            ConfigGuardRailError::DomainRange { min: 3, max: 2 }
        );
    }

    #[test]
    fn non_postgres_urls_are_rejected() {
        let mut config = valid();
        config.database.url = Some("mysql://localhost/crawlq".into());
        assert_eq!(
            apply_guard_rails(&config).unwrap_err(),
            ConfigGuardRailError::UnsupportedDatabaseScheme
        );

        config.database.url = Some("postgresql://localhost/crawlq".into());
        assert!(apply_guard_rails(&config).is_ok());
    }

    #[test]
    fn missing_database_url_warns() {
        let mut config = valid();
        config.database.url = None;
        let warnings = apply_guard_rails(&config).unwrap();
        assert_eq!(warnings.items.len(), 1);
        assert!(warnings.items[0].message.contains("DATABASE_URL"));
    }

    #[test]
    fn short_worker_timeout_warns() {
        let mut config = valid();
        config.coordinator.worker_timeout_secs = 30;
        let warnings = apply_guard_rails(&config).unwrap();
        assert!(
            warnings
                .items
                .iter()
                .any(|w| w.message.contains("WORKER_TIMEOUT_SECONDS"))
        );
    }
}
