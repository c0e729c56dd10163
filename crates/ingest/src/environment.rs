//! Deployment environment classification. Ingestion only runs in
//! production; every other environment is a no-op.

use shoppulse_core::config::TrackingConfig;

/// Explicit environment input threaded through the ingestor instead of
/// read from ambient globals.
#[derive(Debug, Clone)]
pub struct EnvironmentContext {
    production: bool,
    hostname: String,
    production_hosts: Vec<String>,
}

impl EnvironmentContext {
    pub fn new(production: bool, hostname: impl Into<String>, production_hosts: Vec<String>) -> Self {
        Self {
            production,
            hostname: hostname.into(),
            production_hosts,
        }
    }

    pub fn from_config(config: &TrackingConfig, hostname: impl Into<String>) -> Self {
        Self::new(config.production, hostname, config.production_hosts.clone())
    }

    /// True when the explicit flag is set or the hostname is on the
    /// production allow-list.
    pub fn is_production(&self) -> bool {
        self.production
            || self
                .production_hosts
                .iter()
                .any(|host| host.eq_ignore_ascii_case(&self.hostname))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_flag_wins() {
        let env = EnvironmentContext::new(true, "localhost", vec![]);
        assert!(env.is_production());
    }

    #[test]
    fn test_hostname_allow_list() {
        let hosts = vec!["shop.example.com".to_string()];
        let env = EnvironmentContext::new(false, "SHOP.example.com", hosts.clone());
        assert!(env.is_production());

        let env = EnvironmentContext::new(false, "staging.example.com", hosts);
        assert!(!env.is_production());
    }

    #[test]
    fn test_default_config_is_not_production() {
        let env = EnvironmentContext::from_config(&TrackingConfig::default(), "localhost");
        assert!(!env.is_production());
    }
}
