use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `SHOP_PULSE__` and TOML config files.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub clickhouse: ClickHouseConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClickHouseConfig {
    #[serde(default = "default_clickhouse_url")]
    pub url: String,
    #[serde(default = "default_clickhouse_db")]
    pub database: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

/// Ingestion gating and enrichment settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Explicit production flag. When false, ingestion still activates if
    /// the deployment hostname matches `production_hosts`.
    #[serde(default = "default_production")]
    pub production: bool,
    #[serde(default = "default_production_hosts")]
    pub production_hosts: Vec<String>,
    /// User ids whose activity is never recorded.
    #[serde(default)]
    pub admin_users: Vec<String>,
    #[serde(default = "default_origin_endpoint")]
    pub origin_endpoint: String,
    #[serde(default = "default_geo_endpoint")]
    pub geo_endpoint: String,
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default functions
fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_clickhouse_url() -> String {
    "http://localhost:8123".to_string()
}
fn default_clickhouse_db() -> String {
    "shop_pulse".to_string()
}
fn default_batch_size() -> usize {
    10000
}
fn default_flush_interval_ms() -> u64 {
    1000
}
fn default_production() -> bool {
    false
}
fn default_production_hosts() -> Vec<String> {
    vec!["shop.example.com".to_string(), "www.shop.example.com".to_string()]
}
fn default_origin_endpoint() -> String {
    "https://api.ipify.org?format=json".to_string()
}
fn default_geo_endpoint() -> String {
    "https://ipapi.co".to_string()
}
fn default_lookup_timeout_ms() -> u64 {
    2000
}
fn default_metrics_port() -> u16 {
    9091
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: default_clickhouse_url(),
            database: default_clickhouse_db(),
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            production: default_production(),
            production_hosts: default_production_hosts(),
            admin_users: Vec::new(),
            origin_endpoint: default_origin_endpoint(),
            geo_endpoint: default_geo_endpoint(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            clickhouse: ClickHouseConfig::default(),
            tracking: TrackingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and optional config file.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("SHOP_PULSE")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
