//! Best-effort enrichment lookups: apparent client IP and coarse
//! city-level geolocation. Failures return the `"unknown"` sentinel,
//! never an error into the ingest path.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use shoppulse_core::error::{AnalyticsError, AnalyticsResult};
use shoppulse_core::types::UNKNOWN;

/// Resolves the caller's apparent network origin (IP address).
#[async_trait]
pub trait NetworkOriginLookup: Send + Sync {
    /// Returns the IP, or `"unknown"` on any failure.
    async fn resolve(&self) -> String;
}

/// Maps a network origin to a city-level label.
#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// Returns the city, or `"unknown"` on any failure.
    async fn city(&self, ip: &str) -> String;
}

#[derive(Debug, Deserialize)]
struct OriginResponse {
    ip: String,
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    city: Option<String>,
}

/// HTTP origin lookup against an ipify-style endpoint returning `{"ip": ...}`.
pub struct HttpOriginLookup {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpOriginLookup {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> AnalyticsResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalyticsError::Lookup(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl NetworkOriginLookup for HttpOriginLookup {
    async fn resolve(&self) -> String {
        let response = match self.client.get(&self.endpoint).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "origin lookup request failed");
                return UNKNOWN.to_string();
            }
        };
        match response.json::<OriginResponse>().await {
            Ok(origin) if !origin.ip.trim().is_empty() => origin.ip,
            Ok(_) => UNKNOWN.to_string(),
            Err(e) => {
                debug!(error = %e, "origin lookup returned an unreadable body");
                UNKNOWN.to_string()
            }
        }
    }
}

/// HTTP geolocation lookup against an ipapi-style endpoint
/// (`GET {base}/{ip}/json/` returning `{"city": ...}`).
pub struct HttpGeoLookup {
    client: reqwest::Client,
    base: String,
}

impl HttpGeoLookup {
    pub fn new(base: impl Into<String>, timeout: Duration) -> AnalyticsResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalyticsError::Lookup(e.to_string()))?;
        Ok(Self {
            client,
            base: base.into(),
        })
    }
}

#[async_trait]
impl GeoLookup for HttpGeoLookup {
    async fn city(&self, ip: &str) -> String {
        if ip.is_empty() || ip == UNKNOWN {
            return UNKNOWN.to_string();
        }
        let url = match Url::parse(&format!("{}/{}/json/", self.base.trim_end_matches('/'), ip)) {
            Ok(url) => url,
            Err(e) => {
                debug!(error = %e, ip = %ip, "geo lookup url rejected");
                return UNKNOWN.to_string();
            }
        };
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "geo lookup request failed");
                return UNKNOWN.to_string();
            }
        };
        match response.json::<GeoResponse>().await {
            Ok(GeoResponse { city: Some(city) }) if !city.trim().is_empty() => city,
            Ok(_) => UNKNOWN.to_string(),
            Err(e) => {
                debug!(error = %e, "geo lookup returned an unreadable body");
                UNKNOWN.to_string()
            }
        }
    }
}
