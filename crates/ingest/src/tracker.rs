//! Event tracker: validates, enriches, and records storefront events.
//!
//! Recording is best-effort end to end. Each enrichment step degrades
//! independently to a sentinel, persistence errors are logged and counted,
//! and the returned `Result` may be discarded by the caller, so a tracking
//! problem never surfaces into the shopping flow.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use shoppulse_core::error::AnalyticsResult;
use shoppulse_core::store::EventStore;
use shoppulse_core::types::{EventKind, TrackedEvent, UNKNOWN};

use crate::environment::EnvironmentContext;
use crate::lookup::{GeoLookup, NetworkOriginLookup};
use crate::session::SessionManager;

/// The resolved actor behind a tracked interaction.
#[derive(Debug, Clone, Default)]
pub struct Actor {
    pub user_id: Option<String>,
    pub is_admin: bool,
}

impl Actor {
    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Maps an optional authenticated user id onto an `Actor`, flagging
/// configured administrative accounts.
#[derive(Debug, Clone)]
pub struct ActorResolver {
    admin_users: Vec<String>,
}

impl ActorResolver {
    pub fn new(admin_users: Vec<String>) -> Self {
        Self { admin_users }
    }

    pub fn resolve(&self, user_id: Option<String>) -> Actor {
        let is_admin = user_id
            .as_deref()
            .map(|id| self.admin_users.iter().any(|admin| admin == id))
            .unwrap_or(false);
        Actor { user_id, is_admin }
    }
}

/// Ambient client metadata captured alongside an event.
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    pub agent_string: String,
    pub referrer: Option<String>,
}

/// What a recording call did. Skips are business rules, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Recorded,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NonProduction,
    AdminActor,
    EmptySubject,
}

impl SkipReason {
    fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NonProduction => "non_production",
            SkipReason::AdminActor => "admin_actor",
            SkipReason::EmptySubject => "empty_subject",
        }
    }
}

/// Records page visits and product views into the event store.
pub struct EventTracker {
    store: Arc<dyn EventStore>,
    sessions: SessionManager,
    origin: Arc<dyn NetworkOriginLookup>,
    geo: Arc<dyn GeoLookup>,
    environment: EnvironmentContext,
    lookup_timeout: Duration,
}

impl EventTracker {
    pub fn new(
        store: Arc<dyn EventStore>,
        sessions: SessionManager,
        origin: Arc<dyn NetworkOriginLookup>,
        geo: Arc<dyn GeoLookup>,
        environment: EnvironmentContext,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            store,
            sessions,
            origin,
            geo,
            environment,
            lookup_timeout,
        }
    }

    /// Record a page visit. The referrer argument wins over the ambient
    /// client referrer when both are present.
    pub async fn record_page_visit(
        &self,
        actor: &Actor,
        client: &ClientContext,
        path: &str,
        referrer: Option<&str>,
    ) -> AnalyticsResult<IngestOutcome> {
        self.record(EventKind::PageVisit, path, actor, client, referrer)
            .await
    }

    /// Record a product view.
    pub async fn record_product_view(
        &self,
        actor: &Actor,
        client: &ClientContext,
        product_id: &str,
    ) -> AnalyticsResult<IngestOutcome> {
        self.record(EventKind::ProductView, product_id, actor, client, None)
            .await
    }

    async fn record(
        &self,
        kind: EventKind,
        subject: &str,
        actor: &Actor,
        client: &ClientContext,
        referrer: Option<&str>,
    ) -> AnalyticsResult<IngestOutcome> {
        if subject.trim().is_empty() {
            return Ok(self.skip(kind, SkipReason::EmptySubject));
        }
        // Hard business rule: internal traffic is never recorded,
        // regardless of environment.
        if actor.is_admin {
            return Ok(self.skip(kind, SkipReason::AdminActor));
        }
        // Outside production nothing is written and no lookups run.
        if !self.environment.is_production() {
            return Ok(self.skip(kind, SkipReason::NonProduction));
        }

        let session_id = self.sessions.get_or_create();
        let network_origin = self.resolve_origin().await;
        let location = self.resolve_location(&network_origin).await;

        let event = TrackedEvent {
            event_id: Uuid::new_v4(),
            kind,
            subject: subject.to_string(),
            session_id,
            user_id: actor.user_id.clone(),
            occurred_at: Utc::now(),
            network_origin,
            location,
            agent_string: client.agent_string.clone(),
            referrer: referrer
                .map(str::to_string)
                .or_else(|| client.referrer.clone()),
        };

        if let Err(e) = self.store.insert(event).await {
            metrics::counter!("tracking.store_errors").increment(1);
            warn!(error = %e, kind = kind.as_str(), "event write failed");
            return Err(e);
        }

        metrics::counter!("tracking.recorded", "kind" => kind.as_str()).increment(1);
        Ok(IngestOutcome::Recorded)
    }

    fn skip(&self, kind: EventKind, reason: SkipReason) -> IngestOutcome {
        metrics::counter!("tracking.skipped", "reason" => reason.as_str()).increment(1);
        debug!(kind = kind.as_str(), reason = reason.as_str(), "event skipped");
        IngestOutcome::Skipped(reason)
    }

    async fn resolve_origin(&self) -> String {
        match tokio::time::timeout(self.lookup_timeout, self.origin.resolve()).await {
            Ok(ip) => ip,
            Err(_) => {
                debug!("origin lookup timed out");
                UNKNOWN.to_string()
            }
        }
    }

    async fn resolve_location(&self, origin: &str) -> String {
        if origin == UNKNOWN {
            return UNKNOWN.to_string();
        }
        match tokio::time::timeout(self.lookup_timeout, self.geo.city(origin)).await {
            Ok(city) => city,
            Err(_) => {
                debug!("geo lookup timed out");
                UNKNOWN.to_string()
            }
        }
    }
}
