//! ClickHouse event store. Writes ride a channel into a background batch
//! writer so ingestion never waits on the database; reads are bounded
//! range queries mapped back onto `TrackedEvent`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shoppulse_core::config::ClickHouseConfig;
use shoppulse_core::error::{AnalyticsError, AnalyticsResult};
use shoppulse_core::store::EventStore;
use shoppulse_core::types::{EventFilter, EventKind, TrackedEvent};

/// Event store with a background batch writer.
pub struct ClickHouseEventStore {
    client: clickhouse::Client,
    sender: mpsc::Sender<TrackedEvent>,
}

impl ClickHouseEventStore {
    /// Create the store, verify the schema, and spawn the batch writer.
    pub async fn new(config: &ClickHouseConfig) -> anyhow::Result<Self> {
        let client = clickhouse::Client::default()
            .with_url(&config.url)
            .with_database(&config.database);

        Self::ensure_schema(&client).await?;

        let (sender, receiver) = mpsc::channel::<TrackedEvent>(100_000);
        let writer = BatchWriter {
            client: client.clone(),
        };
        let batch_size = config.batch_size;
        let flush_interval = Duration::from_millis(config.flush_interval_ms);

        // Spawn background batch writer
        tokio::spawn(async move {
            writer.run(receiver, batch_size, flush_interval).await;
        });

        info!("Event store initialized with ClickHouse backend");

        Ok(Self { client, sender })
    }

    async fn ensure_schema(client: &clickhouse::Client) -> anyhow::Result<()> {
        client
            .query(
                "CREATE TABLE IF NOT EXISTS tracked_events (
                    event_id UUID,
                    kind String,
                    subject String,
                    session_id String,
                    user_id Nullable(String),
                    occurred_at DateTime64(3),
                    network_origin String,
                    location String,
                    agent_string String,
                    referrer Nullable(String)
                ) ENGINE = MergeTree()
                ORDER BY (occurred_at, kind)
                PARTITION BY toYYYYMM(occurred_at)
                TTL toDateTime(occurred_at) + INTERVAL 365 DAY",
            )
            .execute()
            .await?;

        info!("ClickHouse schema verified");
        Ok(())
    }
}

#[async_trait]
impl EventStore for ClickHouseEventStore {
    async fn insert(&self, event: TrackedEvent) -> AnalyticsResult<()> {
        if let Err(e) = self.sender.try_send(event) {
            metrics::counter!("events.dropped").increment(1);
            warn!("Tracked event dropped: {}", e);
            return Err(AnalyticsError::Store(format!("event queue unavailable: {e}")));
        }
        metrics::counter!("events.queued").increment(1);
        Ok(())
    }

    async fn query(&self, filter: &EventFilter) -> AnalyticsResult<Vec<TrackedEvent>> {
        let sql = build_query(filter);
        let rows = self
            .client
            .query(&sql)
            .fetch_all::<EventRow>()
            .await
            .map_err(|e| AnalyticsError::Store(e.to_string()))?;
        Ok(rows.into_iter().filter_map(EventRow::into_event).collect())
    }
}

fn build_query(filter: &EventFilter) -> String {
    let mut conditions = Vec::new();
    if let Some(kind) = filter.kind {
        conditions.push(format!("kind = '{}'", kind.as_str()));
    }
    if let Some(since) = filter.since {
        conditions.push(format!(
            "occurred_at >= toDateTime64('{}', 3)",
            since.format("%Y-%m-%d %H:%M:%S%.3f")
        ));
    }
    if let Some(until) = filter.until {
        conditions.push(format!(
            "occurred_at <= toDateTime64('{}', 3)",
            until.format("%Y-%m-%d %H:%M:%S%.3f")
        ));
    }
    if let Some(subject) = &filter.subject {
        conditions.push(format!("subject = '{}'", escape(subject)));
    }

    let mut sql = String::from(
        "SELECT toString(event_id) AS event_id, kind, subject, session_id, user_id, \
         toString(occurred_at) AS occurred_at, network_origin, location, agent_string, referrer \
         FROM tracked_events",
    );
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY occurred_at");
    sql
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[derive(Debug, clickhouse::Row, Deserialize)]
struct EventRow {
    event_id: String,
    kind: String,
    subject: String,
    session_id: String,
    user_id: Option<String>,
    occurred_at: String,
    network_origin: String,
    location: String,
    agent_string: String,
    referrer: Option<String>,
}

impl EventRow {
    /// Rows that fail to map are dropped with a log rather than failing
    /// the whole query.
    fn into_event(self) -> Option<TrackedEvent> {
        let kind = match EventKind::parse(&self.kind) {
            Some(kind) => kind,
            None => {
                debug!(kind = %self.kind, "dropping row with unrecognized kind");
                return None;
            }
        };
        let occurred_at = parse_timestamp(&self.occurred_at)?;
        let event_id = Uuid::parse_str(&self.event_id).ok()?;
        Some(TrackedEvent {
            event_id,
            kind,
            subject: self.subject,
            session_id: self.session_id,
            user_id: self.user_id,
            occurred_at,
            network_origin: self.network_origin,
            location: self.location,
            agent_string: self.agent_string,
            referrer: self.referrer,
        })
    }
}

fn parse_timestamp(value: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.3f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Background writer that batches events and flushes to ClickHouse.
struct BatchWriter {
    client: clickhouse::Client,
}

impl BatchWriter {
    async fn run(
        self,
        mut receiver: mpsc::Receiver<TrackedEvent>,
        batch_size: usize,
        flush_interval: Duration,
    ) {
        let mut buffer: Vec<TrackedEvent> = Vec::with_capacity(batch_size);
        let mut interval = tokio::time::interval(flush_interval);

        loop {
            tokio::select! {
                Some(event) = receiver.recv() => {
                    buffer.push(event);
                    if buffer.len() >= batch_size {
                        self.flush(&mut buffer).await;
                    }
                }
                _ = interval.tick() => {
                    if !buffer.is_empty() {
                        self.flush(&mut buffer).await;
                    }
                }
            }
        }
    }

    async fn flush(&self, buffer: &mut Vec<TrackedEvent>) {
        let count = buffer.len();
        debug!(count = count, "Flushing event batch to ClickHouse");

        // Serialize events as NDJSON and insert
        let mut json_rows = Vec::with_capacity(buffer.len());
        for event in buffer.iter() {
            if let Ok(json) = serde_json::to_string(event) {
                json_rows.push(json);
            }
        }

        if json_rows.is_empty() {
            buffer.clear();
            return;
        }

        let insert_sql = format!(
            "INSERT INTO tracked_events SETTINGS date_time_input_format='best_effort' FORMAT JSONEachRow {}",
            json_rows.join("\n")
        );

        match self.client.query(&insert_sql).execute().await {
            Ok(_) => {
                metrics::counter!("events.flushed").increment(count as u64);
                debug!(count = count, "Event batch flushed successfully");
            }
            Err(e) => {
                metrics::counter!("events.flush_errors").increment(1);
                error!(error = %e, count = count, "Failed to flush event batch");
            }
        }

        buffer.clear();
    }
}
