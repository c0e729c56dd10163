//! ClickHouse-backed event store with a channel-based batch writer.

pub mod store;

pub use store::ClickHouseEventStore;
