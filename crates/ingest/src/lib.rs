//! Storefront event ingestion: session identity, environment gating,
//! best-effort enrichment lookups, and the event tracker.

pub mod environment;
pub mod lookup;
pub mod session;
pub mod tracker;

pub use environment::EnvironmentContext;
pub use lookup::{GeoLookup, HttpGeoLookup, HttpOriginLookup, NetworkOriginLookup};
pub use session::{MemorySessionStorage, SessionManager, SessionStorage};
pub use tracker::{Actor, ActorResolver, ClientContext, EventTracker, IngestOutcome, SkipReason};
