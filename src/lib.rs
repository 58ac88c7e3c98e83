//! gslb-dns - An authoritative Global Server Load Balancing DNS server.
//!
//! Answers are synthesized per query: a matched label either carries static
//! record sets (sampled by administrative weight) or falls through to a
//! per-platform node pool filtered by active TCP health checks. Zone and
//! node files are hot-reloaded from disk.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                           gslb-dns                             │
//! │                                                                │
//! │  ┌───────────┐   polls    ┌─────────────────────────┐          │
//! │  │ Reloader  │───────────▶│ ServerContext           │          │
//! │  │ (config,  │  swaps     │  zones / platform pool  │          │
//! │  │  zones,   │            │  health registry        │          │
//! │  │  nodes)   │            └───────────┬─────────────┘          │
//! │  └───────────┘                        │                        │
//! │        │ reconciles                   ▼                        │
//! │        │                    ┌──────────────────┐               │
//! │        │                    │  GslbHandler     │◀── UDP/TCP    │
//! │        └───────────────────▶│  (Hickory DNS)   │     :53       │
//! │   probe tasks (tcp dial)    └──────────────────┘               │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Resolution
//!
//! ```text
//! A gw.svc
//!   → match zone "svc", relative label "gw"
//!   → alias / cname / qtype walk over the label tree
//!   → static records? weighted sample without replacement
//!   → otherwise platform pool "svc", area "@": healthy nodes by weight
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod health;
pub mod loader;
pub mod metrics;
pub mod platform;
pub mod qlog;
pub mod reload;
pub mod resolver;
pub mod sampler;
pub mod server;
pub mod state;
pub mod telemetry;
pub mod zone;

// Re-export main types
pub use config::GslbConfig;
pub use error::GslbError;
pub use health::HealthRegistry;
pub use platform::PlatformPool;
pub use reload::Reloader;
pub use resolver::GslbHandler;
pub use server::GslbServer;
pub use state::ServerContext;
pub use zone::Zone;
