//! Network command ingestion and discovery pacing

pub mod channel;

pub use channel::{CommandChannel, IgnoreReason, IngestOutcome, ProtocolStats};
