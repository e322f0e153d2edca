//! Log sink port.
//!
//! The sink is a shared, append-only store of log entries produced by many
//! subsystems. Consumers query it incrementally by subsystem tag and a
//! lower time bound.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::logs::LogEntry;

/// Incremental query against the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    /// Only entries tagged with this subsystem.
    pub subsystem: String,
    /// Inclusive lower bound; `None` reads from the sink's horizon.
    pub since: Option<DateTime<Utc>>,
}

impl LogQuery {
    pub fn new(subsystem: impl Into<String>, since: Option<DateTime<Utc>>) -> Self {
        Self {
            subsystem: subsystem.into(),
            since,
        }
    }
}

/// Errors from tailing the sink. Never fatal to the polling loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TailError {
    #[error("Log sink unavailable: {0}")]
    SinkUnavailable(String),
}

/// Read side of a log sink.
#[async_trait]
pub trait LogSinkPort: Send + Sync {
    /// Entries matching `query`, in sink order.
    async fn entries(&self, query: &LogQuery) -> Result<Vec<LogEntry>, TailError>;
}
