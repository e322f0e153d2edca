//! In-memory, process-wide log sink.
//!
//! Every producer in the process (the server's stdout/stderr readers and,
//! through [`super::SinkLayer`], ordinary tracing events) appends here. The
//! sink is append-only and bounded: once `capacity` entries are held the
//! oldest are evicted.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use llamad_core::logs::{LogEntry, LogLevel};
use llamad_core::ports::{LogQuery, LogSinkPort, TailError};

#[derive(Debug, Default)]
struct SinkInner {
    entries: VecDeque<LogEntry>,
    last_timestamp: Option<DateTime<Utc>>,
}

/// Shared append-only log store with strictly increasing timestamps.
#[derive(Debug)]
pub struct MemoryLogSink {
    inner: RwLock<SinkInner>,
    capacity: usize,
    available: AtomicBool,
}

impl MemoryLogSink {
    /// Create a sink retaining at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(SinkInner::default()),
            capacity: capacity.max(1),
            available: AtomicBool::new(true),
        }
    }

    /// Append a message, stamping it with the current time.
    ///
    /// Timestamps never repeat: an append within the clock's resolution of
    /// the previous one is pushed forward by one microsecond.
    pub fn append(
        &self,
        subsystem: &str,
        level: LogLevel,
        message: impl Into<String>,
    ) -> DateTime<Utc> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let now = Utc::now();
        let timestamp = match inner.last_timestamp {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        inner.last_timestamp = Some(timestamp);

        if inner.entries.len() >= self.capacity {
            inner.entries.pop_front();
        }
        inner
            .entries
            .push_back(LogEntry::new(timestamp, subsystem, level, message));
        timestamp
    }

    /// Toggle availability. An unavailable sink still accepts appends but
    /// rejects queries.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of retained entries across all subsystems.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LogSinkPort for MemoryLogSink {
    async fn entries(&self, query: &LogQuery) -> Result<Vec<LogEntry>, TailError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(TailError::SinkUnavailable(
                "log store is not accepting queries".to_string(),
            ));
        }

        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.subsystem == query.subsystem)
            .filter(|e| query.since.is_none_or(|since| e.timestamp >= since))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_strictly_increase() {
        let sink = MemoryLogSink::new(100);
        let stamps: Vec<_> = (0..50)
            .map(|i| sink.append("llama-server", LogLevel::Info, format!("line {i}")))
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_query_filters_subsystem_and_since() {
        let sink = MemoryLogSink::new(100);
        sink.append("llama-server", LogLevel::Info, "one");
        sink.append("other", LogLevel::Info, "unrelated");
        let second = sink.append("llama-server", LogLevel::Error, "two");
        sink.append("llama-server", LogLevel::Info, "three");

        let all = sink
            .entries(&LogQuery::new("llama-server", None))
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let since = sink
            .entries(&LogQuery::new("llama-server", Some(second)))
            .await
            .unwrap();
        let messages: Vec<_> = since.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["two", "three"]);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let sink = MemoryLogSink::new(3);
        for i in 0..5 {
            sink.append("s", LogLevel::Debug, format!("{i}"));
        }
        assert_eq!(sink.len(), 3);
    }

    #[tokio::test]
    async fn test_unavailable_sink_rejects_queries() {
        let sink = MemoryLogSink::new(10);
        sink.set_available(false);
        let result = sink.entries(&LogQuery::new("s", None)).await;
        assert!(matches!(result, Err(TailError::SinkUnavailable(_))));

        sink.set_available(true);
        assert!(sink.entries(&LogQuery::new("s", None)).await.is_ok());
    }
}
