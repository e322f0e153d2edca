//! Incremental log tailer.
//!
//! Each cycle queries the sink for the server's subsystem from the cursor
//! onward, drops everything not strictly newer than the cursor, appends the
//! rest to an observable buffer and advances the cursor to the last
//! accepted timestamp. A failed query leaves the cursor where it was.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use llamad_core::logs::LogEntry;
use llamad_core::ports::{LogQuery, LogSinkPort, TailError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::poll::{PollCycle, spawn_poll_loop};

/// Observable contents of the tailer.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: Option<usize>,
    loading: bool,
    accepted: u64,
}

impl LogBuffer {
    fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            loading: true,
            accepted: 0,
        }
    }

    fn push(&mut self, entry: LogEntry) {
        if let Some(cap) = self.capacity {
            while self.entries.len() >= cap.max(1) {
                self.entries.pop_front();
            }
        }
        self.entries.push_back(entry);
        self.accepted += 1;
    }

    /// Entries in timestamp order, oldest first.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True until the first successful poll.
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Entries accepted since the tailer started, including evicted and
    /// cleared ones.
    pub const fn accepted(&self) -> u64 {
        self.accepted
    }

    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

/// Read handle on a tailer's buffer. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LogView {
    tx: Arc<watch::Sender<LogBuffer>>,
}

impl LogView {
    /// Receiver notified after every cycle that changed the buffer.
    pub fn subscribe(&self) -> watch::Receiver<LogBuffer> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.tx.borrow().entries().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.tx.borrow().is_loading()
    }

    /// Empty the buffer. The tailer's cursor is untouched, so cleared
    /// entries are never fetched again.
    pub fn clear(&self) {
        self.tx.send_if_modified(|buffer| {
            if buffer.entries.is_empty() {
                return false;
            }
            buffer.entries.clear();
            true
        });
    }
}

/// Polls a [`LogSinkPort`] for one subsystem.
pub struct LogTailer {
    sink: Arc<dyn LogSinkPort>,
    subsystem: String,
    cursor: Option<DateTime<Utc>>,
    view: LogView,
}

impl LogTailer {
    /// `capacity` caps the buffer; `None` keeps every entry.
    pub fn new(
        sink: Arc<dyn LogSinkPort>,
        subsystem: impl Into<String>,
        capacity: Option<usize>,
    ) -> Self {
        let (tx, _rx) = watch::channel(LogBuffer::new(capacity));
        Self {
            sink,
            subsystem: subsystem.into(),
            cursor: None,
            view: LogView { tx: Arc::new(tx) },
        }
    }

    /// Timestamp of the most recently accepted entry.
    pub const fn cursor(&self) -> Option<DateTime<Utc>> {
        self.cursor
    }

    pub fn view(&self) -> LogView {
        self.view.clone()
    }

    /// Run one poll cycle and return the number of entries appended.
    pub async fn poll_once(&mut self) -> Result<usize, TailError> {
        let query = LogQuery::new(self.subsystem.clone(), self.cursor);
        let fetched = self.sink.entries(&query).await?;

        let mut watermark = self.cursor;
        let fresh: Vec<LogEntry> = fetched
            .into_iter()
            .filter(|entry| {
                if watermark.is_some_and(|mark| entry.timestamp <= mark) {
                    return false;
                }
                watermark = Some(entry.timestamp);
                true
            })
            .collect();

        let appended = fresh.len();
        self.cursor = watermark;
        self.view.tx.send_if_modified(|buffer| {
            let was_loading = std::mem::replace(&mut buffer.loading, false);
            for entry in fresh {
                buffer.push(entry);
            }
            was_loading || appended > 0
        });

        if appended > 0 {
            debug!(subsystem = %self.subsystem, appended, cursor = ?self.cursor, "Tailed log entries");
        }
        Ok(appended)
    }

    /// Poll every `period` until `cancel` fires. The tailer is handed back
    /// when the loop ends.
    pub fn spawn(self, period: Duration, cancel: CancellationToken) -> JoinHandle<Self> {
        spawn_poll_loop("log-tailer", self, period, cancel)
    }
}

#[async_trait]
impl PollCycle for LogTailer {
    async fn cycle(&mut self) {
        if let Err(e) = self.poll_once().await {
            warn!(subsystem = %self.subsystem, error = %e, "Skipping log poll cycle");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use llamad_core::logs::LogLevel;
    use std::sync::Mutex;

    /// Sink replaying scripted batches and recording the queries it saw.
    #[derive(Default)]
    struct ScriptedSink {
        batches: Mutex<VecDeque<Result<Vec<LogEntry>, TailError>>>,
        queries: Mutex<Vec<LogQuery>>,
    }

    impl ScriptedSink {
        fn push(&self, batch: Result<Vec<LogEntry>, TailError>) {
            self.batches.lock().unwrap().push_back(batch);
        }

        fn last_since(&self) -> Option<DateTime<Utc>> {
            self.queries.lock().unwrap().last().and_then(|q| q.since)
        }
    }

    #[async_trait]
    impl LogSinkPort for ScriptedSink {
        async fn entries(&self, query: &LogQuery) -> Result<Vec<LogEntry>, TailError> {
            self.queries.lock().unwrap().push(query.clone());
            self.batches
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn entry(secs: i64) -> LogEntry {
        LogEntry::new(at(secs), "llama-server", LogLevel::Info, format!("t={secs}"))
    }

    fn batch(secs: &[i64]) -> Result<Vec<LogEntry>, TailError> {
        Ok(secs.iter().map(|s| entry(*s)).collect())
    }

    fn timestamps(view: &LogView) -> Vec<DateTime<Utc>> {
        view.snapshot().iter().map(|e| e.timestamp).collect()
    }

    fn tailer(sink: &Arc<ScriptedSink>, capacity: Option<usize>) -> LogTailer {
        LogTailer::new(sink.clone(), "llama-server", capacity)
    }

    #[tokio::test]
    async fn test_boundary_entry_is_deduplicated() {
        let sink = Arc::new(ScriptedSink::default());
        sink.push(batch(&[1, 2, 3]));
        sink.push(batch(&[3, 4]));
        let mut tailer = tailer(&sink, None);
        let view = tailer.view();

        assert_eq!(tailer.poll_once().await.unwrap(), 3);
        assert_eq!(tailer.cursor(), Some(at(3)));
        assert_eq!(timestamps(&view), vec![at(1), at(2), at(3)]);

        assert_eq!(tailer.poll_once().await.unwrap(), 1);
        assert_eq!(sink.last_since(), Some(at(3)));
        assert_eq!(tailer.cursor(), Some(at(4)));
        assert_eq!(timestamps(&view), vec![at(1), at(2), at(3), at(4)]);
    }

    #[tokio::test]
    async fn test_clear_does_not_replay() {
        let sink = Arc::new(ScriptedSink::default());
        sink.push(batch(&[1, 2, 3]));
        sink.push(batch(&[3]));
        let mut tailer = tailer(&sink, None);
        let view = tailer.view();

        tailer.poll_once().await.unwrap();
        view.clear();
        assert!(view.is_empty());

        assert_eq!(tailer.poll_once().await.unwrap(), 0);
        assert!(view.is_empty());
        assert_eq!(tailer.cursor(), Some(at(3)));
    }

    #[tokio::test]
    async fn test_unavailable_sink_keeps_cursor() {
        let sink = Arc::new(ScriptedSink::default());
        sink.push(batch(&[1]));
        sink.push(Err(TailError::SinkUnavailable("store offline".into())));
        sink.push(Err(TailError::SinkUnavailable("store offline".into())));
        sink.push(batch(&[1, 2]));
        let mut tailer = tailer(&sink, None);

        tailer.poll_once().await.unwrap();
        assert!(tailer.poll_once().await.is_err());
        assert_eq!(tailer.cursor(), Some(at(1)));

        // Loop entry point swallows the error
        tailer.cycle().await;
        assert_eq!(tailer.cursor(), Some(at(1)));

        tailer.poll_once().await.unwrap();
        assert_eq!(tailer.cursor(), Some(at(2)));
        assert_eq!(tailer.view().len(), 2);
    }

    #[tokio::test]
    async fn test_repeated_and_stale_timestamps_within_batch() {
        let sink = Arc::new(ScriptedSink::default());
        sink.push(batch(&[1, 2, 2, 1, 3]));
        let mut tailer = tailer(&sink, None);

        assert_eq!(tailer.poll_once().await.unwrap(), 3);
        assert_eq!(timestamps(&tailer.view()), vec![at(1), at(2), at(3)]);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let sink = Arc::new(ScriptedSink::default());
        sink.push(batch(&[1, 2, 3]));
        sink.push(batch(&[4, 5]));
        let mut tailer = tailer(&sink, Some(3));
        let view = tailer.view();

        tailer.poll_once().await.unwrap();
        tailer.poll_once().await.unwrap();
        assert_eq!(timestamps(&view), vec![at(3), at(4), at(5)]);
        assert_eq!(view.subscribe().borrow().accepted(), 5);
    }

    #[tokio::test]
    async fn test_loading_flag_and_notifications() {
        let sink = Arc::new(ScriptedSink::default());
        let mut tailer = tailer(&sink, None);
        let view = tailer.view();
        let mut rx = view.subscribe();
        assert!(view.is_loading());

        // First successful poll clears the loading flag even without entries
        tailer.poll_once().await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_loading());

        // An empty poll afterwards does not notify
        tailer.poll_once().await.unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_loop_polls_and_stops() {
        let sink = Arc::new(ScriptedSink::default());
        sink.push(batch(&[1]));
        sink.push(batch(&[2]));
        let cancel = CancellationToken::new();
        let handle = tailer(&sink, None).spawn(Duration::from_secs(1), cancel.clone());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        cancel.cancel();
        let tailer = handle.await.unwrap();
        assert_eq!(tailer.cursor(), Some(at(2)));
        assert_eq!(tailer.view().len(), 2);
    }
}
