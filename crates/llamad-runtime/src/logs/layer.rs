//! Tracing layer that records events into a [`MemoryLogSink`].
//!
//! With this layer installed the sink holds every tracing event of the
//! process, tagged by target, next to the server's own output.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use llamad_core::logs::LogLevel;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use super::MemoryLogSink;

/// `tracing_subscriber` layer feeding a [`MemoryLogSink`].
#[derive(Debug, Clone)]
pub struct SinkLayer {
    sink: Arc<MemoryLogSink>,
}

impl SinkLayer {
    pub const fn new(sink: Arc<MemoryLogSink>) -> Self {
        Self { sink }
    }
}

fn level_of(level: &Level) -> LogLevel {
    match *level {
        Level::ERROR => LogLevel::Error,
        Level::WARN => LogLevel::Notice,
        Level::INFO => LogLevel::Info,
        _ => LogLevel::Debug,
    }
}

/// Collects the `message` field plus `key=value` for the rest.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.trim_start().to_string()
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

impl<S: Subscriber> Layer<S> for SinkLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.sink
            .append(metadata.target(), level_of(metadata.level()), visitor.finish());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llamad_core::ports::{LogQuery, LogSinkPort};
    use tracing_subscriber::layer::SubscriberExt;

    #[tokio::test]
    async fn test_events_land_in_sink() {
        let sink = Arc::new(MemoryLogSink::new(100));
        let subscriber = tracing_subscriber::registry().with(SinkLayer::new(sink.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "model-loader", port = 8080, "slow start");
            tracing::info!(target: "elsewhere", "unrelated");
        });

        let entries = sink
            .entries(&LogQuery::new("model-loader", None))
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Notice);
        assert_eq!(entries[0].message, "slow start port=8080");
        assert_eq!(sink.len(), 2);
    }
}
