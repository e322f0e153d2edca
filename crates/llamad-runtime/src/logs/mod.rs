//! Log sink, tracing bridge and tailer.

mod layer;
mod sink;
mod tailer;

pub use layer::SinkLayer;
pub use sink::MemoryLogSink;
pub use tailer::{LogBuffer, LogTailer, LogView};
