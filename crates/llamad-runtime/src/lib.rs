//! Runtime adapters for llamad.
//!
//! Implements the ports defined in `llamad-core`: launching and supervising
//! llama-server, the in-memory log sink and its tailer, and the status
//! poller. [`SupervisorContext`] wires them together.
#![deny(unsafe_code)]

pub mod access;
pub mod context;
pub mod logs;
pub mod poll;
pub mod process;
pub mod status;

pub use access::FileModelAccess;
pub use context::SupervisorContext;
pub use logs::{LogBuffer, LogTailer, LogView, MemoryLogSink, SinkLayer};
pub use poll::{PollCycle, spawn_poll_loop};
pub use process::{LlamaServerLauncher, ProcessLifecycleManager, resolve_server_binary};
pub use status::{StatusPoller, StatusSource};
