//! Process management for llama-server.
//!
//! # Structure
//!
//! - `launcher` - Binary resolution and spawning (implements `ServerLauncher`)
//! - `manager` - Start/stop/restart state machine
//! - `shutdown` - SIGTERM → SIGKILL escalation
//! - `stream` - stdout/stderr capture into the log sink

mod launcher;
mod manager;
mod shutdown;
mod stream;

pub use launcher::{
    BinaryError, DEFAULT_STARTUP_GRACE, LlamaServerLauncher, LlamaServerProcess,
    SERVER_BINARY_NAME, resolve_server_binary,
};
pub use manager::ProcessLifecycleManager;
pub use shutdown::{TERM_GRACE, shutdown_child};
pub use stream::spawn_stream_reader;
