//! Server configuration model.
//!
//! A [`ServerConfig`] is the validated, immutable description of one
//! llama-server run. It is built fresh from raw user input for every
//! start/restart request via [`ServerConfig::build`] and handed by value to
//! the lifecycle manager.
//!
//! # Structure
//!
//! - `raw` - Untyped field values as they arrive from an input surface
//! - `builder` - Validation and defaulting (`RawFields` → `ServerConfig`)
//! - `args` - Serialization into the llama-server argument vector

mod args;
mod builder;
mod raw;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub use builder::FIELD_NAMES;
pub use raw::{RawFields, RawValue};

/// Default prompt context size.
pub const DEFAULT_CTX_SIZE: u32 = 4096;

/// Default server read/write timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u32 = 600;

/// Default port the server listens on.
pub const DEFAULT_PORT: u16 = 8080;

/// Output format of the server's own logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    /// Value passed on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated configuration for one llama-server run.
///
/// Every optional field is either `None` (the server's own default applies)
/// or a validated value. `ctx_size`, `timeout` and `port` always carry a value
/// because the supervisor applies its own defaults for them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerConfig {
    // === Model source ===
    /// Local GGUF model file (required, readable).
    pub model_path: PathBuf,
    /// Remote URL to download the model from.
    pub model_url: Option<String>,
    /// Alias reported in API responses.
    pub alias: Option<String>,

    // === Threads ===
    pub threads: Option<u32>,
    pub threads_batch: Option<u32>,
    pub threads_http: Option<u32>,

    // === Context & batching ===
    pub ctx_size: u32,
    pub batch_size: Option<u32>,
    pub parallel: Option<u32>,
    pub n_predict: Option<u32>,
    pub grp_attn_n: Option<u32>,
    pub grp_attn_w: Option<u32>,

    // === GPU offload ===
    pub n_gpu_layers: Option<u32>,
    pub main_gpu: Option<u32>,
    /// Proportions of large tensors per GPU.
    pub tensor_split: Vec<f32>,

    // === Memory ===
    pub memory_f32: bool,
    pub mlock: bool,
    pub no_mmap: bool,
    pub numa: Option<String>,

    // === Adapters & prompt files ===
    pub lora: Option<PathBuf>,
    pub lora_base: Option<PathBuf>,
    pub mmproj: Option<PathBuf>,
    pub system_prompt_file: Option<PathBuf>,
    pub chat_template: Option<String>,

    // === Network ===
    pub host: Option<String>,
    pub port: u16,
    /// Read/write timeout in seconds.
    pub timeout: u32,
    /// Directory to serve static files from.
    pub static_path: Option<PathBuf>,

    // === Auth ===
    pub api_keys: Vec<String>,
    pub api_key_file: Option<PathBuf>,

    // === Feature toggles ===
    pub embedding: bool,
    pub cont_batching: bool,
    pub metrics: bool,
    pub slots_endpoint_disable: bool,

    // === Server logging ===
    pub log_disable: bool,
    pub log_format: Option<LogFormat>,
}

/// Errors raised while building a [`ServerConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No model path was given, or it cannot be read.
    #[error("A readable model file is required: {0}")]
    MissingModel(String),

    /// A field carried a value that failed validation.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
