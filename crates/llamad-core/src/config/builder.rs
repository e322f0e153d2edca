//! Validation and defaulting of raw fields into a [`ServerConfig`].

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::raw::{RawFields, RawValue};
use super::{
    ConfigError, DEFAULT_CTX_SIZE, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS, LogFormat, ServerConfig,
};

/// Every field name the builder understands (normalized form).
pub const FIELD_NAMES: &[&str] = &[
    "model",
    "model-url",
    "alias",
    "threads",
    "threads-batch",
    "threads-http",
    "ctx-size",
    "batch-size",
    "parallel",
    "n-predict",
    "grp-attn-n",
    "grp-attn-w",
    "n-gpu-layers",
    "main-gpu",
    "tensor-split",
    "memory-f32",
    "mlock",
    "no-mmap",
    "numa",
    "lora",
    "lora-base",
    "mmproj",
    "system-prompt-file",
    "chat-template",
    "host",
    "port",
    "timeout",
    "path",
    "api-key",
    "api-key-file",
    "embedding",
    "cont-batching",
    "metrics",
    "slots-endpoint-disable",
    "log-disable",
    "log-format",
];

impl ServerConfig {
    /// Build a validated configuration from raw field values.
    ///
    /// The model path is checked first, so any input without a readable
    /// model fails with [`ConfigError::MissingModel`] regardless of the other
    /// fields. Absent optional fields take the documented defaults.
    pub fn build(raw: &RawFields) -> Result<Self, ConfigError> {
        let reader = FieldReader { raw };

        let model_path = reader.path("model")?.ok_or_else(|| {
            ConfigError::MissingModel("no model path was provided".to_string())
        })?;
        check_model_readable(&model_path)?;

        if let Some((name, _)) = raw.iter().find(|(name, _)| !FIELD_NAMES.contains(name)) {
            return Err(ConfigError::invalid(name, "unknown option"));
        }

        let config = Self {
            model_path,
            model_url: reader.text("model-url")?,
            alias: reader.text("alias")?,
            threads: reader.count("threads")?,
            threads_batch: reader.count("threads-batch")?,
            threads_http: reader.count("threads-http")?,
            ctx_size: reader.count("ctx-size")?.unwrap_or(DEFAULT_CTX_SIZE),
            batch_size: reader.count("batch-size")?,
            parallel: reader.count("parallel")?,
            n_predict: reader.count("n-predict")?,
            grp_attn_n: reader.count("grp-attn-n")?,
            grp_attn_w: reader.count("grp-attn-w")?,
            n_gpu_layers: reader.count("n-gpu-layers")?,
            main_gpu: reader.count("main-gpu")?,
            tensor_split: reader.proportions("tensor-split")?,
            memory_f32: reader.flag("memory-f32")?,
            mlock: reader.flag("mlock")?,
            no_mmap: reader.flag("no-mmap")?,
            numa: reader.text("numa")?,
            lora: reader.path("lora")?,
            lora_base: reader.path("lora-base")?,
            mmproj: reader.path("mmproj")?,
            system_prompt_file: reader.path("system-prompt-file")?,
            chat_template: reader.verbatim_text("chat-template")?,
            host: reader.text("host")?,
            port: reader.port("port")?.unwrap_or(DEFAULT_PORT),
            timeout: reader.count("timeout")?.unwrap_or(DEFAULT_TIMEOUT_SECS),
            static_path: reader.path("path")?,
            api_keys: reader.list("api-key")?,
            api_key_file: reader.path("api-key-file")?,
            embedding: reader.flag("embedding")?,
            cont_batching: reader.flag("cont-batching")?,
            metrics: reader.flag("metrics")?,
            slots_endpoint_disable: reader.flag("slots-endpoint-disable")?,
            log_disable: reader.flag("log-disable")?,
            log_format: reader.log_format("log-format")?,
        };

        debug!(
            model = %config.model_path.display(),
            port = config.port,
            ctx_size = config.ctx_size,
            "Built server config"
        );
        Ok(config)
    }
}

fn check_model_readable(path: &Path) -> Result<(), ConfigError> {
    let metadata = path
        .metadata()
        .map_err(|e| ConfigError::MissingModel(format!("{}: {e}", path.display())))?;
    if !metadata.is_file() {
        return Err(ConfigError::MissingModel(format!(
            "{} is not a file",
            path.display()
        )));
    }
    File::open(path).map_err(|e| {
        ConfigError::MissingModel(format!("{} cannot be read: {e}", path.display()))
    })?;
    Ok(())
}

/// Typed accessors over the raw field map.
struct FieldReader<'a> {
    raw: &'a RawFields,
}

impl FieldReader<'_> {
    /// Untrimmed scalar text; blank text counts as absent.
    fn verbatim_text(&self, name: &str) -> Result<Option<String>, ConfigError> {
        match self.raw.get(name) {
            None => Ok(None),
            Some(value) => {
                let text = value
                    .scalar_text()
                    .ok_or_else(|| ConfigError::invalid(name, "expected a single value"))?;
                Ok((!text.trim().is_empty()).then_some(text))
            }
        }
    }

    fn text(&self, name: &str) -> Result<Option<String>, ConfigError> {
        Ok(self
            .verbatim_text(name)?
            .map(|text| text.trim().to_string()))
    }

    fn path(&self, name: &str) -> Result<Option<PathBuf>, ConfigError> {
        Ok(self.text(name)?.map(PathBuf::from))
    }

    /// Non-negative integer.
    fn count(&self, name: &str) -> Result<Option<u32>, ConfigError> {
        let value = match self.raw.get(name) {
            None => return Ok(None),
            Some(RawValue::Int(i)) => *i,
            Some(RawValue::Text(s)) if s.trim().is_empty() => return Ok(None),
            Some(RawValue::Text(s)) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::invalid(name, format!("'{s}' is not an integer")))?,
            Some(_) => return Err(ConfigError::invalid(name, "expected an integer")),
        };
        if value < 0 {
            return Err(ConfigError::invalid(
                name,
                format!("must be non-negative, got {value}"),
            ));
        }
        u32::try_from(value)
            .map(Some)
            .map_err(|_| ConfigError::invalid(name, format!("{value} is too large")))
    }

    fn port(&self, name: &str) -> Result<Option<u16>, ConfigError> {
        match self.count(name)? {
            None => Ok(None),
            Some(port) => match u16::try_from(port) {
                Ok(p) if p >= 1 => Ok(Some(p)),
                _ => Err(ConfigError::invalid(
                    name,
                    format!("must be between 1 and 65535, got {port}"),
                )),
            },
        }
    }

    fn flag(&self, name: &str) -> Result<bool, ConfigError> {
        match self.raw.get(name) {
            None => Ok(false),
            Some(RawValue::Bool(b)) => Ok(*b),
            Some(RawValue::Int(0)) => Ok(false),
            Some(RawValue::Int(1)) => Ok(true),
            Some(RawValue::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "" | "false" | "no" | "off" | "0" => Ok(false),
                "true" | "yes" | "on" | "1" => Ok(true),
                other => Err(ConfigError::invalid(
                    name,
                    format!("'{other}' is not a boolean"),
                )),
            },
            Some(_) => Err(ConfigError::invalid(name, "expected a boolean")),
        }
    }

    /// String list from either a list value or a comma-joined string.
    /// Empty entries are discarded.
    fn list(&self, name: &str) -> Result<Vec<String>, ConfigError> {
        let items: Vec<String> = match self.raw.get(name) {
            None => return Ok(Vec::new()),
            Some(RawValue::List(values)) => values
                .iter()
                .map(|v| {
                    v.scalar_text()
                        .ok_or_else(|| ConfigError::invalid(name, "nested lists are not allowed"))
                })
                .collect::<Result<_, _>>()?,
            Some(value) => value
                .scalar_text()
                .map(|s| s.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
        };
        Ok(items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }

    fn proportions(&self, name: &str) -> Result<Vec<f32>, ConfigError> {
        self.list(name)?
            .iter()
            .map(|item| match item.parse::<f32>() {
                Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
                _ => Err(ConfigError::invalid(
                    name,
                    format!("'{item}' is not a non-negative number"),
                )),
            })
            .collect()
    }

    fn log_format(&self, name: &str) -> Result<Option<LogFormat>, ConfigError> {
        match self.text(name)?.map(|s| s.to_ascii_lowercase()).as_deref() {
            None => Ok(None),
            Some("json") => Ok(Some(LogFormat::Json)),
            Some("text") => Ok(Some(LogFormat::Text)),
            Some(other) => Err(ConfigError::invalid(
                name,
                format!("'{other}' is not one of: json, text"),
            )),
        }
    }
}
