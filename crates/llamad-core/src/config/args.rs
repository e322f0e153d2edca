//! Serialization of a [`ServerConfig`] into the llama-server argument vector.

use std::path::Path;

use super::ServerConfig;

/// Accumulates `--flag [value]` pairs in insertion order.
#[derive(Default)]
struct ArgList {
    args: Vec<String>,
}

impl ArgList {
    fn value(&mut self, flag: &str, value: impl ToString) {
        self.args.push(flag.to_string());
        self.args.push(value.to_string());
    }

    fn opt(&mut self, flag: &str, value: Option<impl ToString>) {
        if let Some(v) = value {
            self.value(flag, v);
        }
    }

    fn opt_path(&mut self, flag: &str, value: Option<&Path>) {
        self.opt(flag, value.map(|p| p.display()));
    }

    fn flag(&mut self, flag: &str, enabled: bool) {
        if enabled {
            self.args.push(flag.to_string());
        }
    }

    fn joined<T: ToString>(&mut self, flag: &str, values: &[T]) {
        if !values.is_empty() {
            let joined = values
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            self.value(flag, joined);
        }
    }
}

impl ServerConfig {
    /// Serialize into the llama-server command-line contract.
    ///
    /// The order is stable: model first, then options grouped as in the
    /// struct definition. Unset optional fields produce no arguments.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut a = ArgList::default();

        a.value("-m", self.model_path.display());
        a.opt("--model-url", self.model_url.as_deref());
        a.opt("--alias", self.alias.as_deref());

        a.opt("--threads", self.threads);
        a.opt("--threads-batch", self.threads_batch);
        a.opt("--threads-http", self.threads_http);

        a.value("--ctx-size", self.ctx_size);
        a.opt("--batch-size", self.batch_size);
        a.opt("--parallel", self.parallel);
        a.opt("--n-predict", self.n_predict);
        a.opt("--grp-attn-n", self.grp_attn_n);
        a.opt("--grp-attn-w", self.grp_attn_w);

        a.opt("--n-gpu-layers", self.n_gpu_layers);
        a.opt("--main-gpu", self.main_gpu);
        a.joined("--tensor-split", &self.tensor_split);

        a.flag("--memory-f32", self.memory_f32);
        a.flag("--mlock", self.mlock);
        a.flag("--no-mmap", self.no_mmap);
        a.opt("--numa", self.numa.as_deref());

        a.opt_path("--lora", self.lora.as_deref());
        a.opt_path("--lora-base", self.lora_base.as_deref());
        a.opt_path("--mmproj", self.mmproj.as_deref());
        a.opt_path("--system-prompt-file", self.system_prompt_file.as_deref());
        a.opt("--chat-template", self.chat_template.as_deref());

        a.opt("--host", self.host.as_deref());
        a.value("--port", self.port);
        a.value("--timeout", self.timeout);
        a.opt_path("--path", self.static_path.as_deref());

        a.joined("--api-key", &self.api_keys);
        a.opt_path("--api-key-file", self.api_key_file.as_deref());

        a.flag("--embedding", self.embedding);
        a.flag("--cont-batching", self.cont_batching);
        a.flag("--metrics", self.metrics);
        a.flag("--slots-endpoint-disable", self.slots_endpoint_disable);

        a.flag("--log-disable", self.log_disable);
        a.opt("--log-format", self.log_format);

        a.args
    }
}
