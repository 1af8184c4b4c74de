use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use pulso_analyze::AnalyzeOptions;
use pulso_model::catalog::{DEFAULT_BASE_URL, DEFAULT_TEMPERATURE};
use pulso_model::{ChatCompletionsClient, CompletionClient, ModelConfig, DEFAULT_BATCH_SIZE, DEFAULT_MODEL};
use pulso_store::{ClientsCache, FileStore, KeyValueStore};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "pulso.json";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Resolved settings: defaults, then config file, then environment, then flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub batch_size: usize,
    pub timeout_secs: u64,
    pub cache_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cache_dir: None,
        }
    }
}

/// `pulso.json`; every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    batch_size: Option<usize>,
    timeout_secs: Option<u64>,
    cache_dir: Option<PathBuf>,
}

impl Settings {
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut settings = Self::default();
        match explicit {
            Some(path) => settings.apply_file(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    settings.apply_file(path)?;
                }
            }
        }
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    fn apply_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read config {}: {e}", path.display()))?;
        let file: FileConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;

        if let Some(v) = file.base_url {
            self.base_url = v;
        }
        if let Some(v) = file.api_key {
            self.api_key = v;
        }
        if let Some(v) = file.model {
            self.model = v;
        }
        if let Some(v) = file.batch_size {
            self.batch_size = v;
        }
        if let Some(v) = file.timeout_secs {
            self.timeout_secs = v;
        }
        if file.cache_dir.is_some() {
            self.cache_dir = file.cache_dir;
        }
        tracing::debug!(path = %path.display(), "config file applied");
        Ok(())
    }

    /// Apply `PULSO_*` variables. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("PULSO_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = var("PULSO_API_KEY") {
            self.api_key = v;
        }
        if let Some(v) = var("PULSO_MODEL") {
            self.model = v;
        }
        if let Some(v) = var("PULSO_BATCH_SIZE") {
            self.batch_size = v
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PULSO_BATCH_SIZE must be a number, got {v:?}"))?;
        }
        if let Some(v) = var("PULSO_TIMEOUT_SECS") {
            self.timeout_secs = v
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PULSO_TIMEOUT_SECS must be a number, got {v:?}"))?;
        }
        if let Some(v) = var("PULSO_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    /// Flag overrides, applied last.
    pub fn with_overrides(mut self, model: Option<String>, batch_size: Option<usize>) -> Self {
        if let Some(m) = model {
            self.model = m;
        }
        if let Some(b) = batch_size {
            self.batch_size = b;
        }
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.trim().is_empty() {
            anyhow::bail!("base URL must not be empty");
        }
        if self.model.trim().is_empty() {
            anyhow::bail!("model must not be empty");
        }
        if self.batch_size == 0 {
            anyhow::bail!("batch size must be greater than 0");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout must be greater than 0 seconds");
        }
        Ok(())
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            default_model: self.model.clone(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn analyze_options(&self) -> anyhow::Result<AnalyzeOptions> {
        let batch_size = NonZeroUsize::new(self.batch_size)
            .ok_or_else(|| anyhow::anyhow!("batch size must be greater than 0"))?;
        Ok(AnalyzeOptions {
            batch_size,
            model: self.model.clone(),
            call_timeout: None,
        })
    }

    /// HTTP model client. Commands that call the model require an API key.
    pub fn model_client(&self) -> anyhow::Result<Arc<dyn CompletionClient>> {
        self.validate()?;
        if self.api_key.trim().is_empty() {
            anyhow::bail!("no API key configured (set PULSO_API_KEY or api_key in {DEFAULT_CONFIG_FILE})");
        }
        Ok(Arc::new(ChatCompletionsClient::new(self.model_config())?))
    }

    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(pulso_store::store_root)
    }

    /// File-backed cache for the dataset at `csv`.
    pub fn open_cache(&self, csv: &Path) -> ClientsCache<Box<dyn KeyValueStore>> {
        let dir = pulso_store::dataset_dir(&self.cache_root(), csv);
        ClientsCache::new(Box::new(FileStore::new(dir)))
    }
}
