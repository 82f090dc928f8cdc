use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub publishing: PublishingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for `file`, database file for `sqlite`; ignored for `memory`.
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_storage_key")]
    pub key: String,
    #[serde(default = "default_max_logs")]
    pub max_logs: usize,
    /// Quiet period after the last append before the buffer is written.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Hard flush interval, independent of the debounce.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
}

fn default_storage_key() -> String {
    "k8s-dashboard-logs".into()
}

fn default_max_logs() -> usize {
    500
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_flush_interval_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// Base URL of the cluster bridge, e.g. `http://localhost:9000`.
    pub api_base_url: String,
    pub poll_interval_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Start the watcher on boot (after `start_delay_ms`).
    #[serde(default = "default_true")]
    pub auto_start: bool,
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_start_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Ping interval for /ws/logs connection health.
    #[serde(default = "default_ws_ping_interval_secs")]
    pub ws_ping_interval_secs: u64,
    /// Updates buffered per /ws/logs client. A client that falls further
    /// behind skips the backlog and is sent a fresh snapshot.
    #[serde(default = "default_ws_queue_capacity")]
    pub ws_queue_capacity: usize,
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            ws_ping_interval_secs: default_ws_ping_interval_secs(),
            ws_queue_capacity: default_ws_queue_capacity(),
        }
    }
}

fn default_ws_ping_interval_secs() -> u64 {
    30
}

fn default_ws_queue_capacity() -> usize {
    64
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.storage.backend == StorageBackend::Memory || !self.storage.path.is_empty(),
            "storage.path must be non-empty for the {:?} backend",
            self.storage.backend
        );
        anyhow::ensure!(!self.storage.key.is_empty(), "storage.key must be non-empty");
        anyhow::ensure!(
            self.storage.max_logs > 0,
            "storage.max_logs must be > 0, got {}",
            self.storage.max_logs
        );
        anyhow::ensure!(
            self.storage.debounce_ms > 0,
            "storage.debounce_ms must be > 0, got {}",
            self.storage.debounce_ms
        );
        anyhow::ensure!(
            self.storage.flush_interval_secs > 0,
            "storage.flush_interval_secs must be > 0, got {}",
            self.storage.flush_interval_secs
        );
        anyhow::ensure!(
            self.monitoring.api_base_url.starts_with("http://")
                || self.monitoring.api_base_url.starts_with("https://"),
            "monitoring.api_base_url must be an http(s) URL, got {:?}",
            self.monitoring.api_base_url
        );
        anyhow::ensure!(
            self.monitoring.poll_interval_ms > 0,
            "monitoring.poll_interval_ms must be > 0, got {}",
            self.monitoring.poll_interval_ms
        );
        anyhow::ensure!(
            self.monitoring.request_timeout_ms > 0,
            "monitoring.request_timeout_ms must be > 0, got {}",
            self.monitoring.request_timeout_ms
        );
        anyhow::ensure!(
            self.publishing.ws_ping_interval_secs > 0,
            "publishing.ws_ping_interval_secs must be > 0, got {}",
            self.publishing.ws_ping_interval_secs
        );
        anyhow::ensure!(
            self.publishing.ws_queue_capacity > 0,
            "publishing.ws_queue_capacity must be > 0, got {}",
            self.publishing.ws_queue_capacity
        );
        Ok(())
    }
}
