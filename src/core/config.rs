use std::collections::HashMap;
use std::path::PathBuf;

/// Process-wide configuration: `Default` for local/dev use, `from_env` for
/// deployment.
#[derive(Debug, Clone)]
pub struct Config {
    // Remote in-memory cache (queues, payload staging, bulk tracker mirror).
    pub redis_host: String,
    pub redis_port: u16,

    // Remote authoritative document/posting store.
    pub mongo_uri: String,
    pub mongo_database: String,

    // Embedded KV tier.
    pub kv_path: PathBuf,

    // Hot tier (term dictionary LRU).
    pub max_cache_size: usize,
    pub eviction_threshold: f32,

    // Background maintenance.
    pub gc_interval_secs: u64,
    pub memory_monitor_interval_secs: u64,

    // BM25 scoring parameters handed to the query reader contract.
    pub search_bm25_k1: f32,
    pub search_bm25_b: f32,
    pub search_field_weights: HashMap<String, f32>,
    pub search_fields: Vec<String>,

    // Bulk indexing defaults.
    pub default_batch_size: usize,
    pub indexing_concurrency: usize,
    pub persistence_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            redis_host: "127.0.0.1".to_string(),
            redis_port: 6379,
            mongo_uri: "mongodb://127.0.0.1:27017".to_string(),
            mongo_database: "lexidex".to_string(),
            kv_path: PathBuf::from("./data/kv"),
            max_cache_size: 100_000,
            eviction_threshold: 0.9,
            gc_interval_secs: 60,
            memory_monitor_interval_secs: 30,
            search_bm25_k1: 1.2,
            search_bm25_b: 0.75,
            search_field_weights: HashMap::new(),
            search_fields: Vec::new(),
            default_batch_size: 1000,
            indexing_concurrency: ((num_cpus::get() as f32) * 0.75).ceil() as usize,
            persistence_concurrency: 1,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// `Default::default()` for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            redis_host: env_or("REDIS_HOST", defaults.redis_host),
            redis_port: env_parsed_or("REDIS_PORT", defaults.redis_port),
            mongo_uri: env_or("MONGO_URI", defaults.mongo_uri),
            mongo_database: env_or("MONGO_DATABASE", defaults.mongo_database),
            kv_path: env_or("KV_PATH", defaults.kv_path.to_string_lossy().to_string()).into(),
            max_cache_size: env_parsed_or("MAX_CACHE_SIZE", defaults.max_cache_size),
            eviction_threshold: env_parsed_or("EVICTION_THRESHOLD", defaults.eviction_threshold),
            gc_interval_secs: env_parsed_or("GC_INTERVAL", defaults.gc_interval_secs),
            memory_monitor_interval_secs: env_parsed_or(
                "MEMORY_MONITOR_INTERVAL",
                defaults.memory_monitor_interval_secs,
            ),
            search_bm25_k1: env_parsed_or("SEARCH_BM25_K1", defaults.search_bm25_k1),
            search_bm25_b: env_parsed_or("SEARCH_BM25_B", defaults.search_bm25_b),
            search_field_weights: std::env::var("SEARCH_FIELD_WEIGHTS")
                .ok()
                .and_then(|raw| serde_json::from_str(&raw).ok())
                .unwrap_or_default(),
            search_fields: std::env::var("SEARCH_FIELDS")
                .ok()
                .map(|raw| raw.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_default(),
            default_batch_size: defaults.default_batch_size,
            indexing_concurrency: defaults.indexing_concurrency,
            persistence_concurrency: 1,
        }
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.redis_host, self.redis_port)
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
