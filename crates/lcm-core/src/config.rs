//! Process-scoped configuration, loaded once at the CLI boundary and
//! passed explicitly through a context value rather than read from
//! ambient globals, so multiple sessions can coexist in tests (§9).

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Top-level configuration for an LCM process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database file location. Defaults to `~/.lcm/lcm.db` (§6).
    pub db_path: PathBuf,
    pub llm: LlmConfig,
    pub compaction: CompactionConfig,
    pub capture: CaptureConfig,
    pub search: SearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: Self::default_db_path(),
            llm: LlmConfig::default(),
            compaction: CompactionConfig::default(),
            capture: CaptureConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Name of the environment variable holding the provider API key.
    pub api_key_env: String,
    pub model: String,
    /// Retry attempts before surfacing `LLMUnavailable` (§4.B).
    pub max_retries: u32,
    /// Base backoff delay in milliseconds.
    pub backoff_base_ms: u64,
    /// Backoff delay cap in milliseconds.
    pub backoff_cap_ms: u64,
    /// Hard per-call deadline in seconds.
    pub call_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            model: "claude-haiku-3-5-20241022".to_string(),
            max_retries: 5,
            backoff_base_ms: 1_000,
            backoff_cap_ms: 30_000,
            call_timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok()
    }
}

/// Thresholds and bounds driving the compaction engine (§4.D).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionConfig {
    /// Soft pressure threshold, triggers an asynchronous pass.
    pub tau_soft_tokens: u32,
    /// Hard pressure threshold, blocks the caller until drained.
    pub tau_hard_tokens: u32,
    /// Minimum block size (in estimated tokens) for a leaf summary.
    pub block_min_tokens: u32,
    /// Maximum block size (in estimated tokens) for a leaf summary.
    pub block_max_tokens: u32,
    /// Number of uncondensed summaries at a level that triggers
    /// condensation into the next level.
    pub condensation_fanout: usize,
    /// Target token ceiling for a condensed (level >= 1) summary.
    pub condensation_target_tokens: u32,
    /// Escalation overshoot tolerance before moving to the next level
    /// (levels 1-2 only; `truncated` must hit the ceiling exactly).
    pub overshoot_factor: f64,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            tau_soft_tokens: 50_000,
            tau_hard_tokens: 200_000,
            block_min_tokens: 4_000,
            block_max_tokens: 12_000,
            condensation_fanout: 5,
            condensation_target_tokens: 2_000,
            overshoot_factor: 1.25,
        }
    }
}

impl CompactionConfig {
    /// `T` for a leaf block per §4.D: `B_max / 4`.
    pub fn leaf_target_tokens(&self) -> u32 {
        self.block_max_tokens / 4
    }
}

/// Capture-protocol tunables (§4.E).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Tool-result blobs at or above this size are diverted to a file
    /// reference instead of stored inline.
    pub blob_divert_bytes: u64,
    /// Length of the inline snippet kept alongside a diverted blob.
    pub snippet_len_bytes: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            blob_divert_bytes: 16 * 1024,
            snippet_len_bytes: 256,
        }
    }
}

/// Search tunables (§4.A).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub result_cap: usize,
    pub regex_timeout_ms: u64,
    pub page_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            result_cap: 100,
            regex_timeout_ms: 500,
            page_size: 10,
        }
    }
}

impl Config {
    /// Load configuration from defaults, user config, project config, and
    /// environment variables, in that order of increasing precedence.
    pub fn load() -> Result<Self, figment::Error> {
        let config_dir = Self::config_dir();
        let project_config = PathBuf::from(".lcm/config.toml");

        Figment::new()
            .merge(figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::file(config_dir.join("config.toml")))
            .merge(Toml::file(&project_config))
            .merge(Toml::file(".lcm/config.local.toml"))
            // Double underscore separates nested keys (`LCM_LLM__MODEL`)
            // so the flat `LCM_DB_PATH` variable named in the external
            // interfaces section maps straight to `db_path`.
            .merge(Env::prefixed("LCM_").split("__"))
            .extract()
    }

    /// The directory holding the user-level config file, honoring
    /// `LCM_CONFIG_DIR` as an override.
    pub fn config_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("LCM_CONFIG_DIR") {
            return PathBuf::from(dir);
        }
        dirs::config_dir()
            .map(|p| p.join("lcm"))
            .unwrap_or_else(|| PathBuf::from("~/.config/lcm"))
    }

    fn default_db_path() -> PathBuf {
        dirs::home_dir()
            .map(|p| p.join(".lcm").join("lcm.db"))
            .unwrap_or_else(|| PathBuf::from(".lcm/lcm.db"))
    }
}
