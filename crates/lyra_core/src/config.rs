use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LyraConfig {
    pub llm: LlmConfig,
    pub simulation: SimulationConfig,
    pub memory: MemoryConfig,
    pub detector: DetectorConfig,
    pub resonance: ResonanceConfig,
    pub emotion: EmotionConfig,
    pub embedding: EmbeddingConfig,
    pub gateway: GatewayConfig,
}

impl LyraConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: LyraConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if the file is missing or invalid, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({:#}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("OPENAI_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("LLM_MAX_TOKENS") {
            if let Ok(n) = v.parse() {
                self.llm.max_tokens = n;
            }
        }
        if let Ok(v) = std::env::var("LLM_TEMPERATURE") {
            if let Ok(n) = v.parse() {
                self.llm.temperature = n;
            }
        }
        if let Ok(v) = std::env::var("LYRA_DT") {
            if let Ok(n) = v.parse() {
                self.simulation.dt = n;
            }
        }
        if let Ok(v) = std::env::var("LYRA_EMBEDDER") {
            self.embedding.backend = v;
        }
        if let Ok(v) = std::env::var("LYRA_HOST") {
            self.gateway.host = v;
        }
        if let Ok(v) = std::env::var("LYRA_PORT") {
            if let Ok(n) = v.parse() {
                self.gateway.port = n;
            }
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "openai" or "mock".
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            base_url: None,
            max_tokens: 150,
            temperature: 0.8,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Integration step and tick length.
    pub dt: f64,
    /// Per-module delayed-input cache limit. 0 keeps every entry.
    pub cache_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            cache_capacity: 4096,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub lambda: f64,
    pub threshold: f64,
    pub max_length: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            lambda: 0.4,
            threshold: 0.01,
            max_length: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub theta_c: f64,
    pub gamma: f64,
    pub eta_c: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            theta_c: 0.8,
            gamma: 1.2,
            eta_c: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResonanceConfig {
    pub alpha: f64,
}

impl Default for ResonanceConfig {
    fn default() -> Self {
        Self { alpha: 0.2 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    pub sensitivity: f64,
    pub objective: String,
    pub tone: String,
    pub themes: Vec<String>,
    pub forbidden: Vec<String>,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.8,
            objective: "Sensitive exploration".to_string(),
            tone: "poetic".to_string(),
            themes: vec![],
            forbidden: vec![],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// "hash" (deterministic within one build, offline) or "fastembed".
    /// Production runs should use "fastembed".
    pub backend: String,
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "hash".to_string(),
            dimensions: 384,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
