//! The orchestrator: wires the generation bridge, the decay memory, the
//! threshold detector and the resonance accumulator, and advances them one
//! tick per prompt.
//!
//! Tick order matters. Memory is stepped first, then the detector, then the
//! accumulator; each sees the states the previous ones left in the same tick.

use crate::generation::GenerationBridge;
use crate::providers;
use anyhow::{bail, Context, Result};
use lyra_core::config::EmbeddingConfig;
use lyra_core::{
    ConstructionError, Embedder, Generator, LyraConfig, LyraModule, Params, SignalBoard, Stylist,
    Transfer,
};
use lyra_expression::{DynamicContext, EmotionalCore};
use lyra_limbic::{DetectorStatus, ResonanceAccumulator, ResonanceStatus, ThresholdDetector};
use lyra_memory::{DecayMemory, HashEmbedder, MemoryStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Input name under which the generation amplitude is published.
pub const GENERATION_SOURCE: &str = "autogenesis";
pub const MEMORY: &str = "journal";
pub const DETECTOR: &str = "critrix";
pub const ECHO: &str = "echo";

/// Reply used before anything has been generated.
const SILENCE: &str = "(silence)";

/// Result of one tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub timestamp: String,
    pub reply: String,
    pub styled_output: String,
    pub alert: bool,
    pub emotional_state: BTreeMap<String, f64>,
    /// Simulation time after the tick, rounded to 2 decimals.
    pub t: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoreStatus {
    pub sim_time: f64,
    pub active_traces: usize,
    pub alert: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    pub memory: MemoryStatus,
    pub detector: DetectorStatus,
    pub echo: ResonanceStatus,
}

pub struct Orchestrator {
    config: LyraConfig,
    t: f64,
    generator: Box<dyn Generator>,
    stylist: Box<dyn Stylist>,
    embedder: Arc<dyn Embedder>,
    memory: DecayMemory,
    detector: ThresholdDetector,
    echo: ResonanceAccumulator,
}

impl Orchestrator {
    pub fn new(
        config: LyraConfig,
        generator: Box<dyn Generator>,
        stylist: Box<dyn Stylist>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, ConstructionError> {
        let (memory, detector, echo) = build_modules(&config, embedder.clone())?;
        tracing::info!(
            dt = config.simulation.dt,
            embedder_dims = embedder.dimensions(),
            "Orchestrator ready"
        );
        Ok(Self {
            config,
            t: 0.0,
            generator,
            stylist,
            embedder,
            memory,
            detector,
            echo,
        })
    }

    /// Build every collaborator from configuration: LLM provider, embedding
    /// backend and an emotional core framed by the configured context.
    pub fn from_config(config: LyraConfig) -> Result<Self> {
        let client = providers::from_config(&config.llm)?;
        let generator = GenerationBridge::from_config(client, &config.llm);
        let embedder = embedder_from_config(&config.embedding)?;
        let emotion = &config.emotion;
        let context = DynamicContext::new(&emotion.objective)
            .with_tone(&emotion.tone)
            .with_themes(emotion.themes.clone())
            .with_forbidden(emotion.forbidden.clone());
        let stylist = EmotionalCore::new(emotion.sensitivity, Some(context));

        Self::new(config, Box::new(generator), Box::new(stylist), embedder)
            .context("Failed to build orchestrator modules")
    }

    /// Advance the whole system by one `dt`.
    ///
    /// An empty prompt skips reaction, generation and memory lookup but still
    /// steps every module.
    pub async fn tick(&mut self, prompt: &str) -> TickReport {
        let has_prompt = !prompt.trim().is_empty();
        if has_prompt {
            self.stylist.react_to(prompt);
            self.generator.prompt(prompt).await;
        }

        let t = self.t;

        let board = self.board();
        self.memory.step(t, &board);

        self.detector.inject_tau_in(self.generator.amplitude().abs());
        let board = self.board();
        self.detector.step(t, &board);

        if has_prompt {
            self.rewire_echo(prompt);
        }

        let board = self.board();
        self.echo.step(t, &board);

        let reply = self.generator.last_text().unwrap_or(SILENCE).to_string();
        let styled_output = self.stylist.express(&reply);

        self.t += self.config.simulation.dt;
        let alert = self.detector.is_over_threshold();
        tracing::debug!(
            t = self.t,
            memory = self.memory.state(),
            tau_c = self.detector.tau_c(),
            echo = self.echo.state(),
            alert,
            "tick"
        );

        TickReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            reply,
            styled_output,
            alert,
            emotional_state: self.stylist.emotional_state(),
            t: self.sim_time(),
        }
    }

    /// Couple the accumulator to memory with a weight equal to how closely the
    /// best stored trace matches the prompt.
    fn rewire_echo(&mut self, prompt: &str) {
        let Some(best) = self.memory.query_similar(prompt, 1).into_iter().next() else {
            return;
        };
        let weight = f64::from(best.score);
        if let Err(e) = self.echo.add_neighbor(MEMORY, weight, 0.0, Transfer::identity()) {
            tracing::warn!("Skipping echo rewiring: {}", e);
        }
    }

    /// Current state of every input a module may be wired to.
    fn board(&self) -> SignalBoard {
        SignalBoard::new()
            .with(GENERATION_SOURCE, self.generator.amplitude())
            .with(MEMORY, self.memory.state())
            .with(DETECTOR, self.detector.state())
            .with(ECHO, self.echo.state())
    }

    pub fn status(&self) -> CoreStatus {
        CoreStatus {
            sim_time: self.sim_time(),
            active_traces: self.memory.len(),
            alert: self.detector.is_over_threshold(),
        }
    }

    pub fn module_status(&self) -> ModuleReport {
        ModuleReport {
            memory: self.memory.status(),
            detector: self.detector.status(),
            echo: self.echo.status(),
        }
    }

    /// Return to time zero with fresh modules and collaborators.
    pub fn reset(&mut self) -> Result<(), ConstructionError> {
        let (memory, detector, echo) = build_modules(&self.config, self.embedder.clone())?;
        self.memory = memory;
        self.detector = detector;
        self.echo = echo;
        self.generator.reset();
        self.stylist.reset();
        self.t = 0.0;
        tracing::info!("Orchestrator reset");
        Ok(())
    }

    /// Simulation time rounded to 2 decimals.
    pub fn sim_time(&self) -> f64 {
        (self.t * 100.0).round() / 100.0
    }

    pub fn config(&self) -> &LyraConfig {
        &self.config
    }

    pub fn memory(&self) -> &DecayMemory {
        &self.memory
    }

    pub fn detector(&self) -> &ThresholdDetector {
        &self.detector
    }

    pub fn echo(&self) -> &ResonanceAccumulator {
        &self.echo
    }
}

fn build_modules(
    config: &LyraConfig,
    embedder: Arc<dyn Embedder>,
) -> Result<(DecayMemory, ThresholdDetector, ResonanceAccumulator), ConstructionError> {
    let dt = config.simulation.dt;
    let capacity = config.simulation.cache_capacity;

    let mut memory = DecayMemory::new(
        MEMORY,
        Params::new()
            .with("lambda", config.memory.lambda)
            .with("threshold", config.memory.threshold)
            .with("max_length", config.memory.max_length as f64)
            .with("dt", dt),
        embedder,
    )?;
    memory.add_neighbor(GENERATION_SOURCE, 1.0, 0.0, Transfer::identity())?;
    memory.core_mut().set_cache_capacity(capacity);

    let mut detector = ThresholdDetector::new(
        DETECTOR,
        Params::new()
            .with("theta_C", config.detector.theta_c)
            .with("gamma", config.detector.gamma)
            .with("eta_C", config.detector.eta_c)
            .with("dt", dt),
    )?;
    detector.core_mut().set_cache_capacity(capacity);

    let mut echo = ResonanceAccumulator::new(
        ECHO,
        Params::new()
            .with("alpha", config.resonance.alpha)
            .with("dt", dt),
    )?;
    echo.add_neighbor(GENERATION_SOURCE, 0.6, 0.0, Transfer::sigmoid())?;
    echo.core_mut().set_cache_capacity(capacity);

    Ok((memory, detector, echo))
}

fn embedder_from_config(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.backend.as_str() {
        "hash" => Ok(Arc::new(HashEmbedder::new(config.dimensions))),
        #[cfg(feature = "fastembed")]
        "fastembed" => Ok(Arc::new(lyra_memory::FastEmbedder::new()?)),
        other => bail!(
            "Unknown or disabled embedding backend: {} (build with the `fastembed` feature for fastembed)",
            other
        ),
    }
}
