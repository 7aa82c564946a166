//! Decay memory: a filtering journal whose traces evaporate over time.
//!
//! Each tick:
//! 1. every trace decays: `v ← v · exp(-λ · (t - t₀))`
//! 2. traces with `|v| ≤ threshold` are forgotten, and only the newest
//!    `max_length` survive
//! 3. wired neighbors whose coupled signal clears the threshold leave a new
//!    trace, embedded from its label `"{self}:{neighbor}:{signal:.3}"`
//! 4. the state becomes the sum of surviving trace values
//!
//! Embeddings are an auxiliary index: nothing in the decay dynamics depends on
//! similarity. `query_similar` is a pure read.

use crate::embedding::{cosine_similarity, norm};
use lyra_core::{
    ConstructionError, Embedder, Embedding, LyraModule, ModuleCore, Params, SignalSource,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceMeta {
    /// Neighbor the signal came from.
    pub source: String,
    /// Human-readable label, also the embedded text.
    pub text_form: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Trace {
    pub timestamp: f64,
    pub value: f64,
    #[serde(skip)]
    pub embedding: Embedding,
    pub meta: TraceMeta,
}

/// Result row of [`DecayMemory::query_similar`].
#[derive(Debug, Clone, Serialize)]
pub struct SimilarTrace {
    pub timestamp: f64,
    pub value: f64,
    pub meta: TraceMeta,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryStatus {
    pub module: String,
    pub active_traces: usize,
    pub state: f64,
}

pub struct DecayMemory {
    core: ModuleCore,
    traces: Vec<Trace>,
    decay_lambda: f64,
    threshold: f64,
    max_length: usize,
    embedder: Arc<dyn Embedder>,
}

impl DecayMemory {
    /// Params: `lambda` (0.5), `threshold` (0.01), `max_length` (100), `dt`.
    pub fn new(
        name: &str,
        params: Params,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, ConstructionError> {
        let decay_lambda = params.get_or("lambda", 0.5);
        let threshold = params.get_or("threshold", 0.01);
        let max_length = params.get_or("max_length", 100.0).max(0.0) as usize;
        let core = ModuleCore::new(name, params)?;
        Ok(Self {
            core,
            traces: Vec::new(),
            decay_lambda,
            threshold,
            max_length,
            embedder,
        })
    }

    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// The `n` most recent surviving traces, oldest first.
    pub fn remember(&self, n: usize) -> &[Trace] {
        let start = self.traces.len().saturating_sub(n);
        &self.traces[start..]
    }

    /// The `top_k` traces closest to `text`, best first.
    ///
    /// Empty when memory is empty or the query embeds to a zero vector.
    pub fn query_similar(&self, text: &str, top_k: usize) -> Vec<SimilarTrace> {
        if self.traces.is_empty() || top_k == 0 {
            return Vec::new();
        }
        let query = match self.embedder.embed(text) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(module = %self.core.name(), "query embedding failed: {:#}", e);
                return Vec::new();
            }
        };
        if norm(&query) == 0.0 {
            return Vec::new();
        }

        let mut scored: Vec<SimilarTrace> = self
            .traces
            .iter()
            .map(|trace| SimilarTrace {
                timestamp: trace.timestamp,
                value: trace.value,
                meta: trace.meta.clone(),
                score: cosine_similarity(&query, &trace.embedding),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        scored
    }

    pub fn status(&self) -> MemoryStatus {
        MemoryStatus {
            module: self.core.name().to_string(),
            active_traces: self.traces.len(),
            state: self.core.state(),
        }
    }

    fn decay(&mut self, t: f64) {
        let lambda = self.decay_lambda;
        let threshold = self.threshold;
        for trace in &mut self.traces {
            trace.value *= (-lambda * (t - trace.timestamp)).exp();
        }
        self.traces.retain(|trace| trace.value.abs() > threshold);
        self.truncate();
    }

    fn ingest(&mut self, t: f64, inputs: &dyn SignalSource) {
        let wired: Vec<(String, lyra_core::Coupling)> = self
            .core
            .neighbors()
            .map(|(name, coupling)| (name.to_string(), coupling.clone()))
            .collect();

        for (neighbor, coupling) in wired {
            let Some(input) = self.core.delayed_input(&neighbor, t, inputs) else {
                continue;
            };
            let signal = coupling.signal(input);
            if signal.abs() <= self.threshold {
                continue;
            }
            let text_form = format!("{}:{}:{:.3}", self.core.name(), neighbor, signal);
            let embedding = self.embed_label(&text_form);
            tracing::debug!(module = %self.core.name(), t, signal, "trace stored: {}", text_form);
            self.traces.push(Trace {
                timestamp: t,
                value: signal,
                embedding,
                meta: TraceMeta {
                    source: neighbor,
                    text_form,
                },
            });
        }
        self.truncate();
    }

    fn truncate(&mut self) {
        if self.traces.len() > self.max_length {
            let excess = self.traces.len() - self.max_length;
            self.traces.drain(..excess);
        }
    }

    fn embed_label(&self, label: &str) -> Embedding {
        self.embedder.embed(label).unwrap_or_else(|e| {
            tracing::warn!(module = %self.core.name(), "trace embedding failed: {:#}", e);
            Vec::new()
        })
    }
}

impl LyraModule for DecayMemory {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    /// No autonomous dynamics: the journal is driven entirely by its inputs.
    fn intrinsic(&mut self, _t: f64) -> f64 {
        0.0
    }

    /// Accumulation, not integration: decay, prune, ingest, then sum.
    fn step(&mut self, t: f64, inputs: &dyn SignalSource) -> f64 {
        self.decay(t);
        self.ingest(t, inputs);
        let total: f64 = self.traces.iter().map(|trace| trace.value).sum();
        self.core.set_state(total);
        self.core.state()
    }
}
