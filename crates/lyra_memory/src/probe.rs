//! Vector probe: a passive side-store of embedded text snapshots.
//!
//! Unlike [`DecayMemory`](crate::DecayMemory) nothing here decays; the probe
//! keeps the newest `max_length` entries and answers similarity queries.

use crate::embedding::cosine_similarity;
use anyhow::Result;
use lyra_core::{ConstructionError, Embedder, Embedding, LyraModule, ModuleCore, Params};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ProbeEntry {
    pub timestamp: f64,
    pub embedding: Embedding,
    pub meta: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeMatch {
    pub timestamp: f64,
    pub meta: Value,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeStatus {
    pub module: String,
    pub stored_vectors: usize,
}

pub struct VectorProbe {
    core: ModuleCore,
    entries: Vec<ProbeEntry>,
    max_length: usize,
    embedder: Arc<dyn Embedder>,
}

impl VectorProbe {
    /// Params: `max_length` (100), `dt`.
    pub fn new(
        name: &str,
        params: Params,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, ConstructionError> {
        let max_length = params.get_or("max_length", 100.0).max(0.0) as usize;
        Ok(Self {
            core: ModuleCore::new(name, params)?,
            entries: Vec::new(),
            max_length,
            embedder,
        })
    }

    /// Embed `text` and store it with its timestamp and metadata.
    pub fn encode_and_store(&mut self, t: f64, text: &str, meta: Value) -> Result<()> {
        let embedding = self.embedder.embed(text)?;
        self.entries.push(ProbeEntry {
            timestamp: t,
            embedding,
            meta,
        });
        if self.entries.len() > self.max_length {
            let excess = self.entries.len() - self.max_length;
            self.entries.drain(..excess);
        }
        Ok(())
    }

    /// The `top_k` stored entries closest to `text`, best first.
    pub fn query(&self, text: &str, top_k: usize) -> Result<Vec<ProbeMatch>> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        let query = self.embedder.embed(text)?;
        let mut matches: Vec<ProbeMatch> = self
            .entries
            .iter()
            .map(|e| ProbeMatch {
                timestamp: e.timestamp,
                meta: e.meta.clone(),
                score: cosine_similarity(&query, &e.embedding),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }

    pub fn entries(&self) -> &[ProbeEntry] {
        &self.entries
    }

    pub fn status(&self) -> ProbeStatus {
        ProbeStatus {
            module: self.core.name().to_string(),
            stored_vectors: self.entries.len(),
        }
    }
}

impl LyraModule for VectorProbe {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn intrinsic(&mut self, _t: f64) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use lyra_core::SignalBoard;
    use serde_json::json;

    fn probe(max_length: f64) -> VectorProbe {
        let params = Params::new().with("max_length", max_length);
        VectorProbe::new("probe", params, Arc::new(HashEmbedder::default())).unwrap()
    }

    #[test]
    fn test_store_and_query() {
        let mut p = probe(10.0);
        p.encode_and_store(0.0, "the tide comes in", json!({"kind": "prompt"}))
            .unwrap();
        p.encode_and_store(0.1, "parsing toml files", json!({"kind": "log"}))
            .unwrap();

        let hits = p.query("the tide", 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].meta["kind"], "prompt");
        assert_eq!(p.status().stored_vectors, 2);
    }

    #[test]
    fn test_query_empty_probe() {
        let p = probe(10.0);
        assert!(p.query("anything", 3).unwrap().is_empty());
    }

    #[test]
    fn test_keeps_newest() {
        let mut p = probe(2.0);
        for i in 0..5 {
            p.encode_and_store(i as f64, &format!("entry {}", i), json!(i))
                .unwrap();
        }
        let stamps: Vec<f64> = p.entries().iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![3.0, 4.0]);
    }

    #[test]
    fn test_passive_dynamics() {
        let mut p = probe(2.0);
        assert_eq!(p.step(0.0, &SignalBoard::new()), 0.0);
    }
}
