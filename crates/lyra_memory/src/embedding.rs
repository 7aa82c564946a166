//! Text embedders and vector similarity.
//!
//! [`HashEmbedder`] is the default: deterministic, offline, and good enough to
//! make shared words score higher than unrelated text. With the `fastembed`
//! feature, [`FastEmbedder`] runs a real sentence-embedding model; production
//! deployments should build with it and set `LYRA_EMBEDDER=fastembed`.

use anyhow::Result;
use lyra_core::{Embedder, Embedding};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Feature-hashing embedder over lowercase words and character trigrams.
///
/// Same text → same vector. Non-empty text yields a unit vector; text with no
/// alphanumeric content yields the zero vector.
///
/// Features are hashed with std `DefaultHasher`, whose output is only fixed
/// within one build. Vectors must not be persisted or compared across
/// binaries built with different Rust releases.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, feature: &str) -> (usize, f32) {
        let mut hasher = DefaultHasher::new();
        feature.hash(&mut hasher);
        let h = hasher.finish();
        let index = (h % self.dimensions as u64) as usize;
        let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let (i, sign) = self.bucket(word);
            vector[i] += sign;

            let chars: Vec<char> = word.chars().collect();
            for tri in chars.windows(3) {
                let gram: String = tri.iter().collect();
                let (i, sign) = self.bucket(&gram);
                vector[i] += 0.5 * sign;
            }
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(feature = "fastembed")]
pub use self::fast::FastEmbedder;

#[cfg(feature = "fastembed")]
mod fast {
    use super::*;
    use fastembed::{EmbeddingModel as FastEmbedModel, InitOptions, TextEmbedding};
    use std::sync::Arc;

    /// Sentence embeddings via fastembed (all-MiniLM-L6-v2, 384 dims).
    #[derive(Clone)]
    pub struct FastEmbedder {
        model: Arc<TextEmbedding>,
    }

    impl FastEmbedder {
        pub fn new() -> Result<Self> {
            let mut options = InitOptions::default();
            options.model_name = FastEmbedModel::AllMiniLML6V2;
            options.show_download_progress = false;

            let model = TextEmbedding::try_new(options)?;
            Ok(Self {
                model: Arc::new(model),
            })
        }
    }

    impl Embedder for FastEmbedder {
        fn embed(&self, text: &str) -> Result<Embedding> {
            let embeddings = self.model.embed(vec![text], None)?;
            embeddings
                .into_iter()
                .next()
                .ok_or_else(|| anyhow::anyhow!("Failed to generate embedding"))
        }

        fn dimensions(&self) -> usize {
            384
        }
    }
}

/// Euclidean norm.
pub fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity in [-1, 1]; 0.0 when either vector is empty, zero, or
/// the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = norm(a);
    let norm_b = norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
