pub mod embedding;
pub mod journal;
pub mod probe;

pub use embedding::{cosine_similarity, HashEmbedder};
#[cfg(feature = "fastembed")]
pub use embedding::FastEmbedder;
pub use journal::{DecayMemory, MemoryStatus, SimilarTrace, Trace, TraceMeta};
pub use probe::{ProbeEntry, ProbeMatch, ProbeStatus, VectorProbe};
