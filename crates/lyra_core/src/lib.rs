//! # Lyra Core
//!
//! The coupled-module update engine: transfer functions, the module base with
//! delayed neighbor coupling, construction errors and configuration.
//!
//! The collaborator seams used by the orchestrator (generation, emotional
//! styling, embedding) are declared here so every crate can depend on the
//! interface without depending on an implementation.

pub mod config;
pub mod error;
pub mod module;
pub mod transfer;

pub use config::LyraConfig;
pub use error::ConstructionError;
pub use module::{
    Coupling, InputCache, LyraModule, ModuleCore, ModuleStatus, Params, SignalBoard, SignalSource,
    TimeKey, DEFAULT_DT, STATE_BOUND, TAU_EPSILON,
};
pub use transfer::Transfer;

use async_trait::async_trait;
use std::collections::BTreeMap;

pub type Embedding = Vec<f32>;

/// Text → fixed-length vector. Identical input must give identical output.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> anyhow::Result<Embedding>;

    fn dimensions(&self) -> usize;
}

/// Text generation collaborator.
///
/// `prompt` never fails: a failing backend leaves the amplitude untouched and
/// replaces the last text with an error placeholder.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn prompt(&mut self, text: &str);

    /// Output amplitude in [0, 1].
    fn amplitude(&self) -> f64;

    fn last_text(&self) -> Option<&str>;

    /// Forget the last output and return the amplitude to zero.
    fn reset(&mut self) {}
}

/// Emotional reaction and text styling collaborator.
pub trait Stylist: Send + Sync {
    fn react_to(&mut self, text: &str);

    fn express(&mut self, text: &str) -> String;

    /// Named emotional intensities in [0, 1].
    fn emotional_state(&self) -> BTreeMap<String, f64>;

    /// Return to the initial emotional state.
    fn reset(&mut self) {}
}
