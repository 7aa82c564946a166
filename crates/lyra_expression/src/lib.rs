//! Emotional expression: how Lyra reacts to what it hears and how it dresses
//! what it says.

mod context;
mod emotion;

pub use context::{ContextualMemory, DynamicContext};
pub use emotion::{Emotion, EmotionalCore, JOURNAL_CAPACITY};
