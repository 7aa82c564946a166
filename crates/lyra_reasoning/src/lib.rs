//! # Lyra Reasoning
//!
//! Generation and orchestration: LLM providers, the [`GenerationBridge`] that
//! turns completions into an amplitude, and the [`Orchestrator`] that advances
//! every module one tick per prompt.

pub mod engine;
pub mod generation;
pub mod llm;
pub mod providers;

pub use engine::{CoreStatus, ModuleReport, Orchestrator, TickReport};
pub use generation::GenerationBridge;
pub use llm::{CompletionParams, LlmClient, Message, Role};
