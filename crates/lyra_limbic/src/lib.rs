//! # Lyra Limbic System
//!
//! Fast, non-verbal dynamics that sit between generation and expression:
//!
//! - **ThresholdDetector**: integrates tension from the generated amplitude and
//!   raises an alert when tension outruns coherence
//! - **ResonanceAccumulator**: a damped echo of delay-weighted neighbor signals
//!
//! Both are [`lyra_core::LyraModule`]s and share the base integration step.

mod resonance;
mod tension;

pub use resonance::{ResonanceAccumulator, ResonanceStatus};
pub use tension::{DetectorStatus, ThresholdDetector, COHERENCE_FLOOR, TENSION_MAX};
