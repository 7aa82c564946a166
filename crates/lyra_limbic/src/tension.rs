//! Threshold detector: integrates tension and raises an alert when tension is
//! high while coherence with the incoming signal is low.
//!
//! dτ/dt = γ · max(0, τ_in - θ) - η · τ,   τ ∈ [0, 10]
//! coherence = 1 / (1 + |τ_in - τ|)
//! alert ⇔ τ > θ ∧ coherence < 0.4

use lyra_core::{ConstructionError, LyraModule, ModuleCore, Params};
use serde::Serialize;

pub const TENSION_MAX: f64 = 10.0;
pub const COHERENCE_FLOOR: f64 = 0.4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectorStatus {
    pub module: String,
    pub output: f64,
    pub tau_c: f64,
    pub coherence: f64,
    pub alert: bool,
}

pub struct ThresholdDetector {
    core: ModuleCore,
    is_over_threshold: bool,
    coherence_score: f64,
    last_output: f64,
}

impl ThresholdDetector {
    /// Params: `theta_C` (1.0), `gamma` (1.0), `eta_C` (0.2), `tau_in` (0.0), `dt`.
    pub fn new(name: &str, params: Params) -> Result<Self, ConstructionError> {
        Ok(Self {
            core: ModuleCore::new(name, params)?,
            is_over_threshold: false,
            coherence_score: 1.0,
            last_output: 0.0,
        })
    }

    /// Overwrite the incoming tension for the next step.
    pub fn inject_tau_in(&mut self, value: f64) {
        self.core.params_mut().set("tau_in", value);
    }

    pub fn tau_in(&self) -> f64 {
        self.core.params().get_or("tau_in", 0.0)
    }

    pub fn tau_c(&self) -> f64 {
        self.core.tau_c
    }

    pub fn coherence(&self) -> f64 {
        self.coherence_score
    }

    pub fn is_over_threshold(&self) -> bool {
        self.is_over_threshold
    }

    pub fn last_output(&self) -> f64 {
        self.last_output
    }

    pub fn status(&self) -> DetectorStatus {
        DetectorStatus {
            module: self.core.name().to_string(),
            output: self.last_output,
            tau_c: self.core.tau_c,
            coherence: self.coherence_score,
            alert: self.is_over_threshold,
        }
    }
}

impl LyraModule for ThresholdDetector {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn intrinsic(&mut self, _t: f64) -> f64 {
        let params = self.core.params();
        let tau_in = params.get_or("tau_in", 0.0);
        let theta_c = params.get_or("theta_C", 1.0);
        let gamma = params.get_or("gamma", 1.0);
        let eta_c = params.get_or("eta_C", 0.2);
        let dt = params.dt();

        let excitation = gamma * (tau_in - theta_c).max(0.0);
        let dissipation = eta_c * self.core.tau_c;
        let tau_c = (self.core.tau_c + (excitation - dissipation) * dt).clamp(0.0, TENSION_MAX);
        self.core.tau_c = tau_c;

        self.coherence_score = 1.0 / (1.0 + (tau_in - tau_c).abs());
        let was_alert = self.is_over_threshold;
        self.is_over_threshold = tau_c > theta_c && self.coherence_score < COHERENCE_FLOOR;
        if self.is_over_threshold && !was_alert {
            tracing::info!(
                module = %self.core.name(),
                tau_c,
                coherence = self.coherence_score,
                "tension alert raised"
            );
        }

        self.last_output = -tau_c;
        self.last_output
    }
}
