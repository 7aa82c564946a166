//! Resonance accumulator: captures, damps or amplifies incoming signals.
//!
//! dx/dt = -α · x + Σ_j ρ_j · e^(-δ_j) · g_j(x_j(t - δ_j))
//!
//! The resonance sum is rebuilt every tick from the delayed inputs resolved
//! into the module cache. It is the only path by which neighbors drive the
//! state: the plain coupled drive of the base step is not added on top.

use lyra_core::{ConstructionError, LyraModule, ModuleCore, Params, SignalSource};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResonanceStatus {
    pub module: String,
    pub state: f64,
    pub resonance: f64,
}

pub struct ResonanceAccumulator {
    core: ModuleCore,
    resonance_sum: f64,
}

impl ResonanceAccumulator {
    /// Params: `alpha` (0.2), `dt`.
    pub fn new(name: &str, params: Params) -> Result<Self, ConstructionError> {
        Ok(Self {
            core: ModuleCore::new(name, params)?,
            resonance_sum: 0.0,
        })
    }

    /// Resonance collected during the last step.
    pub fn resonance(&self) -> f64 {
        self.resonance_sum
    }

    pub fn status(&self) -> ResonanceStatus {
        ResonanceStatus {
            module: self.core.name().to_string(),
            state: self.core.state(),
            resonance: self.resonance_sum,
        }
    }
}

impl LyraModule for ResonanceAccumulator {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn intrinsic(&mut self, t: f64) -> f64 {
        let alpha = self.core.params().get_or("alpha", 0.2);
        self.resonance_sum = self
            .core
            .neighbors()
            .filter_map(|(name, coupling)| {
                let delayed = self.core.cached_input(name, t)?;
                Some(coupling.weight * (-coupling.delay).exp() * coupling.transfer.apply(delayed))
            })
            .sum();
        -alpha * self.core.state() + self.resonance_sum
    }

    /// The resonance sum already carries every neighbor's drive.
    fn step(&mut self, t: f64, inputs: &dyn SignalSource) -> f64 {
        self.core.resolve_inputs(t, inputs);
        let dx = self.intrinsic(t);
        self.core.integrate(dx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyra_core::{SignalBoard, Transfer};

    fn echo(state0: f64) -> ResonanceAccumulator {
        let params = Params::new()
            .with("alpha", 0.2)
            .with("dt", 0.1)
            .with("state0", state0);
        ResonanceAccumulator::new("echo", params).unwrap()
    }

    #[test]
    fn test_no_neighbors_pure_damping() {
        let mut e = echo(2.0);
        assert_eq!(e.intrinsic(0.0), -0.2 * 2.0);
        assert_eq!(e.resonance(), 0.0);

        let s = e.step(0.0, &SignalBoard::new());
        assert!((s - (2.0 - 0.04)).abs() < 1e-12);
    }

    #[test]
    fn test_resonance_uses_delay_weighting() {
        let mut e = echo(0.0);
        e.add_neighbor("autogenesis", 0.6, 0.5, Transfer::identity())
            .unwrap();
        let board = SignalBoard::new().with("autogenesis", 1.0);
        e.step(1.0, &board);

        let expected = 0.6 * (-0.5f64).exp();
        assert!((e.resonance() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_resonance_reset_each_tick() {
        let mut e = echo(0.0);
        e.add_neighbor("autogenesis", 0.6, 0.0, Transfer::sigmoid())
            .unwrap();
        e.step(0.0, &SignalBoard::new().with("autogenesis", 0.0));
        assert!((e.resonance() - 0.3).abs() < 1e-12);

        // neighbor absent from this tick's inputs
        e.step(0.1, &SignalBoard::new());
        assert_eq!(e.resonance(), 0.0);
    }

    #[test]
    fn test_neighbor_drive_counted_once() {
        let mut e = echo(0.0);
        e.add_neighbor("journal", 0.5, 0.0, Transfer::identity())
            .unwrap();
        let s = e.step(0.0, &SignalBoard::new().with("journal", 2.0));
        // dx = -0.2 * 0 + 0.5 * 2
        assert!((e.resonance() - 1.0).abs() < 1e-12);
        assert!((s - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_step_integrates_damping_and_resonance() {
        let mut e = echo(1.0);
        e.add_neighbor("autogenesis", 0.6, 0.0, Transfer::sigmoid())
            .unwrap();
        e.add_neighbor("journal", 0.5, 0.0, Transfer::identity())
            .unwrap();
        let board = SignalBoard::new()
            .with("autogenesis", 0.0)
            .with("journal", 2.0);
        let s = e.step(0.0, &board);
        // dx = -0.2 * 1 + 0.6 * 0.5 + 0.5 * 2
        assert!((s - (1.0 + 0.1 * 1.1)).abs() < 1e-12);
    }

    #[test]
    fn test_status() {
        let e = echo(1.5);
        let st = e.status();
        assert_eq!(st.module, "echo");
        assert_eq!(st.state, 1.5);
        assert_eq!(st.resonance, 0.0);
    }
}
