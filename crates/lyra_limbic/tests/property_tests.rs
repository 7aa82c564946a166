//! Property-based tests for the limbic modules.
//!
//! The detector's alert must never fire at or below its threshold, tension
//! stays within [0, 10], and an accumulator with no neighbors is pure
//! exponential damping.

use lyra_core::{LyraModule, Params, SignalBoard, Transfer, STATE_BOUND};
use lyra_limbic::{ResonanceAccumulator, ThresholdDetector, TENSION_MAX};
use proptest::prelude::*;

fn detector(theta: f64, gamma: f64, eta: f64) -> ThresholdDetector {
    let params = Params::new()
        .with("theta_C", theta)
        .with("gamma", gamma)
        .with("eta_C", eta)
        .with("dt", 0.1);
    ThresholdDetector::new("critrix", params).unwrap()
}

proptest! {
    #[test]
    fn alert_implies_tension_above_threshold(
        theta in 0.0f64..3.0,
        gamma in 0.0f64..5.0,
        eta in 0.0f64..1.0,
        inputs in prop::collection::vec(0.0f64..12.0, 1..60),
    ) {
        let mut d = detector(theta, gamma, eta);
        for (i, tau_in) in inputs.into_iter().enumerate() {
            d.inject_tau_in(tau_in);
            let s = d.step(i as f64 * 0.1, &SignalBoard::new());
            prop_assert!(s.abs() <= STATE_BOUND);
            prop_assert!((0.0..=TENSION_MAX).contains(&d.tau_c()));
            prop_assert!(d.coherence() > 0.0 && d.coherence() <= 1.0);
            if d.tau_c() <= theta {
                prop_assert!(!d.is_over_threshold());
            }
        }
    }

    #[test]
    fn rising_input_eventually_alerts(
        theta in 0.1f64..2.0,
        gamma in 0.5f64..2.0,
    ) {
        let mut d = detector(theta, gamma, 0.3);
        let mut alerted = false;
        for i in 0..400 {
            // monotonically increasing, saturating well above the threshold
            let tau_in = (theta + 3.0 + i as f64 * 0.05).min(theta + 9.0);
            d.inject_tau_in(tau_in);
            d.step(i as f64 * 0.1, &SignalBoard::new());
            if d.is_over_threshold() {
                alerted = true;
                break;
            }
        }
        prop_assert!(alerted);
    }

    #[test]
    fn isolated_accumulator_is_pure_damping(
        state0 in -10.0f64..=10.0,
        alpha in 0.0f64..2.0,
    ) {
        let params = Params::new().with("alpha", alpha).with("state0", state0);
        let mut e = ResonanceAccumulator::new("echo", params).unwrap();
        prop_assert_eq!(e.intrinsic(0.0), -alpha * state0);
        prop_assert_eq!(e.resonance(), 0.0);
    }

    #[test]
    fn accumulator_state_bounded(
        weight in -50.0f64..50.0,
        delay in 0.0f64..3.0,
        inputs in prop::collection::vec(-100.0f64..100.0, 1..50),
    ) {
        let mut e = ResonanceAccumulator::new("echo", Params::new()).unwrap();
        e.add_neighbor("journal", weight, delay, Transfer::tanh()).unwrap();
        for (i, x) in inputs.into_iter().enumerate() {
            let s = e.step(i as f64 * 0.1, &SignalBoard::new().with("journal", x));
            prop_assert!(s.abs() <= STATE_BOUND);
        }
    }
}
