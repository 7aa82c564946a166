//! Transfer functions: scalar maps that shape a neighbor's signal before it
//! enters another module's derivative.
//!
//! A [`Transfer`] is a shared capability (`Arc<dyn Fn>`) with a display name,
//! so couplings stay cheap to clone and readable in logs.

use std::fmt;
use std::sync::Arc;

type TransferFn = dyn Fn(f64) -> f64 + Send + Sync;

/// A named scalar→scalar coupling function.
#[derive(Clone)]
pub struct Transfer {
    name: Arc<str>,
    func: Arc<TransferFn>,
}

impl Transfer {
    /// Wrap an arbitrary function under a display name.
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn apply(&self, x: f64) -> f64 {
        (self.func)(x)
    }

    // --- Linear ---

    pub fn identity() -> Self {
        Self::new("identity", |x| x)
    }

    pub fn negate() -> Self {
        Self::new("negate", |x| -x)
    }

    pub fn scale_half() -> Self {
        Self::new("scale_half", |x| 0.5 * x)
    }

    // --- Classic non-linear ---

    pub fn sigmoid() -> Self {
        Self::new("sigmoid", |x| 1.0 / (1.0 + (-x).exp()))
    }

    pub fn tanh() -> Self {
        Self::new("tanh", f64::tanh)
    }

    pub fn relu() -> Self {
        Self::new("relu", |x| x.max(0.0))
    }

    // --- Shaping curves ---

    /// Amplifies weak signals and compresses strong ones: `sign(x) * sqrt(|x|)`.
    pub fn soft_mirror() -> Self {
        Self::new("soft_mirror", |x| signum0(x) * x.abs().sqrt())
    }

    /// Non-monotone wave filter: `sin(x) * tanh(x)`.
    pub fn chaos_echo() -> Self {
        Self::new("chaos_echo", |x| x.sin() * x.tanh())
    }

    /// `sign(x) * |x|^0.3`
    pub fn sensitivity_curve() -> Self {
        Self::new("sensitivity_curve", |x| signum0(x) * x.abs().powf(0.3))
    }

    // --- Thresholds and clamps ---

    pub fn hard_threshold() -> Self {
        Self::new("hard_threshold", |x| if x > 0.5 { 1.0 } else { 0.0 })
    }

    pub fn clamped() -> Self {
        Self::new("clamped", |x| x.clamp(-1.0, 1.0))
    }

    /// Compose transfers right-to-left: `compose([f, g, h])(x) == f(g(h(x)))`.
    pub fn compose(parts: Vec<Transfer>) -> Self {
        let name = parts
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join("∘");
        Self::new(&name, move |x| parts.iter().rev().fold(x, |acc, t| t.apply(acc)))
    }
}

impl fmt::Debug for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transfer({})", self.name)
    }
}

impl Default for Transfer {
    fn default() -> Self {
        Self::identity()
    }
}

/// `f64::signum` maps 0.0 to 1.0; coupling curves need sign(0) == 0.
#[inline]
fn signum0(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}
