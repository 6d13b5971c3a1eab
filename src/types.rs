use num_traits::{Float, NumAssign};
use std::fmt::{Debug, Display};
use std::iter::{Product, Sum};

/// The float precision of the simulation.
pub trait Precision:
    Default + NumAssign + Float + Sum + Send + Sync + Display + Product + Debug
{
}

impl Precision for f64 {}

impl Precision for f32 {}

/// The spin of the simulated particles, which fixes the dimension of their state vectors.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum SpinKind {
    /// Spin-1/2, two outcomes (up, down).
    Half,
    /// Spin-1, three outcomes (up, zero, down).
    One,
}

impl SpinKind {
    /// Number of complex amplitudes in a state of this spin.
    pub fn dimension(self) -> usize {
        match self {
            SpinKind::Half => 2,
            SpinKind::One => 3,
        }
    }

    /// Spin for a state vector of length `dim`, if any.
    pub fn from_dimension(dim: usize) -> Option<Self> {
        match dim {
            2 => Some(SpinKind::Half),
            3 => Some(SpinKind::One),
            _ => None,
        }
    }
}

/// A single measurement result.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Outcome {
    /// Aligned with the analyzer axis.
    Up,
    /// Zero projection, only produced by spin-1 analyzers.
    Zero,
    /// Anti-aligned with the analyzer axis.
    Down,
}

impl Outcome {
    /// Lowercase label as used on the wire.
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Up => "up",
            Outcome::Zero => "zero",
            Outcome::Down => "down",
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Convert an `f64` constant into the simulation precision.
pub(crate) fn cast<P: Precision>(x: f64) -> P {
    P::from(x).unwrap_or_else(P::nan)
}
