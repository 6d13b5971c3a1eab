use crate::errors::{SimulationError, SimulationResult};
use crate::state_ops::vector_ops::{inner_product, norm, normalize};
use crate::types::{cast, Precision, SpinKind};
use crate::Complex;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use smallvec::SmallVec;
use std::fmt;

/// Inline storage for the amplitudes of a single spin.
pub type Amplitudes<P> = SmallVec<[Complex<P>; 3]>;

/// The unit-normalized spin state of one particle, of dimension 2 (spin-1/2) or 3 (spin-1).
///
/// States are never edited in place: measurement produces a new state.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinState<P: Precision> {
    amplitudes: Amplitudes<P>,
}

impl<P: Precision> SpinState<P> {
    /// Wrap amplitudes which are already known to be normalized (eigenvectors).
    pub(crate) fn from_normalized(amplitudes: Amplitudes<P>) -> Self {
        debug_assert!(SpinKind::from_dimension(amplitudes.len()).is_some());
        Self { amplitudes }
    }

    /// Build a state from caller-supplied amplitudes, normalizing them.
    ///
    /// Normalization is always applied, even to input which claims to be normalized.
    ///
    /// # Example
    /// ```
    /// use stern_gerlach::{Complex, SpinState};
    ///
    /// let s = SpinState::from_amplitudes(&[Complex::new(3.0, 0.0), Complex::new(0.0, 4.0)]).unwrap();
    /// assert!((s.amplitudes()[0].re - 0.6f64).abs() < 1e-12);
    /// assert!((s.amplitudes()[1].im - 0.8f64).abs() < 1e-12);
    /// ```
    pub fn from_amplitudes(amplitudes: &[Complex<P>]) -> SimulationResult<Self> {
        if SpinKind::from_dimension(amplitudes.len()).is_none() {
            let message = format!(
                "expected 2 or 3 amplitudes but {} were supplied",
                amplitudes.len()
            );
            return Err(SimulationError::invalid_initial_state(message));
        }
        let amplitudes = normalize(amplitudes).ok_or(SimulationError::DegenerateState)?;
        Ok(Self {
            amplitudes: amplitudes.into_iter().collect(),
        })
    }

    /// Draw a state uniformly from the complex unit sphere.
    ///
    /// Each component gets independent standard normal real and imaginary parts and the
    /// result is normalized, which is Haar-uniform over pure states.
    pub fn random<R: Rng + ?Sized>(kind: SpinKind, rng: &mut R) -> Self {
        loop {
            let amplitudes: Amplitudes<P> = (0..kind.dimension())
                .map(|_| {
                    let re: f64 = StandardNormal.sample(rng);
                    let im: f64 = StandardNormal.sample(rng);
                    Complex::new(cast(re), cast(im))
                })
                .collect();
            // A zero draw has probability zero, but redraw rather than divide by it.
            if let Some(amplitudes) = normalize(&amplitudes) {
                return Self {
                    amplitudes: amplitudes.into_iter().collect(),
                };
            }
        }
    }

    /// Spin of this state.
    pub fn kind(&self) -> SpinKind {
        match self.amplitudes.len() {
            3 => SpinKind::One,
            _ => SpinKind::Half,
        }
    }

    /// Number of amplitudes.
    pub fn dimension(&self) -> usize {
        self.amplitudes.len()
    }

    /// Read-only access to the amplitudes.
    pub fn amplitudes(&self) -> &[Complex<P>] {
        &self.amplitudes
    }

    /// Euclidean norm, one up to rounding.
    pub fn norm(&self) -> P {
        norm(&self.amplitudes)
    }

    /// Hermitian inner product `<self|other>`.
    pub fn inner(&self, other: &Self) -> Complex<P> {
        inner_product(&self.amplitudes, &other.amplitudes)
    }

    /// Probability `|<self|other>|^2` of finding `other` in this state.
    pub fn overlap(&self, other: &Self) -> P {
        self.inner(other).norm_sqr()
    }
}

impl<P: Precision> fmt::Display for SpinState<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, c) in self.amplitudes.iter().enumerate() {
            write!(f, "{}{:.4}", if i > 0 { ", " } else { "" }, c)?;
        }
        write!(f, "]")
    }
}

/// Draw a uniformly random state of the given spin.
pub fn random_state<P: Precision, R: Rng + ?Sized>(kind: SpinKind, rng: &mut R) -> SpinState<P> {
    SpinState::random(kind, rng)
}

/// Normalize caller-supplied amplitudes into a state.
pub fn fixed_state<P: Precision>(amplitudes: &[Complex<P>]) -> SimulationResult<SpinState<P>> {
    SpinState::from_amplitudes(amplitudes)
}
