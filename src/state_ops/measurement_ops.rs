use crate::basis::{eigenbasis, Axis, Eigenbasis};
use crate::errors::{SimulationError, SimulationResult};
use crate::state::SpinState;
use crate::types::{Outcome, Precision};
use rand::Rng;
use smallvec::SmallVec;
use tracing::warn;

/// Tolerated drift of the summed Born probabilities before a warning is logged.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Born probabilities for each outcome, in sampling order (up, zero, down).
pub type OutcomeProbabilities<P> = SmallVec<[(Outcome, P); 3]>;

/// Cumulative probabilities closer than this to 0 or 1 are treated as exactly 0 or 1, so
/// an eigenstate measured along its own axis always returns the same outcome.
/// Never wider than [`PROBABILITY_TOLERANCE`].
fn collapse_tolerance<P: Precision>() -> f64 {
    let rounding = P::epsilon().to_f64().unwrap_or(f64::EPSILON) * 64.0;
    rounding.min(PROBABILITY_TOLERANCE)
}

/// Calculate the probability `|<e_k|state>|^2` of each outcome of `basis`.
///
/// The probabilities are not renormalized; for a unit state they sum to one up to rounding.
///
/// # Example
/// ```
/// use stern_gerlach::state_ops::measurement_ops::outcome_probabilities;
/// use stern_gerlach::{Eigenbasis, FixedAxis, Outcome, SpinKind};
///
/// let x = Eigenbasis::<f64>::fixed(FixedAxis::X, SpinKind::Half);
/// let z = Eigenbasis::<f64>::fixed(FixedAxis::Z, SpinKind::Half);
/// let probs = outcome_probabilities(z.up(), &x).unwrap();
/// assert_eq!(probs[0].0, Outcome::Up);
/// assert!((probs[0].1 - 0.5).abs() < 1e-12);
/// assert!((probs[1].1 - 0.5).abs() < 1e-12);
/// ```
pub fn outcome_probabilities<P: Precision>(
    state: &SpinState<P>,
    basis: &Eigenbasis<P>,
) -> SimulationResult<OutcomeProbabilities<P>> {
    if state.kind() != basis.kind() {
        return Err(SimulationError::DimensionMismatch {
            state: state.dimension(),
            basis: basis.kind().dimension(),
        });
    }
    let probs: OutcomeProbabilities<P> = basis
        .outcomes()
        .map(|(outcome, e)| (outcome, e.overlap(state)))
        .collect();

    let total: P = probs.iter().map(|(_, p)| *p).sum();
    let drift = (total - P::one()).abs().to_f64().unwrap_or(f64::INFINITY);
    if drift > PROBABILITY_TOLERANCE {
        warn!(drift, "born probabilities do not sum to one");
    }
    Ok(probs)
}

/// Pick an outcome for a uniform `draw` in `[0, 1)`.
///
/// The draw is compared against the cumulative mass in sampling order: up if
/// `draw < p_up`, zero if `draw < p_up + p_zero`, and down otherwise, so every draw maps to
/// exactly one outcome.
///
/// # Example
/// ```
/// use stern_gerlach::state_ops::measurement_ops::select_outcome;
/// use stern_gerlach::Outcome;
///
/// let probs = [(Outcome::Up, 0.25), (Outcome::Zero, 0.5), (Outcome::Down, 0.25)];
/// assert_eq!(select_outcome(&probs, 0.1), Outcome::Up);
/// assert_eq!(select_outcome(&probs, 0.25), Outcome::Zero);
/// assert_eq!(select_outcome(&probs, 0.8), Outcome::Down);
/// ```
pub fn select_outcome<P: Precision>(probabilities: &[(Outcome, P)], draw: f64) -> Outcome {
    let tolerance = collapse_tolerance::<P>();
    let mut cumulative = 0.0;
    for (outcome, p) in probabilities {
        if *outcome == Outcome::Down {
            break;
        }
        cumulative += p.to_f64().unwrap_or(0.0);
        let threshold = if cumulative <= tolerance {
            0.0
        } else if cumulative >= 1.0 - tolerance {
            1.0
        } else {
            cumulative
        };
        if draw < threshold {
            return *outcome;
        }
    }
    Outcome::Down
}

/// Measure `state` in `basis` using a supplied uniform `draw` instead of a random one.
/// Returns the collapsed state (the eigenvector of the outcome) and the outcome.
pub fn measure_with_draw<P: Precision>(
    state: &SpinState<P>,
    basis: &Eigenbasis<P>,
    draw: f64,
) -> SimulationResult<(SpinState<P>, Outcome)> {
    let probs = outcome_probabilities(state, basis)?;
    let outcome = select_outcome(&probs, draw);
    let collapsed = basis
        .vector(outcome)
        .cloned()
        .ok_or(SimulationError::DimensionMismatch {
            state: state.dimension(),
            basis: basis.kind().dimension(),
        })?;
    Ok((collapsed, outcome))
}

/// Measure `state` in a precomputed `basis`, sampling the outcome from `rng`.
pub fn measure_in_basis<P: Precision, R: Rng + ?Sized>(
    state: &SpinState<P>,
    basis: &Eigenbasis<P>,
    rng: &mut R,
) -> SimulationResult<(SpinState<P>, Outcome)> {
    let draw: f64 = rng.gen();
    measure_with_draw(state, basis, draw)
}

/// Measure `state` along `axis`, returning the collapsed state and the outcome.
///
/// # Example
/// ```
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use stern_gerlach::state_ops::measurement_ops::measure;
/// use stern_gerlach::{Axis, Eigenbasis, FixedAxis, Outcome, SpinKind};
///
/// let mut rng = StdRng::seed_from_u64(3);
/// let z = Eigenbasis::<f64>::fixed(FixedAxis::Z, SpinKind::Half);
/// let (collapsed, outcome) = measure(z.down(), &Axis::Z, &mut rng).unwrap();
/// assert_eq!(outcome, Outcome::Down);
/// assert_eq!(&collapsed, z.down());
/// ```
pub fn measure<P: Precision, R: Rng + ?Sized>(
    state: &SpinState<P>,
    axis: &Axis,
    rng: &mut R,
) -> SimulationResult<(SpinState<P>, Outcome)> {
    let basis = eigenbasis(axis, state.kind())?;
    measure_in_basis(state, &basis, rng)
}
