use crate::basis::{eigenbasis, Axis, Eigenbasis};
use crate::errors::{SimulationError, SimulationResult};
use crate::state::SpinState;
use crate::state_ops::measurement_ops::measure_in_basis;
use crate::types::{Outcome, Precision, SpinKind};
use rand::Rng;
use smallvec::SmallVec;
use std::fmt;

/// Which outcomes an analyzer lets through to the next stage.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Default)]
pub enum Filter {
    /// Pass only particles measured up.
    Up,
    /// Pass only particles measured down.
    Down,
    /// Pass only particles measured zero (spin-1).
    Zero,
    /// Pass every particle.
    #[default]
    Both,
}

impl Filter {
    /// Whether a particle with this `outcome` continues down the chain.
    pub fn accepts(self, outcome: Outcome) -> bool {
        match self {
            Filter::Both => true,
            Filter::Up => outcome == Outcome::Up,
            Filter::Down => outcome == Outcome::Down,
            Filter::Zero => outcome == Outcome::Zero,
        }
    }

    /// Parse a transport token (`"up"`, `"down"`, `"zero"`, `"both"`).
    pub fn from_token(token: &str) -> SimulationResult<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "up" | "+" => Ok(Filter::Up),
            "down" | "-" => Ok(Filter::Down),
            "zero" | "0" => Ok(Filter::Zero),
            "both" | "all" | "" => Ok(Filter::Both),
            other => Err(SimulationError::invalid_request(format!(
                "unrecognized filter {:?}, expected up, down or both",
                other
            ))),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Filter::Up => "up",
            Filter::Down => "down",
            Filter::Zero => "zero",
            Filter::Both => "both",
        };
        write!(f, "{}", s)
    }
}

/// One stage of an experiment chain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Analyzer {
    /// Measurement direction.
    pub axis: Axis,
    /// Outcomes passed on to the next stage.
    pub filter: Filter,
}

impl Analyzer {
    /// Make a new analyzer.
    pub fn new(axis: Axis, filter: Filter) -> Self {
        Self { axis, filter }
    }

    /// An analyzer which passes every particle.
    pub fn unfiltered(axis: Axis) -> Self {
        Self::new(axis, Filter::Both)
    }
}

/// The outcome recorded at one stage of one particle's chain.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct StageRecord {
    /// Index of the analyzer in the chain.
    pub stage: usize,
    /// Measured outcome.
    pub outcome: Outcome,
}

/// The stages a particle reached, in order.
pub type ChainRecords = SmallVec<[StageRecord; 4]>;

/// An experiment chain with every analyzer's eigenbasis resolved up front, so a chain can be
/// evaluated for many particles without recomputing bases.
#[derive(Debug, Clone)]
pub struct CompiledChain<P: Precision> {
    stages: Vec<(Eigenbasis<P>, Filter)>,
    kind: SpinKind,
    forget: bool,
}

impl<P: Precision> CompiledChain<P> {
    /// Resolve `analyzers` for particles of spin `kind`.
    ///
    /// With `forget` set the collapsed state is replaced by a fresh random state between
    /// consecutive stages.
    pub fn new(analyzers: &[Analyzer], kind: SpinKind, forget: bool) -> SimulationResult<Self> {
        let stages = analyzers
            .iter()
            .map(|a| eigenbasis(&a.axis, kind).map(|basis| (basis, a.filter)))
            .collect::<SimulationResult<Vec<_>>>()?;
        Ok(Self {
            stages,
            kind,
            forget,
        })
    }

    /// Number of analyzers.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// True if there are no analyzers.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Spin the chain was resolved for.
    pub fn kind(&self) -> SpinKind {
        self.kind
    }

    /// Whether state is forgotten between stages.
    pub fn forgets(&self) -> bool {
        self.forget
    }

    /// Drive one particle through the chain, calling `record` for each stage it reaches.
    ///
    /// A stage whose filter rejects the outcome still records that outcome, then the
    /// particle leaves the chain.
    pub fn evaluate_with<R, F>(
        &self,
        initial: SpinState<P>,
        rng: &mut R,
        mut record: F,
    ) -> SimulationResult<()>
    where
        R: Rng + ?Sized,
        F: FnMut(StageRecord),
    {
        if initial.kind() != self.kind {
            return Err(SimulationError::DimensionMismatch {
                state: initial.dimension(),
                basis: self.kind.dimension(),
            });
        }
        let last = self.stages.len().saturating_sub(1);
        let mut state = initial;
        for (stage, (basis, filter)) in self.stages.iter().enumerate() {
            let (collapsed, outcome) = measure_in_basis(&state, basis, rng)?;
            record(StageRecord { stage, outcome });
            if !filter.accepts(outcome) || stage == last {
                break;
            }
            state = if self.forget {
                SpinState::random(self.kind, rng)
            } else {
                collapsed
            };
        }
        Ok(())
    }

    /// Drive one particle through the chain and return the stages it reached.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        initial: SpinState<P>,
        rng: &mut R,
    ) -> SimulationResult<ChainRecords> {
        let mut records = ChainRecords::new();
        self.evaluate_with(initial, rng, |r| records.push(r))?;
        Ok(records)
    }
}

/// Run a single particle in `initial` through `analyzers`.
///
/// # Example
/// ```
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use stern_gerlach::{run_chain, Analyzer, Axis, Eigenbasis, Filter, FixedAxis, Outcome, SpinKind};
///
/// let mut rng = StdRng::seed_from_u64(0);
/// let z = Eigenbasis::<f64>::fixed(FixedAxis::Z, SpinKind::Half);
/// let analyzers = [
///     Analyzer::new(Axis::Z, Filter::Down),
///     Analyzer::unfiltered(Axis::X),
/// ];
/// // An up particle is rejected by the first stage and never reaches the second.
/// let records = run_chain(z.up(), &analyzers, false, &mut rng).unwrap();
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].outcome, Outcome::Up);
/// ```
pub fn run_chain<P: Precision, R: Rng + ?Sized>(
    initial: &SpinState<P>,
    analyzers: &[Analyzer],
    forget: bool,
    rng: &mut R,
) -> SimulationResult<ChainRecords> {
    let chain = CompiledChain::new(analyzers, initial.kind(), forget)?;
    chain.evaluate(initial.clone(), rng)
}
