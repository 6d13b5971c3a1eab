#[cfg(feature = "parallel")]
pub(crate) use rayon::prelude::*;

use crate::chain::{Analyzer, CompiledChain};
use crate::errors::{SimulationError, SimulationResult};
use crate::state::SpinState;
use crate::types::{Outcome, Precision, SpinKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::{Add, AddAssign};
use tracing::{debug, trace};

/// Particles simulated with one seeded generator. Chunking is independent of the thread
/// count, so a seeded run gives the same tallies with or without the `parallel` feature.
pub const CHUNK_SIZE: usize = 4096;

/// How each particle of an ensemble is prepared.
#[derive(Debug, Clone, PartialEq)]
pub enum InitialState<P: Precision> {
    /// An independent uniformly random state per particle.
    Random,
    /// The same normalized state for every particle.
    Fixed(SpinState<P>),
}

/// Per-analyzer outcome counts.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct Tally {
    /// Particles measured up.
    pub up: u64,
    /// Particles measured zero (spin-1 only).
    pub zero: u64,
    /// Particles measured down.
    pub down: u64,
}

impl Tally {
    /// Count one outcome.
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Up => self.up += 1,
            Outcome::Zero => self.zero += 1,
            Outcome::Down => self.down += 1,
        }
    }

    /// Count for a single outcome.
    pub fn count(&self, outcome: Outcome) -> u64 {
        match outcome {
            Outcome::Up => self.up,
            Outcome::Zero => self.zero,
            Outcome::Down => self.down,
        }
    }

    /// Particles which reached this stage.
    pub fn total(&self) -> u64 {
        self.up + self.zero + self.down
    }

    /// Fraction of particles at this stage measured up, or `None` if none arrived.
    pub fn up_fraction(&self) -> Option<f64> {
        self.fraction(Outcome::Up)
    }

    /// Fraction of particles at this stage with `outcome`, or `None` if none arrived.
    pub fn fraction(&self, outcome: Outcome) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.count(outcome) as f64 / total as f64),
        }
    }
}

impl AddAssign for Tally {
    fn add_assign(&mut self, rhs: Self) {
        self.up += rhs.up;
        self.zero += rhs.zero;
        self.down += rhs.down;
    }
}

impl Add for Tally {
    type Output = Tally;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

/// One ensemble run: a fixed chain, particle count, preparation and forget policy.
///
/// # Example
/// ```
/// use stern_gerlach::{Analyzer, Axis, Ensemble, Filter};
///
/// let tallies = Ensemble::<f64>::new(1000, vec![
///     Analyzer::new(Axis::Z, Filter::Up),
///     Analyzer::unfiltered(Axis::Z),
/// ])
/// .with_seed(42)
/// .run()
/// .unwrap();
///
/// assert_eq!(tallies[0].total(), 1000);
/// // Every particle passing the up filter is found up again.
/// assert_eq!(tallies[1].up, tallies[0].up);
/// assert_eq!(tallies[1].down, 0);
/// ```
#[derive(Debug, Clone)]
pub struct Ensemble<P: Precision> {
    atoms: usize,
    kind: SpinKind,
    initial: InitialState<P>,
    analyzers: Vec<Analyzer>,
    forget: bool,
    seed: Option<u64>,
}

impl<P: Precision> Ensemble<P> {
    /// A spin-1/2 ensemble of `atoms` random particles sent through `analyzers`.
    pub fn new(atoms: usize, analyzers: Vec<Analyzer>) -> Self {
        Self {
            atoms,
            kind: SpinKind::Half,
            initial: InitialState::Random,
            analyzers,
            forget: false,
            seed: None,
        }
    }

    /// Set how particles are prepared. A fixed state also fixes the spin.
    pub fn with_initial_state(mut self, initial: InitialState<P>) -> Self {
        if let InitialState::Fixed(state) = &initial {
            self.kind = state.kind();
        }
        self.initial = initial;
        self
    }

    /// Set the particle spin.
    pub fn with_spin(mut self, kind: SpinKind) -> Self {
        self.kind = kind;
        self
    }

    /// Forget the collapsed state between consecutive analyzers.
    pub fn with_forget(mut self, forget: bool) -> Self {
        self.forget = forget;
        self
    }

    /// Make the run reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of particles.
    pub fn atoms(&self) -> usize {
        self.atoms
    }

    /// Particle spin.
    pub fn kind(&self) -> SpinKind {
        self.kind
    }

    /// The analyzers in chain order.
    pub fn analyzers(&self) -> &[Analyzer] {
        &self.analyzers
    }

    /// Run every particle and return one tally per analyzer, in chain order.
    ///
    /// Either the whole ensemble runs or an error is returned; there are no partial tallies.
    pub fn run(&self) -> SimulationResult<Vec<Tally>> {
        if self.atoms == 0 {
            return Err(SimulationError::invalid_request("atoms must be positive"));
        }
        if self.analyzers.is_empty() {
            return Err(SimulationError::invalid_request(
                "at least one analyzer is required",
            ));
        }
        if let InitialState::Fixed(state) = &self.initial {
            if state.kind() != self.kind {
                let message = format!(
                    "fixed state has {} amplitudes but the ensemble is {:?}",
                    state.dimension(),
                    self.kind
                );
                return Err(SimulationError::invalid_initial_state(message));
            }
        }
        let chain = CompiledChain::new(&self.analyzers, self.kind, self.forget)?;

        let mut master = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let chunks: Vec<(usize, usize, u64)> = (0..self.atoms)
            .step_by(CHUNK_SIZE)
            .enumerate()
            .map(|(i, start)| (i, CHUNK_SIZE.min(self.atoms - start), master.gen()))
            .collect();

        debug!(
            atoms = self.atoms,
            stages = chain.len(),
            forget = self.forget,
            seed = ?self.seed,
            chunks = chunks.len(),
            "running ensemble"
        );

        let partials = into_iter!(chunks)
            .map(|(index, count, seed)| self.run_chunk(&chain, index, count, seed))
            .collect::<SimulationResult<Vec<_>>>()?;

        let tallies = partials.into_iter().fold(
            vec![Tally::default(); chain.len()],
            |mut acc, partial| {
                acc.iter_mut().zip(partial).for_each(|(a, p)| *a += p);
                acc
            },
        );
        debug!(tallies = ?tallies, "ensemble finished");
        Ok(tallies)
    }

    fn run_chunk(
        &self,
        chain: &CompiledChain<P>,
        index: usize,
        count: usize,
        seed: u64,
    ) -> SimulationResult<Vec<Tally>> {
        trace!(chunk = index, particles = count, "running chunk");
        let mut rng = StdRng::seed_from_u64(seed);
        let mut tallies = vec![Tally::default(); chain.len()];
        for _ in 0..count {
            let initial = match &self.initial {
                InitialState::Random => SpinState::random(self.kind, &mut rng),
                InitialState::Fixed(state) => state.clone(),
            };
            chain.evaluate_with(initial, &mut rng, |r| tallies[r.stage].record(r.outcome))?;
        }
        Ok(tallies)
    }
}

/// Run `n` independent particles through `analyzers` and tally each stage.
///
/// The per-particle generators are seeded from `rng`, so a seeded `rng` gives a
/// reproducible run.
pub fn run_ensemble<P: Precision, R: Rng + ?Sized>(
    n: usize,
    initial: InitialState<P>,
    analyzers: &[Analyzer],
    forget: bool,
    rng: &mut R,
) -> SimulationResult<Vec<Tally>> {
    Ensemble::new(n, analyzers.to_vec())
        .with_initial_state(initial)
        .with_forget(forget)
        .with_seed(rng.gen())
        .run()
}

#[cfg(test)]
mod ensemble_tests {
    use super::*;
    use crate::basis::Axis;
    use crate::chain::Filter;

    #[test]
    fn test_tally_arithmetic() {
        let mut a = Tally::default();
        a.record(Outcome::Up);
        a.record(Outcome::Up);
        a.record(Outcome::Down);
        let b = Tally {
            up: 1,
            zero: 2,
            down: 3,
        };
        let c = a + b;
        assert_eq!(c.total(), 9);
        assert_eq!(c.count(Outcome::Zero), 2);
        assert_eq!(a.up_fraction(), Some(2.0 / 3.0));
        assert_eq!(Tally::default().up_fraction(), None);
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let analyzers = vec![
            Analyzer::new(Axis::X, Filter::Up),
            Analyzer::unfiltered(Axis::parametric(60.0, 45.0)),
        ];
        let ensemble = Ensemble::<f64>::new(3 * CHUNK_SIZE + 17, analyzers).with_seed(99);
        let first = ensemble.run().unwrap();
        let second = ensemble.run().unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].total(), (3 * CHUNK_SIZE + 17) as u64);
    }

    #[test]
    fn test_rejects_empty_requests() {
        let none = Ensemble::<f64>::new(0, vec![Analyzer::unfiltered(Axis::Z)]);
        assert!(matches!(none.run(), Err(SimulationError::InvalidRequest(_))));
        let no_stages = Ensemble::<f64>::new(10, vec![]);
        assert!(matches!(
            no_stages.run(),
            Err(SimulationError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_spin_mismatch_rejected() {
        let state = SpinState::<f64>::from_amplitudes(&[
            crate::Complex::new(1.0, 0.0),
            crate::Complex::new(1.0, 0.0),
        ])
        .unwrap();
        let ensemble = Ensemble::new(10, vec![Analyzer::unfiltered(Axis::Z)])
            .with_initial_state(InitialState::Fixed(state))
            .with_spin(SpinKind::One);
        assert!(matches!(
            ensemble.run(),
            Err(SimulationError::InvalidInitialState(_))
        ));
    }
}
