#![forbid(unsafe_code)]
#![deny(
    unreachable_pub,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    missing_docs
)]

//! Monte-Carlo simulation of sequential Stern–Gerlach experiments.
//!
//! Particles of spin 1/2 (or spin 1) are prepared in a random or fixed state and sent through
//! a chain of analyzers. Each analyzer measures the spin along its axis, collapses the state
//! onto the eigenvector of the observed outcome, and optionally blocks every particle whose
//! outcome does not match its filter. The ensemble driver repeats this for many independent
//! particles and reports how many were found up (or zero, or down) at each analyzer.
//!
//! # Example
//! Three analyzers: z passing only up, then x, then z again. Quantum mechanics says the x
//! measurement erases the first z result, so the final z splits evenly.
//! ```
//! use stern_gerlach::prelude::*;
//!
//! # fn main() -> SimulationResult<()> {
//! let tallies = Ensemble::<f64>::new(20_000, vec![
//!     Analyzer::new(Axis::Z, Filter::Up),
//!     Analyzer::new(Axis::X, Filter::Up),
//!     Analyzer::unfiltered(Axis::Z),
//! ])
//! .with_seed(1234)
//! .run()?;
//!
//! // Only the first stage sees every particle.
//! assert_eq!(tallies[0].total(), 20_000);
//! assert_eq!(tallies[1].total(), tallies[0].up);
//! assert_eq!(tallies[2].total(), tallies[1].up);
//!
//! let up = tallies[2].up_fraction().unwrap();
//! assert!((up - 0.5).abs() < 0.05);
//! # Ok(())
//! # }
//! ```
//!
//! # Requests
//! The [`request`] module accepts the JSON shape used by the `sgsim` binary:
//! ```
//! use stern_gerlach::request::{handle_json, Reply};
//!
//! let reply = handle_json(r#"{
//!     "analyzers": [{"axis": "θφ", "theta": 90, "phi": 0, "filter": "up"}],
//!     "atoms": 10,
//!     "a": "1/√2",
//!     "b": "1/√2",
//!     "seed": 7
//! }"#);
//! match reply {
//!     // (1, 1)/√2 is the x up state, and θ=90, φ=0 is the x axis.
//!     Reply::Results(r) => assert_eq!((r.results[0].up, r.results[0].down), (10, 0)),
//!     Reply::Error(e) => panic!("{}", e.error),
//! }
//! ```

#[macro_use]
mod rayon_helper;

/// Measurement axes and their eigenbases.
pub mod basis;
/// Analyzer chains and single-particle evaluation.
pub mod chain;
/// Many-particle runs and per-analyzer tallies.
pub mod ensemble;
/// Simulation error types.
pub mod errors;
/// Parsing of calculator-style amplitude expressions.
pub mod expression;
/// Transport-independent request and response types.
pub mod request;
/// Spin state vectors.
pub mod state;
/// Lower-level vector and measurement operations.
pub mod state_ops;
/// Reusable types.
pub mod types;

pub use basis::{eigenbasis, Axis, Eigenbasis, FixedAxis};
pub use chain::{run_chain, Analyzer, ChainRecords, CompiledChain, Filter, StageRecord};
pub use ensemble::{run_ensemble, Ensemble, InitialState, Tally};
pub use errors::{SimulationError, SimulationResult};
pub use expression::parse_amplitude;
pub use num_complex::Complex;
pub use rand;
pub use request::{MeasurementRequest, MeasurementResponse, TallyReport};
pub use state::{fixed_state, random_state, SpinState};
pub use types::*;

/// Commonly used types and functions.
/// ```
/// use stern_gerlach::prelude::*;
/// ```
pub mod prelude {
    pub use super::*;
    pub use crate::state_ops::measurement_ops::{measure, measure_in_basis};
}
