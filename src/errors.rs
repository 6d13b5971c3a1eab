use std::error::Error;
use std::fmt::{Display, Formatter};

/// An error from configuring or running a simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// The analyzer axis was not recognized, or a parametric axis lacked its angles.
    InvalidAxis(String),
    /// Supplied amplitudes have zero (or non-finite) norm and cannot be normalized.
    DegenerateState,
    /// Supplied amplitudes could not be parsed or have the wrong shape.
    InvalidInitialState(String),
    /// A state was measured against a basis of a different dimension.
    DimensionMismatch {
        /// Dimension of the measured state.
        state: usize,
        /// Dimension of the analyzer basis.
        basis: usize,
    },
    /// The ensemble request itself is malformed.
    InvalidRequest(String),
}

impl SimulationError {
    /// Construct a new `InvalidAxis` error.
    pub fn invalid_axis<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidAxis(msg.into())
    }

    /// Construct a new `InvalidInitialState` error.
    pub fn invalid_initial_state<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidInitialState(msg.into())
    }

    /// Construct a new `InvalidRequest` error.
    pub fn invalid_request<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidRequest(msg.into())
    }
}

/// A result which may contain a simulation error.
pub type SimulationResult<T> = Result<T, SimulationError>;

impl Error for SimulationError {}

impl Display for SimulationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAxis(msg) => write!(f, "invalid axis: {}", msg),
            Self::DegenerateState => write!(f, "initial amplitudes cannot be normalized"),
            Self::InvalidInitialState(msg) => write!(f, "invalid initial state: {}", msg),
            Self::DimensionMismatch { state, basis } => write!(
                f,
                "state of dimension {} measured against a basis of dimension {}",
                state, basis
            ),
            Self::InvalidRequest(msg) => write!(f, "invalid request: {}", msg),
        }
    }
}
