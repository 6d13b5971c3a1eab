use crate::basis::Axis;
use crate::chain::{Analyzer, Filter};
use crate::ensemble::{Ensemble, InitialState, Tally};
use crate::errors::{SimulationError, SimulationResult};
use crate::expression::parse_amplitude;
use crate::state::SpinState;
use crate::types::SpinKind;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One analyzer as it arrives on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerInput {
    /// `"x"`, `"y"`, `"z"`, or a parametric token such as `"θφ"`.
    pub axis: String,
    /// `"up"`, `"down"`, `"zero"` or `"both"`.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Polar angle in degrees, required for parametric axes.
    #[serde(default)]
    pub theta: Option<f64>,
    /// Azimuthal angle in degrees, defaults to 0.
    #[serde(default)]
    pub phi: Option<f64>,
}

fn default_filter() -> String {
    "both".to_string()
}

impl AnalyzerInput {
    /// Resolve into an [`Analyzer`].
    pub fn resolve(&self) -> SimulationResult<Analyzer> {
        let axis = Axis::from_token(&self.axis, self.theta, self.phi)?;
        let filter = Filter::from_token(&self.filter)?;
        Ok(Analyzer::new(axis, filter))
    }
}

/// A measurement request.
///
/// When `a` and `b` are both absent every particle starts in an independent random state;
/// otherwise every particle starts in the normalized state `(a, b)` or, with `c`, the
/// spin-1 state `(a, b, c)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRequest {
    /// The experiment chain, in order.
    pub analyzers: Vec<AnalyzerInput>,
    /// Number of particles.
    pub atoms: usize,
    /// First amplitude expression.
    #[serde(default)]
    pub a: Option<String>,
    /// Second amplitude expression.
    #[serde(default)]
    pub b: Option<String>,
    /// Third amplitude expression, selects spin-1.
    #[serde(default)]
    pub c: Option<String>,
    /// Spin of random particles: `"1/2"` (default) or `"1"`. With amplitudes it must
    /// agree with their count.
    #[serde(default)]
    pub spin: Option<String>,
    /// Replace the collapsed state by a random one between analyzers.
    #[serde(default)]
    pub forget: bool,
    /// Seed for a reproducible run.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Counts for one analyzer on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyReport {
    /// Particles measured up.
    pub up: u64,
    /// Particles measured down.
    pub down: u64,
    /// Particles measured zero, spin-1 runs only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zero: Option<u64>,
}

impl TallyReport {
    /// Report `tally` for particles of spin `kind`.
    pub fn new(tally: &Tally, kind: SpinKind) -> Self {
        Self {
            up: tally.up,
            down: tally.down,
            zero: match kind {
                SpinKind::Half => None,
                SpinKind::One => Some(tally.zero),
            },
        }
    }
}

/// Per-analyzer tallies, in chain order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementResponse {
    /// One entry per analyzer.
    pub results: Vec<TallyReport>,
}

/// The single error body returned instead of any tallies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human readable reason.
    pub error: String,
}

/// Either a response or an error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    /// Tallies for a successful run.
    Results(MeasurementResponse),
    /// The reason the run was refused.
    Error(ErrorResponse),
}

impl From<SimulationResult<MeasurementResponse>> for Reply {
    fn from(result: SimulationResult<MeasurementResponse>) -> Self {
        match result {
            Ok(response) => Reply::Results(response),
            Err(err) => Reply::Error(ErrorResponse {
                error: err.to_string(),
            }),
        }
    }
}

fn present(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl MeasurementRequest {
    fn spin_hint(&self) -> SimulationResult<Option<SpinKind>> {
        match present(&self.spin) {
            None => Ok(None),
            Some("1/2" | "0.5" | "half" | "½") => Ok(Some(SpinKind::Half)),
            Some("1" | "one") => Ok(Some(SpinKind::One)),
            Some(other) => Err(SimulationError::invalid_request(format!(
                "unsupported spin {:?}, expected 1/2 or 1",
                other
            ))),
        }
    }

    /// Work out the spin and initial-state policy from the amplitude fields.
    pub fn initial_state(&self) -> SimulationResult<(SpinKind, InitialState<f64>)> {
        let hint = self.spin_hint()?;
        let amplitudes = match (present(&self.a), present(&self.b), present(&self.c)) {
            (None, None, None) => {
                return Ok((hint.unwrap_or(SpinKind::Half), InitialState::Random));
            }
            (Some(a), Some(b), None) => vec![a, b],
            (Some(a), Some(b), Some(c)) => vec![a, b, c],
            _ => {
                return Err(SimulationError::invalid_initial_state(
                    "amplitudes a and b must be given together",
                ))
            }
        };
        let amplitudes = amplitudes
            .into_iter()
            .map(parse_amplitude)
            .collect::<SimulationResult<Vec<_>>>()?;
        let state = SpinState::from_amplitudes(&amplitudes)?;
        if let Some(kind) = hint {
            if kind != state.kind() {
                return Err(SimulationError::invalid_initial_state(format!(
                    "{} amplitudes do not describe a {:?} particle",
                    state.dimension(),
                    kind
                )));
            }
        }
        Ok((state.kind(), InitialState::Fixed(state)))
    }

    /// Build the ensemble this request describes.
    pub fn ensemble(&self) -> SimulationResult<Ensemble<f64>> {
        let analyzers = self
            .analyzers
            .iter()
            .map(AnalyzerInput::resolve)
            .collect::<SimulationResult<Vec<_>>>()?;
        let (kind, initial) = self.initial_state()?;
        let ensemble = Ensemble::new(self.atoms, analyzers)
            .with_spin(kind)
            .with_initial_state(initial)
            .with_forget(self.forget);
        Ok(match self.seed {
            Some(seed) => ensemble.with_seed(seed),
            None => ensemble,
        })
    }

    /// Run the request. Any invalid input fails the whole request.
    ///
    /// # Example
    /// ```
    /// use stern_gerlach::MeasurementRequest;
    ///
    /// let request: MeasurementRequest = serde_json::from_str(
    ///     r#"{"analyzers": [{"axis": "z", "filter": "both"}], "atoms": 4}"#,
    /// ).unwrap();
    /// let response = request.run().unwrap();
    /// assert_eq!(response.results.len(), 1);
    /// assert_eq!(response.results[0].up + response.results[0].down, 4);
    /// ```
    pub fn run(&self) -> SimulationResult<MeasurementResponse> {
        let ensemble = self.ensemble()?;
        let kind = ensemble.kind();
        let tallies = ensemble.run()?;
        info!(
            atoms = self.atoms,
            analyzers = self.analyzers.len(),
            forget = self.forget,
            "measurement request complete"
        );
        Ok(MeasurementResponse {
            results: tallies.iter().map(|t| TallyReport::new(t, kind)).collect(),
        })
    }
}

/// Handle a JSON request body, producing either tallies or a single error body.
pub fn handle_json(body: &str) -> Reply {
    match serde_json::from_str::<MeasurementRequest>(body) {
        Ok(request) => request.run().into(),
        Err(err) => {
            warn!(%err, "malformed measurement request");
            Reply::Error(ErrorResponse {
                error: SimulationError::invalid_request(err.to_string()).to_string(),
            })
        }
    }
}

#[cfg(test)]
mod request_tests {
    use super::*;

    fn request(json: &str) -> MeasurementRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_defaults() {
        let r = request(r#"{"analyzers": [{"axis": "x"}], "atoms": 3}"#);
        assert_eq!(r.analyzers[0].filter, "both");
        assert!(!r.forget);
        assert_eq!(r.analyzers[0].resolve().unwrap(), Analyzer::unfiltered(Axis::X));
    }

    #[test]
    fn test_parametric_phi_defaults_to_zero() {
        let r = request(r#"{"analyzers": [{"axis": "θφ", "theta": 45}], "atoms": 3}"#);
        assert_eq!(
            r.analyzers[0].resolve().unwrap().axis,
            Axis::parametric(45.0, 0.0)
        );
    }

    #[test]
    fn test_empty_amplitudes_mean_random() {
        let r = request(r#"{"analyzers": [{"axis": "z"}], "atoms": 3, "a": "", "b": " "}"#);
        let (kind, initial) = r.initial_state().unwrap();
        assert_eq!(kind, SpinKind::Half);
        assert_eq!(initial, InitialState::Random);
    }

    #[test]
    fn test_lone_amplitude_rejected() {
        let r = request(r#"{"analyzers": [{"axis": "z"}], "atoms": 3, "a": "1"}"#);
        assert!(matches!(
            r.initial_state(),
            Err(SimulationError::InvalidInitialState(_))
        ));
    }

    #[test]
    fn test_three_amplitudes_select_spin_one() {
        let r = request(
            r#"{"analyzers": [{"axis": "z"}], "atoms": 3, "a": "1", "b": "0", "c": "0", "seed": 1}"#,
        );
        let response = r.run().unwrap();
        assert_eq!(
            response.results,
            vec![TallyReport {
                up: 3,
                down: 0,
                zero: Some(0)
            }]
        );
    }

    #[test]
    fn test_spin_field_selects_random_spin_one() {
        let r = request(r#"{"analyzers": [{"axis": "x"}], "atoms": 50, "spin": "1", "seed": 3}"#);
        let response = r.run().unwrap();
        let tally = response.results[0];
        assert_eq!(tally.up + tally.zero.unwrap() + tally.down, 50);
        assert!(serde_json::to_string(&response).unwrap().contains("\"zero\""));

        let r = request(r#"{"analyzers": [{"axis": "x"}], "atoms": 5, "spin": "1/2"}"#);
        assert_eq!(r.run().unwrap().results[0].zero, None);
    }

    #[test]
    fn test_spin_field_must_match_amplitudes() {
        let r = request(
            r#"{"analyzers": [{"axis": "z"}], "atoms": 3, "spin": "1", "a": "1", "b": "0"}"#,
        );
        assert!(matches!(
            r.run(),
            Err(SimulationError::InvalidInitialState(_))
        ));
        let r = request(
            r#"{"analyzers": [{"axis": "z"}], "atoms": 3, "spin": "1/2", "a": "1", "b": "0", "c": "0"}"#,
        );
        assert!(matches!(
            r.run(),
            Err(SimulationError::InvalidInitialState(_))
        ));
        let r = request(r#"{"analyzers": [{"axis": "z"}], "atoms": 3, "spin": "3/2"}"#);
        assert!(matches!(r.run(), Err(SimulationError::InvalidRequest(_))));
    }

    #[test]
    fn test_zero_amplitudes_are_degenerate() {
        let r = request(r#"{"analyzers": [{"axis": "z"}], "atoms": 3, "a": "0", "b": "0*i"}"#);
        assert_eq!(r.run(), Err(SimulationError::DegenerateState));
    }

    #[test]
    fn test_handle_json_errors() {
        match handle_json("{not json") {
            Reply::Error(e) => assert!(e.error.starts_with("invalid request")),
            other => panic!("unexpected {:?}", other),
        }
        let body = r#"{"analyzers": [{"axis": "w"}], "atoms": 3}"#;
        match handle_json(body) {
            Reply::Error(e) => assert!(e.error.starts_with("invalid axis")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_reply_serialization() {
        let reply = Reply::Results(MeasurementResponse {
            results: vec![TallyReport {
                up: 1,
                down: 2,
                zero: None,
            }],
        });
        assert_eq!(
            serde_json::to_string(&reply).unwrap(),
            r#"{"results":[{"up":1,"down":2}]}"#
        );
        let error = Reply::Error(ErrorResponse {
            error: "bad".to_string(),
        });
        assert_eq!(serde_json::to_string(&error).unwrap(), r#"{"error":"bad"}"#);
    }
}
