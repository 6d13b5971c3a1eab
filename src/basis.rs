use crate::errors::{SimulationError, SimulationResult};
use crate::state::{Amplitudes, SpinState};
use crate::types::{cast, Outcome, Precision, SpinKind};
use crate::Complex;
use std::f64::consts::{FRAC_1_SQRT_2, SQRT_2};
use std::fmt;

/// One of the three canonical axes.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum FixedAxis {
    /// The x axis.
    X,
    /// The y axis.
    Y,
    /// The z axis.
    Z,
}

/// Direction of a Stern-Gerlach analyzer.
///
/// Angles of a parametric axis are in degrees: `theta` is the polar angle from +z and `phi`
/// the azimuthal angle from +x.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Axis {
    /// A canonical axis.
    Fixed(FixedAxis),
    /// An arbitrary direction on the Bloch sphere.
    Parametric {
        /// Polar angle in degrees.
        theta: f64,
        /// Azimuthal angle in degrees.
        phi: f64,
    },
}

impl From<FixedAxis> for Axis {
    fn from(axis: FixedAxis) -> Self {
        Axis::Fixed(axis)
    }
}

impl Axis {
    /// The x axis.
    pub const X: Axis = Axis::Fixed(FixedAxis::X);
    /// The y axis.
    pub const Y: Axis = Axis::Fixed(FixedAxis::Y);
    /// The z axis.
    pub const Z: Axis = Axis::Fixed(FixedAxis::Z);

    /// Parametric axis from polar and azimuthal angles in degrees.
    pub fn parametric(theta: f64, phi: f64) -> Self {
        Axis::Parametric { theta, phi }
    }

    /// Resolve a transport token such as `"x"` or `"θφ"` with its optional angles.
    ///
    /// # Example
    /// ```
    /// use stern_gerlach::Axis;
    ///
    /// assert_eq!(Axis::from_token("Z", None, None).unwrap(), Axis::Z);
    /// assert_eq!(
    ///     Axis::from_token("θφ", Some(90.0), None).unwrap(),
    ///     Axis::parametric(90.0, 0.0)
    /// );
    /// assert!(Axis::from_token("w", None, None).is_err());
    /// assert!(Axis::from_token("theta", None, None).is_err());
    /// ```
    pub fn from_token(token: &str, theta: Option<f64>, phi: Option<f64>) -> SimulationResult<Self> {
        let token = token.trim();
        match token.to_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            "θ" | "θφ" | "theta" | "thetaphi" | "theta_phi" | "n" | "parametric" => {
                let theta = theta.ok_or_else(|| {
                    SimulationError::invalid_axis(format!(
                        "parametric axis {:?} requires a theta angle",
                        token
                    ))
                })?;
                let axis = Axis::parametric(theta, phi.unwrap_or(0.0));
                axis.validate()?;
                Ok(axis)
            }
            _ => Err(SimulationError::invalid_axis(format!(
                "unrecognized axis {:?}, expected x, y, z or θφ",
                token
            ))),
        }
    }

    /// Check that a parametric axis has finite angles.
    pub fn validate(&self) -> SimulationResult<()> {
        match self {
            Axis::Parametric { theta, phi } if !theta.is_finite() || !phi.is_finite() => {
                Err(SimulationError::invalid_axis(format!(
                    "parametric axis angles must be finite (theta={}, phi={})",
                    theta, phi
                )))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Fixed(FixedAxis::X) => write!(f, "x"),
            Axis::Fixed(FixedAxis::Y) => write!(f, "y"),
            Axis::Fixed(FixedAxis::Z) => write!(f, "z"),
            Axis::Parametric { theta, phi } => write!(f, "θ={}° φ={}°", theta, phi),
        }
    }
}

/// The orthonormal eigenvectors of one analyzer axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Eigenbasis<P: Precision> {
    up: SpinState<P>,
    zero: Option<SpinState<P>>,
    down: SpinState<P>,
}

impl<P: Precision> Eigenbasis<P> {
    /// Spin of the basis vectors.
    pub fn kind(&self) -> SpinKind {
        self.up.kind()
    }

    /// The "up" eigenvector.
    pub fn up(&self) -> &SpinState<P> {
        &self.up
    }

    /// The "zero" eigenvector, spin-1 only.
    pub fn zero(&self) -> Option<&SpinState<P>> {
        self.zero.as_ref()
    }

    /// The "down" eigenvector.
    pub fn down(&self) -> &SpinState<P> {
        &self.down
    }

    /// Eigenvector belonging to `outcome`, if this basis has one.
    pub fn vector(&self, outcome: Outcome) -> Option<&SpinState<P>> {
        match outcome {
            Outcome::Up => Some(&self.up),
            Outcome::Zero => self.zero.as_ref(),
            Outcome::Down => Some(&self.down),
        }
    }

    /// Eigenvectors in sampling order: up, zero (if present), down.
    pub fn outcomes(&self) -> impl Iterator<Item = (Outcome, &SpinState<P>)> {
        std::iter::once((Outcome::Up, &self.up))
            .chain(self.zero.iter().map(|z| (Outcome::Zero, z)))
            .chain(std::iter::once((Outcome::Down, &self.down)))
    }
}

fn spinor<P: Precision>(entries: &[(f64, f64)]) -> SpinState<P> {
    let amplitudes: Amplitudes<P> = entries
        .iter()
        .map(|(re, im)| Complex::new(cast(*re), cast(*im)))
        .collect();
    SpinState::from_normalized(amplitudes)
}

fn half_basis<P: Precision>(up: &[(f64, f64)], down: &[(f64, f64)]) -> Eigenbasis<P> {
    Eigenbasis {
        up: spinor(up),
        zero: None,
        down: spinor(down),
    }
}

fn one_basis<P: Precision>(
    up: &[(f64, f64)],
    zero: &[(f64, f64)],
    down: &[(f64, f64)],
) -> Eigenbasis<P> {
    Eigenbasis {
        up: spinor(up),
        zero: Some(spinor(zero)),
        down: spinor(down),
    }
}

/// Eigenbasis of `axis` for particles of the given spin.
///
/// Fixed axes use the standard Pauli (spin-1/2) or spin-1 eigenvectors. A parametric axis
/// uses the rotated basis, for spin-1/2
/// `up = (cos(θ/2), e^{iφ} sin(θ/2))` and `down = (-e^{-iφ} sin(θ/2), cos(θ/2))`.
///
/// θ=0 reproduces the z basis exactly. Other special angles (θ=180 swapping up and down,
/// θ=90 giving x or y) hold up to rounding, e.g. `cos(90°)` evaluates to about `6e-17`.
///
/// # Example
/// ```
/// use stern_gerlach::{eigenbasis, Axis, Complex, SpinKind};
///
/// let basis = eigenbasis::<f64>(&Axis::parametric(0.0, 30.0), SpinKind::Half).unwrap();
/// assert_eq!(basis.up().amplitudes()[0], Complex::new(1.0, 0.0));
/// assert_eq!(basis.up().amplitudes()[1], Complex::new(0.0, 0.0));
/// ```
pub fn eigenbasis<P: Precision>(axis: &Axis, kind: SpinKind) -> SimulationResult<Eigenbasis<P>> {
    match *axis {
        Axis::Fixed(fixed) => Ok(Eigenbasis::fixed(fixed, kind)),
        Axis::Parametric { theta, phi } => {
            axis.validate()?;
            Ok(match kind {
                SpinKind::Half => parametric_half(theta, phi),
                SpinKind::One => parametric_one(theta, phi),
            })
        }
    }
}

fn parametric_half<P: Precision>(theta: f64, phi: f64) -> Eigenbasis<P> {
    let half_theta: P = cast(theta.to_radians() / 2.0);
    let (s, c) = half_theta.sin_cos();
    let phase = Complex::from_polar(P::one(), cast(phi.to_radians()));
    let c = Complex::from(c);

    let up = [c, phase * s];
    let down = [-(phase.conj() * s), c];
    Eigenbasis {
        up: SpinState::from_normalized(up.iter().cloned().collect()),
        zero: None,
        down: SpinState::from_normalized(down.iter().cloned().collect()),
    }
}

fn parametric_one<P: Precision>(theta: f64, phi: f64) -> Eigenbasis<P> {
    let (s, c) = cast::<P>(theta.to_radians()).sin_cos();
    let phi: P = cast(phi.to_radians());
    let e1 = Complex::from_polar(P::one(), phi);
    let e2 = Complex::from_polar(P::one(), phi + phi);

    let two = P::one() + P::one();
    let side = s / cast::<P>(SQRT_2);
    let plus = (P::one() + c) / two;
    let minus = (P::one() - c) / two;

    let up = [Complex::from(plus), e1 * side, e2 * minus];
    let zero = [-(e1.conj() * side), Complex::from(c), e1 * side];
    let down = [e2.conj() * minus, -(e1.conj() * side), Complex::from(plus)];
    Eigenbasis {
        up: SpinState::from_normalized(up.iter().cloned().collect()),
        zero: Some(SpinState::from_normalized(zero.iter().cloned().collect())),
        down: SpinState::from_normalized(down.iter().cloned().collect()),
    }
}

impl<P: Precision> Eigenbasis<P> {
    /// Eigenbasis of a canonical axis.
    pub fn fixed(axis: FixedAxis, kind: SpinKind) -> Self {
        let h = FRAC_1_SQRT_2;
        match (kind, axis) {
            (SpinKind::Half, FixedAxis::Z) => {
                half_basis(&[(1.0, 0.0), (0.0, 0.0)], &[(0.0, 0.0), (1.0, 0.0)])
            }
            (SpinKind::Half, FixedAxis::X) => {
                half_basis(&[(h, 0.0), (h, 0.0)], &[(h, 0.0), (-h, 0.0)])
            }
            (SpinKind::Half, FixedAxis::Y) => {
                half_basis(&[(h, 0.0), (0.0, h)], &[(h, 0.0), (0.0, -h)])
            }
            (SpinKind::One, FixedAxis::Z) => one_basis(
                &[(1.0, 0.0), (0.0, 0.0), (0.0, 0.0)],
                &[(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)],
                &[(0.0, 0.0), (0.0, 0.0), (1.0, 0.0)],
            ),
            (SpinKind::One, FixedAxis::X) => one_basis(
                &[(0.5, 0.0), (h, 0.0), (0.5, 0.0)],
                &[(-h, 0.0), (0.0, 0.0), (h, 0.0)],
                &[(0.5, 0.0), (-h, 0.0), (0.5, 0.0)],
            ),
            (SpinKind::One, FixedAxis::Y) => one_basis(
                &[(-0.5, 0.0), (0.0, -h), (0.5, 0.0)],
                &[(h, 0.0), (0.0, 0.0), (h, 0.0)],
                &[(-0.5, 0.0), (0.0, h), (0.5, 0.0)],
            ),
        }
    }
}
