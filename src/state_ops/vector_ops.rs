use crate::{Complex, Precision};
use num_traits::Zero;

/// Make a complex vector from real amplitudes.
///
/// # Example
/// ```
/// use stern_gerlach::state_ops::vector_ops::from_reals;
/// use stern_gerlach::Complex;
///
/// let v = from_reals(&[1.0, 0.0]);
/// assert_eq!(v, vec![Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)]);
/// ```
pub fn from_reals<P: Precision>(data: &[P]) -> Vec<Complex<P>> {
    data.iter().cloned().map(Complex::from).collect()
}

/// Get total magnitude of state.
pub fn prob_magnitude<P: Precision>(input: &[Complex<P>]) -> P {
    input.iter().map(Complex::<P>::norm_sqr).sum()
}

/// Euclidean norm of `input`.
pub fn norm<P: Precision>(input: &[Complex<P>]) -> P {
    prob_magnitude(input).sqrt()
}

/// Hermitian inner product `<a|b>`, conjugate-linear in `a`.
///
/// Vectors of different length are compared over their common prefix.
///
/// # Example
/// ```
/// use stern_gerlach::state_ops::vector_ops::inner_product;
/// use stern_gerlach::Complex;
///
/// let a = [Complex::new(0.0, 1.0), Complex::new(0.0, 0.0)];
/// let b = [Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)];
/// assert_eq!(inner_product(&a, &b), Complex::new(0.0, -1.0));
/// ```
pub fn inner_product<P: Precision>(a: &[Complex<P>], b: &[Complex<P>]) -> Complex<P> {
    a.iter()
        .zip(b.iter())
        .fold(Complex::zero(), |acc, (x, y)| acc + x.conj() * *y)
}

/// Scale `input` to unit norm. Returns `None` if the norm is zero or not finite.
pub fn normalize<P: Precision>(input: &[Complex<P>]) -> Option<Vec<Complex<P>>> {
    let n = norm(input);
    if n.is_zero() || !n.is_finite() {
        None
    } else {
        Some(input.iter().map(|c| *c / n).collect())
    }
}
