/// Inner products, norms and normalization of small state vectors.
pub mod vector_ops;
/// Born-rule probabilities, outcome sampling and collapse.
pub mod measurement_ops;

pub use self::measurement_ops::*;
pub use self::vector_ops::*;
