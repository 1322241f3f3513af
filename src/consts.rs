//! Crate-wide numeric constants.

/// Floating-point comparison tolerance.
pub const EPSILON: f64 = 1e-12;

/// Lowest permitted solver precision. Below this the quantized score table
/// is too coarse to distinguish options at all.
pub(crate) const MIN_PRECISION: usize = 4;
