//! Burden economies: the cost algebra the solver and controller run on.
//!
//! An economy describes a *burden* (a cost charged against a capacity) and
//! how burdens combine, compare, and fit under that capacity. Two economies
//! are provided:
//!
//! - [`ScalarEconomy`]: burden and capacity are the same nonnegative real.
//! - [`NormalEconomy`]: burden is a mean/variance pair and capacity is a
//!   hard limit plus a sigma margin, so independent per-task cost noise can
//!   be consolidated instead of summed pessimistically.

use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Arithmetic every burden representation must support.
///
/// Scalar multiplication covers anomaly and past-run scaling. Subtraction
/// exists for removing a component from a net burden; for the normal
/// economy it still widens variance, since the parts are independent.
pub trait BurdenArith:
    Copy
    + fmt::Debug
    + PartialEq
    + Add<Output = Self>
    + AddAssign
    + Sub<Output = Self>
    + SubAssign
    + Mul<f64, Output = Self>
    + MulAssign<f64>
    + Div<f64, Output = Self>
    + DivAssign<f64>
{
}

impl BurdenArith for f64 {}

/// A burden algebra: comparison, identity elements, and the capacity test.
///
/// The solver and controller are generic over this trait and monomorphize
/// per economy; nothing is dispatched dynamically in the inner loops.
pub trait Economy {
    /// Cost of selecting an option.
    type Burden: BurdenArith;
    /// Bound the net burden of a solution must fit under.
    type Capacity: Copy + fmt::Debug;

    /// The burden of doing nothing.
    fn zero() -> Self::Burden;

    /// A burden no capacity accepts.
    fn infinite() -> Self::Burden;

    /// Whether a burden is finite enough to ever be selected.
    fn is_possible(burden: &Self::Burden) -> bool;

    /// Strict ordering used for frontier pruning.
    fn lesser(lhs: &Self::Burden, rhs: &Self::Burden) -> bool;

    /// Whether a burden fits within the capacity.
    fn acceptable(burden: &Self::Burden, capacity: &Self::Capacity) -> bool;
}

/// Economy with a plain scalar burden; the capacity is the same scalar.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarEconomy;

impl Economy for ScalarEconomy {
    type Burden = f64;
    type Capacity = f64;

    #[inline]
    fn zero() -> f64 {
        0.0
    }

    #[inline]
    fn infinite() -> f64 {
        f64::INFINITY
    }

    #[inline]
    fn is_possible(burden: &f64) -> bool {
        *burden < f64::INFINITY
    }

    #[inline]
    fn lesser(lhs: &f64, rhs: &f64) -> bool {
        lhs < rhs
    }

    #[inline]
    fn acceptable(burden: &f64, capacity: &f64) -> bool {
        burden < capacity
    }
}

/// A normally-distributed burden: mean and variance of a cost.
///
/// Arithmetic treats the operands as independent: addition and subtraction
/// both add variances; scaling by `s` scales the variance by `s²`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalBurden {
    pub mean: f64,
    pub var: f64,
}

impl NormalBurden {
    pub const fn new(mean: f64, var: f64) -> Self {
        Self { mean, var }
    }

    /// A burden with no uncertainty.
    pub const fn exact(mean: f64) -> Self {
        Self { mean, var: 0.0 }
    }

    /// Mean plus `sigmas` standard deviations.
    pub fn sigma_offset(&self, sigmas: f64) -> f64 {
        self.mean + sigmas * self.var.sqrt()
    }
}

impl Add for NormalBurden {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.mean + rhs.mean, self.var + rhs.var)
    }
}

impl AddAssign for NormalBurden {
    fn add_assign(&mut self, rhs: Self) {
        self.mean += rhs.mean;
        self.var += rhs.var;
    }
}

impl Sub for NormalBurden {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.mean - rhs.mean, self.var + rhs.var)
    }
}

impl SubAssign for NormalBurden {
    fn sub_assign(&mut self, rhs: Self) {
        self.mean -= rhs.mean;
        self.var += rhs.var;
    }
}

impl Mul<f64> for NormalBurden {
    type Output = Self;
    fn mul(self, s: f64) -> Self {
        Self::new(self.mean * s, self.var * (s * s))
    }
}

impl MulAssign<f64> for NormalBurden {
    fn mul_assign(&mut self, s: f64) {
        self.mean *= s;
        self.var *= s * s;
    }
}

impl Div<f64> for NormalBurden {
    type Output = Self;
    fn div(self, s: f64) -> Self {
        Self::new(self.mean / s, self.var / (s * s))
    }
}

impl DivAssign<f64> for NormalBurden {
    fn div_assign(&mut self, s: f64) {
        self.mean /= s;
        self.var /= s * s;
    }
}

impl BurdenArith for NormalBurden {}

/// Capacity for the normal economy: a hard limit on mean net burden plus a
/// standard-deviation margin. With 3-5 sigmas, exceeding the limit is very
/// unlikely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalCapacity {
    /// Upper bound on the net burden.
    pub limit: f64,
    /// Standard deviations of headroom required under the limit.
    pub sigmas: f64,
}

impl NormalCapacity {
    pub const fn new(limit: f64, sigmas: f64) -> Self {
        Self { limit, sigmas }
    }
}

impl Default for NormalCapacity {
    fn default() -> Self {
        Self {
            limit: f64::INFINITY,
            sigmas: 3.0,
        }
    }
}

/// Economy for normally-distributed burdens, layered on the scalar one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalEconomy;

impl Economy for NormalEconomy {
    type Burden = NormalBurden;
    type Capacity = NormalCapacity;

    #[inline]
    fn zero() -> NormalBurden {
        NormalBurden::new(0.0, 0.0)
    }

    #[inline]
    fn infinite() -> NormalBurden {
        NormalBurden::new(f64::INFINITY, 0.0)
    }

    #[inline]
    fn is_possible(burden: &NormalBurden) -> bool {
        burden.mean < f64::INFINITY && burden.var < f64::INFINITY
    }

    /// There is no objective total order for normal burdens. Ordering by
    /// mean is sufficient for frontier pruning: two same-mean burdens only
    /// differ at acceptability time, and candidates are re-checked against
    /// the capacity before admission.
    #[inline]
    fn lesser(lhs: &NormalBurden, rhs: &NormalBurden) -> bool {
        lhs.mean < rhs.mean
    }

    /// Exact test for `mean + sigmas·sqrt(var) < limit` without the square
    /// root: `mean < limit && sigmas²·var < (limit − mean)²`.
    #[inline]
    fn acceptable(burden: &NormalBurden, capacity: &NormalCapacity) -> bool {
        if !(burden.mean < capacity.limit) {
            return false;
        }
        let margin = capacity.limit - burden.mean;
        capacity.sigmas * capacity.sigmas * burden.var < margin * margin
    }
}
