//!
//! Probabilities in log space
//!
//! `Prob` stores `log p`, so products of many small emission probabilities
//! over a long track never underflow. `+` is log-add-exp.
//!
use approx::AbsDiffEq;

///
/// Probability `0 <= p <= 1` stored as its natural logarithm.
///
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Prob(f64);

///
/// `Prob` from a probability value
///
pub fn p(p: f64) -> Prob {
    Prob::from_prob(p)
}

///
/// `Prob` from a log probability value
///
pub fn lp(lp: f64) -> Prob {
    Prob::from_log_prob(lp)
}

/// Normalization is skipped when the log normalizer is within this distance
/// of zero, so that normalizing a normalized vector leaves it bit-identical.
pub const NORMALIZE_TOLERANCE: f64 = 1e-13;

impl Prob {
    pub fn from_prob(value: f64) -> Prob {
        Prob(value.ln())
    }
    pub fn from_log_prob(log_value: f64) -> Prob {
        Prob(log_value)
    }
    /// probability in `[0, 1]`
    pub fn to_value(self) -> f64 {
        self.0.exp()
    }
    pub fn to_log_value(self) -> f64 {
        self.0
    }
    /// `log p == -inf`
    pub fn is_zero(self) -> bool {
        self.0 == f64::NEG_INFINITY
    }
    /// `log p == 0`
    pub fn is_one(self) -> bool {
        self.0 == 0.0
    }
    ///
    /// The log value is NaN, e.g. after `0 / 0`.
    ///
    pub fn is_nan(self) -> bool {
        self.0.is_nan()
    }
    pub fn zero() -> Prob {
        Prob(f64::NEG_INFINITY)
    }
    pub fn one() -> Prob {
        Prob(0.0)
    }
    pub fn max(self, other: Prob) -> Prob {
        if other > self {
            other
        } else {
            self
        }
    }
}

impl Default for Prob {
    fn default() -> Self {
        Prob::zero()
    }
}

impl std::fmt::Display for Prob {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

///
/// `log(e^a + e^b) = m + log(1 + e^(min - m))` with `m = max(a, b)`
///
impl std::ops::Add for Prob {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        let (hi, lo) = if self.0 >= other.0 {
            (self.0, other.0)
        } else {
            (other.0, self.0)
        };
        if lo == f64::NEG_INFINITY {
            Prob(hi)
        } else if hi == lo {
            Prob(hi + std::f64::consts::LN_2)
        } else {
            Prob(hi + (lo - hi).exp().ln_1p())
        }
    }
}

impl std::ops::Mul for Prob {
    type Output = Self;
    fn mul(self, other: Self) -> Self {
        Prob(self.0 + other.0)
    }
}

impl std::ops::Div for Prob {
    type Output = Self;
    fn div(self, other: Self) -> Self {
        Prob(self.0 - other.0)
    }
}

///
/// `p * n` for a non-negative count `n` (observation multiplicities)
///
impl std::ops::Mul<f64> for Prob {
    type Output = Self;
    fn mul(self, count: f64) -> Self {
        Prob(self.0 + count.ln())
    }
}

impl std::ops::AddAssign for Prob {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl std::ops::MulAssign for Prob {
    fn mul_assign(&mut self, other: Self) {
        *self = *self * other;
    }
}

impl std::iter::Sum for Prob {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Prob::zero(), |acc, x| acc + x)
    }
}

impl<'a> std::iter::Sum<&'a Prob> for Prob {
    fn sum<I: Iterator<Item = &'a Prob>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl std::iter::Product for Prob {
    fn product<I: Iterator<Item = Self>>(iter: I) -> Self {
        Prob(iter.map(|x| x.0).sum())
    }
}

impl<'a> std::iter::Product<&'a Prob> for Prob {
    fn product<I: Iterator<Item = &'a Prob>>(iter: I) -> Self {
        iter.copied().product()
    }
}

/// Compares log values; two zeros are equal.
impl AbsDiffEq for Prob {
    type Epsilon = f64;
    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }
    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        (self.is_zero() && other.is_zero()) || f64::abs_diff_eq(&self.0, &other.0, epsilon)
    }
}

// total order on log values (NaN sorts above one)
impl Eq for Prob {}
impl Ord for Prob {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

///
/// `log(sum_i exp(x_i))` shifted by the maximum.
///
/// Zero for an empty slice or when every element is zero.
///
pub fn log_sum_exp(xs: &[Prob]) -> Prob {
    let m = xs.iter().copied().fold(Prob::zero(), Prob::max);
    if m.0.is_infinite() {
        return m;
    }
    let s: f64 = xs.iter().map(|x| (x.0 - m.0).exp()).sum();
    Prob(m.0 + s.ln())
}

///
/// Divide `xs` by its sum in place and return the sum.
///
/// All-zero slices are left untouched, and so are slices whose sum is within
/// `NORMALIZE_TOLERANCE` of one.
///
pub fn normalize(xs: &mut [Prob]) -> Prob {
    let s = log_sum_exp(xs);
    if !s.is_zero() && s.0.abs() > NORMALIZE_TOLERANCE {
        xs.iter_mut().for_each(|x| *x = *x / s);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities() {
        let x = p(0.3);
        assert_eq!(x + Prob::zero(), x);
        assert_eq!(Prob::zero() + x, x);
        assert!((x * Prob::zero()).is_zero());
        assert_eq!(x * Prob::one(), x);
        assert!((Prob::zero() / Prob::zero()).is_nan());
        assert!(Prob::default().is_zero());
    }
    #[test]
    fn add_and_mul() {
        assert_abs_diff_eq!(p(0.3) + p(0.3), p(0.6), epsilon = 1e-12);
        assert_abs_diff_eq!(p(0.2) + p(0.5), p(0.7), epsilon = 1e-12);
        assert_abs_diff_eq!(p(0.3) * p(0.3), p(0.09), epsilon = 1e-12);
        assert_abs_diff_eq!(p(0.3) / p(0.6), p(0.5), epsilon = 1e-12);
        assert_abs_diff_eq!(p(0.25) * 4.0, Prob::one(), epsilon = 1e-12);
        assert!((p(0.25) * 0.0).is_zero());
        let mut x = p(0.1);
        x += p(0.3);
        x *= p(0.5);
        assert_abs_diff_eq!(x, p(0.2), epsilon = 1e-12);
    }
    #[test]
    fn add_far_below_underflow() {
        // e^-1000 is zero as f64 but its log is not
        let x = lp(-1000.0) + lp(-1001.0);
        assert!(!x.is_zero());
        assert_abs_diff_eq!(x.to_log_value(), -1000.0 + (-1.0f64).exp().ln_1p(), epsilon = 1e-9);
    }
    #[test]
    fn sum_and_product() {
        let xs = [p(0.1), p(0.2), p(0.3)];
        assert_abs_diff_eq!(xs.iter().sum::<Prob>().to_value(), 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(xs.iter().product::<Prob>().to_value(), 0.006, epsilon = 1e-12);
        let empty: [Prob; 0] = [];
        assert!(empty.iter().sum::<Prob>().is_zero());
        assert!(empty.iter().product::<Prob>().is_one());
    }
    #[test]
    fn ordering() {
        let mut ps = vec![p(0.9), p(0.0), p(0.5), p(1.0), p(0.1)];
        ps.sort();
        assert!(ps[0].is_zero());
        assert!(ps[4].is_one());
        assert_eq!(ps[2], p(0.5));
        assert_eq!(p(0.2).max(p(0.4)), p(0.4));
    }
    #[test]
    fn log_sum_exp_equals_sum() {
        let xs = [p(0.1), p(0.25), p(0.0), lp(-700.0)];
        assert_abs_diff_eq!(log_sum_exp(&xs), xs.iter().sum::<Prob>(), epsilon = 1e-12);
        assert!(log_sum_exp(&[]).is_zero());
        assert!(log_sum_exp(&[p(0.0), p(0.0)]).is_zero());
    }
    #[test]
    fn normalize_twice_changes_nothing() {
        let mut xs = vec![p(3.0), p(1.0), p(0.0), p(0.5)];
        let s = normalize(&mut xs);
        assert_abs_diff_eq!(s, p(4.5), epsilon = 1e-12);
        assert_abs_diff_eq!(log_sum_exp(&xs), Prob::one(), epsilon = 1e-12);
        assert!(xs[2].is_zero());
        let once = xs.clone();
        normalize(&mut xs);
        for (a, b) in once.iter().zip(xs.iter()) {
            assert_eq!(a.to_log_value().to_bits(), b.to_log_value().to_bits());
        }
        let mut zs = vec![p(0.0), p(0.0)];
        assert!(normalize(&mut zs).is_zero());
        assert!(zs.iter().all(|z| z.is_zero()));
    }
}
