//! Differential algebra (DA) backend.
//!
//! `spec.md` treats the DA library as an external collaborator and fixes
//! only the interface the rest of the crate consumes from it (truncated
//! multivariate power series closed under the elementary operations, plus
//! `identity`, `cons` and `deriv`). This module is that collaborator,
//! implemented in-crate: a sparse multivariate truncated Taylor series keyed
//! by exponent vectors, with transcendental functions built by composing a
//! univariate Taylor-coefficient sequence (computed from each function's
//! defining ODE) with the multivariate nilpotent remainder of the operand.
//!
//! Process-wide configuration (`order`, number of `vars`) is set once via
//! [`init`], mirroring the real DACE library's own global `DA::init`.
use std::collections::BTreeMap;
use std::sync::RwLock;

use lazy_static::lazy_static;

use crate::error::Error;

#[derive(Clone, Copy, Debug)]
struct DaConfig {
    order: usize,
    vars: usize,
}

lazy_static! {
    static ref DA_CONFIG: RwLock<Option<DaConfig>> = RwLock::new(None);
}

/// Sets the process-wide truncation order and variable count. Must be
/// called once, before any [`Da`] is constructed. Calling it again changes
/// global state shared by every live `Da` and is not guarded against, in
/// line with `spec.md`'s note that re-initializing mid-run is undefined.
pub fn init(order: usize, vars: usize) {
    *DA_CONFIG.write().unwrap() = Some(DaConfig { order, vars });
}

fn config() -> DaConfig {
    DA_CONFIG
        .read()
        .unwrap()
        .expect("dcgp::da::init must be called before constructing a Da")
}

/// A truncated multivariate power series ("differential algebra" element).
#[derive(Clone, Debug, Default)]
pub struct Da {
    terms: BTreeMap<Vec<u32>, f64>,
}

impl Da {
    /// A series that is constant everywhere (zero in every non-constant term).
    pub fn from_const(v: f64) -> Da {
        let cfg = config();
        let mut terms = BTreeMap::new();
        if v != 0.0 {
            terms.insert(vec![0u32; cfg.vars], v);
        }
        Da { terms }
    }

    /// The DA whose constant part is zero and whose monomial `x_i` has
    /// coefficient one. `i` is 1-based, in `[1, vars]`.
    pub fn identity(i: usize) -> Result<Da, Error> {
        let cfg = config();
        if i == 0 || i > cfg.vars {
            return Err(Error::InvalidInput(format!(
                "variable index {i} out of range [1, {}]",
                cfg.vars
            )));
        }
        let mut exp = vec![0u32; cfg.vars];
        exp[i - 1] = 1;
        let mut terms = BTreeMap::new();
        terms.insert(exp, 1.0);
        Ok(Da { terms })
    }

    /// Convenience combining a constant value with the identity direction of
    /// variable `i` (1-based): `value + DA::identity(i)`.
    pub fn seed(value: f64, i: usize) -> Result<Da, Error> {
        let id = Da::identity(i)?;
        Ok(Da::from_const(value).add(&id))
    }

    /// The constant part of the series.
    pub fn cons(&self) -> f64 {
        let cfg = config();
        self.terms.get(&vec![0u32; cfg.vars]).copied().unwrap_or(0.0)
    }

    fn sub_const(&self, a0: f64) -> Da {
        let cfg = config();
        let key = vec![0u32; cfg.vars];
        let mut terms = self.terms.clone();
        let existing = terms.get(&key).copied().unwrap_or(0.0);
        let new_val = existing - a0;
        if new_val == 0.0 {
            terms.remove(&key);
        } else {
            terms.insert(key, new_val);
        }
        Da { terms }
    }

    /// `∂self/∂x_i`, `i` 1-based.
    pub fn deriv(&self, i: usize) -> Result<Da, Error> {
        let cfg = config();
        if i == 0 || i > cfg.vars {
            return Err(Error::InvalidInput(format!(
                "variable index {i} out of range [1, {}]",
                cfg.vars
            )));
        }
        let idx = i - 1;
        let mut terms = BTreeMap::new();
        for (exp, coeff) in &self.terms {
            let p = exp[idx];
            if p == 0 {
                continue;
            }
            let mut new_exp = exp.clone();
            new_exp[idx] = p - 1;
            *terms.entry(new_exp).or_insert(0.0) += coeff * p as f64;
        }
        Ok(Da { terms })
    }

    pub fn scale(&self, s: f64) -> Da {
        if s == 0.0 {
            return Da { terms: BTreeMap::new() };
        }
        let terms = self.terms.iter().map(|(e, c)| (e.clone(), c * s)).collect();
        Da { terms }
    }

    pub fn add(&self, other: &Da) -> Da {
        let mut terms = self.terms.clone();
        for (exp, coeff) in &other.terms {
            let entry = terms.entry(exp.clone()).or_insert(0.0);
            *entry += coeff;
            if *entry == 0.0 {
                terms.remove(exp);
            }
        }
        Da { terms }
    }

    pub fn neg(&self) -> Da {
        self.scale(-1.0)
    }

    pub fn sub(&self, other: &Da) -> Da {
        self.add(&other.neg())
    }

    pub fn mul(&self, other: &Da) -> Da {
        let order = config().order;
        let mut terms: BTreeMap<Vec<u32>, f64> = BTreeMap::new();
        for (e1, c1) in &self.terms {
            for (e2, c2) in &other.terms {
                let mut exp = vec![0u32; e1.len()];
                let mut degree = 0u32;
                for i in 0..exp.len() {
                    exp[i] = e1[i] + e2[i];
                    degree += exp[i];
                }
                if degree as usize > order {
                    continue;
                }
                let entry = terms.entry(exp).or_insert(0.0);
                *entry += c1 * c2;
            }
        }
        Da { terms }
    }
}

/// Free-function alias matching the `cons(d)` name used in `spec.md` §6.3.
pub fn cons(d: &Da) -> f64 {
    d.cons()
}

/// Composes `coeffs` (the Taylor coefficients of some scalar function `g`
/// around `cons(d)`, i.e. `coeffs[k] == g^(k)(cons(d)) / k!`) with the
/// multivariate nilpotent remainder of `d`, producing `g(d)` to the
/// process-wide truncation order.
fn compose(d: &Da, coeffs: &[f64]) -> Da {
    let order = config().order;
    let a0 = d.cons();
    let eps = d.sub_const(a0);
    let mut result = Da::from_const(coeffs[0]);
    let mut eps_pow = Da::from_const(1.0);
    for k in 1..=order {
        eps_pow = eps_pow.mul(&eps);
        if eps_pow.terms.is_empty() {
            break;
        }
        let c = coeffs.get(k).copied().unwrap_or(0.0);
        if c != 0.0 {
            result = result.add(&eps_pow.scale(c));
        }
    }
    result
}

// ---------------------------------------------------------------------
// Univariate Taylor-coefficient generators, one per elementary function.
// Each returns `order + 1` coefficients `c_k = f^(k)(a0) / k!`, derived
// from the function's defining first-order ODE rather than hand-computed
// higher derivatives (the standard technique for generic Taylor arithmetic).
// ---------------------------------------------------------------------

fn exp_coeffs(a0: f64, order: usize) -> Vec<f64> {
    let mut c = vec![0.0; order + 1];
    c[0] = a0.exp();
    for k in 0..order {
        c[k + 1] = c[k] / (k as f64 + 1.0);
    }
    c
}

fn log_coeffs(a0: f64, order: usize) -> Vec<f64> {
    let mut c = vec![0.0; order + 1];
    c[0] = a0.ln();
    for k in 1..=order {
        let sign = if (k - 1) % 2 == 0 { 1.0 } else { -1.0 };
        c[k] = sign / (k as f64 * a0.powi(k as i32));
    }
    c
}

fn sincos_coeffs(a0: f64, order: usize) -> (Vec<f64>, Vec<f64>) {
    let mut s = vec![0.0; order + 1];
    let mut co = vec![0.0; order + 1];
    s[0] = a0.sin();
    co[0] = a0.cos();
    for k in 0..order {
        s[k + 1] = co[k] / (k as f64 + 1.0);
        co[k + 1] = -s[k] / (k as f64 + 1.0);
    }
    (s, co)
}

fn sinhcosh_coeffs(a0: f64, order: usize) -> (Vec<f64>, Vec<f64>) {
    let mut sh = vec![0.0; order + 1];
    let mut ch = vec![0.0; order + 1];
    sh[0] = a0.sinh();
    ch[0] = a0.cosh();
    for k in 0..order {
        sh[k + 1] = ch[k] / (k as f64 + 1.0);
        ch[k + 1] = sh[k] / (k as f64 + 1.0);
    }
    (sh, ch)
}

fn tan_coeffs(a0: f64, order: usize) -> Vec<f64> {
    let mut y = vec![0.0; order + 1];
    y[0] = a0.tan();
    for k in 0..order {
        let mut s = 0.0;
        for i in 0..=k {
            s += y[i] * y[k - i];
        }
        if k == 0 {
            s += 1.0;
        }
        y[k + 1] = s / (k as f64 + 1.0);
    }
    y
}

fn tanh_coeffs(a0: f64, order: usize) -> Vec<f64> {
    let mut y = vec![0.0; order + 1];
    y[0] = a0.tanh();
    for k in 0..order {
        let mut s = 0.0;
        for i in 0..=k {
            s += y[i] * y[k - i];
        }
        let rhs = if k == 0 { 1.0 - s } else { -s };
        y[k + 1] = rhs / (k as f64 + 1.0);
    }
    y
}

/// Reciprocal of the power series `u` (`u[0]` must be non-zero for a
/// meaningful result; if it is zero the IEEE result is inf/NaN, propagated
/// rather than checked — callers that must reject this case check first).
fn recip_coeffs(u: &[f64]) -> Vec<f64> {
    let n = u.len();
    let mut r = vec![0.0; n];
    r[0] = 1.0 / u[0];
    for k in 1..n {
        let mut s = 0.0;
        for i in 1..=k {
            s += u[i] * r[k - i];
        }
        r[k] = -s / u[0];
    }
    r
}

/// Principal square root of the power series `u` (`u[0] > 0`).
fn sqrt_coeffs(u: &[f64]) -> Vec<f64> {
    let n = u.len();
    let mut s = vec![0.0; n];
    s[0] = u[0].sqrt();
    for k in 1..n {
        let mut acc = u[k];
        for i in 1..k {
            acc -= s[i] * s[k - i];
        }
        s[k] = acc / (2.0 * s[0]);
    }
    s
}

fn asin_coeffs(a0: f64, order: usize) -> Vec<f64> {
    let n = order + 1;
    let mut u = vec![0.0; n];
    u[0] = 1.0 - a0 * a0;
    if n > 1 {
        u[1] = -2.0 * a0;
    }
    if n > 2 {
        u[2] = -1.0;
    }
    let w = sqrt_coeffs(&u);
    let d = recip_coeffs(&w);
    let mut y = vec![0.0; n];
    y[0] = a0.asin();
    for k in 1..n {
        y[k] = d[k - 1] / (k as f64);
    }
    y
}

fn acos_coeffs(a0: f64, order: usize) -> Vec<f64> {
    let mut y = asin_coeffs(a0, order);
    y[0] = std::f64::consts::FRAC_PI_2 - a0.asin();
    for v in y.iter_mut().skip(1) {
        *v = -*v;
    }
    y
}

fn atan_coeffs(a0: f64, order: usize) -> Vec<f64> {
    let n = order + 1;
    let mut u = vec![0.0; n];
    u[0] = 1.0 + a0 * a0;
    if n > 1 {
        u[1] = 2.0 * a0;
    }
    if n > 2 {
        u[2] = 1.0;
    }
    let d = recip_coeffs(&u);
    let mut y = vec![0.0; n];
    y[0] = a0.atan();
    for k in 1..n {
        y[k] = d[k - 1] / (k as f64);
    }
    y
}

// ---------------------------------------------------------------------
// The closed set of elementary operations over `Da`.
// ---------------------------------------------------------------------

pub fn exp(d: &Da) -> Da {
    let order = config().order;
    compose(d, &exp_coeffs(d.cons(), order))
}

pub fn log(d: &Da) -> Result<Da, Error> {
    let a0 = d.cons();
    if a0 < 0.0 {
        return log(&d.scale(-1.0));
    }
    if a0 == 0.0 {
        log::debug!("log: derivative undefined at 0");
        return Err(Error::DerivativeUndefined(
            "log is not differentiable at 0".into(),
        ));
    }
    let order = config().order;
    Ok(compose(d, &log_coeffs(a0, order)))
}

pub fn sin(d: &Da) -> Da {
    let order = config().order;
    let (s, _) = sincos_coeffs(d.cons(), order);
    compose(d, &s)
}

pub fn cos(d: &Da) -> Da {
    let order = config().order;
    let (_, c) = sincos_coeffs(d.cons(), order);
    compose(d, &c)
}

pub fn tan(d: &Da) -> Da {
    let order = config().order;
    compose(d, &tan_coeffs(d.cons(), order))
}

pub fn asin(d: &Da) -> Result<Da, Error> {
    let a0 = d.cons();
    if a0.abs() >= 1.0 {
        log::debug!("asin: derivative undefined at |x| >= 1");
        return Err(Error::DerivativeUndefined(
            "asin is not differentiable at |x| >= 1".into(),
        ));
    }
    let order = config().order;
    Ok(compose(d, &asin_coeffs(a0, order)))
}

pub fn acos(d: &Da) -> Result<Da, Error> {
    let a0 = d.cons();
    if a0.abs() >= 1.0 {
        log::debug!("acos: derivative undefined at |x| >= 1");
        return Err(Error::DerivativeUndefined(
            "acos is not differentiable at |x| >= 1".into(),
        ));
    }
    let order = config().order;
    Ok(compose(d, &acos_coeffs(a0, order)))
}

pub fn atan(d: &Da) -> Da {
    let order = config().order;
    compose(d, &atan_coeffs(d.cons(), order))
}

pub fn sinh(d: &Da) -> Da {
    let order = config().order;
    let (sh, _) = sinhcosh_coeffs(d.cons(), order);
    compose(d, &sh)
}

pub fn cosh(d: &Da) -> Da {
    let order = config().order;
    let (_, ch) = sinhcosh_coeffs(d.cons(), order);
    compose(d, &ch)
}

pub fn tanh(d: &Da) -> Da {
    let order = config().order;
    compose(d, &tanh_coeffs(d.cons(), order))
}

pub fn sqrt(d: &Da) -> Result<Da, Error> {
    let a0 = d.cons();
    if a0 < 0.0 {
        return sqrt(&d.scale(-1.0));
    }
    if a0 == 0.0 {
        log::debug!("sqrt: derivative undefined at 0");
        return Err(Error::DerivativeUndefined(
            "sqrt is not differentiable at 0".into(),
        ));
    }
    // sqrt(x) = exp(0.5 * log(x)) for x > 0; reuses exp/log's compositions
    // rather than a bespoke binomial-series expansion.
    Ok(exp(&log(d)?.scale(0.5)))
}

pub fn pow(x: &Da, y: &Da) -> Result<Da, Error> {
    let a0 = x.cons();
    if a0 < 0.0 {
        return Ok(exp(&y.mul(&log(&x.scale(-1.0))?)));
    }
    if a0 == 0.0 {
        log::debug!("pow: derivative undefined at base 0");
        return Err(Error::DerivativeUndefined(
            "pow is not differentiable at base 0".into(),
        ));
    }
    Ok(exp(&y.mul(&log(x)?)))
}

/// Raw reciprocal of `y` via truncated geometric series around `cons(y)`.
/// Does not check for a zero constant part; used internally by `div`
/// (which does check) and by `tan`'s sin/cos ratio (which, per the DA
/// backend contract, has no documented failure point of its own).
fn reciprocal_raw(y: &Da) -> Da {
    let y0 = y.cons();
    let inv_y0 = 1.0 / y0;
    let p = y.sub_const(y0);
    let q = p.scale(-inv_y0);
    let order = config().order;
    let mut term = Da::from_const(1.0);
    let mut result = Da::from_const(1.0);
    for _ in 0..order {
        term = term.mul(&q);
        if term.terms.is_empty() {
            break;
        }
        result = result.add(&term);
    }
    result.scale(inv_y0)
}

pub fn div(x: &Da, y: &Da) -> Result<Da, Error> {
    if y.cons() == 0.0 {
        log::debug!("div: derivative undefined at divisor 0");
        return Err(Error::DerivativeUndefined(
            "div is not differentiable when the divisor is 0".into(),
        ));
    }
    Ok(x.mul(&reciprocal_raw(y)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::Mutex;

    lazy_static! {
        // `Da` reads process-wide config; serialize tests that call `init`
        // with different (order, vars) so they cannot race each other.
        static ref DA_TEST_LOCK: Mutex<()> = Mutex::new(());
    }

    #[test]
    fn identity_and_cons_roundtrip() {
        let _g = DA_TEST_LOCK.lock().unwrap();
        init(2, 2);
        let x = Da::seed(3.0, 1).unwrap();
        let y = Da::seed(4.0, 2).unwrap();
        assert_relative_eq!(x.cons(), 3.0);
        assert_relative_eq!(y.cons(), 4.0);
        let xy = x.mul(&y);
        assert_relative_eq!(xy.cons(), 12.0);
        assert_relative_eq!(xy.deriv(1).unwrap().cons(), 4.0);
        assert_relative_eq!(xy.deriv(2).unwrap().cons(), 3.0);
    }

    #[test]
    fn exp_log_are_inverse_on_value_and_first_derivative() {
        let _g = DA_TEST_LOCK.lock().unwrap();
        init(2, 1);
        let x = Da::seed(1.5, 1).unwrap();
        let rt = exp(&log(&x).unwrap());
        assert_relative_eq!(rt.cons(), x.cons(), epsilon = 1e-9);
        assert_relative_eq!(
            rt.deriv(1).unwrap().cons(),
            x.deriv(1).unwrap().cons(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn sin_derivative_is_cos() {
        let _g = DA_TEST_LOCK.lock().unwrap();
        init(1, 1);
        let x = Da::seed(0.7, 1).unwrap();
        let s = sin(&x);
        assert_relative_eq!(s.deriv(1).unwrap().cons(), 0.7f64.cos(), epsilon = 1e-9);
    }

    #[test]
    fn div_by_zero_constant_is_undefined() {
        let _g = DA_TEST_LOCK.lock().unwrap();
        init(1, 1);
        let x = Da::seed(1.0, 1).unwrap();
        let zero = Da::from_const(0.0);
        assert!(matches!(div(&x, &zero), Err(Error::DerivativeUndefined(_))));
    }

    #[test]
    fn sqrt_and_pow_undefined_at_zero_base() {
        let _g = DA_TEST_LOCK.lock().unwrap();
        init(1, 1);
        let zero = Da::seed(0.0, 1).unwrap();
        assert!(matches!(sqrt(&zero), Err(Error::DerivativeUndefined(_))));
        let y = Da::from_const(2.0);
        assert!(matches!(pow(&zero, &y), Err(Error::DerivativeUndefined(_))));
    }

    #[test]
    fn asin_undefined_outside_domain() {
        let _g = DA_TEST_LOCK.lock().unwrap();
        init(1, 1);
        let x = Da::seed(1.0, 1).unwrap();
        assert!(matches!(asin(&x), Err(Error::DerivativeUndefined(_))));
    }

    #[test]
    fn mul_by_xy_matches_quotient_rule_numerically() {
        let _g = DA_TEST_LOCK.lock().unwrap();
        init(1, 2);
        let x = Da::seed(2.0, 1).unwrap();
        let y = Da::seed(5.0, 2).unwrap();
        let q = div(&x, &y).unwrap();
        assert_relative_eq!(q.cons(), 2.0 / 5.0, epsilon = 1e-9);
        // d/dx (x/y) = 1/y
        assert_relative_eq!(q.deriv(1).unwrap().cons(), 1.0 / 5.0, epsilon = 1e-9);
        // d/dy (x/y) = -x/y^2
        assert_relative_eq!(q.deriv(2).unwrap().cons(), -2.0 / 25.0, epsilon = 1e-9);
    }
}
