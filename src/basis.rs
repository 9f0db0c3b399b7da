//! Basis function registry (component A).
//!
//! Each [`BasisFunction`] is a capability bundle: a numeric evaluator, a
//! differential-algebra evaluator, and a symbolic (string) evaluator, tagged
//! with an [`Arity`] that tells the activity analyzer how many operand
//! slots to follow. Instances are plain `'static` data — "static-lifetime
//! handles into an immutable registry" per `spec.md`'s design notes —
//! compared by pointer identity when a [`crate::function_set::FunctionSet`]
//! deduplicates them.
use crate::da::{self, Da};
use crate::error::Error;

/// How many operand slots a basis function reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Const,
    Unary,
    Binary,
}

/// A numeric / differential-algebra / symbolic capability bundle.
pub struct BasisFunction {
    pub name: &'static str,
    pub arity: Arity,
    pub eval_num: fn(f64, f64) -> f64,
    pub eval_da: fn(&Da, &Da) -> Result<Da, Error>,
    pub eval_sym: fn(&str, &str, bool) -> String,
}

impl BasisFunction {
    pub fn apply_num(&self, x: f64, y: f64) -> f64 {
        (self.eval_num)(x, y)
    }

    pub fn apply_da(&self, x: &Da, y: &Da) -> Result<Da, Error> {
        (self.eval_da)(x, y)
    }

    pub fn apply_sym(&self, s1: &str, s2: &str, simplify: bool) -> String {
        (self.eval_sym)(s1, s2, simplify)
    }
}

impl std::fmt::Debug for BasisFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasisFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

fn fmt_const(v: f64) -> String {
    format!("({})", v)
}

// --- constants ---------------------------------------------------------

fn zero_num(_x: f64, _y: f64) -> f64 {
    0.0
}
fn zero_da(_x: &Da, _y: &Da) -> Result<Da, Error> {
    Ok(Da::from_const(0.0))
}
fn zero_sym(_s1: &str, _s2: &str, _simplify: bool) -> String {
    fmt_const(0.0)
}

fn one_num(_x: f64, _y: f64) -> f64 {
    1.0
}
fn one_da(_x: &Da, _y: &Da) -> Result<Da, Error> {
    Ok(Da::from_const(1.0))
}
fn one_sym(_s1: &str, _s2: &str, _simplify: bool) -> String {
    fmt_const(1.0)
}

// --- binary arithmetic ---------------------------------------------------

fn sum_num(x: f64, y: f64) -> f64 {
    x + y
}
fn sum_da(x: &Da, y: &Da) -> Result<Da, Error> {
    Ok(x.add(y))
}
fn sum_sym(s1: &str, s2: &str, simplify: bool) -> String {
    if simplify {
        if s1 == s2 {
            return format!("(2*{s1})");
        } else if s1 == "0" {
            return s2.to_string();
        } else if s2 == "0" {
            return s1.to_string();
        }
    }
    format!("({s1}+{s2})")
}

fn diff_num(x: f64, y: f64) -> f64 {
    x - y
}
fn diff_da(x: &Da, y: &Da) -> Result<Da, Error> {
    Ok(x.sub(y))
}
fn diff_sym(s1: &str, s2: &str, simplify: bool) -> String {
    if simplify {
        if s1 == s2 {
            return "0".to_string();
        } else if s1 == "0" {
            return format!("(-{s2})");
        } else if s2 == "0" {
            return s1.to_string();
        }
    }
    format!("({s1}-{s2})")
}

fn mul_num(x: f64, y: f64) -> f64 {
    x * y
}
fn mul_da(x: &Da, y: &Da) -> Result<Da, Error> {
    Ok(x.mul(y))
}
fn mul_sym(s1: &str, s2: &str, simplify: bool) -> String {
    if simplify {
        if s1 == "0" || s2 == "0" {
            return "0".to_string();
        } else if s1 == s2 {
            return format!("{s1}^2");
        } else if s1 == "1" {
            return s2.to_string();
        } else if s2 == "1" {
            return s1.to_string();
        }
    }
    format!("({s1}*{s2})")
}

fn div_num(x: f64, y: f64) -> f64 {
    x / y
}
fn div_da(x: &Da, y: &Da) -> Result<Da, Error> {
    da::div(x, y)
}
fn div_sym(s1: &str, s2: &str, simplify: bool) -> String {
    if simplify {
        if s1 == "0" && s2 != "0" {
            return "0".to_string();
        } else if s1 == s2 && s1 != "0" {
            return "1".to_string();
        }
    }
    format!("({s1}/{s2})")
}

fn pow_num(x: f64, y: f64) -> f64 {
    x.abs().powf(y)
}
fn pow_da(x: &Da, y: &Da) -> Result<Da, Error> {
    da::pow(x, y)
}
fn pow_sym(s1: &str, s2: &str, simplify: bool) -> String {
    if simplify {
        if s1 == "0" && s2 != "0" {
            return "0".to_string();
        } else if s1 == "1" {
            return "1".to_string();
        } else if s2 == "0" && s1 != "0" {
            return "1".to_string();
        } else if s2 == "1" {
            return format!("abs({s1})");
        }
    }
    format!("abs({s1})^({s2})")
}

// --- unary ---------------------------------------------------------------

fn sqrt_num(x: f64, _y: f64) -> f64 {
    x.abs().sqrt()
}
fn sqrt_da(x: &Da, _y: &Da) -> Result<Da, Error> {
    da::sqrt(x)
}
fn sqrt_sym(s1: &str, _s2: &str, simplify: bool) -> String {
    if simplify {
        if s1 == "0" {
            return "0".to_string();
        } else if s1 == "1" {
            return "1".to_string();
        }
    }
    format!("sqrt(abs({s1}))")
}

fn exp_num(x: f64, _y: f64) -> f64 {
    x.exp()
}
fn exp_da(x: &Da, _y: &Da) -> Result<Da, Error> {
    Ok(da::exp(x))
}
fn exp_sym(s1: &str, _s2: &str, simplify: bool) -> String {
    if simplify && s1 == "0" {
        return "1".to_string();
    }
    format!("exp({s1})")
}

fn log_num(x: f64, _y: f64) -> f64 {
    x.abs().ln()
}
fn log_da(x: &Da, _y: &Da) -> Result<Da, Error> {
    da::log(x)
}
fn log_sym(s1: &str, _s2: &str, simplify: bool) -> String {
    if simplify && s1 == "1" {
        return "0".to_string();
    }
    format!("log(abs({s1}))")
}

fn sin_num(x: f64, _y: f64) -> f64 {
    x.sin()
}
fn sin_da(x: &Da, _y: &Da) -> Result<Da, Error> {
    Ok(da::sin(x))
}
fn sin_sym(s1: &str, _s2: &str, _simplify: bool) -> String {
    format!("sin({s1})")
}

fn cos_num(x: f64, _y: f64) -> f64 {
    x.cos()
}
fn cos_da(x: &Da, _y: &Da) -> Result<Da, Error> {
    Ok(da::cos(x))
}
fn cos_sym(s1: &str, _s2: &str, _simplify: bool) -> String {
    format!("cos({s1})")
}

fn tan_num(x: f64, _y: f64) -> f64 {
    x.tan()
}
fn tan_da(x: &Da, _y: &Da) -> Result<Da, Error> {
    Ok(da::tan(x))
}
fn tan_sym(s1: &str, _s2: &str, _simplify: bool) -> String {
    format!("tan({s1})")
}

fn asin_num(x: f64, _y: f64) -> f64 {
    x.asin()
}
fn asin_da(x: &Da, _y: &Da) -> Result<Da, Error> {
    da::asin(x)
}
fn asin_sym(s1: &str, _s2: &str, _simplify: bool) -> String {
    format!("asin({s1})")
}

fn acos_num(x: f64, _y: f64) -> f64 {
    x.acos()
}
fn acos_da(x: &Da, _y: &Da) -> Result<Da, Error> {
    da::acos(x)
}
fn acos_sym(s1: &str, _s2: &str, _simplify: bool) -> String {
    format!("acos({s1})")
}

fn atan_num(x: f64, _y: f64) -> f64 {
    x.atan()
}
fn atan_da(x: &Da, _y: &Da) -> Result<Da, Error> {
    Ok(da::atan(x))
}
fn atan_sym(s1: &str, _s2: &str, _simplify: bool) -> String {
    format!("atan({s1})")
}

fn sinh_num(x: f64, _y: f64) -> f64 {
    x.sinh()
}
fn sinh_da(x: &Da, _y: &Da) -> Result<Da, Error> {
    Ok(da::sinh(x))
}
fn sinh_sym(s1: &str, _s2: &str, _simplify: bool) -> String {
    format!("sinh({s1})")
}

fn cosh_num(x: f64, _y: f64) -> f64 {
    x.cosh()
}
fn cosh_da(x: &Da, _y: &Da) -> Result<Da, Error> {
    Ok(da::cosh(x))
}
fn cosh_sym(s1: &str, _s2: &str, _simplify: bool) -> String {
    format!("cosh({s1})")
}

fn tanh_num(x: f64, _y: f64) -> f64 {
    x.tanh()
}
fn tanh_da(x: &Da, _y: &Da) -> Result<Da, Error> {
    Ok(da::tanh(x))
}
fn tanh_sym(s1: &str, _s2: &str, _simplify: bool) -> String {
    format!("tanh({s1})")
}

// --- the registry --------------------------------------------------------

pub static ZERO: BasisFunction = BasisFunction {
    name: "zero",
    arity: Arity::Const,
    eval_num: zero_num,
    eval_da: zero_da,
    eval_sym: zero_sym,
};
pub static ONE: BasisFunction = BasisFunction {
    name: "one",
    arity: Arity::Const,
    eval_num: one_num,
    eval_da: one_da,
    eval_sym: one_sym,
};
pub static SUM: BasisFunction = BasisFunction {
    name: "sum",
    arity: Arity::Binary,
    eval_num: sum_num,
    eval_da: sum_da,
    eval_sym: sum_sym,
};
pub static DIFF: BasisFunction = BasisFunction {
    name: "diff",
    arity: Arity::Binary,
    eval_num: diff_num,
    eval_da: diff_da,
    eval_sym: diff_sym,
};
pub static MUL: BasisFunction = BasisFunction {
    name: "mul",
    arity: Arity::Binary,
    eval_num: mul_num,
    eval_da: mul_da,
    eval_sym: mul_sym,
};
pub static DIV: BasisFunction = BasisFunction {
    name: "div",
    arity: Arity::Binary,
    eval_num: div_num,
    eval_da: div_da,
    eval_sym: div_sym,
};
pub static POW: BasisFunction = BasisFunction {
    name: "pow",
    arity: Arity::Binary,
    eval_num: pow_num,
    eval_da: pow_da,
    eval_sym: pow_sym,
};
pub static SQRT: BasisFunction = BasisFunction {
    name: "sqrt",
    arity: Arity::Unary,
    eval_num: sqrt_num,
    eval_da: sqrt_da,
    eval_sym: sqrt_sym,
};
pub static EXP: BasisFunction = BasisFunction {
    name: "exp",
    arity: Arity::Unary,
    eval_num: exp_num,
    eval_da: exp_da,
    eval_sym: exp_sym,
};
pub static LOG: BasisFunction = BasisFunction {
    name: "log",
    arity: Arity::Unary,
    eval_num: log_num,
    eval_da: log_da,
    eval_sym: log_sym,
};
pub static SIN: BasisFunction = BasisFunction {
    name: "sin",
    arity: Arity::Unary,
    eval_num: sin_num,
    eval_da: sin_da,
    eval_sym: sin_sym,
};
pub static COS: BasisFunction = BasisFunction {
    name: "cos",
    arity: Arity::Unary,
    eval_num: cos_num,
    eval_da: cos_da,
    eval_sym: cos_sym,
};
pub static TAN: BasisFunction = BasisFunction {
    name: "tan",
    arity: Arity::Unary,
    eval_num: tan_num,
    eval_da: tan_da,
    eval_sym: tan_sym,
};
pub static ASIN: BasisFunction = BasisFunction {
    name: "asin",
    arity: Arity::Unary,
    eval_num: asin_num,
    eval_da: asin_da,
    eval_sym: asin_sym,
};
pub static ACOS: BasisFunction = BasisFunction {
    name: "acos",
    arity: Arity::Unary,
    eval_num: acos_num,
    eval_da: acos_da,
    eval_sym: acos_sym,
};
pub static ATAN: BasisFunction = BasisFunction {
    name: "atan",
    arity: Arity::Unary,
    eval_num: atan_num,
    eval_da: atan_da,
    eval_sym: atan_sym,
};
pub static SINH: BasisFunction = BasisFunction {
    name: "sinh",
    arity: Arity::Unary,
    eval_num: sinh_num,
    eval_da: sinh_da,
    eval_sym: sinh_sym,
};
pub static COSH: BasisFunction = BasisFunction {
    name: "cosh",
    arity: Arity::Unary,
    eval_num: cosh_num,
    eval_da: cosh_da,
    eval_sym: cosh_sym,
};
pub static TANH: BasisFunction = BasisFunction {
    name: "tanh",
    arity: Arity::Unary,
    eval_num: tanh_num,
    eval_da: tanh_da,
    eval_sym: tanh_sym,
};

/// Looks up a basis function by its `spec.md` §6.4 name. Used by the
/// string-driven [`crate::function_set::FunctionSet::from_names`] builder.
pub fn by_name(name: &str) -> Result<&'static BasisFunction, Error> {
    Ok(match name {
        "zero" => &ZERO,
        "one" => &ONE,
        "sum" => &SUM,
        "diff" => &DIFF,
        "mul" => &MUL,
        "div" => &DIV,
        "pow" => &POW,
        "sqrt" => &SQRT,
        "exp" => &EXP,
        "log" => &LOG,
        "sin" => &SIN,
        "cos" => &COS,
        "tan" => &TAN,
        "asin" => &ASIN,
        "acos" => &ACOS,
        "atan" => &ATAN,
        "sinh" => &SINH,
        "cosh" => &COSH,
        "tanh" => &TANH,
        other => return Err(Error::UnknownFunction(other.to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_identities_only_apply_when_simplifying() {
        assert_eq!(SUM.apply_sym("x", "x", true), "(2*x)");
        assert_eq!(SUM.apply_sym("x", "x", false), "(x+x)");
        assert_eq!(SUM.apply_sym("0", "y", true), "y");
        assert_eq!(SUM.apply_sym("x", "0", true), "x");
    }

    #[test]
    fn diff_identities() {
        assert_eq!(DIFF.apply_sym("a", "a", true), "0");
        assert_eq!(DIFF.apply_sym("0", "b", true), "(-b)");
        assert_eq!(DIFF.apply_sym("a", "0", true), "a");
    }

    #[test]
    fn mul_identities() {
        assert_eq!(MUL.apply_sym("0", "b", true), "0");
        assert_eq!(MUL.apply_sym("a", "0", true), "0");
        assert_eq!(MUL.apply_sym("a", "a", true), "a^2");
        assert_eq!(MUL.apply_sym("1", "b", true), "b");
        assert_eq!(MUL.apply_sym("a", "1", true), "a");
    }

    #[test]
    fn pow_identities_and_default_wraps_abs() {
        assert_eq!(POW.apply_sym("0", "b", true), "0");
        assert_eq!(POW.apply_sym("1", "b", true), "1");
        assert_eq!(POW.apply_sym("a", "0", true), "1");
        assert_eq!(POW.apply_sym("a", "1", true), "abs(a)");
        assert_eq!(POW.apply_sym("a", "b", true), "abs(a)^(b)");
        assert_eq!(POW.apply_sym("a", "b", false), "abs(a)^(b)");
    }

    #[test]
    fn sqrt_log_exp_identities() {
        assert_eq!(SQRT.apply_sym("0", "", true), "0");
        assert_eq!(SQRT.apply_sym("1", "", true), "1");
        assert_eq!(SQRT.apply_sym("a", "", true), "sqrt(abs(a))");
        assert_eq!(EXP.apply_sym("0", "", true), "1");
        assert_eq!(LOG.apply_sym("1", "", true), "0");
    }

    #[test]
    fn arity_is_respected_by_unary_functions() {
        assert_eq!(SQRT.arity, Arity::Unary);
        assert_eq!(SUM.arity, Arity::Binary);
        assert_eq!(ZERO.arity, Arity::Const);
    }

    #[test]
    fn by_name_rejects_unknown() {
        assert!(matches!(by_name("banana"), Err(Error::UnknownFunction(_))));
        assert!(by_name("sum").is_ok());
    }
}
