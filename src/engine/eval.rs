//! Numeric evaluation of expression trees for the sampling tier.
//!
//! Two parallel evaluators: one over `f64` and one over `Complex64` for
//! the complex-plane retry. Partial functions return NaN on the real
//! line rather than erroring, which is what triggers the retry. The
//! reciprocal trig family and the inverse hyperbolic reciprocals are
//! supplied via identities so the evaluator is total on the nominal
//! domain.

use std::collections::HashMap;

use num::complex::Complex64;
use num::ToPrimitive;

use crate::ast::{Constant, Decimal, Expr, Function};

/// Evaluate over the reals; any failure surfaces as NaN.
pub fn eval_real(expr: &Expr, env: &HashMap<String, f64>) -> f64 {
    match expr {
        Expr::Integer(n) => n.to_f64().unwrap_or(f64::NAN),
        Expr::Rational(n, d) => {
            n.to_f64().unwrap_or(f64::NAN) / d.to_f64().unwrap_or(f64::NAN)
        }
        Expr::Float(Decimal(v)) => *v,
        Expr::Symbol(name) => env.get(name).copied().unwrap_or(f64::NAN),
        Expr::Constant(Constant::Pi) => std::f64::consts::PI,
        Expr::Constant(Constant::E) => std::f64::consts::E,
        // The imaginary unit has no real value; force the complex retry.
        Expr::Constant(Constant::I) => f64::NAN,
        Expr::Add(children) => children.iter().map(|c| eval_real(c, env)).sum(),
        Expr::Mul(children) => children.iter().map(|c| eval_real(c, env)).product(),
        Expr::Pow(base, exponent) => {
            eval_real(base, env).powf(eval_real(exponent, env))
        }
        Expr::Func(function, args) => eval_real_func(*function, args, env),
        Expr::Bool(_)
        | Expr::Eq(_, _)
        | Expr::Rel(_, _, _)
        | Expr::And(_)
        | Expr::Or(_)
        | Expr::Xor(_)
        | Expr::Not(_)
        | Expr::Implies(_, _) => f64::NAN,
    }
}

fn eval_real_func(function: Function, args: &[Expr], env: &HashMap<String, f64>) -> f64 {
    let x = eval_real(&args[0], env);
    match function {
        Function::Sin => x.sin(),
        Function::Cos => x.cos(),
        Function::Tan => x.tan(),
        Function::Csc => 1.0 / x.sin(),
        Function::Sec => 1.0 / x.cos(),
        Function::Cot => 1.0 / x.tan(),
        Function::Asin => x.asin(),
        Function::Acos => x.acos(),
        Function::Atan => x.atan(),
        Function::Acsc => (1.0 / x).asin(),
        Function::Asec => (1.0 / x).acos(),
        Function::Acot => (1.0 / x).atan(),
        Function::Sinh => x.sinh(),
        Function::Cosh => x.cosh(),
        Function::Tanh => x.tanh(),
        Function::Csch => 1.0 / x.sinh(),
        Function::Sech => 1.0 / x.cosh(),
        Function::Coth => 1.0 / x.tanh(),
        Function::Asinh => x.asinh(),
        Function::Acosh => x.acosh(),
        Function::Atanh => x.atanh(),
        Function::Acsch => (1.0 / x).asinh(),
        Function::Asech => (1.0 / x).acosh(),
        Function::Acoth => (1.0 / x).atanh(),
        Function::Exp => x.exp(),
        Function::Log => match args.len() {
            1 => x.ln(),
            _ => x.ln() / eval_real(&args[1], env).ln(),
        },
        Function::Abs => x.abs(),
        Function::Factorial => real_factorial(x),
        // Derivatives are substituted by dummy symbols before sampling.
        Function::Derivative => f64::NAN,
    }
}

fn real_factorial(x: f64) -> f64 {
    if !x.is_finite() || x < 0.0 || x.fract().abs() > 1e-9 || x > 170.0 {
        return f64::NAN;
    }
    let n = x.round() as u64;
    let mut acc = 1.0f64;
    for k in 2..=n {
        acc *= k as f64;
    }
    acc
}

/// Evaluate on the complex plane with branch-cut definitions.
pub fn eval_complex(expr: &Expr, env: &HashMap<String, Complex64>) -> Complex64 {
    match expr {
        Expr::Integer(n) => Complex64::new(n.to_f64().unwrap_or(f64::NAN), 0.0),
        Expr::Rational(n, d) => Complex64::new(
            n.to_f64().unwrap_or(f64::NAN) / d.to_f64().unwrap_or(f64::NAN),
            0.0,
        ),
        Expr::Float(Decimal(v)) => Complex64::new(*v, 0.0),
        Expr::Symbol(name) => env
            .get(name)
            .copied()
            .unwrap_or_else(|| Complex64::new(f64::NAN, f64::NAN)),
        Expr::Constant(Constant::Pi) => Complex64::new(std::f64::consts::PI, 0.0),
        Expr::Constant(Constant::E) => Complex64::new(std::f64::consts::E, 0.0),
        Expr::Constant(Constant::I) => Complex64::new(0.0, 1.0),
        Expr::Add(children) => children
            .iter()
            .map(|c| eval_complex(c, env))
            .fold(Complex64::new(0.0, 0.0), |a, b| a + b),
        Expr::Mul(children) => children
            .iter()
            .map(|c| eval_complex(c, env))
            .fold(Complex64::new(1.0, 0.0), |a, b| a * b),
        Expr::Pow(base, exponent) => {
            let b = eval_complex(base, env);
            let e = eval_complex(exponent, env);
            // 0^negative explodes either way; powc of a zero base with a
            // positive real exponent should stay zero rather than NaN.
            if b.norm() == 0.0 && e.im == 0.0 && e.re > 0.0 {
                Complex64::new(0.0, 0.0)
            } else {
                b.powc(e)
            }
        }
        Expr::Func(function, args) => eval_complex_func(*function, args, env),
        Expr::Bool(_)
        | Expr::Eq(_, _)
        | Expr::Rel(_, _, _)
        | Expr::And(_)
        | Expr::Or(_)
        | Expr::Xor(_)
        | Expr::Not(_)
        | Expr::Implies(_, _) => Complex64::new(f64::NAN, f64::NAN),
    }
}

fn eval_complex_func(
    function: Function,
    args: &[Expr],
    env: &HashMap<String, Complex64>,
) -> Complex64 {
    let one = Complex64::new(1.0, 0.0);
    let x = eval_complex(&args[0], env);
    match function {
        Function::Sin => x.sin(),
        Function::Cos => x.cos(),
        Function::Tan => x.tan(),
        Function::Csc => one / x.sin(),
        Function::Sec => one / x.cos(),
        Function::Cot => one / x.tan(),
        Function::Asin => x.asin(),
        Function::Acos => x.acos(),
        Function::Atan => x.atan(),
        Function::Acsc => (one / x).asin(),
        Function::Asec => (one / x).acos(),
        Function::Acot => (one / x).atan(),
        Function::Sinh => x.sinh(),
        Function::Cosh => x.cosh(),
        Function::Tanh => x.tanh(),
        Function::Csch => one / x.sinh(),
        Function::Sech => one / x.cosh(),
        Function::Coth => one / x.tanh(),
        Function::Asinh => x.asinh(),
        Function::Acosh => x.acosh(),
        Function::Atanh => x.atanh(),
        Function::Acsch => (one / x).asinh(),
        Function::Asech => (one / x).acosh(),
        Function::Acoth => (one / x).atanh(),
        Function::Exp => x.exp(),
        Function::Log => match args.len() {
            1 => x.ln(),
            _ => x.ln() / eval_complex(&args[1], env).ln(),
        },
        Function::Abs => Complex64::new(x.norm(), 0.0),
        Function::Factorial => {
            if x.im.abs() < 1e-12 {
                Complex64::new(real_factorial(x.re), 0.0)
            } else {
                Complex64::new(f64::NAN, f64::NAN)
            }
        }
        Function::Derivative => Complex64::new(f64::NAN, f64::NAN),
    }
}
