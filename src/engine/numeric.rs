//! The numeric sampling tier (maths only).
//!
//! Invoked when both the exact and symbolic tiers have failed. Both
//! sides are sampled at random points in [0, 1); the target is trusted
//! to contain only necessary symbols, so its free symbols must be a
//! subset of the test's. Derivative subtrees are swapped for shared
//! dummy symbols first, highest order first so nested forms do not
//! collide. A NaN on the reals triggers one retry on the complex plane.

use std::collections::{BTreeSet, HashMap};

use num::complex::Complex64;
use tracing::debug;

use crate::ast::{Expr, Function};
use crate::engine::eval::{eval_complex, eval_real};
use crate::engine::Deadline;
use crate::errors::CheckError;

/// Number of sample points per comparison.
const SAMPLE_POINTS: usize = 25;
/// Relative tolerance for accepting equality.
const TOLERANCE: f64 = 1e-10;
/// Sampled target ranges wider than this cannot be compared reliably.
const MAX_RANGE: f64 = 1e10;
/// Sampled target ranges narrower than this look constant.
const MIN_RANGE: f64 = 1e-10;

/// Test whether two expressions agree numerically at sampled points.
pub fn numeric_equality(
    test: &Expr,
    target: &Expr,
    deadline: &Deadline,
) -> Result<bool, CheckError> {
    let (test, target) = substitute_derivatives(test.canonical(), target.canonical());
    attempt(&test, &target, false, deadline)
}

/// Replace every derivative subtree on either side with a fresh dummy
/// symbol. Longer variable lists substitute first so a second-order
/// derivative is swapped out before its embedded first-order form.
fn substitute_derivatives(test: Expr, target: Expr) -> (Expr, Expr) {
    let mut derivatives = Vec::new();
    let is_derivative = |e: &Expr| matches!(e, Expr::Func(Function::Derivative, _));
    target.collect_subtrees(&is_derivative, &mut derivatives);
    test.collect_subtrees(&is_derivative, &mut derivatives);
    derivatives.sort();
    derivatives.dedup();
    derivatives.sort_by_key(|d| match d {
        Expr::Func(Function::Derivative, args) => std::cmp::Reverse(args.len()),
        _ => std::cmp::Reverse(0),
    });
    let mut test = test;
    let mut target = target;
    for (index, derivative) in derivatives.into_iter().enumerate() {
        let dummy = Expr::symbol(format!("Derivative_{index}"));
        debug!(
            "Swapping '{}' into variable '{}' for numeric evaluation",
            derivative, dummy
        );
        target = target.substitute(&derivative, &dummy);
        test = test.substitute(&derivative, &dummy);
    }
    (test, target)
}

fn attempt(
    test: &Expr,
    target: &Expr,
    complexify: bool,
    deadline: &Deadline,
) -> Result<bool, CheckError> {
    let target_symbols: BTreeSet<String> = target.free_symbols();
    let test_symbols: BTreeSet<String> = test.free_symbols();

    // The target is trusted to contain only necessary symbols; if the
    // test is missing any of them the two cannot be equal.
    if !target_symbols.is_subset(&test_symbols) {
        debug!("Test expression does not contain all target variables");
        return Ok(false);
    }

    let shared: Vec<String> = target_symbols.iter().cloned().collect();
    let extra: Vec<String> = test_symbols.difference(&target_symbols).cloned().collect();

    let mut shared_samples: HashMap<String, Vec<f64>> = HashMap::new();
    for name in shared.iter().chain(extra.iter()) {
        let column: Vec<f64> = (0..SAMPLE_POINTS).map(|_| fastrand::f64()).collect();
        shared_samples.insert(name.clone(), column);
    }

    let decision = if complexify {
        let values = |expr: &Expr, names: &[&Vec<String>]| -> Vec<Complex64> {
            (0..SAMPLE_POINTS)
                .map(|i| {
                    let env: HashMap<String, Complex64> = names
                        .iter()
                        .flat_map(|group| group.iter())
                        .map(|name| {
                            (name.clone(), Complex64::new(shared_samples[name][i], 0.0))
                        })
                        .collect();
                    eval_complex(expr, &env)
                })
                .collect()
        };
        let target_values = values(target, &[&shared]);
        let test_values = values(test, &[&shared, &extra]);
        decide_complex(&target_values, &test_values, !target_symbols.is_empty())
    } else {
        let values = |expr: &Expr, names: &[&Vec<String>]| -> Vec<f64> {
            (0..SAMPLE_POINTS)
                .map(|i| {
                    let env: HashMap<String, f64> = names
                        .iter()
                        .flat_map(|group| group.iter())
                        .map(|name| (name.clone(), shared_samples[name][i]))
                        .collect();
                    eval_real(expr, &env)
                })
                .collect()
        };
        let target_values = values(target, &[&shared]);
        let test_values = values(test, &[&shared, &extra]);
        decide_real(&target_values, &test_values, !target_symbols.is_empty())
    };

    match decision {
        Decision::Equal(answer) => Ok(answer),
        Decision::Undefined => {
            if complexify {
                Err(CheckError::NumericDomain(
                    "A function in the test or target expression is undefined in the interval [0,1).".into(),
                ))
            } else {
                debug!("A function appears undefined in [0,1); retrying with complex values");
                deadline.check()?;
                attempt(test, target, true, deadline)
            }
        }
        Decision::RangeTooLarge => Err(CheckError::NumericRange(
            "Too Large Range, numeric equality test unlikely to be accurate!".into(),
        )),
        Decision::RangeTooSmall => Err(CheckError::NumericRange(
            "Too Small Range, numeric equality test unlikely to be accurate!".into(),
        )),
        Decision::NotRepresentable => Err(CheckError::NumericRange(
            "A function has values not representable by 64 bit floats!".into(),
        )),
    }
}

enum Decision {
    Equal(bool),
    Undefined,
    RangeTooLarge,
    RangeTooSmall,
    NotRepresentable,
}

fn decide_real(target_values: &[f64], test_values: &[f64], target_has_symbols: bool) -> Decision {
    if target_values.iter().chain(test_values).any(|v| v.is_nan()) {
        return Decision::Undefined;
    }
    let max = target_values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = target_values.iter().cloned().fold(f64::INFINITY, f64::min);
    let range = (max - min).abs();
    if range > MAX_RANGE {
        return Decision::RangeTooLarge;
    }
    if range < MIN_RANGE && target_has_symbols {
        return Decision::RangeTooSmall;
    }
    if target_values
        .iter()
        .chain(test_values)
        .any(|v| !v.is_finite())
    {
        return Decision::NotRepresentable;
    }
    let difference: f64 = target_values
        .iter()
        .zip(test_values)
        .map(|(g, t)| (g - t).abs())
        .sum();
    let scale = target_values.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    debug!("Numeric equality tested: absolute difference of {difference:.6e}");
    Decision::Equal(difference <= TOLERANCE * scale)
}

fn decide_complex(
    target_values: &[Complex64],
    test_values: &[Complex64],
    target_has_symbols: bool,
) -> Decision {
    let is_nan = |v: &Complex64| v.re.is_nan() || v.im.is_nan();
    if target_values.iter().chain(test_values).any(is_nan) {
        return Decision::Undefined;
    }
    // Lexicographic max/min by real then imaginary part, matching how
    // array libraries order complex values.
    let key = |v: &Complex64| (v.re, v.im);
    let max = target_values
        .iter()
        .cloned()
        .max_by(|a, b| key(a).partial_cmp(&key(b)).unwrap())
        .unwrap_or(Complex64::new(0.0, 0.0));
    let min = target_values
        .iter()
        .cloned()
        .min_by(|a, b| key(a).partial_cmp(&key(b)).unwrap())
        .unwrap_or(Complex64::new(0.0, 0.0));
    let range = (max - min).norm();
    if range > MAX_RANGE {
        return Decision::RangeTooLarge;
    }
    if range < MIN_RANGE && target_has_symbols {
        return Decision::RangeTooSmall;
    }
    let finite = |v: &Complex64| v.re.is_finite() && v.im.is_finite();
    if !target_values.iter().chain(test_values).all(finite) {
        return Decision::NotRepresentable;
    }
    let difference: f64 = target_values
        .iter()
        .zip(test_values)
        .map(|(g, t)| (g - t).norm())
        .sum();
    let scale = target_values.iter().fold(0.0f64, |acc, v| acc.max(v.norm()));
    debug!("Numeric equality tested (complex): absolute difference of {difference:.6e}");
    Decision::Equal(difference <= TOLERANCE * scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::maths::{parse_expr as parse_maths, MathsContext};

    fn parse(input: &str) -> Expr {
        parse_maths(input, &MathsContext::new()).unwrap()
    }

    fn check(test: &str, target: &str) -> Result<bool, CheckError> {
        numeric_equality(&parse(test), &parse(target), &Deadline::none())
    }

    #[test]
    fn identical_functions_agree() {
        assert_eq!(check("sin(x)*cos(x)", "sin(x)*cos(x)"), Ok(true));
        assert_eq!(check("sin(2*x)", "2*sin(x)*cos(x)"), Ok(true));
    }

    #[test]
    fn different_functions_disagree() {
        assert_eq!(check("sin(x)", "cos(x)"), Ok(false));
        assert_eq!(check("x + 1", "x + 2"), Ok(false));
    }

    #[test]
    fn missing_target_variables_fail_without_sampling() {
        assert_eq!(check("x", "x*y"), Ok(false));
    }

    #[test]
    fn extra_test_variables_are_sampled_over() {
        assert_eq!(check("x + y - y", "x"), Ok(true));
        assert_eq!(check("(y/y)*sin(x)", "sin(x)"), Ok(true));
    }

    #[test]
    fn complex_fallback_handles_partial_domains() {
        // log(x - 2) is undefined on [0,1) but fine off the real axis.
        assert_eq!(check("log(x - 2)", "log(x - 2)"), Ok(true));
    }

    #[test]
    fn persistent_nan_is_a_domain_error() {
        let result = check("factorial(x)", "factorial(x)");
        assert!(matches!(result, Err(CheckError::NumericDomain(_))));
    }

    #[test]
    fn wide_ranges_are_rejected() {
        let result = check("1/x", "1/x**20");
        assert!(matches!(result, Err(CheckError::NumericRange(_))));
    }

    #[test]
    fn constant_looking_targets_with_symbols_are_rejected() {
        let result = check("x - x + 5", "x - x + 5");
        assert!(matches!(result, Err(CheckError::NumericRange(_))));
    }

    #[test]
    fn derivatives_substitute_as_shared_dummies() {
        assert_eq!(
            check(
                "Derivative(y, x) + Derivative(z, x)",
                "Derivative(z, x) + Derivative(y, x)"
            ),
            Ok(true)
        );
        assert_eq!(
            check("2*Derivative(y, x)", "Derivative(y, x)"),
            Ok(false)
        );
    }
}
