//! The maths equivalence checker: exact -> symbolic -> numeric, with the
//! known-pair memo, relation dispatch, and plus-minus expansion.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info};

use crate::ast::{display_symbol_name, Expr, RelOp};
use crate::engine::{
    eq_type_order, numeric::numeric_equality, CheckOptions, CheckResult, Deadline,
    EqualityType, SymbolMismatch,
};
use crate::errors::CheckError;
use crate::parsing::{cleanup_string, maths, MathsContext, Mode};
use crate::simplify::{algebra, derivative};

/// A maths checker instance. State is limited to the known-pair memo,
/// which is only ever written on successful symbolic or numeric matches
/// (entries are idempotent, so last-writer-wins is fine under sharing).
#[derive(Debug, Default)]
pub struct MathsChecker {
    memo: Mutex<HashMap<(Expr, Expr), EqualityType>>,
}

impl MathsChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main checking function; returns a result dict-equivalent whose
    /// `error` field should always be checked first.
    pub fn check(
        &self,
        test_str: &str,
        target_str: &str,
        options: &CheckOptions,
        deadline: &Deadline,
    ) -> CheckResult {
        if let Some(description) = &options.description {
            info!("{description}");
        }
        if test_str.is_empty() || target_str.is_empty() {
            debug!("No input provided");
            return CheckResult::error_only("Empty string as argument.");
        }

        // Clean up the strings before anything is done to them; the
        // trusted target fails fatally, the test fails as a syntax error.
        let target_clean = match cleanup_string(target_str, Mode::Maths, true) {
            Ok(clean) => clean,
            Err(_) => {
                debug!("Target contained non-whitelisted characters");
                return CheckResult {
                    error: Some("Bad input provided!".into()),
                    code: Some(400),
                    ..Default::default()
                };
            }
        };
        let test_clean = match cleanup_string(test_str, Mode::Maths, true) {
            Ok(clean) => clean,
            Err(_) => {
                debug!("Test contained non-whitelisted characters");
                return CheckResult {
                    error: Some("Bad input provided!".into()),
                    syntax_error: true,
                    ..Default::default()
                };
            }
        };
        debug!("Target string: '{target_clean}'");
        debug!("Test string: '{test_clean}'");

        if target_clean.contains('±') || test_clean.contains('±') {
            return self.plus_minus_checker(&test_clean, &target_clean, options, deadline);
        }

        let ctx = MathsContext::new()
            .with_symbols(&options.symbols)
            .with_hints(&options.hints);

        let mut result = CheckResult {
            target: Some(target_clean.clone()),
            test: Some(test_clean.clone()),
            ..Default::default()
        };

        let target_expr = match maths::parse_expr(&target_clean, &ctx) {
            Ok(expr) => expr,
            Err(error) => {
                debug!("Trusted expression cannot be parsed: {error}");
                result.error = Some(match error {
                    CheckError::FactorialTooLarge => error.to_string(),
                    _ => "Parsing TARGET Expression Failed!".into(),
                });
                result.code = Some(400);
                return result;
            }
        };
        let test_expr = match maths::parse_expr(&test_clean, &ctx) {
            Ok(expr) => expr,
            Err(error) => {
                debug!("Incorrectly formatted ToCheck expression: {error}");
                result.error = Some(match error {
                    CheckError::FactorialTooLarge => error.to_string(),
                    _ => "Parsing Test Expression Failed!".into(),
                });
                result.syntax_error = true;
                return result;
            }
        };

        result.parsed_target = Some(target_expr.to_string());
        result.parsed_test = Some(test_expr.to_string());
        debug!("Parsed target: {target_expr}");
        debug!("Parsed test: {test_expr}");

        if options.check_symbols {
            if let Some(mismatch) = contains_incorrect_symbols(&test_expr, &target_expr) {
                result.equal = Some(false);
                result.equality_type = Some(EqualityType::Symbolic);
                result.incorrect_symbols = Some(mismatch);
                return result;
            }
        }
        if let Err(error) = deadline.check() {
            result.error = Some(error.to_string());
            return result;
        }

        match self.general_equality(&test_expr, &target_expr, options, deadline) {
            Ok((equal, equality_type)) => {
                if equal && equality_type != EqualityType::Exact {
                    let key = (target_expr.canonical(), test_expr.canonical());
                    debug!("Adding known pair ({target_expr}, {test_expr})");
                    self.memo.lock().unwrap().insert(key, equality_type);
                }
                result.equal = Some(equal);
                result.equality_type = Some(equality_type);
                result
            }
            Err(CheckError::EquationTypeMismatch) => {
                debug!("Equation/Expression type mismatch: can't be equal");
                result.equal = Some(false);
                result.equality_type = Some(EqualityType::Symbolic);
                result
            }
            Err(CheckError::Timeout) => {
                result.error = Some(CheckError::Timeout.to_string());
                result
            }
            Err(error) => {
                debug!("Error when comparing expressions: '{error}'");
                result.error = Some(format!(
                    "Comparison of expressions failed: '{error}'"
                ));
                result
            }
        }
    }

    /// Checking for inputs containing the plus-or-minus character: the
    /// whole engine runs once per sign and both runs must succeed.
    fn plus_minus_checker(
        &self,
        test_clean: &str,
        target_clean: &str,
        options: &CheckOptions,
        deadline: &Deadline,
    ) -> CheckResult {
        debug!("[[PLUS-OR-MINUS CHECKING]]");
        if !(target_clean.contains('±') && test_clean.contains('±')) {
            debug!("Plus-or-minus mismatch between test and target; can't be equal");
            return CheckResult {
                target: Some(target_clean.to_string()),
                test: Some(test_clean.to_string()),
                equal: Some(false),
                equality_type: Some(EqualityType::Symbolic),
                ..Default::default()
            };
        }
        let plus = self.check(
            &test_clean.replace('±', "+"),
            &target_clean.replace('±', "+"),
            options,
            deadline,
        );
        if plus.error.is_some() {
            let mut plus = plus;
            plus.target = Some(target_clean.to_string());
            plus.test = Some(test_clean.to_string());
            plus.case = Some('+');
            return plus;
        }
        let minus = self.check(
            &test_clean.replace('±', "-"),
            &target_clean.replace('±', "-"),
            options,
            deadline,
        );
        if minus.error.is_some() {
            let mut minus = minus;
            minus.target = Some(target_clean.to_string());
            minus.test = Some(test_clean.to_string());
            minus.case = Some('-');
            return minus;
        }
        let equal = plus.equal == Some(true) && minus.equal == Some(true);
        let tiers: Vec<EqualityType> = [plus.equality_type, minus.equality_type]
            .into_iter()
            .flatten()
            .collect();
        let equality_type = if tiers.is_empty() {
            EqualityType::Symbolic
        } else {
            eq_type_order(&tiers)
        };
        CheckResult {
            target: Some(target_clean.to_string()),
            test: Some(test_clean.to_string()),
            parsed_target: plus.parsed_target,
            parsed_test: plus.parsed_test,
            equal: Some(equal),
            equality_type: Some(equality_type),
            ..Default::default()
        }
    }

    /// Dispatch on the target's shape: equation, inequality, or plain
    /// expression. The memo short-circuits everything.
    fn general_equality(
        &self,
        test: &Expr,
        target: &Expr,
        options: &CheckOptions,
        deadline: &Deadline,
    ) -> Result<(bool, EqualityType), CheckError> {
        let key = (target.canonical(), test.canonical());
        if let Some(tier) = self.memo.lock().unwrap().get(&key) {
            debug!("Known pair from {} equality", tier.as_str());
            return Ok((true, *tier));
        }
        match target {
            Expr::Eq(target_lhs, target_rhs) => {
                debug!("[[EQUATION CHECK]]");
                let Expr::Eq(test_lhs, test_rhs) = test else {
                    return Err(CheckError::EquationTypeMismatch);
                };
                let (equal_lhs, tier_lhs) =
                    self.expr_equality(test_lhs, target_lhs, options, deadline)?;
                let (equal_rhs, tier_rhs) =
                    self.expr_equality(test_rhs, target_rhs, options, deadline)?;
                if equal_lhs && equal_rhs {
                    return Ok((true, eq_type_order(&[tier_lhs, tier_rhs])));
                }
                debug!("[CROSS SIDE CHECK]");
                let (equal_lhs, tier_lhs) =
                    self.expr_equality(test_rhs, target_lhs, options, deadline)?;
                let (equal_rhs, tier_rhs) =
                    self.expr_equality(test_lhs, target_rhs, options, deadline)?;
                Ok((equal_lhs && equal_rhs, eq_type_order(&[tier_lhs, tier_rhs])))
            }
            Expr::Rel(target_op, target_lhs, target_rhs) => {
                debug!("[[INEQUALITY CHECK]]");
                let Expr::Rel(test_op, test_lhs, test_rhs) = test else {
                    return Err(CheckError::EquationTypeMismatch);
                };
                let (target_lesser, target_greater) =
                    lesser_greater(*target_op, target_lhs, target_rhs);
                let (test_lesser, test_greater) =
                    lesser_greater(*test_op, test_lhs, test_rhs);
                let (equal_lesser, tier_lesser) =
                    self.expr_equality(test_lesser, target_lesser, options, deadline)?;
                let (equal_greater, tier_greater) =
                    self.expr_equality(test_greater, target_greater, options, deadline)?;
                let strictness_matches = target_op.is_strict() == test_op.is_strict();
                if !strictness_matches {
                    debug!("Strict vs non-strict inequality mismatch");
                }
                Ok((
                    equal_lesser && equal_greater && strictness_matches,
                    eq_type_order(&[tier_lesser, tier_greater]),
                ))
            }
            _ => {
                debug!("[[EXPRESSION CHECK]]");
                if test.is_relation() {
                    return Err(CheckError::EquationTypeMismatch);
                }
                self.expr_equality(test, target, options, deadline)
            }
        }
    }

    /// The tier ladder for a pair of plain expressions.
    fn expr_equality(
        &self,
        test: &Expr,
        target: &Expr,
        options: &CheckOptions,
        deadline: &Deadline,
    ) -> Result<(bool, EqualityType), CheckError> {
        if test.is_relation() || target.is_relation() {
            return Err(CheckError::EquationTypeMismatch);
        }
        debug!("[EXACT TEST]");
        if test.canonical() == target.canonical() {
            debug!("Exact match");
            return Ok((true, EqualityType::Exact));
        }
        let (test, target) = if options.simplify_derivatives
            && (test.has_derivative() || target.has_derivative())
        {
            debug!("[SIMPLIFY DERIVATIVES]");
            (
                derivative::simplify_derivatives(test),
                derivative::simplify_derivatives(target),
            )
        } else {
            (test.clone(), target.clone())
        };
        deadline.check()?;
        debug!("[SYMBOLIC TEST]");
        let difference = Expr::Add(vec![test.clone(), Expr::neg(target.clone())]);
        match algebra::is_zero(&difference) {
            Ok(true) => {
                debug!("Symbolic match");
                return Ok((true, EqualityType::Symbolic));
            }
            Ok(false) => {}
            Err(reason) => {
                debug!("Can't check symbolic equality: {}", reason.0);
            }
        }
        deadline.check()?;
        debug!("[NUMERIC TEST]");
        let equal = numeric_equality(&test, &target, deadline)?;
        Ok((equal, EqualityType::Numeric))
    }
}

fn lesser_greater<'a>(op: RelOp, lhs: &'a Expr, rhs: &'a Expr) -> (&'a Expr, &'a Expr) {
    match op {
        RelOp::Lt | RelOp::Le => (lhs, rhs),
        RelOp::Gt | RelOp::Ge => (rhs, lhs),
    }
}

/// Compare free-symbol sets, reporting missing and extra names with the
/// lambda defence reversed for display.
pub fn contains_incorrect_symbols(test: &Expr, target: &Expr) -> Option<SymbolMismatch> {
    let test_symbols = test.free_symbols();
    let target_symbols = target.free_symbols();
    if test_symbols == target_symbols {
        return None;
    }
    debug!("Symbol mismatch between test and target");
    let join = |names: Vec<&String>| -> Option<String> {
        if names.is_empty() {
            None
        } else {
            Some(
                names
                    .into_iter()
                    .map(|n| display_symbol_name(n))
                    .collect::<Vec<_>>()
                    .join(","),
            )
        }
    };
    Some(SymbolMismatch {
        missing: join(target_symbols.difference(&test_symbols).collect()),
        extra: join(test_symbols.difference(&target_symbols).collect()),
    })
}
