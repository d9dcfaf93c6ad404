//! The logic equivalence checker: exact -> symbolic, no numeric tier.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info};

use crate::ast::Expr;
use crate::engine::{maths::contains_incorrect_symbols, CheckOptions, CheckResult, Deadline, EqualityType};
use crate::parsing::{cleanup_string, logic, Mode};
use crate::simplify::boolean;

/// A boolean-logic checker instance with its own known-pair memo.
#[derive(Debug, Default)]
pub struct LogicChecker {
    memo: Mutex<HashMap<(Expr, Expr), EqualityType>>,
}

impl LogicChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the equivalence of two boolean formulae.
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

        let target_clean = match cleanup_string(target_str, Mode::Logic, true) {
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
        let test_clean = match cleanup_string(test_str, Mode::Logic, true) {
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

        let mut result = CheckResult {
            target: Some(target_clean.clone()),
            test: Some(test_clean.clone()),
            ..Default::default()
        };

        let target_expr = match logic::parse_expr(&target_clean) {
            Ok(expr) => expr,
            Err(error) => {
                debug!("Trusted expression cannot be parsed: {error}");
                result.error = Some("Parsing TARGET Expression Failed!".into());
                result.code = Some(400);
                return result;
            }
        };
        let test_expr = match logic::parse_expr(&test_clean) {
            Ok(expr) => expr,
            Err(error) => {
                debug!("Incorrectly formatted ToCheck expression: {error}");
                result.error = Some("Parsing Test Expression Failed!".into());
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

        let (equal, equality_type) = self.general_equality(&test_expr, &target_expr);
        if equal && equality_type != EqualityType::Exact {
            let key = (target_expr.canonical(), test_expr.canonical());
            debug!("Adding known pair ({target_expr}, {test_expr})");
            self.memo.lock().unwrap().insert(key, equality_type);
        }
        result.equal = Some(equal);
        result.equality_type = Some(equality_type);
        result
    }

    fn general_equality(&self, test: &Expr, target: &Expr) -> (bool, EqualityType) {
        let key = (target.canonical(), test.canonical());
        if let Some(tier) = self.memo.lock().unwrap().get(&key) {
            debug!("Known pair from {} equality", tier.as_str());
            return (true, *tier);
        }
        debug!("[EXACT TEST]");
        if test.canonical() == target.canonical() {
            debug!("Exact match");
            return (true, EqualityType::Exact);
        }
        debug!("[SYMBOLIC TEST]");
        match boolean::equivalent(test, target) {
            Ok(equal) => {
                if equal {
                    debug!("Symbolic match");
                }
                (equal, EqualityType::Symbolic)
            }
            Err(reason) => {
                debug!("Can't check symbolic equality: {}", reason.0);
                (false, EqualityType::Symbolic)
            }
        }
    }
}
