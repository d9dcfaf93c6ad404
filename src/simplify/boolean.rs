//! The boolean normal form behind the logic pipeline's symbolic tier.
//!
//! A formula's normal form is its truth table over a given variable
//! ordering. Two formulae are equivalent iff their tables over the union
//! of their free symbols agree. The variable count is capped; beyond the
//! cap the tier reports that it cannot decide.

use std::collections::BTreeMap;

use crate::ast::Expr;
use crate::simplify::algebra::Unsupported;

/// Variable-count cap: the table has `2^n` rows.
const MAX_VARIABLES: usize = 16;

/// Evaluate a formula under an assignment of truth values.
fn evaluate(expr: &Expr, assignment: &BTreeMap<String, bool>) -> Result<bool, Unsupported> {
    match expr {
        Expr::Bool(value) => Ok(*value),
        Expr::Symbol(name) => assignment
            .get(name)
            .copied()
            .ok_or_else(|| Unsupported(format!("unbound symbol '{name}'"))),
        Expr::And(children) => {
            for child in children {
                if !evaluate(child, assignment)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Expr::Or(children) => {
            for child in children {
                if evaluate(child, assignment)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Expr::Xor(children) => {
            let mut parity = false;
            for child in children {
                parity ^= evaluate(child, assignment)?;
            }
            Ok(parity)
        }
        Expr::Not(inner) => Ok(!evaluate(inner, assignment)?),
        Expr::Implies(lhs, rhs) => {
            Ok(!evaluate(lhs, assignment)? || evaluate(rhs, assignment)?)
        }
        Expr::Eq(lhs, rhs) => Ok(evaluate(lhs, assignment)? == evaluate(rhs, assignment)?),
        other => Err(Unsupported(format!(
            "not a boolean expression: {other:?}"
        ))),
    }
}

/// The truth table of `expr` over `variables`, one entry per assignment
/// in binary counting order.
pub fn truth_table(expr: &Expr, variables: &[String]) -> Result<Vec<bool>, Unsupported> {
    if variables.len() > MAX_VARIABLES {
        return Err(Unsupported("too many variables for a truth table".into()));
    }
    let rows = 1usize << variables.len();
    let mut table = Vec::with_capacity(rows);
    for row in 0..rows {
        let assignment: BTreeMap<String, bool> = variables
            .iter()
            .enumerate()
            .map(|(bit, name)| (name.clone(), row & (1 << bit) != 0))
            .collect();
        table.push(evaluate(expr, &assignment)?);
    }
    Ok(table)
}

/// Whether two formulae agree on every assignment over the union of
/// their free symbols.
pub fn equivalent(a: &Expr, b: &Expr) -> Result<bool, Unsupported> {
    let mut variables = a.free_symbols();
    variables.extend(b.free_symbols());
    let ordering: Vec<String> = variables.into_iter().collect();
    Ok(truth_table(a, &ordering)? == truth_table(b, &ordering)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::logic::parse_expr as parse_logic;

    fn equiv(a: &str, b: &str) -> bool {
        equivalent(&parse_logic(a).unwrap(), &parse_logic(b).unwrap()).unwrap()
    }

    #[test]
    fn de_morgan_holds() {
        assert!(equiv("~A | ~B", "~(A & B)"));
        assert!(equiv("~A & ~B", "~(A | B)"));
    }

    #[test]
    fn xor_expands_to_its_definition() {
        assert!(equiv("(P & ~Q) | (Q & ~P)", "P ^ Q"));
    }

    #[test]
    fn double_negation_eliminates() {
        assert!(equiv("~~A", "A"));
        assert!(!equiv("~A", "A"));
    }

    #[test]
    fn implication_is_material() {
        assert!(equiv("P >> Q", "~P | Q"));
        assert!(!equiv("P >> Q", "Q >> P"));
    }

    #[test]
    fn biconditional_is_shared_truth() {
        assert!(equiv("P == Q", "(P >> Q) & (Q >> P)"));
    }

    #[test]
    fn constants_evaluate() {
        assert!(equiv("True", "not False"));
        assert!(equiv("P & True", "P"));
        assert!(!equiv("P | True", "P"));
    }

    #[test]
    fn extra_redundant_variables_are_tolerated() {
        assert!(equiv("A | (B & ~B)", "A"));
    }

    #[test]
    fn variable_cap_is_enforced() {
        let wide: Vec<String> = (0..MAX_VARIABLES + 1)
            .map(|i| format!("v{i}"))
            .collect();
        let expr = Expr::And(wide.iter().map(|n| Expr::symbol(n.clone())).collect());
        assert!(truth_table(&expr, &wide).is_err());
    }
}
