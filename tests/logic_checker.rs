//! Integration tests for the boolean logic checking pipeline.

use equality_checker::engine::{CheckOptions, CheckResult, Deadline, EqualityType, LogicChecker};

fn check(test: &str, target: &str) -> CheckResult {
    LogicChecker::new().check(test, target, &CheckOptions::default(), &Deadline::none())
}

fn assert_equal(test: &str, target: &str, tier: EqualityType) {
    let result = check(test, target);
    assert_eq!(
        result.equal,
        Some(true),
        "expected '{test}' == '{target}', got {result:?}"
    );
    assert_eq!(
        result.equality_type,
        Some(tier),
        "wrong tier for '{test}' vs '{target}'"
    );
}

#[test]
fn commutativity_is_exact() {
    assert_equal("Q & P", "P & Q", EqualityType::Exact);
    assert_equal("Q | P", "P | Q", EqualityType::Exact);
    assert_equal("Q ^ P", "P ^ Q", EqualityType::Exact);
}

#[test]
fn de_morgan_is_symbolic() {
    assert_equal("~(A & B)", "~A | ~B", EqualityType::Symbolic);
}

#[test]
fn xor_matches_its_expansion() {
    assert_equal("P ^ Q", "(P & ~Q) | (Q & ~P)", EqualityType::Symbolic);
}

#[test]
fn double_negation_is_symbolic() {
    assert_equal("~~A", "A", EqualityType::Symbolic);
}

#[test]
fn negation_is_not_identity() {
    let result = check("~A", "A");
    assert_eq!(result.equal, Some(false));
}

#[test]
fn truth_constants_compare() {
    let result = check("not False", "True");
    assert_eq!(result.equal, Some(true));
    // Depending on representation this is exact or symbolic; it must be one
    // of the two and never numeric.
    assert!(matches!(
        result.equality_type,
        Some(EqualityType::Exact) | Some(EqualityType::Symbolic)
    ));
}

#[test]
fn digits_act_as_truth_constants() {
    assert_equal("1", "True", EqualityType::Exact);
    assert_equal("not 0", "True", EqualityType::Symbolic);
}

#[test]
fn implication_and_material_form_agree() {
    assert_equal("~P | Q", "P >> Q", EqualityType::Symbolic);
}

#[test]
fn biconditional_matches_double_implication() {
    assert_equal("(P >> Q) & (Q >> P)", "P == Q", EqualityType::Symbolic);
}

#[test]
fn reflexivity_is_exact() {
    for expr in ["P & Q", "P >> (Q | ~R)", "P ^ Q ^ R", "A == B"] {
        assert_equal(expr, expr, EqualityType::Exact);
    }
}

#[test]
fn symbol_mismatch_is_not_equal_symbolic() {
    let result = check("A & B", "A & C");
    assert_eq!(result.equal, Some(false));
    assert_eq!(result.equality_type, Some(EqualityType::Symbolic));
    let mismatch = result.incorrect_symbols.expect("symbol breakdown");
    assert_eq!(mismatch.missing.as_deref(), Some("C"));
    assert_eq!(mismatch.extra.as_deref(), Some("B"));
}

#[test]
fn redundant_variables_pass_when_checking_is_off() {
    let checker = LogicChecker::new();
    let options = CheckOptions {
        check_symbols: false,
        ..Default::default()
    };
    let result = checker.check("A | (B & ~B)", "A", &options, &Deadline::none());
    assert_eq!(result.equal, Some(true));
    assert_eq!(result.equality_type, Some(EqualityType::Symbolic));
}

#[test]
fn empty_input_is_an_error() {
    let result = check("", "A");
    assert!(result.error.is_some());
    assert_eq!(result.equal, None);
}

#[test]
fn unsafe_characters_respect_the_asymmetry() {
    let fatal = check("A", "A + B");
    assert_eq!(fatal.code, Some(400));
    let syntax = check("A + B", "A");
    assert!(syntax.syntax_error);
    assert_eq!(syntax.code, None);
}

#[test]
fn malformed_formulae_are_syntax_errors() {
    let result = check("A &", "A");
    assert!(result.syntax_error);
    let fatal = check("A", "A &");
    assert_eq!(fatal.code, Some(400));
}

#[test]
fn unicode_connectives_normalise() {
    assert_equal("P ∧ Q", "P & Q", EqualityType::Exact);
    assert_equal("P ∨ Q", "P | Q", EqualityType::Exact);
    assert_equal("¬P", "~P", EqualityType::Exact);
    assert_equal("P ⊕ Q", "P ^ Q", EqualityType::Exact);
}

#[test]
fn memo_round_trip_keeps_the_tier() {
    let checker = LogicChecker::new();
    let options = CheckOptions::default();
    let first = checker.check("~(A & B)", "~A | ~B", &options, &Deadline::none());
    assert_eq!(first.equality_type, Some(EqualityType::Symbolic));
    let second = checker.check("~(A & B)", "~A | ~B", &options, &Deadline::none());
    assert_eq!(second.equal, Some(true));
    assert_eq!(second.equality_type, Some(EqualityType::Symbolic));
}
