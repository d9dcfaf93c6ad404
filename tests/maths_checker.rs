//! Integration tests for the maths checking pipeline, covering the
//! documented equality scenarios and boundary behaviour.

use equality_checker::engine::{CheckOptions, CheckResult, Deadline, EqualityType, MathsChecker};

fn check(test: &str, target: &str) -> CheckResult {
    MathsChecker::new().check(test, target, &CheckOptions::default(), &Deadline::none())
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

fn assert_not_equal(test: &str, target: &str) {
    let result = check(test, target);
    assert_eq!(
        result.equal,
        Some(false),
        "expected '{test}' != '{target}', got {result:?}"
    );
}

#[test]
fn reflexivity_is_exact() {
    for expr in [
        "x + 1",
        "sin(x)*cos(x)",
        "x**2 - 3*x/7 + sqrt(2)",
        "log(x, 10) + exp(y)",
    ] {
        assert_equal(expr, expr, EqualityType::Exact);
    }
}

#[test]
fn addition_order_is_exact() {
    assert_equal("1 + x", "x + 1", EqualityType::Exact);
}

#[test]
fn implicit_multiplication_matches_explicit() {
    assert_equal("xyz", "x * y * z", EqualityType::Exact);
}

#[test]
fn division_shapes_are_exact() {
    assert_equal("x*(1/y)", "x/y", EqualityType::Exact);
}

#[test]
fn cancelling_fractions_is_symbolic() {
    assert_equal("(2*x*y*x)/(2*x*y*y)", "x/y", EqualityType::Symbolic);
}

#[test]
fn bracket_expansion_is_symbolic() {
    assert_equal("(x+1)*(x+1)", "x^2+2*x+1", EqualityType::Symbolic);
    assert_not_equal("(x+1)*(x+2)", "x^2+2*x+1");
}

#[test]
fn log_base_forms_are_symbolic() {
    let result = check("log(x)/log(10)", "log(x, 10)");
    assert_eq!(result.equal, Some(true));
    assert_eq!(result.equality_type, Some(EqualityType::Symbolic));
}

#[test]
fn cos_of_negated_argument_is_symbolic() {
    assert_equal("cos(x)", "cos(-x)", EqualityType::Symbolic);
}

#[test]
fn mixed_trig_identity_is_symbolic() {
    assert_equal(
        "arcsin(x)+arccos(x)+arctan(x)+sin(x)^2+cos(x)^2+tan(x)",
        "1 + tan(x) + arcsin(x) + arccos(x) + arctan(x)",
        EqualityType::Symbolic,
    );
}

#[test]
fn sqrt_of_square_is_symbolic() {
    assert_equal("sqrt(x**2)", "x", EqualityType::Symbolic);
}

#[test]
fn no_evaluation_at_parse() {
    let result = check("2+3", "5");
    assert_eq!(result.equal, Some(true));
    assert_ne!(result.equality_type, Some(EqualityType::Exact));
}

#[test]
fn strict_and_non_strict_inequalities_differ() {
    let result = check("x^2 + x + 1 > 0", "x + 1 + x^2 >= 0");
    assert_eq!(result.equal, Some(false));
    assert_eq!(result.equality_type, Some(EqualityType::Exact));
}

#[test]
fn equations_match_side_by_side() {
    assert_equal("x**2 + x + 1 == 0", "x + 1 + x**2 == 0", EqualityType::Exact);
    assert_equal(
        "(x+1)*(x+1) == 0",
        "x^2 + 2*x + 1 == 0",
        EqualityType::Symbolic,
    );
}

#[test]
fn equations_match_across_sides() {
    assert_equal("x + 1 == y", "y == x + 1", EqualityType::Exact);
}

#[test]
fn reversed_inequalities_compare_by_side_role() {
    assert_equal("x**2 + x + 1 > 0", "0 < x + 1 + x**2", EqualityType::Exact);
}

#[test]
fn plus_minus_matches_itself_exactly() {
    assert_equal("a ± b", "a ± b", EqualityType::Exact);
}

#[test]
fn plus_minus_on_one_side_is_not_equal() {
    let result = check("a + b", "a ± b");
    assert_eq!(result.equal, Some(false));
    assert_eq!(result.equality_type, Some(EqualityType::Symbolic));
}

#[test]
fn symmetry_of_equality_decisions() {
    let pairs = [
        ("x + 1", "1 + x"),
        ("(x+1)*(x+1)", "x^2+2*x+1"),
        ("sin(x)", "cos(x)"),
        ("2+3", "5"),
    ];
    for (a, b) in pairs {
        let forward = check(a, b).equal;
        let backward = check(b, a).equal;
        assert_eq!(forward, backward, "asymmetry for '{a}' vs '{b}'");
    }
}

#[test]
fn extra_symbols_are_rejected_by_default() {
    let result = check("(y/y)*x", "x");
    assert_eq!(result.equal, Some(false));
    assert_eq!(result.equality_type, Some(EqualityType::Symbolic));
    let mismatch = result.incorrect_symbols.expect("symbol breakdown");
    assert_eq!(mismatch.extra.as_deref(), Some("y"));
}

#[test]
fn missing_symbols_are_reported() {
    let result = check("x", "x + z");
    let mismatch = result.incorrect_symbols.expect("symbol breakdown");
    assert_eq!(mismatch.missing.as_deref(), Some("z"));
}

#[test]
fn extra_symbols_are_sampled_when_checking_is_off() {
    let checker = MathsChecker::new();
    let options = CheckOptions {
        check_symbols: false,
        ..Default::default()
    };
    let result = checker.check("(y/y)*sin(x)", "sin(x)", &options, &Deadline::none());
    assert_eq!(result.equal, Some(true));
}

#[test]
fn compound_symbols_are_kept_whole() {
    let checker = MathsChecker::new();
    let options = CheckOptions {
        symbols: vec!["velocity".to_string()],
        ..Default::default()
    };
    let result = checker.check("velocity + 1", "1 + velocity", &options, &Deadline::none());
    assert_eq!(result.equal, Some(true));
    assert_eq!(result.equality_type, Some(EqualityType::Exact));
}

#[test]
fn natural_logarithm_hint_applies() {
    let checker = MathsChecker::new();
    let options = CheckOptions {
        hints: vec!["natural_logarithm".to_string()],
        ..Default::default()
    };
    let result = checker.check("ln(x)", "log(x)", &options, &Deadline::none());
    assert_eq!(result.equal, Some(true));
    assert_eq!(result.equality_type, Some(EqualityType::Exact));
}

#[test]
fn imaginary_hint_makes_i_squared_negative_one() {
    let checker = MathsChecker::new();
    let options = CheckOptions {
        hints: vec!["imaginary_i".to_string()],
        check_symbols: false,
        ..Default::default()
    };
    let result = checker.check("i*i", "-1", &options, &Deadline::none());
    assert_eq!(result.equal, Some(true));
}

#[test]
fn empty_input_yields_error_without_equal() {
    let result = check("", "x + 1");
    assert!(result.error.is_some());
    assert_eq!(result.equal, None);
    assert_eq!(result.equality_type, None);
}

#[test]
fn unsafe_target_is_fatal_for_the_question() {
    let result = check("x", "x + #");
    assert_eq!(result.code, Some(400));
    assert!(result.error.is_some());
    assert!(!result.syntax_error);
}

#[test]
fn unsafe_test_is_a_user_syntax_error() {
    let result = check("x + #", "x");
    assert!(result.syntax_error);
    assert_eq!(result.code, None);
}

#[test]
fn malformed_test_is_a_syntax_error() {
    let result = check("sin(x", "x");
    assert!(result.syntax_error);
    assert_eq!(
        result.error.as_deref(),
        Some("Parsing Test Expression Failed!")
    );
}

#[test]
fn oversized_factorial_errors_on_either_side() {
    let target_side = check("x", "factorial(51)");
    assert!(target_side.error.is_some());
    assert_eq!(target_side.code, Some(400));

    let test_side = check("factorial(51)", "x");
    assert!(test_side.error.is_some());
    assert!(test_side.syntax_error);
}

#[test]
fn wildly_ranging_targets_give_a_range_error() {
    let result = check("1/x", "1/x**20");
    let error = result.error.expect("expected numeric range error");
    assert!(error.contains("Too Large Range"), "got '{error}'");
    assert_eq!(result.equal, None);
}

#[test]
fn complex_fallback_accepts_partially_defined_functions() {
    // ln(x**2 - 1) is undefined on [0,1), but both spellings agree once
    // the sampler retries on the complex plane.
    assert_equal(
        "ln(x - 1) + ln(x + 1)",
        "ln(x**2 - 1)",
        EqualityType::Numeric,
    );
}

#[test]
fn nested_derivative_lists_flatten_to_exact() {
    assert_equal(
        "Derivative(Derivative(y, x), x)",
        "Derivative(y, x, x)",
        EqualityType::Exact,
    );
}

#[test]
fn derivatives_commute_inside_sums() {
    assert_equal(
        "Derivative(z, x) + Derivative(y, x)",
        "Derivative(y, x) + Derivative(z, x)",
        EqualityType::Exact,
    );
}

#[test]
fn derivative_coefficients_cancel_symbolically() {
    assert_equal(
        "2 * Derivative(y, x) / 2",
        "Derivative(y, x)",
        EqualityType::Symbolic,
    );
}

#[test]
fn derivative_simplification_evaluates_when_enabled() {
    let checker = MathsChecker::new();
    let options = CheckOptions {
        simplify_derivatives: true,
        ..Default::default()
    };
    let result = checker.check(
        "-2*sin(x)*cos(x)",
        "Derivative(cos(x)**2, x)",
        &options,
        &Deadline::none(),
    );
    assert_eq!(result.equal, Some(true));
    assert_eq!(result.equality_type, Some(EqualityType::Symbolic));

    let disabled = checker.check(
        "-2*sin(x)*cos(x)",
        "Derivative(cos(x)**2, x)",
        &CheckOptions::default(),
        &Deadline::none(),
    );
    assert_eq!(disabled.equal, Some(false));
}

#[test]
fn memo_preserves_the_original_tier() {
    let checker = MathsChecker::new();
    let options = CheckOptions::default();
    let first = checker.check("(x+1)*(x+1)", "x^2+2*x+1", &options, &Deadline::none());
    let second = checker.check("(x+1)*(x+1)", "x^2+2*x+1", &options, &Deadline::none());
    assert_eq!(first.equality_type, second.equality_type);
    assert_eq!(second.equal, Some(true));
}

#[test]
fn sanitised_strings_are_echoed_back() {
    let result = check("1 + x", "x + 1");
    assert_eq!(result.target.as_deref(), Some("x + 1"));
    assert_eq!(result.test.as_deref(), Some("1 + x"));
    assert!(result.parsed_target.is_some());
    assert!(result.parsed_test.is_some());
}

#[test]
fn keywords_parse_as_plain_symbols() {
    // `true` is four separate symbols in maths mode, so both sides split
    // the same way and compare equal.
    assert_equal("true", "t*r*u*e", EqualityType::Exact);
}
