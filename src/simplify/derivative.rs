//! Formal differentiation, used when derivative simplification is
//! enabled on a request.
//!
//! A `Derivative` node whose variable list names exactly one underlying
//! symbol is evaluated by the usual sum, product and chain rules. Free
//! symbols other than the variable behave as formal functions of it, so
//! `d/dx y` stays opaque as `Derivative(y, x)` while `d/dx cos(x)^2`
//! becomes `-2*sin(x)*cos(x)`.

use crate::ast::{Expr, Function};

/// Rewrite every maximal `Derivative` subtree that is with respect to a
/// single variable. Multi-variable derivatives are left untouched.
pub fn simplify_derivatives(expr: &Expr) -> Expr {
    let mut derivatives = Vec::new();
    expr.collect_subtrees(
        &|e| matches!(e, Expr::Func(Function::Derivative, _)),
        &mut derivatives,
    );
    let mut result = expr.clone();
    for derivative in derivatives {
        if let Some(evaluated) = evaluate_derivative(&derivative) {
            result = result.substitute(&derivative, &evaluated);
        }
    }
    result
}

fn evaluate_derivative(derivative: &Expr) -> Option<Expr> {
    let Expr::Func(Function::Derivative, args) = derivative else {
        return None;
    };
    let variables: Vec<&Expr> = args[1..].iter().collect();
    let mut names = std::collections::BTreeSet::new();
    for variable in &variables {
        names.extend(variable.free_symbols());
    }
    // Differentiating with respect to several distinct variables is left
    // alone entirely.
    if names.len() != 1 {
        return None;
    }
    let variable = names.into_iter().next().unwrap();
    let mut current = args[0].clone();
    for _ in 0..variables.len() {
        current = differentiate(&current, &variable);
    }
    if current == *derivative {
        None
    } else {
        Some(current)
    }
}

/// The formal derivative of `expr` with respect to `variable`.
pub fn differentiate(expr: &Expr, variable: &str) -> Expr {
    match expr {
        Expr::Integer(_)
        | Expr::Rational(_, _)
        | Expr::Float(_)
        | Expr::Constant(_)
        | Expr::Bool(_) => Expr::integer(0),
        Expr::Symbol(name) => {
            if name == variable {
                Expr::integer(1)
            } else {
                // A formal function of the variable: its derivative is an
                // opaque first-order derivative node.
                Expr::Func(
                    Function::Derivative,
                    vec![Expr::symbol(name.clone()), Expr::symbol(variable)],
                )
            }
        }
        Expr::Add(children) => {
            Expr::Add(children.iter().map(|c| differentiate(c, variable)).collect())
        }
        Expr::Mul(children) => {
            // Product rule over the whole factor list.
            let mut terms = Vec::with_capacity(children.len());
            for (index, child) in children.iter().enumerate() {
                let mut factors = vec![differentiate(child, variable)];
                for (other_index, other) in children.iter().enumerate() {
                    if other_index != index {
                        factors.push(other.clone());
                    }
                }
                terms.push(Expr::Mul(factors));
            }
            Expr::Add(terms)
        }
        Expr::Pow(base, exponent) => {
            if exponent.as_rational_literal().is_some() {
                // d(b^n) = n * b^(n-1) * b'
                let lowered = Expr::Add(vec![(**exponent).clone(), Expr::integer(-1)]);
                Expr::Mul(vec![
                    (**exponent).clone(),
                    Expr::pow((**base).clone(), lowered),
                    differentiate(base, variable),
                ])
            } else {
                // General case: b^e * (e' ln b + e b'/b)
                let log_term = Expr::Mul(vec![
                    differentiate(exponent, variable),
                    Expr::Func(Function::Log, vec![(**base).clone()]),
                ]);
                let ratio_term = Expr::Mul(vec![
                    (**exponent).clone(),
                    differentiate(base, variable),
                    Expr::pow((**base).clone(), Expr::integer(-1)),
                ]);
                Expr::Mul(vec![
                    expr.clone(),
                    Expr::Add(vec![log_term, ratio_term]),
                ])
            }
        }
        Expr::Func(Function::Derivative, args) => {
            // Differentiating a derivative appends the variable.
            let mut extended = args.clone();
            extended.push(Expr::symbol(variable));
            Expr::Func(Function::Derivative, extended)
        }
        Expr::Func(function, args) => {
            if *function == Function::Log && args.len() == 2 {
                // d log_b(u) = u' / (u ln b)
                return Expr::Mul(vec![
                    differentiate(&args[0], variable),
                    Expr::pow(args[0].clone(), Expr::integer(-1)),
                    Expr::pow(
                        Expr::Func(Function::Log, vec![args[1].clone()]),
                        Expr::integer(-1),
                    ),
                ]);
            }
            let argument = &args[0];
            let outer = match function_derivative(*function, argument) {
                Some(outer) => outer,
                None => {
                    // No closed form known: keep an opaque derivative.
                    return Expr::Func(
                        Function::Derivative,
                        vec![expr.clone(), Expr::symbol(variable)],
                    );
                }
            };
            Expr::Mul(vec![outer, differentiate(argument, variable)])
        }
        Expr::Eq(_, _)
        | Expr::Rel(_, _, _)
        | Expr::And(_)
        | Expr::Or(_)
        | Expr::Xor(_)
        | Expr::Not(_)
        | Expr::Implies(_, _) => Expr::Func(
            Function::Derivative,
            vec![expr.clone(), Expr::symbol(variable)],
        ),
    }
}

/// `d f(u) / d u` for the functions with a known closed form.
fn function_derivative(function: Function, u: &Expr) -> Option<Expr> {
    let u = u.clone();
    let call = |f: Function, arg: &Expr| Expr::Func(f, vec![arg.clone()]);
    Some(match function {
        Function::Sin => call(Function::Cos, &u),
        Function::Cos => Expr::neg(call(Function::Sin, &u)),
        Function::Tan => Expr::pow(call(Function::Sec, &u), Expr::integer(2)),
        Function::Cot => Expr::neg(Expr::pow(call(Function::Csc, &u), Expr::integer(2))),
        Function::Sec => Expr::Mul(vec![call(Function::Sec, &u), call(Function::Tan, &u)]),
        Function::Csc => Expr::neg(Expr::Mul(vec![
            call(Function::Csc, &u),
            call(Function::Cot, &u),
        ])),
        Function::Sinh => call(Function::Cosh, &u),
        Function::Cosh => call(Function::Sinh, &u),
        Function::Tanh => Expr::pow(call(Function::Sech, &u), Expr::integer(2)),
        Function::Exp => call(Function::Exp, &u),
        Function::Log => Expr::pow(u.clone(), Expr::integer(-1)),
        Function::Asin => Expr::pow(
            Expr::Add(vec![
                Expr::integer(1),
                Expr::neg(Expr::pow(u.clone(), Expr::integer(2))),
            ]),
            Expr::rational(-1, 2),
        ),
        Function::Acos => Expr::neg(Expr::pow(
            Expr::Add(vec![
                Expr::integer(1),
                Expr::neg(Expr::pow(u.clone(), Expr::integer(2))),
            ]),
            Expr::rational(-1, 2),
        )),
        Function::Atan => Expr::pow(
            Expr::Add(vec![Expr::integer(1), Expr::pow(u.clone(), Expr::integer(2))]),
            Expr::integer(-1),
        ),
        Function::Asinh => Expr::pow(
            Expr::Add(vec![Expr::integer(1), Expr::pow(u.clone(), Expr::integer(2))]),
            Expr::rational(-1, 2),
        ),
        Function::Atanh => Expr::pow(
            Expr::Add(vec![
                Expr::integer(1),
                Expr::neg(Expr::pow(u.clone(), Expr::integer(2))),
            ]),
            Expr::integer(-1),
        ),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::maths::{parse_expr as parse_maths, MathsContext};
    use crate::simplify::algebra::is_zero;

    fn parse(input: &str) -> Expr {
        parse_maths(input, &MathsContext::new()).unwrap()
    }

    fn same(a: &Expr, b: &Expr) -> bool {
        let difference = Expr::Add(vec![a.clone(), Expr::neg(b.clone())]);
        is_zero(&difference).unwrap()
    }

    #[test]
    fn polynomials_differentiate() {
        let d = differentiate(&parse("x**2 + 3*x"), "x");
        assert!(same(&d, &parse("2*x + 3")));
    }

    #[test]
    fn chain_rule_applies() {
        let d = differentiate(&parse("cos(x)**2"), "x");
        assert!(same(&d, &parse("-2*sin(x)*cos(x)")));
    }

    #[test]
    fn foreign_symbols_stay_formal() {
        let d = differentiate(&parse("y"), "x");
        assert_eq!(d, parse("Derivative(y, x)"));
    }

    #[test]
    fn simplify_rewrites_single_variable_derivatives() {
        let expr = parse("Derivative(x**2, x)");
        let simplified = simplify_derivatives(&expr);
        assert!(same(&simplified, &parse("2*x")));
    }

    #[test]
    fn opaque_derivatives_survive() {
        let expr = parse("Derivative(y, x)");
        assert_eq!(simplify_derivatives(&expr), expr);
    }

    #[test]
    fn second_derivatives_apply_twice() {
        let expr = parse("Derivative(x**3, x, x)");
        let simplified = simplify_derivatives(&expr);
        assert!(same(&simplified, &parse("6*x")));
    }

    #[test]
    fn exponential_differentiates_to_itself() {
        let d = differentiate(&parse("exp(x)"), "x");
        assert!(same(&d, &parse("exp(x)")));
    }
}
