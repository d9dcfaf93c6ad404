//! The canonical expression tree shared by the maths and logic pipelines.
//!
//! Trees are built by the parsers and never mutated; `canonical()` returns
//! a new tree with associative operators flattened and commutative children
//! sorted, which is what the exact matcher and the known-pair memo operate
//! on. Constructors never evaluate: `Add(2, 3)` stays `Add(2, 3)`.

use std::collections::BTreeSet;
use std::fmt;

use num::bigint::BigInt;
use num::rational::BigRational;
use num::{One, Signed, Zero};

/// A total-ordered wrapper for float atoms so the tree can be used as a
/// map key. Parsed literals are never NaN, so the bit-level ordering only
/// has to be deterministic, not numerically meaningful.
#[derive(Clone, Copy, Debug)]
pub struct Decimal(pub f64);

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::hash::Hash for Decimal {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// Named constants which only enter a tree via parse hints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Constant {
    /// The circle constant, positive real.
    Pi,
    /// Euler's number, positive real.
    E,
    /// The imaginary unit.
    I,
}

impl Constant {
    pub fn name(&self) -> &'static str {
        match self {
            Constant::Pi => "pi",
            Constant::E => "E",
            Constant::I => "I",
        }
    }
}

/// The closed set of named functions the parser recognises. Calls are
/// preserved verbatim in the tree and never folded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Csc,
    Sec,
    Cot,
    Asin,
    Acos,
    Atan,
    Acsc,
    Asec,
    Acot,
    Sinh,
    Cosh,
    Tanh,
    Csch,
    Sech,
    Coth,
    Asinh,
    Acosh,
    Atanh,
    Acsch,
    Asech,
    Acoth,
    Exp,
    /// `Log([x])` is the natural logarithm; `Log([x, b])` is base `b`.
    Log,
    Abs,
    Factorial,
    /// `Derivative([f, x, ...])`: derivand first, then one entry per
    /// differentiation variable (repeated for higher orders).
    Derivative,
}

impl Function {
    pub fn name(&self) -> &'static str {
        match self {
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Csc => "csc",
            Function::Sec => "sec",
            Function::Cot => "cot",
            Function::Asin => "asin",
            Function::Acos => "acos",
            Function::Atan => "atan",
            Function::Acsc => "acsc",
            Function::Asec => "asec",
            Function::Acot => "acot",
            Function::Sinh => "sinh",
            Function::Cosh => "cosh",
            Function::Tanh => "tanh",
            Function::Csch => "csch",
            Function::Sech => "sech",
            Function::Coth => "coth",
            Function::Asinh => "asinh",
            Function::Acosh => "acosh",
            Function::Atanh => "atanh",
            Function::Acsch => "acsch",
            Function::Asech => "asech",
            Function::Acoth => "acoth",
            Function::Exp => "exp",
            Function::Log => "log",
            Function::Abs => "Abs",
            Function::Factorial => "factorial",
            Function::Derivative => "Derivative",
        }
    }
}

/// Strict and non-strict inequality operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl RelOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            RelOp::Lt => "<",
            RelOp::Le => "<=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
        }
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, RelOp::Lt | RelOp::Gt)
    }
}

/// The expression tree. N-ary variants hold at least two children after
/// parsing; subtraction and division never appear (`a - b` is
/// `Add(a, Mul(-1, b))`, `a / b` is `Mul(a, Pow(b, -1))`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Expr {
    Integer(BigInt),
    /// Exact fraction, reduced, denominator positive.
    Rational(BigInt, BigInt),
    Float(Decimal),
    Symbol(String),
    Bool(bool),
    Constant(Constant),
    Add(Vec<Expr>),
    Mul(Vec<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Func(Function, Vec<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Rel(RelOp, Box<Expr>, Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Xor(Vec<Expr>),
    Not(Box<Expr>),
    Implies(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn integer(value: impl Into<BigInt>) -> Expr {
        Expr::Integer(value.into())
    }

    pub fn symbol(name: impl Into<String>) -> Expr {
        Expr::Symbol(name.into())
    }

    /// Reduced rational constructor; a denominator of one collapses to an
    /// integer atom.
    pub fn rational(numer: impl Into<BigInt>, denom: impl Into<BigInt>) -> Expr {
        let mut n = numer.into();
        let mut d = denom.into();
        if d.is_negative() {
            n = -n;
            d = -d;
        }
        let g = num::integer::gcd(n.abs(), d.clone());
        if !g.is_zero() {
            n /= &g;
            d /= &g;
        }
        if d.is_one() {
            Expr::Integer(n)
        } else {
            Expr::Rational(n, d)
        }
    }

    /// `-x` as the tree stores it.
    pub fn neg(expr: Expr) -> Expr {
        Expr::Mul(vec![Expr::integer(-1), expr])
    }

    /// `a / b` as the tree stores it. A literal numerator of one produces
    /// a bare `Pow(b, -1)` so `x*(1/y)` and `x/y` match exactly.
    pub fn div(numer: Expr, denom: Expr) -> Expr {
        let inverse = Expr::Pow(Box::new(denom), Box::new(Expr::integer(-1)));
        if numer == Expr::integer(1) {
            inverse
        } else {
            Expr::Mul(vec![numer, inverse])
        }
    }

    pub fn pow(base: Expr, exponent: Expr) -> Expr {
        Expr::Pow(Box::new(base), Box::new(exponent))
    }

    pub fn is_relation(&self) -> bool {
        matches!(self, Expr::Eq(_, _) | Expr::Rel(_, _, _))
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, Expr::Eq(_, _))
    }

    /// The exact value of this node when it is a numeric literal.
    pub fn as_rational_literal(&self) -> Option<BigRational> {
        match self {
            Expr::Integer(n) => Some(BigRational::from_integer(n.clone())),
            Expr::Rational(n, d) => Some(BigRational::new(n.clone(), d.clone())),
            Expr::Float(Decimal(f)) => BigRational::from_float(*f),
            _ => None,
        }
    }

    /// Canonical form: associative operators flattened, commutative
    /// children sorted by the total order on trees, nested `Derivative`
    /// variable lists flattened. Constants are never folded.
    pub fn canonical(&self) -> Expr {
        match self {
            Expr::Integer(_)
            | Expr::Rational(_, _)
            | Expr::Float(_)
            | Expr::Symbol(_)
            | Expr::Bool(_)
            | Expr::Constant(_) => self.clone(),
            Expr::Add(children) => {
                Expr::Add(flatten_sorted(children, |e| match e {
                    Expr::Add(inner) => Some(inner),
                    _ => None,
                }))
            }
            Expr::Mul(children) => {
                Expr::Mul(flatten_sorted(children, |e| match e {
                    Expr::Mul(inner) => Some(inner),
                    _ => None,
                }))
            }
            Expr::And(children) => {
                Expr::And(flatten_sorted(children, |e| match e {
                    Expr::And(inner) => Some(inner),
                    _ => None,
                }))
            }
            Expr::Or(children) => {
                Expr::Or(flatten_sorted(children, |e| match e {
                    Expr::Or(inner) => Some(inner),
                    _ => None,
                }))
            }
            Expr::Xor(children) => {
                Expr::Xor(flatten_sorted(children, |e| match e {
                    Expr::Xor(inner) => Some(inner),
                    _ => None,
                }))
            }
            Expr::Pow(base, exponent) => {
                Expr::pow(base.canonical(), exponent.canonical())
            }
            Expr::Func(Function::Derivative, args) => {
                let mut args: Vec<Expr> = args.iter().map(Expr::canonical).collect();
                // Derivative(Derivative(y, x), z) flattens to Derivative(y, x, z).
                while let Expr::Func(Function::Derivative, inner) = args[0].clone() {
                    let outer_vars: Vec<Expr> = args.drain(1..).collect();
                    args = inner;
                    args.extend(outer_vars);
                }
                Expr::Func(Function::Derivative, args)
            }
            Expr::Func(name, args) => {
                Expr::Func(*name, args.iter().map(Expr::canonical).collect())
            }
            Expr::Eq(lhs, rhs) => {
                let mut sides = [lhs.canonical(), rhs.canonical()];
                sides.sort();
                let [a, b] = sides;
                Expr::Eq(Box::new(a), Box::new(b))
            }
            Expr::Rel(op, lhs, rhs) => Expr::Rel(
                *op,
                Box::new(lhs.canonical()),
                Box::new(rhs.canonical()),
            ),
            Expr::Not(inner) => Expr::Not(Box::new(inner.canonical())),
            Expr::Implies(lhs, rhs) => Expr::Implies(
                Box::new(lhs.canonical()),
                Box::new(rhs.canonical()),
            ),
        }
    }

    /// Free symbol names, in sorted order.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Symbol(name) => {
                out.insert(name.clone());
            }
            Expr::Integer(_)
            | Expr::Rational(_, _)
            | Expr::Float(_)
            | Expr::Bool(_)
            | Expr::Constant(_) => {}
            Expr::Add(children)
            | Expr::Mul(children)
            | Expr::And(children)
            | Expr::Or(children)
            | Expr::Xor(children)
            | Expr::Func(_, children) => {
                for child in children {
                    child.collect_symbols(out);
                }
            }
            Expr::Pow(a, b) | Expr::Eq(a, b) | Expr::Rel(_, a, b) | Expr::Implies(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
            Expr::Not(inner) => inner.collect_symbols(out),
        }
    }

    /// Whether any subtree satisfies the predicate.
    pub fn any_subtree(&self, pred: &dyn Fn(&Expr) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Expr::Add(children)
            | Expr::Mul(children)
            | Expr::And(children)
            | Expr::Or(children)
            | Expr::Xor(children)
            | Expr::Func(_, children) => children.iter().any(|c| c.any_subtree(pred)),
            Expr::Pow(a, b) | Expr::Eq(a, b) | Expr::Rel(_, a, b) | Expr::Implies(a, b) => {
                a.any_subtree(pred) || b.any_subtree(pred)
            }
            Expr::Not(inner) => inner.any_subtree(pred),
            _ => false,
        }
    }

    pub fn has_derivative(&self) -> bool {
        self.any_subtree(&|e| matches!(e, Expr::Func(Function::Derivative, _)))
    }

    /// Collect every distinct subtree satisfying the predicate.
    pub fn collect_subtrees(&self, pred: &dyn Fn(&Expr) -> bool, out: &mut Vec<Expr>) {
        if pred(self) && !out.contains(self) {
            out.push(self.clone());
        }
        match self {
            Expr::Add(children)
            | Expr::Mul(children)
            | Expr::And(children)
            | Expr::Or(children)
            | Expr::Xor(children)
            | Expr::Func(_, children) => {
                for child in children {
                    child.collect_subtrees(pred, out);
                }
            }
            Expr::Pow(a, b) | Expr::Eq(a, b) | Expr::Rel(_, a, b) | Expr::Implies(a, b) => {
                a.collect_subtrees(pred, out);
                b.collect_subtrees(pred, out);
            }
            Expr::Not(inner) => inner.collect_subtrees(pred, out),
            _ => {}
        }
    }

    /// Structural substitution, replacing every occurrence of `from`.
    pub fn substitute(&self, from: &Expr, to: &Expr) -> Expr {
        if self == from {
            return to.clone();
        }
        match self {
            Expr::Add(c) => Expr::Add(c.iter().map(|e| e.substitute(from, to)).collect()),
            Expr::Mul(c) => Expr::Mul(c.iter().map(|e| e.substitute(from, to)).collect()),
            Expr::And(c) => Expr::And(c.iter().map(|e| e.substitute(from, to)).collect()),
            Expr::Or(c) => Expr::Or(c.iter().map(|e| e.substitute(from, to)).collect()),
            Expr::Xor(c) => Expr::Xor(c.iter().map(|e| e.substitute(from, to)).collect()),
            Expr::Func(name, c) => {
                Expr::Func(*name, c.iter().map(|e| e.substitute(from, to)).collect())
            }
            Expr::Pow(a, b) => Expr::pow(a.substitute(from, to), b.substitute(from, to)),
            Expr::Eq(a, b) => Expr::Eq(
                Box::new(a.substitute(from, to)),
                Box::new(b.substitute(from, to)),
            ),
            Expr::Rel(op, a, b) => Expr::Rel(
                *op,
                Box::new(a.substitute(from, to)),
                Box::new(b.substitute(from, to)),
            ),
            Expr::Not(inner) => Expr::Not(Box::new(inner.substitute(from, to))),
            Expr::Implies(a, b) => Expr::Implies(
                Box::new(a.substitute(from, to)),
                Box::new(b.substitute(from, to)),
            ),
            _ => self.clone(),
        }
    }
}

fn flatten_sorted(
    children: &[Expr],
    unwrap: fn(Expr) -> Option<Vec<Expr>>,
) -> Vec<Expr> {
    let mut flat = Vec::with_capacity(children.len());
    let mut stack: Vec<Expr> = children.iter().rev().map(Expr::canonical).collect();
    while let Some(child) = stack.pop() {
        match unwrap(child.clone()) {
            Some(inner) => stack.extend(inner.into_iter().rev()),
            None => flat.push(child),
        }
    }
    flat.sort();
    flat
}

/// User-facing symbol names: the `lambda` keyword defence is reversed.
pub fn display_symbol_name(name: &str) -> String {
    name.replace("lamda", "lambda").replace("Lamda", "Lambda")
}

// Rendering precedence levels, loosest first.
const PREC_REL: u8 = 0;
const PREC_ADD: u8 = 1;
const PREC_MUL: u8 = 2;
const PREC_POW: u8 = 3;
const PREC_ATOM: u8 = 4;

impl Expr {
    fn precedence(&self) -> u8 {
        match self {
            Expr::Eq(_, _) | Expr::Rel(_, _, _) | Expr::Implies(_, _) => PREC_REL,
            Expr::Add(_) | Expr::Or(_) => PREC_ADD,
            Expr::Xor(_) => PREC_ADD,
            Expr::Mul(children) => {
                // A leading -1 renders as unary minus, which binds like a sum.
                if children.first() == Some(&Expr::integer(-1)) {
                    PREC_ADD
                } else {
                    PREC_MUL
                }
            }
            Expr::And(_) => PREC_MUL,
            Expr::Pow(_, _) => PREC_POW,
            Expr::Integer(n) if n.is_negative() => PREC_ADD,
            Expr::Rational(_, _) => PREC_MUL,
            Expr::Not(_) => PREC_POW,
            _ => PREC_ATOM,
        }
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, min_prec: u8) -> fmt::Result {
        let needs_parens = self.precedence() < min_prec;
        if needs_parens {
            write!(f, "(")?;
        }
        match self {
            Expr::Integer(n) => write!(f, "{}", n)?,
            Expr::Rational(n, d) => write!(f, "{}/{}", n, d)?,
            Expr::Float(Decimal(v)) => {
                if v.fract() == 0.0 && v.abs() < 1e15 {
                    write!(f, "{:.1}", v)?
                } else {
                    write!(f, "{}", v)?
                }
            }
            Expr::Symbol(name) => write!(f, "{}", display_symbol_name(name))?,
            Expr::Bool(true) => write!(f, "True")?,
            Expr::Bool(false) => write!(f, "False")?,
            Expr::Constant(c) => write!(f, "{}", c.name())?,
            Expr::Add(children) => {
                for (index, child) in children.iter().enumerate() {
                    if index == 0 {
                        child.fmt_prec(f, PREC_ADD)?;
                        continue;
                    }
                    if let Some(positive) = negated_form(child) {
                        write!(f, " - ")?;
                        positive.fmt_prec(f, PREC_MUL)?;
                    } else {
                        write!(f, " + ")?;
                        child.fmt_prec(f, PREC_ADD + 1)?;
                    }
                }
            }
            Expr::Mul(children) => {
                if children.first() == Some(&Expr::integer(-1)) && children.len() > 1 {
                    write!(f, "-")?;
                    let rest = if children.len() == 2 {
                        children[1].clone()
                    } else {
                        Expr::Mul(children[1..].to_vec())
                    };
                    rest.fmt_prec(f, PREC_MUL)?;
                } else {
                    for (index, child) in children.iter().enumerate() {
                        if index > 0 {
                            write!(f, "*")?;
                        }
                        child.fmt_prec(f, PREC_MUL + 1)?;
                    }
                }
            }
            Expr::Pow(base, exponent) => {
                base.fmt_prec(f, PREC_POW + 1)?;
                write!(f, "**")?;
                exponent.fmt_prec(f, PREC_POW + 1)?;
            }
            Expr::Func(name, args) => {
                write!(f, "{}(", name.name())?;
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    arg.fmt_prec(f, PREC_REL)?;
                }
                write!(f, ")")?;
            }
            Expr::Eq(lhs, rhs) => {
                lhs.fmt_prec(f, PREC_ADD)?;
                write!(f, " == ")?;
                rhs.fmt_prec(f, PREC_ADD)?;
            }
            Expr::Rel(op, lhs, rhs) => {
                lhs.fmt_prec(f, PREC_ADD)?;
                write!(f, " {} ", op.symbol())?;
                rhs.fmt_prec(f, PREC_ADD)?;
            }
            Expr::And(children) => {
                for (index, child) in children.iter().enumerate() {
                    if index > 0 {
                        write!(f, " & ")?;
                    }
                    child.fmt_prec(f, PREC_MUL + 1)?;
                }
            }
            Expr::Or(children) => {
                for (index, child) in children.iter().enumerate() {
                    if index > 0 {
                        write!(f, " | ")?;
                    }
                    child.fmt_prec(f, PREC_ADD + 1)?;
                }
            }
            Expr::Xor(children) => {
                for (index, child) in children.iter().enumerate() {
                    if index > 0 {
                        write!(f, " ^ ")?;
                    }
                    child.fmt_prec(f, PREC_ADD + 1)?;
                }
            }
            Expr::Not(inner) => {
                write!(f, "~")?;
                inner.fmt_prec(f, PREC_ATOM)?;
            }
            Expr::Implies(lhs, rhs) => {
                lhs.fmt_prec(f, PREC_ADD)?;
                write!(f, " >> ")?;
                rhs.fmt_prec(f, PREC_ADD)?;
            }
        }
        if needs_parens {
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// If `expr` is a negated product or negative literal, return the positive
/// remainder for `a - b` style rendering.
fn negated_form(expr: &Expr) -> Option<Expr> {
    match expr {
        Expr::Mul(children) if children.first() == Some(&Expr::integer(-1)) => {
            Some(if children.len() == 2 {
                children[1].clone()
            } else {
                Expr::Mul(children[1..].to_vec())
            })
        }
        Expr::Integer(n) if n.is_negative() => Some(Expr::Integer(-n)),
        Expr::Rational(n, d) if n.is_negative() => Some(Expr::Rational(-n, d.clone())),
        _ => None,
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, PREC_REL)
    }
}
