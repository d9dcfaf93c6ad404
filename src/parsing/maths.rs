//! The maths-mode tokeniser and parser.
//!
//! Input must already have passed through [`super::sanitize`]. The token
//! stream then goes through three rewriting passes modelled on the
//! transformation pipeline of the original checker: symbol splitting,
//! function exponentiation (`sin^2(x)` -> `sin(x)**2`), and implicit
//! multiplication. Parsing is recursive descent with a shared cursor and
//! builds trees without any evaluation or identity collapsing.

use std::collections::{BTreeSet, HashMap};

use num::bigint::BigInt;
use num::{BigRational, FromPrimitive};

use crate::ast::{Constant, Decimal, Expr, Function, RelOp};
use crate::errors::CheckError;

/// Per-request parser configuration: user-registered symbols and parse
/// hints. User symbols are never split by implicit multiplication.
#[derive(Debug, Clone, Default)]
pub struct MathsContext {
    user_symbols: BTreeSet<String>,
    constants: HashMap<String, Constant>,
    natural_log: bool,
}

impl MathsContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register multi-character identifiers that must stay whole.
    /// Invalid names (empty, bad characters, leading underscore) are
    /// silently dropped, matching the lenient behaviour of the original.
    pub fn with_symbols(mut self, symbols: &[String]) -> Self {
        for raw in symbols {
            let name = raw.trim();
            if is_valid_symbol(name) {
                self.user_symbols.insert(name.to_string());
            }
        }
        self
    }

    /// Apply parse hints; unknown hint names are ignored.
    pub fn with_hints(mut self, hints: &[String]) -> Self {
        for hint in hints {
            match hint.as_str() {
                "constant_pi" => {
                    self.constants.insert("pi".into(), Constant::Pi);
                }
                "constant_e" => {
                    self.constants.insert("e".into(), Constant::E);
                }
                "imaginary_i" => {
                    self.constants.insert("i".into(), Constant::I);
                }
                "imaginary_j" => {
                    self.constants.insert("j".into(), Constant::I);
                }
                "natural_logarithm" => {
                    self.natural_log = true;
                }
                _ => {}
            }
        }
        self
    }

    fn is_registered(&self, name: &str) -> bool {
        self.user_symbols.contains(name) || self.constants.contains_key(name)
    }
}

/// Test whether a string can be a valid symbol: only word characters, and
/// metasymbols starting with an underscore are blacklisted.
pub fn is_valid_symbol(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('_')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The global function table, including every accepted alias spelling.
fn lookup_function(name: &str) -> Option<Function> {
    let function = match name {
        "sin" | "Sin" => Function::Sin,
        "cos" | "Cos" => Function::Cos,
        "tan" | "Tan" => Function::Tan,
        "cosec" | "Csc" => Function::Csc,
        "sec" | "Sec" => Function::Sec,
        "cot" | "Cot" => Function::Cot,
        "arcsin" | "asin" | "ArcSin" => Function::Asin,
        "arccos" | "acos" | "ArcCos" => Function::Acos,
        "arctan" | "atan" | "ArcTan" => Function::Atan,
        "arccosec" | "acsc" | "ArcCsc" => Function::Acsc,
        "arcsec" | "asec" | "ArcSec" => Function::Asec,
        "arccot" | "acot" | "ArcCot" => Function::Acot,
        "sinh" => Function::Sinh,
        "cosh" => Function::Cosh,
        "tanh" => Function::Tanh,
        "cosech" => Function::Csch,
        "sech" => Function::Sech,
        "coth" => Function::Coth,
        "arcsinh" | "arsinh" | "asinh" => Function::Asinh,
        "arccosh" | "arcosh" | "acosh" => Function::Acosh,
        "arctanh" | "artanh" | "atanh" => Function::Atanh,
        "arccosech" | "arcsch" | "acsch" => Function::Acsch,
        "arcsech" | "arsech" | "asech" => Function::Asech,
        "arccoth" | "arcoth" | "acoth" => Function::Acoth,
        "exp" | "Exp" => Function::Exp,
        "log" | "Log" => Function::Log,
        "ln" | "Ln" => Function::Log,
        "factorial" | "Factorial" => Function::Factorial,
        "abs" => Function::Abs,
        "Derivative" | "diff" => Function::Derivative,
        _ => return None,
    };
    Some(function)
}

/// Does this spelling denote the natural logarithm regardless of hints?
fn is_ln_spelling(name: &str) -> bool {
    matches!(name, "ln" | "Ln")
}

fn is_sqrt_spelling(name: &str) -> bool {
    matches!(name, "sqrt" | "Sqrt")
}

/// Greek letter names are never split into single-character symbols.
fn is_greek_name(name: &str) -> bool {
    matches!(
        name,
        "alpha" | "beta" | "gamma" | "delta" | "epsilon" | "zeta" | "eta" | "theta"
            | "iota" | "kappa" | "lamda" | "mu" | "nu" | "xi" | "omicron" | "pi"
            | "rho" | "sigma" | "tau" | "upsilon" | "phi" | "chi" | "psi" | "omega"
            | "Alpha" | "Beta" | "Gamma" | "Delta" | "Epsilon" | "Zeta" | "Eta"
            | "Theta" | "Iota" | "Kappa" | "Lamda" | "Mu" | "Nu" | "Xi" | "Omicron"
            | "Pi" | "Rho" | "Sigma" | "Tau" | "Upsilon" | "Phi" | "Chi" | "Psi"
            | "Omega"
    )
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Int(BigInt),
    Float(f64),
    Name(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Comma,
    LParen,
    RParen,
    EqEq,
    Lt,
    Le,
    Gt,
    Ge,
}

fn tokenize(input: &str) -> Result<Vec<Tok>, CheckError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < chars.len() {
        let c = chars[pos];
        if c.is_whitespace() {
            pos += 1;
            continue;
        }
        if c.is_ascii_digit() || c == '.' {
            let start = pos;
            let mut seen_dot = false;
            while pos < chars.len()
                && (chars[pos].is_ascii_digit() || (chars[pos] == '.' && !seen_dot))
            {
                if chars[pos] == '.' {
                    seen_dot = true;
                }
                pos += 1;
            }
            let text: String = chars[start..pos].iter().collect();
            if text == "." {
                return Err(CheckError::Parse("Lone decimal point".into()));
            }
            if seen_dot {
                let value: f64 = text
                    .parse()
                    .map_err(|_| CheckError::Parse(format!("Bad number '{text}'")))?;
                tokens.push(Tok::Float(value));
            } else {
                let value = text
                    .parse::<BigInt>()
                    .map_err(|_| CheckError::Parse(format!("Bad number '{text}'")))?;
                tokens.push(Tok::Int(value));
            }
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len()
                && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_')
            {
                pos += 1;
            }
            tokens.push(Tok::Name(chars[start..pos].iter().collect()));
            continue;
        }
        pos += 1;
        match c {
            '+' => tokens.push(Tok::Plus),
            '-' => tokens.push(Tok::Minus),
            '*' => {
                if chars.get(pos) == Some(&'*') {
                    pos += 1;
                    tokens.push(Tok::Caret);
                } else {
                    tokens.push(Tok::Star);
                }
            }
            '/' => tokens.push(Tok::Slash),
            // Caret always means exponentiation in maths mode.
            '^' => tokens.push(Tok::Caret),
            ',' => tokens.push(Tok::Comma),
            '(' => tokens.push(Tok::LParen),
            ')' => tokens.push(Tok::RParen),
            '=' => {
                if chars.get(pos) == Some(&'=') {
                    pos += 1;
                }
                tokens.push(Tok::EqEq);
            }
            '<' => {
                if chars.get(pos) == Some(&'=') {
                    pos += 1;
                    tokens.push(Tok::Le);
                } else {
                    tokens.push(Tok::Lt);
                }
            }
            '>' => {
                if chars.get(pos) == Some(&'=') {
                    pos += 1;
                    tokens.push(Tok::Ge);
                } else {
                    tokens.push(Tok::Gt);
                }
            }
            other => {
                return Err(CheckError::Parse(format!(
                    "Unexpected character '{other}'"
                )))
            }
        }
    }
    Ok(tokens)
}

/// Split unregistered multi-character identifiers into single-letter
/// symbols, so `xyz` can later become `x*y*z`. Names containing digits or
/// underscores, Greek names, user symbols, and global names stay whole.
fn split_symbols(tokens: Vec<Tok>, ctx: &MathsContext) -> Vec<Tok> {
    let mut result = Vec::with_capacity(tokens.len());
    for tok in tokens {
        match &tok {
            Tok::Name(name)
                if name.len() > 1
                    && !ctx.is_registered(name)
                    && lookup_function(name).is_none()
                    && !is_sqrt_spelling(name)
                    && name != "Eq"
                    && !is_greek_name(name)
                    && name.chars().all(|c| c.is_ascii_alphabetic()) =>
            {
                for c in name.chars() {
                    result.push(Tok::Name(c.to_string()));
                }
            }
            _ => result.push(tok),
        }
    }
    result
}

/// Rewrite `f ^ n ( args )` into `f ( args ) ^ n` so that `sin^2(x)` parses
/// as `(sin(x))**2`. Runs before implicit multiplication so no stray `*`
/// lands between the exponent and the argument list.
fn function_exponentiation(tokens: Vec<Tok>, ctx: &MathsContext) -> Vec<Tok> {
    let mut result: Vec<Tok> = Vec::with_capacity(tokens.len());
    let mut index = 0;
    while index < tokens.len() {
        let is_function = matches!(&tokens[index], Tok::Name(name)
            if (lookup_function(name).is_some() || is_sqrt_spelling(name))
                && !ctx.is_registered(name));
        if is_function && tokens.get(index + 1) == Some(&Tok::Caret) {
            // Exponent: optional sign, then a single number or name.
            let mut cursor = index + 2;
            let mut exponent = Vec::new();
            if matches!(tokens.get(cursor), Some(Tok::Minus) | Some(Tok::Plus)) {
                exponent.push(tokens[cursor].clone());
                cursor += 1;
            }
            if matches!(
                tokens.get(cursor),
                Some(Tok::Int(_)) | Some(Tok::Float(_)) | Some(Tok::Name(_))
            ) {
                exponent.push(tokens[cursor].clone());
                cursor += 1;
            } else {
                result.push(tokens[index].clone());
                index += 1;
                continue;
            }
            if tokens.get(cursor) != Some(&Tok::LParen) {
                result.push(tokens[index].clone());
                index += 1;
                continue;
            }
            // Find the matching close paren of the argument list.
            let open = cursor;
            let mut depth = 0;
            let mut close = None;
            for (offset, tok) in tokens[open..].iter().enumerate() {
                match tok {
                    Tok::LParen => depth += 1,
                    Tok::RParen => {
                        depth -= 1;
                        if depth == 0 {
                            close = Some(open + offset);
                            break;
                        }
                    }
                    _ => {}
                }
            }
            if let Some(close) = close {
                result.push(tokens[index].clone());
                result.extend(tokens[open..=close].iter().cloned());
                result.push(Tok::Caret);
                result.extend(exponent);
                index = close + 1;
                continue;
            }
        }
        result.push(tokens[index].clone());
        index += 1;
    }
    result
}

/// Insert `*` between adjacent factors: `2x`, `2(`, `x y`, `x(`, `)(`,
/// `)x`. A function name directly before `(` is a call, not a product.
fn implicit_multiplication(tokens: Vec<Tok>, ctx: &MathsContext) -> Vec<Tok> {
    let mut result: Vec<Tok> = Vec::with_capacity(tokens.len() * 2);
    for tok in tokens {
        if let Some(prev) = result.last() {
            let prev_is_function = matches!(prev, Tok::Name(name)
                if !ctx.is_registered(name)
                    && (lookup_function(name).is_some()
                        || is_sqrt_spelling(name)
                        || name == "Eq"));
            let prev_is_value = matches!(prev, Tok::Int(_) | Tok::Float(_) | Tok::RParen)
                || (matches!(prev, Tok::Name(_)) && !prev_is_function);
            let next_starts_factor = matches!(tok, Tok::Name(_) | Tok::LParen);
            if prev_is_value && next_starts_factor {
                result.push(Tok::Star);
            }
        }
        result.push(tok);
    }
    result
}

struct Parser<'a> {
    tokens: Vec<Tok>,
    pos: usize,
    ctx: &'a MathsContext,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Tok, context: &str) -> Result<(), CheckError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(CheckError::Parse(format!(
                "Expected '{expected:?}' {context}"
            )))
        }
    }

    fn parse_relation(&mut self) -> Result<Expr, CheckError> {
        let lhs = self.parse_sum()?;
        let op = match self.peek() {
            Some(Tok::EqEq) => None,
            Some(Tok::Lt) => Some(RelOp::Lt),
            Some(Tok::Le) => Some(RelOp::Le),
            Some(Tok::Gt) => Some(RelOp::Gt),
            Some(Tok::Ge) => Some(RelOp::Ge),
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.parse_sum()?;
        if matches!(
            self.peek(),
            Some(Tok::EqEq) | Some(Tok::Lt) | Some(Tok::Le) | Some(Tok::Gt) | Some(Tok::Ge)
        ) {
            return Err(CheckError::Parse(
                "Cannot parse nested inequalities!".into(),
            ));
        }
        Ok(match op {
            None => Expr::Eq(Box::new(lhs), Box::new(rhs)),
            Some(op) => Expr::Rel(op, Box::new(lhs), Box::new(rhs)),
        })
    }

    fn parse_sum(&mut self) -> Result<Expr, CheckError> {
        let mut terms = vec![self.parse_product()?];
        loop {
            match self.peek() {
                Some(Tok::Plus) => {
                    self.pos += 1;
                    terms.push(self.parse_product()?);
                }
                Some(Tok::Minus) => {
                    self.pos += 1;
                    terms.push(Expr::neg(self.parse_product()?));
                }
                _ => break,
            }
        }
        Ok(if terms.len() == 1 {
            terms.pop().unwrap()
        } else {
            Expr::Add(terms)
        })
    }

    fn parse_product(&mut self) -> Result<Expr, CheckError> {
        let first = self.parse_unary()?;
        let mut factors = vec![first];
        let mut divided_once = false;
        loop {
            match self.peek() {
                Some(Tok::Star) => {
                    self.pos += 1;
                    factors.push(self.parse_unary()?);
                    divided_once = false;
                }
                Some(Tok::Slash) => {
                    self.pos += 1;
                    let denom = self.parse_unary()?;
                    factors.push(Expr::pow(denom, Expr::integer(-1)));
                    divided_once = factors.len() == 2;
                }
                _ => break,
            }
        }
        // `1/y` is a bare negative power, so `x*(1/y)` matches `x/y`.
        if divided_once && factors.len() == 2 && factors[0] == Expr::integer(1) {
            return Ok(factors.pop().unwrap());
        }
        Ok(if factors.len() == 1 {
            factors.pop().unwrap()
        } else {
            Expr::Mul(factors)
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, CheckError> {
        match self.peek() {
            Some(Tok::Plus) => {
                self.pos += 1;
                self.parse_unary()
            }
            Some(Tok::Minus) => {
                self.pos += 1;
                Ok(Expr::neg(self.parse_unary()?))
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Expr, CheckError> {
        let base = self.parse_atom()?;
        if self.peek() == Some(&Tok::Caret) {
            self.pos += 1;
            // Right-associative, and the exponent may carry a sign.
            let exponent = self.parse_unary()?;
            return Ok(Expr::pow(base, exponent));
        }
        Ok(base)
    }

    fn parse_atom(&mut self) -> Result<Expr, CheckError> {
        match self.advance() {
            Some(Tok::Int(value)) => Ok(Expr::Integer(value)),
            Some(Tok::Float(value)) => Ok(Expr::Float(Decimal(value))),
            Some(Tok::LParen) => {
                let inner = self.parse_relation()?;
                self.expect(&Tok::RParen, "to close bracket")?;
                Ok(inner)
            }
            Some(Tok::Name(name)) => self.parse_name(name),
            Some(other) => Err(CheckError::Parse(format!(
                "Unexpected token {other:?}"
            ))),
            None => Err(CheckError::Parse("Unexpected end of expression".into())),
        }
    }

    fn parse_name(&mut self, name: String) -> Result<Expr, CheckError> {
        // Local dictionary first: user symbols, then hinted constants.
        if self.ctx.user_symbols.contains(&name) {
            return Ok(Expr::Symbol(name));
        }
        if let Some(constant) = self.ctx.constants.get(&name) {
            return Ok(Expr::Constant(*constant));
        }
        if name == "Eq" && self.peek() == Some(&Tok::LParen) {
            let args = self.parse_call_args(&name)?;
            if args.len() != 2 {
                return Err(CheckError::Parse("Eq takes exactly two arguments".into()));
            }
            let mut args = args;
            let rhs = args.pop().unwrap();
            let lhs = args.pop().unwrap();
            return Ok(Expr::Eq(Box::new(lhs), Box::new(rhs)));
        }
        if is_sqrt_spelling(&name) {
            let args = self.parse_call_args(&name)?;
            if args.len() != 1 {
                return Err(CheckError::Parse("sqrt takes exactly one argument".into()));
            }
            return Ok(Expr::pow(
                args.into_iter().next().unwrap(),
                Expr::rational(1, 2),
            ));
        }
        if let Some(function) = lookup_function(&name) {
            if self.peek() != Some(&Tok::LParen) {
                return Err(CheckError::Parse(format!(
                    "Function '{name}' used without arguments"
                )));
            }
            let args = self.parse_call_args(&name)?;
            return self.build_call(function, &name, args);
        }
        // Aggressive auto-symbol: anything else is a symbol, except the
        // reserved metasymbol namespace.
        if name.starts_with('_') {
            return Err(CheckError::Parse(format!(
                "Invalid symbol name '{name}'"
            )));
        }
        Ok(Expr::Symbol(name))
    }

    fn parse_call_args(&mut self, name: &str) -> Result<Vec<Expr>, CheckError> {
        self.expect(&Tok::LParen, &format!("after function '{name}'"))?;
        let mut args = Vec::new();
        if self.peek() == Some(&Tok::RParen) {
            return Err(CheckError::Parse(format!(
                "Function '{name}' called with no arguments"
            )));
        }
        loop {
            args.push(self.parse_relation()?);
            match self.advance() {
                Some(Tok::Comma) => continue,
                Some(Tok::RParen) => break,
                _ => {
                    return Err(CheckError::Parse(format!(
                        "Unclosed argument list for '{name}'"
                    )))
                }
            }
        }
        Ok(args)
    }

    fn build_call(
        &mut self,
        function: Function,
        name: &str,
        args: Vec<Expr>,
    ) -> Result<Expr, CheckError> {
        match function {
            Function::Log => {
                if is_ln_spelling(name) {
                    if args.len() != 1 {
                        return Err(CheckError::Parse(
                            "ln takes exactly one argument".into(),
                        ));
                    }
                    return Ok(Expr::Func(Function::Log, args));
                }
                match args.len() {
                    1 => {
                        let mut args = args;
                        if !self.ctx.natural_log {
                            args.push(Expr::integer(10));
                        }
                        Ok(Expr::Func(Function::Log, args))
                    }
                    2 => Ok(Expr::Func(Function::Log, args)),
                    _ => Err(CheckError::Parse(
                        "log takes one or two arguments".into(),
                    )),
                }
            }
            Function::Derivative => {
                if args.len() < 2 {
                    return Err(CheckError::Parse(
                        "Derivative needs an expression and at least one variable".into(),
                    ));
                }
                Ok(Expr::Func(Function::Derivative, args))
            }
            Function::Factorial => {
                if args.len() != 1 {
                    return Err(CheckError::Parse(
                        "factorial takes exactly one argument".into(),
                    ));
                }
                if let Some(value) = args[0].as_rational_literal() {
                    if value > BigRational::from_i64(50).unwrap() {
                        return Err(CheckError::FactorialTooLarge);
                    }
                }
                Ok(Expr::Func(Function::Factorial, args))
            }
            other => {
                if args.len() != 1 {
                    return Err(CheckError::Parse(format!(
                        "Function '{name}' takes exactly one argument"
                    )));
                }
                Ok(Expr::Func(other, args))
            }
        }
    }
}

/// Parse a sanitised maths string into an expression tree. Fails with
/// `ParseError` for malformed input; never evaluates arithmetic.
pub fn parse_expr(sanitized: &str, ctx: &MathsContext) -> Result<Expr, CheckError> {
    let tokens = tokenize(sanitized)?;
    if tokens.is_empty() {
        return Err(CheckError::Parse("Nothing to parse".into()));
    }
    let tokens = split_symbols(tokens, ctx);
    let tokens = function_exponentiation(tokens, ctx);
    let tokens = implicit_multiplication(tokens, ctx);
    let mut parser = Parser {
        tokens,
        pos: 0,
        ctx,
    };
    let expr = parser.parse_relation()?;
    if parser.pos != parser.tokens.len() {
        return Err(CheckError::Parse(format!(
            "Unexpected trailing tokens at position {}",
            parser.pos
        )));
    }
    Ok(expr)
}
