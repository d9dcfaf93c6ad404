//! The logic-mode tokeniser and parser.
//!
//! Boolean formulae use `&`, `|`, `~`, `^` (XOR), `>>` (implication) and
//! `==` (biconditional), the word operators `and`/`or`/`not`, the
//! constants `True`/`False` (also `1`/`0`), and callable forms such as
//! `Xor(P, Q)`. Single-letter symbols only; adjacent symbols are a parse
//! error since logic mode has no implicit operator.

use crate::ast::Expr;
use crate::errors::CheckError;

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Name(String),
    Bool(bool),
    And,
    Or,
    Not,
    Xor,
    Implies,
    Iff,
    AndWord,
    OrWord,
    NotWord,
    LParen,
    RParen,
    Comma,
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
        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len()
                && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_')
            {
                pos += 1;
            }
            let name: String = chars[start..pos].iter().collect();
            tokens.push(match name.as_str() {
                "and" => Tok::AndWord,
                "or" => Tok::OrWord,
                "not" => Tok::NotWord,
                "True" => Tok::Bool(true),
                "False" => Tok::Bool(false),
                _ => Tok::Name(name),
            });
            continue;
        }
        pos += 1;
        match c {
            '0' => tokens.push(Tok::Bool(false)),
            '1' => tokens.push(Tok::Bool(true)),
            '&' => tokens.push(Tok::And),
            '|' => tokens.push(Tok::Or),
            '~' => tokens.push(Tok::Not),
            '^' => tokens.push(Tok::Xor),
            '(' => tokens.push(Tok::LParen),
            ')' => tokens.push(Tok::RParen),
            ',' => tokens.push(Tok::Comma),
            '>' => {
                if chars.get(pos) == Some(&'>') {
                    pos += 1;
                    tokens.push(Tok::Implies);
                } else {
                    return Err(CheckError::Parse("Lone '>' in logic input".into()));
                }
            }
            '=' => {
                if chars.get(pos) == Some(&'=') {
                    pos += 1;
                }
                tokens.push(Tok::Iff);
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

struct Parser {
    tokens: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    // Precedence ladder, loosest first: or, and, not, ==, |, ^, &, >>, ~.

    fn parse_or_word(&mut self) -> Result<Expr, CheckError> {
        let first = self.parse_and_word()?;
        let mut children = vec![first];
        while self.peek() == Some(&Tok::OrWord) {
            self.pos += 1;
            children.push(self.parse_and_word()?);
        }
        Ok(nary(Expr::Or, children))
    }

    fn parse_and_word(&mut self) -> Result<Expr, CheckError> {
        let first = self.parse_not_word()?;
        let mut children = vec![first];
        while self.peek() == Some(&Tok::AndWord) {
            self.pos += 1;
            children.push(self.parse_not_word()?);
        }
        Ok(nary(Expr::And, children))
    }

    fn parse_not_word(&mut self) -> Result<Expr, CheckError> {
        if self.peek() == Some(&Tok::NotWord) {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.parse_not_word()?)));
        }
        self.parse_iff()
    }

    fn parse_iff(&mut self) -> Result<Expr, CheckError> {
        let lhs = self.parse_pipe()?;
        if self.peek() != Some(&Tok::Iff) {
            return Ok(lhs);
        }
        self.pos += 1;
        let rhs = self.parse_pipe()?;
        if self.peek() == Some(&Tok::Iff) {
            return Err(CheckError::Parse(
                "Cannot parse chained equivalences!".into(),
            ));
        }
        Ok(Expr::Eq(Box::new(lhs), Box::new(rhs)))
    }

    fn parse_pipe(&mut self) -> Result<Expr, CheckError> {
        let first = self.parse_xor()?;
        let mut children = vec![first];
        while self.peek() == Some(&Tok::Or) {
            self.pos += 1;
            children.push(self.parse_xor()?);
        }
        Ok(nary(Expr::Or, children))
    }

    fn parse_xor(&mut self) -> Result<Expr, CheckError> {
        let first = self.parse_amp()?;
        let mut children = vec![first];
        while self.peek() == Some(&Tok::Xor) {
            self.pos += 1;
            children.push(self.parse_amp()?);
        }
        Ok(nary(Expr::Xor, children))
    }

    fn parse_amp(&mut self) -> Result<Expr, CheckError> {
        let first = self.parse_implies()?;
        let mut children = vec![first];
        while self.peek() == Some(&Tok::And) {
            self.pos += 1;
            children.push(self.parse_implies()?);
        }
        Ok(nary(Expr::And, children))
    }

    fn parse_implies(&mut self) -> Result<Expr, CheckError> {
        let mut lhs = self.parse_unary()?;
        while self.peek() == Some(&Tok::Implies) {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Implies(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, CheckError> {
        if self.peek() == Some(&Tok::Not) {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Expr, CheckError> {
        match self.tokens.get(self.pos).cloned() {
            Some(Tok::Bool(value)) => {
                self.pos += 1;
                Ok(Expr::Bool(value))
            }
            Some(Tok::LParen) => {
                self.pos += 1;
                let inner = self.parse_or_word()?;
                if self.tokens.get(self.pos) != Some(&Tok::RParen) {
                    return Err(CheckError::Parse("Missing closing bracket".into()));
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(Tok::Name(name)) => {
                self.pos += 1;
                self.parse_name(name)
            }
            Some(other) => Err(CheckError::Parse(format!(
                "Unexpected token {other:?}"
            ))),
            None => Err(CheckError::Parse("Unexpected end of expression".into())),
        }
    }

    fn parse_name(&mut self, name: String) -> Result<Expr, CheckError> {
        if self.peek() == Some(&Tok::LParen) {
            let args = self.parse_call_args(&name)?;
            return match name.as_str() {
                "And" => expect_nary(args, Expr::And, &name),
                "Or" => expect_nary(args, Expr::Or, &name),
                "Xor" | "xor" => expect_nary(args, Expr::Xor, &name),
                "Not" => {
                    if args.len() != 1 {
                        return Err(CheckError::Parse(
                            "Not takes exactly one argument".into(),
                        ));
                    }
                    Ok(Expr::Not(Box::new(args.into_iter().next().unwrap())))
                }
                "Implies" => binary(args, |a, b| Expr::Implies(Box::new(a), Box::new(b))),
                "Eq" => binary(args, |a, b| Expr::Eq(Box::new(a), Box::new(b))),
                _ => Err(CheckError::Parse(format!(
                    "Unknown function '{name}' in logic expression"
                ))),
            };
        }
        // Multi-character names are not valid propositions: there is no
        // implicit conjunction to split them into.
        if name.len() > 1 {
            return Err(CheckError::Parse(format!(
                "Unexpected multi-letter name '{name}' in logic expression"
            )));
        }
        Ok(Expr::Symbol(name))
    }

    fn parse_call_args(&mut self, name: &str) -> Result<Vec<Expr>, CheckError> {
        self.pos += 1; // consume '('
        let mut args = Vec::new();
        if self.peek() == Some(&Tok::RParen) {
            return Err(CheckError::Parse(format!(
                "Function '{name}' called with no arguments"
            )));
        }
        loop {
            args.push(self.parse_or_word()?);
            match self.tokens.get(self.pos).cloned() {
                Some(Tok::Comma) => self.pos += 1,
                Some(Tok::RParen) => {
                    self.pos += 1;
                    break;
                }
                _ => {
                    return Err(CheckError::Parse(format!(
                        "Unclosed argument list for '{name}'"
                    )))
                }
            }
        }
        Ok(args)
    }
}

fn nary(build: fn(Vec<Expr>) -> Expr, mut children: Vec<Expr>) -> Expr {
    if children.len() == 1 {
        children.pop().unwrap()
    } else {
        build(children)
    }
}

fn expect_nary(
    args: Vec<Expr>,
    build: fn(Vec<Expr>) -> Expr,
    name: &str,
) -> Result<Expr, CheckError> {
    if args.len() < 2 {
        return Err(CheckError::Parse(format!(
            "'{name}' needs at least two arguments"
        )));
    }
    Ok(build(args))
}

fn binary(
    mut args: Vec<Expr>,
    build: fn(Expr, Expr) -> Expr,
) -> Result<Expr, CheckError> {
    if args.len() != 2 {
        return Err(CheckError::Parse(
            "Expected exactly two arguments".into(),
        ));
    }
    let rhs = args.pop().unwrap();
    let lhs = args.pop().unwrap();
    Ok(build(lhs, rhs))
}

/// Parse a sanitised logic string into an expression tree.
pub fn parse_expr(sanitized: &str) -> Result<Expr, CheckError> {
    let tokens = tokenize(sanitized)?;
    if tokens.is_empty() {
        return Err(CheckError::Parse("Nothing to parse".into()));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or_word()?;
    if parser.pos != parser.tokens.len() {
        return Err(CheckError::Parse(format!(
            "Unexpected trailing tokens at position {}",
            parser.pos
        )));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Expr {
        parse_expr(input).unwrap()
    }

    fn sym(name: &str) -> Expr {
        Expr::symbol(name)
    }

    #[test]
    fn operators_parse_to_the_right_nodes() {
        assert_eq!(parse("P & Q"), Expr::And(vec![sym("P"), sym("Q")]));
        assert_eq!(parse("P | Q"), Expr::Or(vec![sym("P"), sym("Q")]));
        assert_eq!(parse("P ^ Q"), Expr::Xor(vec![sym("P"), sym("Q")]));
        assert_eq!(parse("~P"), Expr::Not(Box::new(sym("P"))));
        assert_eq!(
            parse("P >> Q"),
            Expr::Implies(Box::new(sym("P")), Box::new(sym("Q")))
        );
        assert_eq!(
            parse("P == Q"),
            Expr::Eq(Box::new(sym("P")), Box::new(sym("Q")))
        );
    }

    #[test]
    fn same_operator_chains_flatten() {
        assert_eq!(
            parse("P & Q & R"),
            Expr::And(vec![sym("P"), sym("Q"), sym("R")])
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        assert_eq!(
            parse("P | Q & R"),
            Expr::Or(vec![sym("P"), Expr::And(vec![sym("Q"), sym("R")])])
        );
    }

    #[test]
    fn xor_sits_between_or_and_and() {
        assert_eq!(
            parse("P | Q ^ R"),
            Expr::Or(vec![sym("P"), Expr::Xor(vec![sym("Q"), sym("R")])])
        );
        assert_eq!(
            parse("P ^ Q & R"),
            Expr::Xor(vec![sym("P"), Expr::And(vec![sym("Q"), sym("R")])])
        );
    }

    #[test]
    fn implies_binds_tighter_than_and() {
        assert_eq!(
            parse("P >> Q & R"),
            Expr::And(vec![
                Expr::Implies(Box::new(sym("P")), Box::new(sym("Q"))),
                sym("R")
            ])
        );
    }

    #[test]
    fn implies_is_left_associative() {
        assert_eq!(
            parse("P >> Q >> R"),
            Expr::Implies(
                Box::new(Expr::Implies(Box::new(sym("P")), Box::new(sym("Q")))),
                Box::new(sym("R"))
            )
        );
    }

    #[test]
    fn word_operators_parse() {
        assert_eq!(parse("not False"), Expr::Not(Box::new(Expr::Bool(false))));
        assert_eq!(
            parse("P and Q or R"),
            Expr::Or(vec![Expr::And(vec![sym("P"), sym("Q")]), sym("R")])
        );
    }

    #[test]
    fn digits_are_boolean_constants() {
        assert_eq!(parse("1 & P"), Expr::And(vec![Expr::Bool(true), sym("P")]));
        assert_eq!(parse("0"), Expr::Bool(false));
    }

    #[test]
    fn callable_forms_parse() {
        assert_eq!(parse("And(P, Q)"), parse("P & Q"));
        assert_eq!(parse("Xor(P, Q)"), parse("P ^ Q"));
        assert_eq!(parse("xor(P, Q)"), parse("P ^ Q"));
        assert_eq!(parse("Not(P)"), parse("~P"));
        assert_eq!(parse("Implies(P, Q)"), parse("P >> Q"));
        assert_eq!(parse("Eq(P, Q)"), parse("P == Q"));
    }

    #[test]
    fn double_negation_is_preserved_structurally() {
        assert_eq!(
            parse("~~A"),
            Expr::Not(Box::new(Expr::Not(Box::new(sym("A")))))
        );
    }

    #[test]
    fn lowercase_true_is_a_symbol() {
        assert_eq!(parse("t"), sym("t"));
        assert!(parse_expr("true").is_err());
    }

    #[test]
    fn adjacent_symbols_are_rejected() {
        assert!(parse_expr("P Q").is_err());
        assert!(parse_expr("PQ").is_err());
    }

    #[test]
    fn chained_equivalences_are_rejected() {
        assert!(parse_expr("A == B == C").is_err());
    }
}
