//! The three-tier equivalence engine.
//!
//! Checking escalates exact -> symbolic -> numeric (maths) or exact ->
//! symbolic (logic), with a per-checker memo of known-equal pairs and a
//! cooperative deadline observed between tiers. Checkers are purely
//! functional over tree values; the memo is the only shared state.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::errors::CheckError;

pub mod eval;
pub mod logic;
pub mod maths;
pub mod numeric;

pub use logic::LogicChecker;
pub use maths::MathsChecker;

/// How strong a proven equality is. Ordering matters: a composite
/// comparison reports its worst sub-tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EqualityType {
    Exact,
    Symbolic,
    Numeric,
}

impl EqualityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EqualityType::Exact => "exact",
            EqualityType::Symbolic => "symbolic",
            EqualityType::Numeric => "numeric",
        }
    }
}

/// The worst equality type among sub-comparisons; the weakest link
/// decides what kind of match an equation has.
pub fn eq_type_order(types: &[EqualityType]) -> EqualityType {
    types
        .iter()
        .copied()
        .max()
        .expect("at least one equality type")
}

/// Cooperative per-request deadline, checked between the expensive
/// sub-tasks. The memo is written only on final success, so a request
/// abandoned mid-flight leaves no partial state behind.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Option<Instant>,
}

impl Deadline {
    pub fn none() -> Self {
        Deadline { expires_at: None }
    }

    pub fn after(duration: Duration) -> Self {
        Deadline {
            expires_at: Some(Instant::now() + duration),
        }
    }

    pub fn check(&self) -> Result<(), CheckError> {
        match self.expires_at {
            Some(at) if Instant::now() >= at => Err(CheckError::Timeout),
            _ => Ok(()),
        }
    }
}

/// Per-request options shared by both checker modes. Maths-only fields
/// are ignored by the logic checker.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Multi-character identifiers that implicit multiplication must not
    /// split.
    pub symbols: Vec<String>,
    /// Enforce that both sides use exactly the same free symbols.
    pub check_symbols: bool,
    /// Free-text description echoed into the logs.
    pub description: Option<String>,
    /// Parse hints (`constant_pi`, `imaginary_i`, `natural_logarithm`, ...).
    pub hints: Vec<String>,
    /// Evaluate single-variable derivative nodes before the symbolic tier.
    pub simplify_derivatives: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        CheckOptions {
            symbols: Vec::new(),
            check_symbols: true,
            description: None,
            hints: Vec::new(),
            simplify_derivatives: false,
        }
    }
}

/// Symbol mismatch breakdown reported when symbol checking fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolMismatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

/// The outcome of a check, mirroring the response body fields. `error`
/// should always be inspected first.
#[derive(Debug, Clone, Default)]
pub struct CheckResult {
    pub target: Option<String>,
    pub test: Option<String>,
    pub parsed_target: Option<String>,
    pub parsed_test: Option<String>,
    pub equal: Option<bool>,
    pub equality_type: Option<EqualityType>,
    pub incorrect_symbols: Option<SymbolMismatch>,
    pub error: Option<String>,
    pub syntax_error: bool,
    pub code: Option<u16>,
    pub case: Option<char>,
}

impl CheckResult {
    pub fn error_only(message: impl Into<String>) -> Self {
        CheckResult {
            error: Some(message.into()),
            ..Default::default()
        }
    }
}
