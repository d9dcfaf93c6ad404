//! Equality checker: a service that judges whether a submitted maths or
//! boolean-logic expression is equivalent to a trusted target, and how
//! strong that equivalence is (exact, symbolic, or numeric).
//!
//! The pipeline is: sanitise untrusted text, parse it into a canonical
//! algebraic tree without evaluating anything, then escalate through the
//! equality tiers with a per-process memo of known-equal pairs.

pub mod ast;
pub mod config;
pub mod engine;
pub mod errors;
pub mod parsing;
pub mod simplify;
pub mod web;
