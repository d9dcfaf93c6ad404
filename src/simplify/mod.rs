//! The simplification cores behind the symbolic tier.
//!
//! `algebra` carries the maths contract (rational-function normal form
//! under the positive-reals assumption), `boolean` the logic contract
//! (truth-table normal form), and `derivative` the optional formal
//! differentiation pass.

pub mod algebra;
pub mod boolean;
pub mod derivative;

pub use algebra::Unsupported;
