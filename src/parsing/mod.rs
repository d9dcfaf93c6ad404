//! Input sanitisation and parsing for both checker modes.
//!
//! The pipeline is sanitise (Unicode normalisation, whitelisting,
//! contextual rewrites) then tokenise and parse into an [`crate::ast::Expr`]
//! tree. Parsing performs no arithmetic and collapses no identities.

pub mod logic;
pub mod maths;
pub mod sanitize;

pub use maths::{is_valid_symbol, MathsContext};
pub use sanitize::{cleanup_string, Mode};
