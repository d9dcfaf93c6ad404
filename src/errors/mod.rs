//! Centralized error handling for the equality checker.
//!
//! Errors never cross the HTTP boundary as panics: the web layer
//! materialises every `CheckError` into JSON fields on the response body
//! (`error`, `syntax_error`, `code`), mirroring the fatal/non-fatal
//! asymmetry between the trusted target and the untrusted test input.

pub mod types;

pub use types::*;
