//! Error type definitions for the equality checker.
//!
//! The checking pipeline distinguishes between failures of the trusted
//! target expression (fatal for the question being asked) and failures of
//! the untrusted test expression (a user-facing syntax error). That split
//! is applied when a `CheckError` is materialised into a response, not
//! here; these types only say what went wrong.

use thiserror::Error;

/// Errors produced while sanitising, parsing, or comparing expressions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// The sanitiser found characters outside the whitelist in strict mode.
    #[error("Unexpected input characters provided!")]
    UnsafeInput,

    /// The sanitised string does not form a valid expression tree.
    #[error("Parse error: {0}")]
    Parse(String),

    /// `factorial` called with a literal argument above the evaluation cutoff.
    #[error("[Factorial]: Too large integer to compute factorial effectively!")]
    FactorialTooLarge,

    /// A relation was compared against a plain expression (or vice versa).
    #[error("Equation/Expression type mismatch!")]
    EquationTypeMismatch,

    /// Sampled values span a range too wide or too narrow to compare reliably.
    #[error("Numeric range error: {0}")]
    NumericRange(String),

    /// A sampled function stayed undefined even on the complex plane.
    #[error("Numeric domain error: {0}")]
    NumericDomain(String),

    /// The per-request deadline elapsed mid-computation.
    #[error("Request took too long to process!")]
    Timeout,
}

impl CheckError {
    /// True for errors raised before any equality testing happened, i.e.
    /// the ones subject to the fatal-target / syntax-error-test asymmetry.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CheckError::UnsafeInput | CheckError::Parse(_) | CheckError::FactorialTooLarge
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_classified() {
        assert!(CheckError::UnsafeInput.is_input_error());
        assert!(CheckError::Parse("bad".into()).is_input_error());
        assert!(CheckError::FactorialTooLarge.is_input_error());
        assert!(!CheckError::Timeout.is_input_error());
        assert!(!CheckError::NumericRange("wide".into()).is_input_error());
    }

    #[test]
    fn messages_are_stable() {
        assert_eq!(
            CheckError::UnsafeInput.to_string(),
            "Unexpected input characters provided!"
        );
        assert_eq!(
            CheckError::Timeout.to_string(),
            "Request took too long to process!"
        );
    }
}
