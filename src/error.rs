use thiserror::Error;

/// Errors raised by the crate.
///
/// Nothing here is retried internally; every fallible operation returns one
/// of these instead of panicking.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Malformed construction parameters, wrong-sized or out-of-bounds
    /// chromosome, wrong-sized evaluation input, or a derivative index `>= n`.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A DA evaluation was attempted at a point where the closed-form
    /// derivative does not exist (e.g. `div` at a zero divisor).
    #[error("derivative undefined: {0}")]
    DerivativeUndefined(String),

    /// A string-driven function-set builder was given a name that is not in
    /// the supported table.
    #[error("unknown function: {0}")]
    UnknownFunction(String),
}
