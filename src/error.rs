use thiserror::Error;

/// Errors raised by the signal core
///
/// Configuration errors are fatal to the instance being built. Input errors
/// reject a single tick and leave all state untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid input: {0}")]
    Input(String),

    #[error("division by zero computing {0}")]
    DivideByZero(&'static str),
}

impl SignalError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Whether the error rejects a tick (as opposed to a construction)
    ///
    /// A zero divisor always stems from a bad quote, so it counts as input.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input(_) | Self::DivideByZero(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

pub type SignalResult<T> = std::result::Result<T, SignalError>;
