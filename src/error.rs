use std::fmt;

/// The error type returned by every fallible operation in this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A `DriverConfig` field is out of its valid range (beta <= 0, rate
    /// outside (0, 1), K < 1, theta <= 0).
    InvalidConfig,
    /// A vertex id is out of range, an edge weight is negative or zero, or
    /// an operation requires a non-empty graph and none was given.
    InvalidGraph,
    /// A row/column/block index passed to a `BlockMatrix` method is out of
    /// `[0, B)`.
    InvalidIndex,
    /// A self-check (debug builds only) found the block-matrix invariants
    /// violated: a negative entry, or `Σ M != E`.
    InvariantViolation,
    /// The driver observed its cancellation token set.
    Cancelled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}

impl Error {
    pub(crate) fn invalid_config<S: Into<String>>(message: S) -> Error {
        Error {
            kind: ErrorKind::InvalidConfig,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_graph<S: Into<String>>(message: S) -> Error {
        Error {
            kind: ErrorKind::InvalidGraph,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_index<S: Into<String>>(message: S) -> Error {
        Error {
            kind: ErrorKind::InvalidIndex,
            message: message.into(),
        }
    }

    pub(crate) fn invariant_violation<S: Into<String>>(message: S) -> Error {
        Error {
            kind: ErrorKind::InvariantViolation,
            message: message.into(),
        }
    }

    pub(crate) fn cancelled() -> Error {
        Error {
            kind: ErrorKind::Cancelled,
            message: "cancellation token observed between phases".to_string(),
        }
    }
}
