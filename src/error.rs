//! Error taxonomy for type construction, value access, encoding and calls.
//!
//! Every failure the crate can report is a variant of [`FfiError`]. All of
//! them are recoverable: they are returned to the immediate caller and never
//! corrected silently. A fault inside a foreign function is not an error
//! value at all; it takes the process down.

use crate::types::Kind;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type FfiResult<T> = Result<T, FfiError>;

/// Status reported by the call engine when it refuses a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    BadTypedef,
    BadAbi,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Ok => write!(f, "FFI_OK"),
            Status::BadTypedef => write!(f, "FFI_BAD_TYPEDEF"),
            Status::BadAbi => write!(f, "FFI_BAD_ABI"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FfiError {
    /// Malformed or unsupported type construction request.
    #[error("type error: {message}")]
    Type {
        message: String,
        status: Option<Status>,
    },

    /// Operation invoked on a value or type of the wrong kind.
    #[error("call of {op} on {kind} value")]
    Kind { op: String, kind: Kind },

    /// Array, slice or field index out of bounds.
    #[error("{op}: index {index} out of range (length {len})")]
    Index {
        op: String,
        index: usize,
        len: usize,
    },

    /// Symbol lookup failed in an opened library.
    #[error("symbol '{symbol}' not found in {library}: {message}")]
    Symbol {
        library: String,
        symbol: String,
        message: String,
    },

    /// Call-time argument count does not match the prepared descriptor.
    #[error("invalid number of arguments: expected {expected}, got {got}")]
    ArgumentCount { expected: usize, got: usize },

    /// Encode/decode hit a leaf the codec does not handle.
    #[error("{op}: unsupported kind {what}")]
    UnsupportedKind { op: String, what: String },

    /// The dynamic loader could not open or close a library.
    #[error("library '{path}': {message}")]
    Library { path: String, message: String },

    /// `field_by_name` on a struct that has no such field.
    #[error("struct {ty} has no field named '{name}'")]
    NoSuchField { ty: String, name: String },

    /// Operation on the zero value.
    #[error("call of {op} on zero Value")]
    InvalidValue { op: String },

    /// Scalar setter given a value that does not fit the native width.
    #[error("{op}: value {value} does not fit in {kind}")]
    OutOfRange {
        op: String,
        kind: Kind,
        value: String,
    },

    /// A call argument could not be marshaled into its parameter type.
    #[error("argument {index}: {message}")]
    Argument { index: usize, message: String },

    /// Host shape and native type are not layout compatible.
    #[error("{op}: can not map host type [{host}] onto c-type [{native}]")]
    Incompatible {
        op: String,
        host: String,
        native: String,
    },
}

impl FfiError {
    pub fn type_error(message: impl Into<String>) -> Self {
        FfiError::Type {
            message: message.into(),
            status: None,
        }
    }

    /// Type error carrying the engine status that caused it.
    pub fn engine(message: impl Into<String>, status: Status) -> Self {
        FfiError::Type {
            message: format!("{} ({})", message.into(), status),
            status: Some(status),
        }
    }

    pub fn kind(op: impl Into<String>, kind: Kind) -> Self {
        FfiError::Kind {
            op: op.into(),
            kind,
        }
    }

    pub fn index(op: impl Into<String>, index: usize, len: usize) -> Self {
        FfiError::Index {
            op: op.into(),
            index,
            len,
        }
    }

    pub fn symbol(
        library: impl Into<String>,
        symbol: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        FfiError::Symbol {
            library: library.into(),
            symbol: symbol.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(op: impl Into<String>, what: impl Into<String>) -> Self {
        FfiError::UnsupportedKind {
            op: op.into(),
            what: what.into(),
        }
    }

    pub fn library(path: impl Into<String>, message: impl Into<String>) -> Self {
        FfiError::Library {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid(op: impl Into<String>) -> Self {
        FfiError::InvalidValue { op: op.into() }
    }

    pub fn out_of_range(op: impl Into<String>, kind: Kind, value: impl ToString) -> Self {
        FfiError::OutOfRange {
            op: op.into(),
            kind,
            value: value.to_string(),
        }
    }

    pub fn argument(index: usize, message: impl Into<String>) -> Self {
        FfiError::Argument {
            index,
            message: message.into(),
        }
    }

    /// Engine status attached to a type error, if any.
    pub fn status(&self) -> Option<Status> {
        match self {
            FfiError::Type { status, .. } => *status,
            _ => None,
        }
    }
}
