use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for Coffer operations
///
/// Each kind names one category of failure so callers can branch on it
/// without parsing messages.
///
/// # Examples
///
/// ```rust,ignore
/// use coffer::errors::{CofferError, ErrorKind, CofferResult};
///
/// fn example() -> CofferResult<()> {
///     Err(CofferError::new("primary key property is missing", ErrorKind::MissingPrimaryKey))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Schema Errors - raised while declaring or reading an entity schema
    /// Generic schema declaration error
    SchemaError,
    /// The schema has no primary key property
    MissingPrimaryKey,
    /// The declared key type cannot be auto-generated
    UnsupportedKeyType,
    /// A relation declaration is invalid
    InvalidRelation,

    // Argument Errors
    /// An argument has the wrong shape or is empty
    InvalidArgument,

    // State Errors
    /// A load returned an item with a different identity
    IdentityMismatch,
    /// The item value does not satisfy its schema
    ValidationError,

    // Outcome Errors - signaled by repositories
    /// The requested item was not found
    NotFound,
    /// An item with the same key already exists
    AlreadyExists,

    // Operation Errors
    /// The operation is not valid in the current context
    InvalidOperation,
    /// The transaction could not be opened, committed or rolled back
    TransactionError,
    /// Error from a storage backend
    BackendError,

    // Data Encoding Errors
    /// Error encoding or decoding data
    EncodingError,

    // Generic/Internal Errors - used as fallback
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::SchemaError => write!(f, "Schema error"),
            ErrorKind::MissingPrimaryKey => write!(f, "Missing primary key"),
            ErrorKind::UnsupportedKeyType => write!(f, "Unsupported key type"),
            ErrorKind::InvalidRelation => write!(f, "Invalid relation"),
            ErrorKind::InvalidArgument => write!(f, "Invalid argument"),
            ErrorKind::IdentityMismatch => write!(f, "Identity mismatch"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::AlreadyExists => write!(f, "Already exists"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::TransactionError => write!(f, "Transaction error"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom Coffer error type.
///
/// `CofferError` carries the error message, its kind, an optional cause and
/// the backtrace captured where it was created.
///
/// # Examples
///
/// ```rust,ignore
/// use coffer::errors::{CofferError, ErrorKind};
///
/// let err = CofferError::new("key or item is empty", ErrorKind::InvalidArgument);
///
/// let cause = CofferError::new("connection reset", ErrorKind::BackendError);
/// let err = CofferError::new_with_cause("save failed", ErrorKind::BackendError, cause);
/// ```
#[derive(Clone)]
pub struct CofferError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<CofferError>>,
    backtrace: Atomic<Backtrace>,
}

impl CofferError {
    /// Creates a new `CofferError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        CofferError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `CofferError` wrapping the error that caused it.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: CofferError) -> Self {
        CofferError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&CofferError> {
        self.cause.as_deref()
    }

    /// Returns `true` for the not-found outcome a repository signals for
    /// missing items.
    pub fn is_not_found(&self) -> bool {
        self.error_kind == ErrorKind::NotFound
    }
}

impl Display for CofferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for CofferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for CofferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for Coffer operations.
pub type CofferResult<T> = Result<T, CofferError>;

impl From<serde_json::Error> for CofferError {
    fn from(err: serde_json::Error) -> Self {
        CofferError::new(&format!("JSON error: {}", err), ErrorKind::EncodingError)
    }
}

impl From<std::fmt::Error> for CofferError {
    fn from(err: std::fmt::Error) -> Self {
        CofferError::new(
            &format!("Formatting error: {}", err),
            ErrorKind::InternalError,
        )
    }
}

impl From<String> for CofferError {
    fn from(msg: String) -> Self {
        CofferError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for CofferError {
    fn from(msg: &str) -> Self {
        CofferError::new(msg, ErrorKind::InternalError)
    }
}
