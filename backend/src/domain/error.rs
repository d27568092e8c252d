//! Domain-level error types.
//!
//! These errors are transport agnostic. The taxonomy is deliberately closed:
//! callers only ever see [`ErrorCode::Conflict`], [`ErrorCode::NotFound`], or
//! [`ErrorCode::InternalError`]. Inbound adapters map them to HTTP responses
//! or CLI exit codes.

use serde::{Deserialize, Serialize};

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request conflicts with the current state (duplicate, full, contended).
    Conflict,
    /// A referenced customer, resource, or enrollment does not exist.
    NotFound,
    /// An unexpected error occurred inside the domain or a driven adapter.
    InternalError,
}

/// Why an operation was rejected with [`ErrorCode::Conflict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// The customer already holds an active enrollment for the resource.
    Duplicate,
    /// The resource had no seat left.
    CapacityExceeded,
    /// A concurrent writer aborted the transaction and the resource still has
    /// seats; the caller may retry.
    Contended,
    /// The enrollment was already checked in and cannot be cancelled.
    CheckedIn,
    /// The enrollment was already checked in once.
    AlreadyCheckedIn,
}

/// Domain error payload.
///
/// ## Invariants
/// - `message` must be non-empty once trimmed of whitespace.
/// - `reason` is only present for [`ErrorCode::Conflict`].
///
/// # Examples
/// ```
/// use facility_backend::domain::{ConflictReason, Error, ErrorCode};
///
/// let err = Error::conflict(ConflictReason::CapacityExceeded, "Program is full");
/// assert_eq!(err.code(), ErrorCode::Conflict);
/// assert_eq!(err.reason(), Some(ConflictReason::CapacityExceeded));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
#[serde(try_from = "ErrorDto", into = "ErrorDto")]
pub struct Error {
    code: ErrorCode,
    message: String,
    reason: Option<ConflictReason>,
}

/// Validation errors emitted by the constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorValidationError {
    /// Message was empty after trimming.
    #[error("error message must not be empty")]
    EmptyMessage,
    /// A conflict reason was attached to a non-conflict error.
    #[error("conflict reason is only valid for conflict errors")]
    UnexpectedReason,
}

impl Error {
    /// Create a new error, panicking if validation fails.
    ///
    /// # Panics
    ///
    /// Panics when `message` is empty once trimmed. Use [`Error::try_new`]
    /// for untrusted input.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        match Self::try_new(code, message) {
            Ok(value) => value,
            Err(err) => panic!("error messages must satisfy validation: {err}"),
        }
    }

    /// Fallible constructor that validates the message content.
    pub fn try_new(code: ErrorCode, message: impl Into<String>) -> Result<Self, ErrorValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ErrorValidationError::EmptyMessage);
        }
        Ok(Self {
            code,
            message,
            reason: None,
        })
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to adapters.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Conflict reason, when the code is [`ErrorCode::Conflict`].
    pub fn reason(&self) -> Option<ConflictReason> {
        self.reason
    }

    /// Convenience constructor for [`ErrorCode::Conflict`].
    pub fn conflict(reason: ConflictReason, message: impl Into<String>) -> Self {
        let mut error = Self::new(ErrorCode::Conflict, message);
        error.reason = Some(reason);
        error
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Whether the error is a conflict with the given reason.
    pub fn is_conflict(&self, reason: ConflictReason) -> bool {
        self.code == ErrorCode::Conflict && self.reason == Some(reason)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDto {
    code: ErrorCode,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<ConflictReason>,
}

impl From<Error> for ErrorDto {
    fn from(value: Error) -> Self {
        Self {
            code: value.code,
            message: value.message,
            reason: value.reason,
        }
    }
}

impl TryFrom<ErrorDto> for Error {
    type Error = ErrorValidationError;

    fn try_from(value: ErrorDto) -> Result<Self, Self::Error> {
        let ErrorDto {
            code,
            message,
            reason,
        } = value;

        if reason.is_some() && code != ErrorCode::Conflict {
            return Err(ErrorValidationError::UnexpectedReason);
        }
        let mut error = Error::try_new(code, message)?;
        error.reason = reason;
        Ok(error)
    }
}
