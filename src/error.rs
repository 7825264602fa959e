//! Error types for object construction

use thiserror::Error;

/// Boxed error raised by constructors, factories, setters and deferred values
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while constructing an object from a specification
#[derive(Error, Debug)]
pub enum FactoryError {
    /// The specification is malformed or not allowed in this context
    #[error("{0}")]
    InvalidSpecification(String),

    /// Construction produced something other than the expected object
    #[error("{0}")]
    UnexpectedResult(String),

    /// The specification names a class that is not registered
    #[error("Class not found: {name}")]
    UnknownClass { name: String },

    /// A setter call names a method the object's class does not define
    #[error("Call to undefined method {class}::{method}()")]
    UnknownMethod { class: String, method: String },

    /// A setter call targets an object that is still shared elsewhere
    #[error("Cannot call {class}::{method}() on a shared instance")]
    SharedInstance { class: String, method: String },

    /// A required service does not exist in the container
    #[error("Service not found: {name}")]
    ServiceNotFound { name: String },

    /// A positional argument is missing or has the wrong type
    #[error("Argument #{position} (${name}): {reason}")]
    Argument {
        position: usize,
        name: String,
        reason: String,
    },

    /// A constructor, factory, setter or deferred value failed
    #[error("{0}")]
    Delegate(#[from] BoxError),
}

impl FactoryError {
    /// Create an InvalidSpecification error
    #[inline]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidSpecification(message.into())
    }

    /// Create an UnexpectedResult error
    #[inline]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedResult(message.into())
    }

    /// Wrap any error raised by a delegate
    #[inline]
    pub fn delegate(err: impl Into<BoxError>) -> Self {
        Self::Delegate(err.into())
    }

    pub(crate) fn raw_class_name_not_allowed() -> Self {
        Self::invalid(
            "Passing a raw class name is not allowed here. Use a specification with 'class' instead.",
        )
    }

    pub(crate) fn raw_callable_not_allowed() -> Self {
        Self::invalid(
            "Passing a raw callable is not allowed here. Use a specification with 'factory' instead.",
        )
    }

    pub(crate) fn not_a_specification() -> Self {
        Self::invalid("Provided specification is not an array.")
    }

    pub(crate) fn missing_selector() -> Self {
        Self::invalid("Provided specification lacks both 'factory' and 'class' parameters.")
    }

    pub(crate) fn associative_args() -> Self {
        Self::invalid("'args' cannot be an associative array")
    }

    pub(crate) fn wrong_field_type(key: &str, expected: &str, actual: &str) -> Self {
        Self::invalid(format!("'{key}' must be {expected}, got {actual}"))
    }

    pub(crate) fn services_without_container() -> Self {
        Self::invalid("'services' and 'optional_services' cannot be used without a service container")
    }

    pub(crate) fn factory_not_object() -> Self {
        Self::unexpected("'factory' did not return an object")
    }

    pub(crate) fn factory_wrong_class(expected: &str, actual: &str) -> Self {
        Self::unexpected(format!(
            "'factory' was expected to return an instance of {expected}, got {actual}"
        ))
    }

    pub(crate) fn assertion_failed(expected: &str, actual: &str) -> Self {
        Self::unexpected(format!("Expected instance of {expected}, got {actual}"))
    }

    /// Check if this is an InvalidSpecification error
    #[inline]
    pub fn is_invalid_specification(&self) -> bool {
        matches!(self, Self::InvalidSpecification(_))
    }

    /// Check if this is an UnexpectedResult error
    #[inline]
    pub fn is_unexpected_result(&self) -> bool {
        matches!(self, Self::UnexpectedResult(_))
    }
}

/// Result type alias for construction operations
pub type Result<T> = std::result::Result<T, FactoryError>;
