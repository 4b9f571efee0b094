//! Result and error types for pagebind.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for pagebind operations
pub type PageResult<T> = Result<T, PageError>;

/// Coarse error taxonomy used by callers that branch on failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad page declaration, locator metadata or frame reference. Not retried.
    Configuration,
    /// A property could not be found or an element operation failed.
    ElementExecute,
    /// The operation makes no sense for the property variant.
    NotSupported,
    /// A validation table could not be bound or evaluated.
    Validation,
    /// Several independent failures collected together.
    Aggregate,
    /// I/O or deserialization failure.
    Io,
}

/// Errors that can occur in pagebind
#[derive(Debug, Error)]
pub enum PageError {
    /// Locator metadata or page declaration is invalid
    #[error("Configuration error in page '{page}': {message}")]
    Configuration {
        /// Declaring page type
        page: String,
        /// Error message
        message: String,
    },

    /// A navigation route names a frame that no frame map declares
    #[error("Navigation error: frame '{frame}' referenced by page '{page}' is not declared by any frame map")]
    FrameNotFound {
        /// Frame name from the route
        frame: String,
        /// Page type declaring the route
        page: String,
    },

    /// The frame element resolved but exposes no document
    #[error("Navigation error: frame '{frame}' for page '{page}' has no document")]
    FrameDocumentMissing {
        /// Frame name from the route
        frame: String,
        /// Page type declaring the route
        page: String,
    },

    /// Property lookup failed
    #[error("Could not locate property '{property}' on page '{page}'. Available properties: {}", .available.join(", "))]
    PropertyNotFound {
        /// Requested property name
        property: String,
        /// Page type searched
        page: String,
        /// Property names the page does declare
        available: Vec<String>,
    },

    /// An element operation failed
    #[error("Element '{property}' on page '{page}': {message}")]
    ElementExecute {
        /// Property name
        property: String,
        /// Declaring page type
        page: String,
        /// Error message
        message: String,
    },

    /// No fill handler is registered for the declared element kind
    #[error("No fill handler registered for '{kind}' (property '{property}' on page '{page}')")]
    FillHandlerMissing {
        /// Declared element kind
        kind: String,
        /// Property name
        property: String,
        /// Declaring page type
        page: String,
    },

    /// The operation is not supported by this property variant
    #[error("Operation '{operation}' is not supported by {variant}")]
    NotSupported {
        /// Operation name
        operation: &'static str,
        /// Property data variant
        variant: &'static str,
    },

    /// A validation rule key matched no registered comparer
    #[error("Unknown comparison rule '{rule}'. Known rules: {}", .known.join(", "))]
    UnknownComparison {
        /// Rule key from the table
        rule: String,
        /// Rule keys the repository knows
        known: Vec<String>,
    },

    /// A validation was evaluated before it was bound to a comparer
    #[error("Validation for field '{field}' has not been bound to a comparer")]
    UnboundValidation {
        /// Raw field name
        field: String,
    },

    /// A validation table row could not be parsed
    #[error("Invalid validation table: {message}")]
    InvalidTable {
        /// Error message
        message: String,
    },

    /// The action requested is not registered with the repository
    #[error("Action '{name}' is not registered")]
    ActionNotRegistered {
        /// Action type name
        name: String,
    },

    /// An action could not run with the context it was given
    #[error("Action '{action}' failed: {message}")]
    ActionFailed {
        /// Action name
        action: String,
        /// Error message
        message: String,
    },

    /// A list holds more items than it may enumerate
    #[error("List of '{item_type}' has more than {limit} items")]
    ListLimitExceeded {
        /// Item page type
        item_type: String,
        /// Enumeration limit of the list
        limit: usize,
    },

    /// Backend driver error
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Several failures raised by independent hooks
    #[error("{0}")]
    Aggregate(ErrorList),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PageError {
    /// Create a configuration error
    pub fn configuration(page: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            page: page.into(),
            message: message.into(),
        }
    }

    /// Create an element execute error
    pub fn element(
        property: impl Into<String>,
        page: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ElementExecute {
            property: property.into(),
            page: page.into(),
            message: message.into(),
        }
    }

    /// Create a not-supported error
    pub const fn not_supported(operation: &'static str, variant: &'static str) -> Self {
        Self::NotSupported { operation, variant }
    }

    /// Taxonomy bucket for this error
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. }
            | Self::FrameNotFound { .. }
            | Self::FrameDocumentMissing { .. }
            | Self::UnknownComparison { .. }
            | Self::ActionNotRegistered { .. } => ErrorKind::Configuration,
            Self::PropertyNotFound { .. }
            | Self::ElementExecute { .. }
            | Self::FillHandlerMissing { .. }
            | Self::ActionFailed { .. }
            | Self::ListLimitExceeded { .. }
            | Self::Driver { .. } => ErrorKind::ElementExecute,
            Self::NotSupported { .. } => ErrorKind::NotSupported,
            Self::UnboundValidation { .. } | Self::InvalidTable { .. } => ErrorKind::Validation,
            Self::Aggregate(_) => ErrorKind::Aggregate,
            Self::Io(_) | Self::Yaml(_) | Self::Json(_) => ErrorKind::Io,
        }
    }

    /// Name of the unsupported operation, if this is a not-supported error
    pub const fn unsupported_operation(&self) -> Option<&'static str> {
        match self {
            Self::NotSupported { operation, .. } => Some(operation),
            _ => None,
        }
    }
}

/// Ordered collection of shared errors, reported as one failure.
#[derive(Debug, Clone, Default)]
pub struct ErrorList {
    errors: Vec<Arc<PageError>>,
}

impl ErrorList {
    /// Create from collected errors, in the order they were raised
    #[must_use]
    pub fn new(errors: Vec<Arc<PageError>>) -> Self {
        Self { errors }
    }

    /// The collected errors
    #[must_use]
    pub fn errors(&self) -> &[Arc<PageError>] {
        &self.errors
    }

    /// Number of collected errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when nothing was collected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} errors occurred:", self.errors.len())?;
        for (i, error) in self.errors.iter().enumerate() {
            write!(f, "\n  {}. {error}", i + 1)?;
        }
        Ok(())
    }
}
