//! Error types for bridge operations
//!
//! Every operation returns a [`BridgeResult`]. Script-side failures keep the
//! script's error type, message, stack and source attribution; failures raised
//! by host code inside a callback keep the original [`HostException`].

use thiserror::Error;

use crate::host::HostException;

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Structured error types for bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Operation on a null or destroyed context
    #[error("Null bridge context - did you close your bridge?")]
    InvalidContext,

    /// The script engine instance could not be allocated
    #[error("Failed to allocate script engine: {0}")]
    Allocation(String),

    /// Script source failed to compile or threw during execution
    #[error("{error_type}{}: {message}", format_location(source_name, line))]
    Script {
        error_type: String,
        message: String,
        source_name: Option<String>,
        line: Option<u32>,
        stack: Option<String>,
    },

    /// A host exception raised inside a callback escaped the script
    #[error("{exception}")]
    Host {
        exception: HostException,
        script_stack: Option<String>,
    },

    /// A binding name is already in use
    #[error("A global object called {0} already exists")]
    DuplicateBinding(String),

    /// A proxy target is not a script object
    #[error("A global JavaScript object called {0} was not found")]
    UnresolvedGlobal(String),

    /// A method could not be resolved against its target
    #[error("{target} has no usable method called {method}: {reason}")]
    UnresolvedMethod {
        target: String,
        method: String,
        reason: String,
    },

    /// Proxy handle was never issued by this context
    #[error("Unknown or stale proxy handle {0}")]
    StaleHandle(i64),

    /// Call with the wrong number of arguments
    #[error("{method} expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        method: String,
        expected: String,
        actual: usize,
    },

    /// A value has no representation on the other side of the boundary
    #[error("Cannot marshal {from} to {to}")]
    Marshal { from: String, to: String },

    /// A callback tried to re-enter the context that is calling it
    #[error("Bridge context is busy {0}")]
    Busy(&'static str),

    /// Engine failure that is not a script exception
    #[error("Engine error: {0}")]
    Engine(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Format location for error display
fn format_location(source_name: &Option<String>, line: &Option<u32>) -> String {
    match (source_name, line) {
        (Some(name), Some(line)) => format!(" at {}:{}", name, line),
        (Some(name), None) => format!(" at {}", name),
        (None, Some(line)) => format!(" at line {}", line),
        (None, None) => String::new(),
    }
}

impl BridgeError {
    /// Create a script error from error type and message
    pub fn script_error(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Script {
            error_type: error_type.into(),
            message: message.into(),
            source_name: None,
            line: None,
            stack: None,
        }
    }

    /// Create a marshalling error
    pub fn marshal(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Marshal {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Create a method resolution error
    pub fn unresolved_method(
        target: impl Into<String>,
        method: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnresolvedMethod {
            target: target.into(),
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error originated in script code
    pub fn is_script_error(&self) -> bool {
        matches!(self, Self::Script { .. } | Self::Host { .. })
    }

    /// Get the script-side stack trace if available
    pub fn stack_trace(&self) -> Option<&str> {
        match self {
            Self::Script { stack, .. } => stack.as_deref(),
            Self::Host { script_stack, .. } => script_stack.as_deref(),
            _ => None,
        }
    }

    /// Get source attribution if available
    pub fn location(&self) -> Option<(Option<&str>, Option<u32>)> {
        match self {
            Self::Script {
                source_name, line, ..
            } => Some((source_name.as_deref(), *line)),
            _ => None,
        }
    }

    /// Get the error type name (e.g., "TypeError", "InvalidContext")
    pub fn error_type(&self) -> &str {
        match self {
            Self::InvalidContext => "InvalidContext",
            Self::Allocation(_) => "AllocationError",
            Self::Script { error_type, .. } => error_type,
            Self::Host { exception, .. } => &exception.type_name,
            Self::DuplicateBinding(_) | Self::UnresolvedGlobal(_) | Self::UnresolvedMethod { .. } => {
                "ResolutionError"
            }
            Self::StaleHandle(_) => "StaleHandle",
            Self::ArgumentCount { .. } | Self::Marshal { .. } => "MarshalError",
            Self::Busy(_) => "BusyError",
            Self::Engine(_) => "EngineError",
            Self::Json(_) => "JsonError",
        }
    }
}

impl From<rquickjs::Error> for BridgeError {
    fn from(e: rquickjs::Error) -> Self {
        match e {
            // Script strings are UTF-16; an unpaired surrogate has no UTF-8 form.
            rquickjs::Error::Utf8(_) => Self::marshal("string (unpaired surrogate)", "String"),
            e => Self::Engine(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_error_display() {
        let err = BridgeError::script_error("TypeError", "undefined is not a function");
        assert_eq!(err.to_string(), "TypeError: undefined is not a function");
        assert!(err.is_script_error());
    }

    #[test]
    fn test_script_error_with_location() {
        let err = BridgeError::Script {
            error_type: "SyntaxError".into(),
            message: "unexpected token".into(),
            source_name: Some("broken.js".into()),
            line: Some(3),
            stack: Some("    at broken.js:3\n".into()),
        };

        assert_eq!(err.to_string(), "SyntaxError at broken.js:3: unexpected token");
        assert_eq!(err.location(), Some((Some("broken.js"), Some(3))));
        assert_eq!(err.stack_trace(), Some("    at broken.js:3\n"));
        assert_eq!(err.error_type(), "SyntaxError");
    }

    #[test]
    fn test_host_error_keeps_exception() {
        let err = BridgeError::Host {
            exception: HostException::new("IllegalStateException", "not ready"),
            script_stack: Some("    at run (app.js:2)\n".into()),
        };

        assert!(err.is_script_error());
        assert_eq!(err.error_type(), "IllegalStateException");
        assert!(err.to_string().contains("not ready"));
        assert!(err.stack_trace().unwrap().contains("app.js"));
    }

    #[test]
    fn test_invalid_context() {
        let err = BridgeError::InvalidContext;
        assert!(err.to_string().contains("did you close your bridge"));
        assert!(err.location().is_none());
        assert!(!err.is_script_error());
    }

    #[test]
    fn test_marshal_error() {
        let err = BridgeError::marshal("object", "int");
        assert_eq!(err.to_string(), "Cannot marshal object to int");
        assert_eq!(err.error_type(), "MarshalError");
    }
}
