//! Host collaborator interfaces
//!
//! The bridge never inspects host objects directly. It asks a [`HostObject`]
//! for its method descriptors and invokes methods reflectively by name, and
//! it asks the process-wide [`HostEnvironment`] for services the script engine
//! needs, such as the local time-zone offset.

use chrono::{Local, TimeZone};
use thiserror::Error;

use crate::value::{HostValue, MethodSignature};

/// An exception raised by host code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{type_name}: {message}")]
pub struct HostException {
    pub type_name: String,
    pub message: String,
    /// Host-side stack trace, when the host can provide one
    pub stack: Option<String>,
}

impl HostException {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            stack: None,
        }
    }

    /// Attach a host-side stack trace
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

/// A host object that can be exposed to scripts
///
/// Implementations describe their callable methods with
/// [`MethodSignature`]s and dispatch invocations by method name. Arguments
/// arrive already converted to the declared parameter types; the returned
/// value must match the declared return type.
pub trait HostObject {
    /// Name of the host type, used in diagnostics
    fn type_name(&self) -> &str;

    /// All methods this object offers
    fn methods(&self) -> Vec<MethodSignature>;

    /// Invoke `method` with marshalled arguments
    fn invoke(&self, method: &str, args: Vec<HostValue>) -> Result<HostValue, HostException>;
}

/// Process-wide host services used by every context
pub trait HostEnvironment: Send + Sync {
    /// Local time-zone offset in seconds east of UTC at `epoch_millis`
    fn local_time_zone_offset(&self, epoch_millis: f64) -> i32;
}

/// Host environment backed by the operating system's local time zone
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

impl HostEnvironment for SystemHost {
    fn local_time_zone_offset(&self, epoch_millis: f64) -> i32 {
        if !epoch_millis.is_finite() {
            return 0;
        }
        Local
            .timestamp_millis_opt(epoch_millis as i64)
            .single()
            .map(|time| time.offset().local_minus_utc())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_exception_display() {
        let ex = HostException::new("IllegalArgumentException", "bad input").with_stack("at Foo.bar");
        assert_eq!(ex.to_string(), "IllegalArgumentException: bad input");
        assert_eq!(ex.stack.as_deref(), Some("at Foo.bar"));
    }

    #[test]
    fn test_system_host_offset_is_bounded() {
        let offset = SystemHost.local_time_zone_offset(0.0);
        assert!(offset.abs() <= 14 * 3600);
        assert_eq!(SystemHost.local_time_zone_offset(f64::NAN), 0);
    }
}
