//! Handle entry layer
//!
//! Opaque integer handles over [`BridgeContext`] for embedders that cannot
//! hold Rust values across their boundary. Handles live in a thread-local
//! table and are only meaningful on the thread that created them.
//!
//! ```
//! use jsbridge::handle::{self, ContextHandle};
//!
//! let h = handle::create_context();
//! assert_ne!(h, ContextHandle::NULL);
//! assert_eq!(handle::evaluate(h, "6 * 7", "answer.js").unwrap(), "42");
//! handle::destroy_context(h);
//! assert!(handle::evaluate(h, "1", "late.js").is_err());
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::config::BridgeConfig;
use crate::context::BridgeContext;
use crate::error::{BridgeError, BridgeResult};
use crate::host::HostObject;
use crate::proxy::ProxyHandle;
use crate::slots::{SlotKey, SlotTable};
use crate::value::{HostValue, MethodSignature};

thread_local! {
    static CONTEXTS: RefCell<SlotTable<Rc<BridgeContext>>> = RefCell::new(SlotTable::new());
}

/// Opaque reference to a live context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(i64);

impl ContextHandle {
    /// Returned when a context could not be created; never refers to one
    pub const NULL: ContextHandle = ContextHandle(0);

    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> i64 {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Create a context with default configuration
pub fn create_context() -> ContextHandle {
    create_context_with(BridgeConfig::default())
}

/// Create a context, or return [`ContextHandle::NULL`] if the engine could
/// not be allocated
pub fn create_context_with(config: BridgeConfig) -> ContextHandle {
    match BridgeContext::with_config(config) {
        Ok(context) => {
            let key = CONTEXTS.with(|table| table.borrow_mut().insert(Rc::new(context)));
            ContextHandle(key.to_raw())
        }
        Err(e) => {
            warn!(error = %e, "failed to create bridge context");
            ContextHandle::NULL
        }
    }
}

/// Destroy a context. Unknown or already destroyed handles are ignored.
pub fn destroy_context(handle: ContextHandle) {
    let removed = SlotKey::from_raw(handle.0)
        .and_then(|key| CONTEXTS.with(|table| table.borrow_mut().remove(key)));
    match removed {
        // Dropped outside the table borrow; the context's own Drop logs.
        Some(context) => drop(context),
        None => warn!(handle = handle.0, "destroy of unknown bridge context ignored"),
    }
}

/// Number of live contexts on this thread
pub fn live_contexts() -> usize {
    CONTEXTS.with(|table| table.borrow().len())
}

fn resolve(handle: ContextHandle) -> BridgeResult<Rc<BridgeContext>> {
    SlotKey::from_raw(handle.0)
        .and_then(|key| CONTEXTS.with(|table| table.borrow().get(key).cloned()))
        .ok_or(BridgeError::InvalidContext)
}

pub fn evaluate(handle: ContextHandle, source: &str, source_name: &str) -> BridgeResult<String> {
    resolve(handle)?.evaluate(source, source_name)
}

pub fn bind(
    handle: ContextHandle,
    name: &str,
    object: Rc<dyn HostObject>,
    method_names: &[&str],
) -> BridgeResult<()> {
    resolve(handle)?.bind(name, object, method_names)
}

pub fn proxy(handle: ContextHandle, name: &str, method_names: &[&str]) -> BridgeResult<ProxyHandle> {
    resolve(handle)?.proxy(name, method_names)
}

pub fn call(
    handle: ContextHandle,
    proxy: ProxyHandle,
    method: &MethodSignature,
    args: &[HostValue],
) -> BridgeResult<HostValue> {
    let context = resolve(handle)?;
    trace!(context = context.id(), proxy = %proxy, "call through handle");
    context.call(proxy, method, args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_handle_is_invalid() {
        assert!(ContextHandle::NULL.is_null());
        assert!(matches!(
            evaluate(ContextHandle::NULL, "1", "null.js"),
            Err(BridgeError::InvalidContext)
        ));
        // Harmless
        destroy_context(ContextHandle::NULL);
    }

    #[test]
    fn test_destroy_twice() {
        let h = create_context();
        assert!(!h.is_null());
        let before = live_contexts();
        destroy_context(h);
        destroy_context(h);
        assert_eq!(live_contexts(), before - 1);
    }

    #[test]
    fn test_reused_slot_does_not_revive_handle() {
        let first = create_context();
        destroy_context(first);
        let second = create_context();
        assert_ne!(first, second);
        assert!(matches!(evaluate(first, "1", "stale.js"), Err(BridgeError::InvalidContext)));
        assert_eq!(evaluate(second, "1", "fresh.js").unwrap(), "1");
        destroy_context(second);
    }
}
