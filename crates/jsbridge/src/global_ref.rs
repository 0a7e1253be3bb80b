//! Process-wide reference to the host environment
//!
//! Established by the first context creation and reused by every later
//! context. It is never torn down: trampolines in any live context may still
//! need it after the context that established it has been destroyed.

use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::debug;

use crate::host::HostEnvironment;

static HOST_ENVIRONMENT: OnceCell<GlobalHostRef> = OnceCell::new();

/// Durable handle to the process-wide host environment
pub struct GlobalHostRef {
    host: Arc<dyn HostEnvironment>,
}

impl GlobalHostRef {
    pub fn host(&self) -> &dyn HostEnvironment {
        self.host.as_ref()
    }
}

/// Establish the reference, or return the existing one.
///
/// `init` runs at most once per process even when several threads race to
/// create their first context.
pub fn establish<F>(init: F) -> &'static GlobalHostRef
where
    F: FnOnce() -> Arc<dyn HostEnvironment>,
{
    HOST_ENVIRONMENT.get_or_init(|| {
        debug!("establishing process-wide host environment reference");
        GlobalHostRef { host: init() }
    })
}

/// The reference, if some context has established it
pub fn get() -> Option<&'static GlobalHostRef> {
    HOST_ENVIRONMENT.get()
}

/// Local time-zone offset in seconds east of UTC, or 0 before the reference
/// exists
pub(crate) fn local_time_zone_offset(epoch_millis: f64) -> i32 {
    match get() {
        Some(global) => global.host().local_time_zone_offset(epoch_millis),
        None => 0,
    }
}
