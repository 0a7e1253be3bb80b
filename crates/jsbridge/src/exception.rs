//! Translation of errors across the boundary
//!
//! Script exceptions leaving the engine become [`BridgeError`]s. Host
//! failures inside trampolines become script exceptions, so that script
//! `try/catch` sees them; host exceptions are parked in a
//! [`HostErrorQueue`] and tagged on the thrown error object, which lets the
//! original exception resurface if the script does not catch it.

use std::cell::RefCell;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use rquickjs::{Ctx, Exception, Function, Object, Value};

use crate::error::BridgeError;
use crate::host::HostException;

/// Property carrying the queue id of a host exception on a thrown error
pub(crate) const HOST_ERROR_KEY: &str = "__jsbridgeHostError";

/// Location of the innermost frame in a QuickJS backtrace line, e.g.
/// `    at run (app.js:12:5)` or `    at broken.js:3`
static FRAME_LOCATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(?([^\s():]+):(\d+)(?::\d+)?\)?\s*$").expect("valid regex"));

/// Host exceptions thrown into script code and not yet resolved
#[derive(Default)]
pub(crate) struct HostErrorQueue {
    next_id: u32,
    pending: HashMap<u32, HostException>,
}

impl HostErrorQueue {
    pub(crate) fn push(&mut self, exception: HostException) -> u32 {
        self.next_id = self.next_id.wrapping_add(1);
        self.pending.insert(self.next_id, exception);
        self.next_id
    }

    pub(crate) fn take(&mut self, id: u32) -> Option<HostException> {
        self.pending.remove(&id)
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Raise a host exception as a script `Error`
pub(crate) fn throw_host_exception<'js>(
    ctx: &Ctx<'js>,
    queue: &mut HostErrorQueue,
    exception: HostException,
) -> rquickjs::Error {
    let message = exception.to_string();
    let id = queue.push(exception);
    match Exception::from_message(ctx.clone(), &message) {
        Ok(error) => {
            if error.as_object().set(HOST_ERROR_KEY, id).is_err() {
                return Exception::throw_message(ctx, &message);
            }
            ctx.throw(error.as_object().clone().into_value())
        }
        Err(e) => e,
    }
}

/// Raise a bridge failure (marshalling, arity, resolution) as a script
/// `TypeError`
pub(crate) fn throw_bridge_error(ctx: &Ctx<'_>, error: &BridgeError) -> rquickjs::Error {
    Exception::throw_type(ctx, &error.to_string())
}

/// Convert an engine error into a bridge error, consuming any pending
/// script exception.
pub(crate) fn from_engine_error<'js>(
    ctx: &Ctx<'js>,
    error: rquickjs::Error,
    source_name: Option<&str>,
    queue: &RefCell<HostErrorQueue>,
) -> BridgeError {
    if !error.is_exception() {
        return BridgeError::from(error);
    }
    let thrown = ctx.catch();
    from_thrown(ctx, &thrown, source_name, queue)
}

/// Build a bridge error from a thrown script value
pub(crate) fn from_thrown<'js>(
    ctx: &Ctx<'js>,
    thrown: &Value<'js>,
    source_name: Option<&str>,
    queue: &RefCell<HostErrorQueue>,
) -> BridgeError {
    let Some(object) = thrown.as_object() else {
        // Primitive throw (`throw "oops"`, `throw 42`)
        return BridgeError::Script {
            error_type: "Error".into(),
            message: describe(ctx, thrown),
            source_name: source_name.map(str::to_string),
            line: None,
            stack: None,
        };
    };

    let stack = string_property(object, "stack");

    let host_error = object
        .get::<_, Option<u32>>(HOST_ERROR_KEY)
        .ok()
        .flatten()
        .and_then(|id| queue.borrow_mut().take(id));
    if let Some(exception) = host_error {
        return BridgeError::Host {
            exception,
            script_stack: stack,
        };
    }

    let error_type = string_property(object, "name").unwrap_or_else(|| "Error".to_string());
    let message = string_property(object, "message").unwrap_or_else(|| describe(ctx, thrown));
    let frame = stack.as_deref().and_then(first_frame);
    let (frame_source, line) = match frame {
        Some((source, line)) => (Some(source), Some(line)),
        None => (None, None),
    };

    BridgeError::Script {
        error_type,
        message,
        source_name: frame_source.or_else(|| source_name.map(str::to_string)),
        line,
        stack,
    }
}

fn string_property(object: &Object<'_>, name: &str) -> Option<String> {
    object.get::<_, Option<String>>(name).ok().flatten()
}

/// `String(value)`, or a placeholder when the conversion itself throws
pub(crate) fn describe<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> String {
    match coerce_string(ctx, value.clone()) {
        Ok(text) => text,
        Err(e) => {
            if e.is_exception() {
                // Discard the conversion's own exception.
                let _ = ctx.catch();
            }
            "Unknown error".to_string()
        }
    }
}

/// Source name and line of the innermost script frame in a backtrace.
/// Native frames carry no location and are skipped.
fn first_frame(stack: &str) -> Option<(String, u32)> {
    stack
        .lines()
        .filter(|line| line.trim_start().starts_with("at "))
        .filter_map(|line| FRAME_LOCATION.captures(line))
        .find_map(|captures| {
            let line = captures.get(2)?.as_str().parse().ok()?;
            Some((captures.get(1)?.as_str().to_string(), line))
        })
}

/// Apply the script `String()` conversion
pub(crate) fn coerce_string<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> rquickjs::Result<String> {
    if let Some(s) = value.as_string() {
        return s.to_string();
    }
    let convert: Function = ctx.globals().get("String")?;
    convert.call::<_, String>((value,))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame() {
        assert_eq!(
            first_frame("    at run (app.js:12:5)\n    at <eval> (main.js:20)\n"),
            Some(("app.js".to_string(), 12))
        );
        assert_eq!(
            first_frame("    at log (native)\n    at run (svc.js:4:9)\n"),
            Some(("svc.js".to_string(), 4))
        );
        assert_eq!(first_frame("    at broken.js:3\n"), Some(("broken.js".to_string(), 3)));
        assert_eq!(first_frame("no frames here"), None);
    }

    #[test]
    fn test_queue_take_once() {
        let mut queue = HostErrorQueue::default();
        let id = queue.push(HostException::new("E", "boom"));
        assert_eq!(queue.take(id).map(|e| e.message), Some("boom".to_string()));
        assert!(queue.take(id).is_none());

        let id = queue.push(HostException::new("E", "again"));
        queue.clear();
        assert!(queue.take(id).is_none());
    }
}
