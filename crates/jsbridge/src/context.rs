//! Bridge context: one script engine instance and everything bound to it

use std::cell::{Cell, RefCell};
use std::ffi::CString;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rquickjs::function::{Args, Rest};
use rquickjs::{Context, Ctx, Function, Object, Persistent, Runtime, Value, qjs};
use scopeguard::ScopeGuard;
use tracing::{debug, trace};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::exception::{self, HostErrorQueue, coerce_string};
use crate::global_ref;
use crate::host::{HostEnvironment, HostObject, SystemHost};
use crate::marshal;
use crate::proxy::{ProxyEntry, ProxyHandle, ProxyTable};
use crate::registry::{BoundObject, MethodRegistry};
use crate::value::{HostType, HostValue, MethodSignature};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Redirects `Date.prototype.getTimezoneOffset` to a native offset query.
/// The native function returns seconds east of UTC; the script API wants
/// minutes west of UTC.
const TIMEZONE_PRELUDE: &str = r#"
(function (localOffsetSeconds) {
  Object.defineProperty(Date.prototype, 'getTimezoneOffset', {
    value: function getTimezoneOffset() {
      var time = this.getTime();
      if (time !== time) return NaN;
      return 0 - localOffsetSeconds(time) / 60;
    },
    writable: true,
    configurable: true,
    enumerable: false
  });
})
"#;

/// What a context is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Created,
    Evaluating,
    Binding,
    Proxying,
    Calling,
}

impl ContextState {
    fn activity(self) -> &'static str {
        match self {
            Self::Created => "idle",
            Self::Evaluating => "evaluating",
            Self::Binding => "binding",
            Self::Proxying => "proxying",
            Self::Calling => "calling",
        }
    }
}

/// State reachable from the native trampolines installed in the engine.
/// Trampolines hold it weakly, so they fail cleanly once the context is gone.
struct Shared {
    registry: RefCell<MethodRegistry>,
    host_errors: RefCell<HostErrorQueue>,
}

/// Marks an operation in progress; returns the context to `Created` and
/// forgets unclaimed host exceptions when the operation ends.
struct Activity<'a> {
    context: &'a BridgeContext,
}

impl Drop for Activity<'_> {
    fn drop(&mut self) {
        self.context.state.set(ContextState::Created);
        self.context.shared.host_errors.borrow_mut().clear();
    }
}

/// A bridge between host objects and one embedded script engine instance
///
/// Owns the engine, the bound host objects and the script-backed proxies.
/// Dropping the context releases all of them.
///
/// # Thread Safety
///
/// This type is `!Send` and `!Sync`: the engine instance is single-threaded
/// and not reentrant. Host code must serialize calls into a context; a
/// host callback that re-enters the context calling it gets
/// [`BridgeError::Busy`].
pub struct BridgeContext {
    id: u64,
    state: Cell<ContextState>,
    strict: bool,
    shared: Rc<Shared>,
    // Declared before the engine so persistent references drop first.
    proxies: RefCell<ProxyTable>,
    context: Context,
    runtime: Runtime,
}

impl BridgeContext {
    /// Create a context with default configuration
    pub fn new() -> BridgeResult<Self> {
        Self::with_config(BridgeConfig::default())
    }

    /// Create a context with the given configuration
    pub fn with_config(config: BridgeConfig) -> BridgeResult<Self> {
        Self::create(None, config)
    }

    /// Create a context, offering `host` as the process-wide host environment.
    ///
    /// Only the first context created in a process establishes the host
    /// environment; later offers are ignored.
    pub fn with_host(host: Arc<dyn HostEnvironment>, config: BridgeConfig) -> BridgeResult<Self> {
        Self::create(Some(host), config)
    }

    fn create(host: Option<Arc<dyn HostEnvironment>>, config: BridgeConfig) -> BridgeResult<Self> {
        let mut offered = host;
        global_ref::establish(|| offered.take().unwrap_or_else(|| Arc::new(SystemHost)));
        if offered.is_some() {
            debug!("host environment already established; ignoring the one offered");
        }

        let runtime = Runtime::new().map_err(|e| BridgeError::Allocation(e.to_string()))?;
        if let Some(limit) = config.memory_limit {
            runtime.set_memory_limit(limit);
        }
        if let Some(size) = config.max_stack_size {
            runtime.set_max_stack_size(size);
        }
        if let Some(threshold) = config.gc_threshold {
            runtime.set_gc_threshold(threshold);
        }
        let context = Context::full(&runtime).map_err(|e| BridgeError::Allocation(e.to_string()))?;

        if config.timezone_trampoline {
            context.with(|ctx| install_timezone_trampoline(&ctx))?;
        }

        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        debug!(context = id, "created bridge context");

        Ok(Self {
            id,
            state: Cell::new(ContextState::Created),
            strict: config.strict,
            shared: Rc::new(Shared {
                registry: RefCell::new(MethodRegistry::new()),
                host_errors: RefCell::new(HostErrorQueue::default()),
            }),
            proxies: RefCell::new(ProxyTable::new()),
            context,
            runtime,
        })
    }

    /// Process-unique id, used in diagnostics
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> ContextState {
        self.state.get()
    }

    /// Number of bound host objects
    pub fn binding_count(&self) -> usize {
        self.shared.registry.borrow().len()
    }

    /// Number of live proxies
    pub fn proxy_count(&self) -> usize {
        self.proxies.borrow().len()
    }

    /// Force a garbage collection in the engine
    pub fn gc(&self) {
        self.runtime.run_gc();
    }

    fn enter(&self, next: ContextState) -> BridgeResult<Activity<'_>> {
        match self.state.get() {
            ContextState::Created => {
                self.state.set(next);
                Ok(Activity { context: self })
            }
            current => Err(BridgeError::Busy(current.activity())),
        }
    }

    fn script_error<'js>(
        &self,
        ctx: &Ctx<'js>,
        error: rquickjs::Error,
        source_name: Option<&str>,
    ) -> BridgeError {
        exception::from_engine_error(ctx, error, source_name, &self.shared.host_errors)
    }

    fn eval_value<'js>(&self, ctx: &Ctx<'js>, source: &str, source_name: &str) -> BridgeResult<Value<'js>> {
        eval_named(ctx, source, source_name, self.strict)
            .map_err(|e| self.script_error(ctx, e, Some(source_name)))
    }

    /// Evaluate `source` and return its completion value as a string.
    ///
    /// `source_name` attributes errors raised while compiling or running.
    pub fn evaluate(&self, source: &str, source_name: &str) -> BridgeResult<String> {
        let _activity = self.enter(ContextState::Evaluating)?;
        trace!(context = self.id, source_name, "evaluate");

        self.context.with(|ctx| {
            let value = self.eval_value(&ctx, source, source_name)?;
            coerce_string(&ctx, value).map_err(|e| self.script_error(&ctx, e, Some(source_name)))
        })
    }

    /// Evaluate `source` and unmarshal its completion value as `ty`
    pub fn evaluate_as(&self, source: &str, source_name: &str, ty: &HostType) -> BridgeResult<HostValue> {
        let _activity = self.enter(ContextState::Evaluating)?;
        trace!(context = self.id, source_name, %ty, "evaluate");

        self.context.with(|ctx| {
            let value = self.eval_value(&ctx, source, source_name)?;
            marshal::from_script(&ctx, ty, &value)
        })
    }

    /// Expose `object` as the script global `name` with the listed methods.
    ///
    /// Fails if `name` is already bound or already names a script global,
    /// or if a method does not resolve to exactly one host method.
    pub fn bind(&self, name: &str, object: Rc<dyn HostObject>, method_names: &[&str]) -> BridgeResult<()> {
        let _activity = self.enter(ContextState::Binding)?;

        if self.shared.registry.borrow().contains(name) {
            return Err(BridgeError::DuplicateBinding(name.to_string()));
        }
        let bound = BoundObject::resolve(name, object, method_names)?;

        self.context.with(|ctx| {
            let globals = ctx.globals();
            if globals.contains_key(name)? {
                return Err(BridgeError::DuplicateBinding(name.to_string()));
            }

            let bound = self.shared.registry.borrow_mut().insert(bound)?;
            let rollback = scopeguard::guard((), |_| {
                self.shared.registry.borrow_mut().remove(name);
            });

            let target = install_binding(&ctx, &self.shared, &bound)
                .map_err(|e| self.script_error(&ctx, e, None))?;
            globals
                .set(name, target)
                .map_err(|e| self.script_error(&ctx, e, None))?;

            ScopeGuard::into_inner(rollback);
            debug!(context = self.id, name, methods = method_names.len(), "bound host object");
            Ok(())
        })
    }

    /// Wrap the script global `name` as a proxy offering `method_names`.
    ///
    /// Every call issues a new handle.
    pub fn proxy(&self, name: &str, method_names: &[&str]) -> BridgeResult<ProxyHandle> {
        let _activity = self.enter(ContextState::Proxying)?;

        let entry = self.context.with(|ctx| {
            let global: Value = ctx
                .globals()
                .get(name)
                .map_err(|e| self.script_error(&ctx, e, None))?;
            let Some(object) = global.as_object() else {
                return Err(BridgeError::UnresolvedGlobal(name.to_string()));
            };

            for &method in method_names {
                let member: Value = object
                    .get(method)
                    .map_err(|e| self.script_error(&ctx, e, None))?;
                if !member.is_function() {
                    return Err(BridgeError::unresolved_method(
                        name,
                        method,
                        format!("member is {}, not a function", marshal::script_kind(&member)),
                    ));
                }
            }

            Ok(ProxyEntry::new(
                name,
                Persistent::save(&ctx, object.clone()),
                method_names.iter().map(|m| m.to_string()),
            ))
        })?;

        let handle = self.proxies.borrow_mut().insert(entry);
        debug!(context = self.id, name, %handle, "created script proxy");
        Ok(handle)
    }

    /// Call `method` on the script object behind `proxy`
    pub fn call(&self, proxy: ProxyHandle, method: &MethodSignature, args: &[HostValue]) -> BridgeResult<HostValue> {
        let _activity = self.enter(ContextState::Calling)?;

        let entry = self.proxies.borrow().get(proxy)?.clone();
        if !entry.declares(&method.name) {
            return Err(BridgeError::unresolved_method(
                entry.name(),
                &method.name,
                "method was not declared when the proxy was created",
            ));
        }
        trace!(context = self.id, proxy = %proxy, method = %method, "host -> script call");

        self.context.with(|ctx| {
            let object: Object = entry.object.clone().restore(&ctx)?;
            let member: Value = object
                .get(method.name.as_str())
                .map_err(|e| self.script_error(&ctx, e, None))?;
            let Some(function) = member.as_function() else {
                return Err(BridgeError::unresolved_method(
                    entry.name(),
                    &method.name,
                    "member is no longer a function",
                ));
            };

            let values = marshal::arguments_to_script(&ctx, method, args)?;
            let mut call_args = Args::new(ctx.clone(), values.len());
            call_args.this(object.clone())?;
            for value in values {
                call_args.push_arg(value)?;
            }

            let result: Value = function
                .call_arg(call_args)
                .map_err(|e| self.script_error(&ctx, e, None))?;
            marshal::from_script(&ctx, &method.returns, &result)
        })
    }
}

impl fmt::Debug for BridgeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeContext")
            .field("id", &self.id)
            .field("state", &self.state.get())
            .finish()
    }
}

impl Drop for BridgeContext {
    fn drop(&mut self) {
        let released = self.proxies.get_mut().clear();
        debug!(context = self.id, proxies = released, "destroying bridge context");
    }
}

/// Evaluate global code compiled under `source_name`, so syntax errors and
/// backtraces of functions it defines name that source.
fn eval_named<'js>(
    ctx: &Ctx<'js>,
    source: &str,
    source_name: &str,
    strict: bool,
) -> rquickjs::Result<Value<'js>> {
    // The parser expects a NUL right after the source bytes.
    let mut input = Vec::with_capacity(source.len() + 1);
    input.extend_from_slice(source.as_bytes());
    input.push(0);
    let file_name = CString::new(source_name.replace('\0', "")).unwrap_or_default();

    let mut flags = qjs::JS_EVAL_TYPE_GLOBAL;
    if strict {
        flags |= qjs::JS_EVAL_FLAG_STRICT;
    }

    // SAFETY: `ctx` is live for 'js, `input` is NUL-terminated after
    // `source.len()` bytes, and both buffers outlive the call. The returned
    // value is owned and handed to `Value` unless it is the exception marker.
    unsafe {
        let raw = qjs::JS_Eval(
            ctx.as_raw().as_ptr(),
            input.as_ptr().cast(),
            source.len() as _,
            file_name.as_ptr(),
            flags as i32,
        );
        if qjs::JS_VALUE_GET_TAG(raw) == qjs::JS_TAG_EXCEPTION as i32 {
            return Err(rquickjs::Error::Exception);
        }
        Ok(Value::from_raw(ctx.clone(), raw))
    }
}

fn install_timezone_trampoline(ctx: &Ctx<'_>) -> rquickjs::Result<()> {
    let offset = Function::new(ctx.clone(), |epoch_millis: f64| {
        global_ref::local_time_zone_offset(epoch_millis)
    })?;
    let install: Function = ctx.eval(TIMEZONE_PRELUDE)?;
    install.call::<_, ()>((offset,))
}

/// Build the script object standing in for a bound host object
fn install_binding<'js>(
    ctx: &Ctx<'js>,
    shared: &Rc<Shared>,
    bound: &BoundObject,
) -> rquickjs::Result<Object<'js>> {
    let target = Object::new(ctx.clone())?;
    for method in bound.method_names() {
        let shared = Rc::downgrade(shared);
        let binding = bound.name().to_string();
        let method_name = method.to_string();
        let function = Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, args: Rest<Value<'js>>| {
                dispatch_host_call(&ctx, &shared, &binding, &method_name, &args.0)
            },
        )?;
        target.set(method, function)?;
    }
    Ok(target)
}

/// Trampoline body for script calls into bound host methods
fn dispatch_host_call<'js>(
    ctx: &Ctx<'js>,
    shared: &Weak<Shared>,
    binding: &str,
    method: &str,
    args: &[Value<'js>],
) -> rquickjs::Result<Value<'js>> {
    let Some(shared) = shared.upgrade() else {
        return Err(exception::throw_bridge_error(ctx, &BridgeError::InvalidContext));
    };
    trace!(binding, method, argc = args.len(), "script -> host call");

    let lookup = shared.registry.borrow().lookup(binding, method);
    let (bound, signature) = lookup.map_err(|e| exception::throw_bridge_error(ctx, &e))?;
    let host_args = marshal::arguments_from_script(ctx, &signature, args)
        .map_err(|e| exception::throw_bridge_error(ctx, &e))?;

    match bound.object().invoke(method, host_args) {
        Ok(result) => marshal::return_to_script(ctx, &signature, &result)
            .map_err(|e| exception::throw_bridge_error(ctx, &e)),
        Err(host_exception) => {
            debug!(binding, method, error = %host_exception, "host method raised");
            Err(exception::throw_host_exception(
                ctx,
                &mut shared.host_errors.borrow_mut(),
                host_exception,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostException;

    struct Greeter;

    impl HostObject for Greeter {
        fn type_name(&self) -> &str {
            "Greeter"
        }

        fn methods(&self) -> Vec<MethodSignature> {
            vec![
                MethodSignature::new("greet")
                    .param(HostType::String)
                    .returns(HostType::String),
            ]
        }

        fn invoke(&self, method: &str, args: Vec<HostValue>) -> Result<HostValue, HostException> {
            match (method, args.as_slice()) {
                ("greet", [HostValue::String(name)]) => Ok(format!("hello, {}", name).into()),
                _ => Err(HostException::new("IllegalArgumentException", method)),
            }
        }
    }

    #[test]
    fn test_context_creation() {
        let ctx = BridgeContext::new().unwrap();
        assert_eq!(ctx.state(), ContextState::Created);
        drop(ctx);
    }

    #[test]
    fn test_evaluate_coerces_to_string() {
        let ctx = BridgeContext::new().unwrap();
        assert_eq!(ctx.evaluate("1 + 1", "sum.js").unwrap(), "2");
        assert_eq!(ctx.evaluate("'a' + 'b'", "concat.js").unwrap(), "ab");
        assert_eq!(ctx.evaluate("undefined", "undef.js").unwrap(), "undefined");
        assert_eq!(ctx.evaluate("[1, 2]", "array.js").unwrap(), "1,2");
    }

    #[test]
    fn test_evaluate_as_json() {
        let ctx = BridgeContext::new().unwrap();
        let value = ctx
            .evaluate_as("({ a: 1, b: [true] })", "obj.js", &HostType::Json)
            .unwrap();
        assert_eq!(value, HostValue::Json(serde_json::json!({"a": 1, "b": [true]})));
    }

    #[test]
    fn test_state_returns_to_created_after_error() {
        let ctx = BridgeContext::new().unwrap();
        assert!(ctx.evaluate("throw new Error('boom')", "boom.js").is_err());
        assert_eq!(ctx.state(), ContextState::Created);
    }

    #[test]
    fn test_bind_and_call_from_script() {
        let ctx = BridgeContext::new().unwrap();
        ctx.bind("greeter", Rc::new(Greeter), &["greet"]).unwrap();
        assert_eq!(ctx.binding_count(), 1);
        assert_eq!(
            ctx.evaluate("greeter.greet('world')", "greet.js").unwrap(),
            "hello, world"
        );
    }

    #[test]
    fn test_proxy_and_call() {
        let ctx = BridgeContext::new().unwrap();
        ctx.evaluate("var doubler = { twice: function (x) { return x * 2; } };", "doubler.js")
            .unwrap();

        let handle = ctx.proxy("doubler", &["twice"]).unwrap();
        let twice = MethodSignature::new("twice")
            .param(HostType::Int)
            .returns(HostType::Int);
        assert_eq!(ctx.call(handle, &twice, &[21.into()]).unwrap(), HostValue::Int(42));
        assert_eq!(ctx.proxy_count(), 1);
    }

    #[test]
    fn test_drop_with_live_proxies() {
        let ctx = BridgeContext::new().unwrap();
        ctx.evaluate("var a = { f: function () {} };", "a.js").unwrap();
        ctx.proxy("a", &["f"]).unwrap();
        ctx.proxy("a", &["f"]).unwrap();
        ctx.gc();
        drop(ctx);
    }
}
