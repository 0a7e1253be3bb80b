//! Bidirectional bridge between Rust host objects and an embedded QuickJS
//! engine.
//!
//! A [`BridgeContext`] owns one engine instance. Host code evaluates script
//! source in it, binds host objects as script globals, and wraps script
//! objects as proxies it can call back into.
//!
//! # Example
//!
//! ```
//! use jsbridge::{BridgeContext, HostType, HostValue, MethodSignature};
//!
//! let ctx = BridgeContext::new().unwrap();
//! ctx.evaluate("var impl = { run: function () { return 42; } };", "impl.js")
//!     .unwrap();
//!
//! let handle = ctx.proxy("impl", &["run"]).unwrap();
//! let run = MethodSignature::new("run").returns(HostType::Int);
//! assert_eq!(ctx.call(handle, &run, &[]).unwrap(), HostValue::Int(42));
//! ```
//!
//! # Thread Safety
//!
//! Contexts are `!Send` and `!Sync`. The engine is single-threaded, so a
//! context stays on the thread that created it. Independent contexts on
//! different threads do not interact, apart from sharing the process-wide
//! host environment in [`global_ref`].
//!
//! ```compile_fail
//! use jsbridge::BridgeContext;
//!
//! let ctx = BridgeContext::new().unwrap();
//! std::thread::spawn(move || {
//!     let _ = ctx.evaluate("1 + 1", "thread.js");
//! });
//! ```

mod config;
mod context;
mod error;
mod exception;
pub mod global_ref;
pub mod handle;
mod host;
pub mod marshal;
mod proxy;
mod registry;
mod slots;
mod value;

pub use config::BridgeConfig;
pub use context::{BridgeContext, ContextState};
pub use error::{BridgeError, BridgeResult};
pub use handle::ContextHandle;
pub use host::{HostEnvironment, HostException, HostObject, SystemHost};
pub use proxy::{ProxyEntry, ProxyHandle, ProxyTable};
pub use registry::{BoundObject, MethodRegistry};
pub use value::{HostType, HostValue, MethodSignature};
