//! Proxy table: script objects wrapped to satisfy host interfaces

use std::collections::HashSet;
use std::fmt;

use rquickjs::{Object, Persistent};

use crate::error::{BridgeError, BridgeResult};
use crate::slots::{SlotKey, SlotTable};

/// Stable handle to a script-backed proxy
///
/// The raw form of an issued handle is always positive.
/// [`ProxyHandle::INVALID`] (`-1`) is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProxyHandle(i64);

impl ProxyHandle {
    pub const INVALID: ProxyHandle = ProxyHandle(-1);

    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ProxyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One script object and the methods the host may call on it
#[derive(Clone)]
pub struct ProxyEntry {
    pub(crate) name: String,
    pub(crate) object: Persistent<Object<'static>>,
    methods: HashSet<String>,
}

impl ProxyEntry {
    pub(crate) fn new(
        name: impl Into<String>,
        object: Persistent<Object<'static>>,
        methods: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            name: name.into(),
            object,
            methods: methods.into_iter().collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declares(&self, method: &str) -> bool {
        self.methods.contains(method)
    }
}

/// Per-context table of live proxies
///
/// Entries are never removed while the context lives, so issued handles
/// increase monotonically and never alias.
#[derive(Default)]
pub struct ProxyTable {
    entries: SlotTable<ProxyEntry>,
}

impl ProxyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, entry: ProxyEntry) -> ProxyHandle {
        ProxyHandle(self.entries.insert(entry).to_raw())
    }

    pub fn get(&self, handle: ProxyHandle) -> BridgeResult<&ProxyEntry> {
        SlotKey::from_raw(handle.0)
            .and_then(|key| self.entries.get(key))
            .ok_or(BridgeError::StaleHandle(handle.0))
    }

    /// Release every entry. Must run before the engine instance is freed,
    /// since entries hold persistent engine references.
    pub(crate) fn clear(&mut self) -> usize {
        self.entries.drain().len()
    }
}
