//! Method registry: bound names to host objects and their exposed methods

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{BridgeError, BridgeResult};
use crate::host::HostObject;
use crate::value::MethodSignature;

/// One host object exposed to scripts under a global name
pub struct BoundObject {
    name: String,
    object: Rc<dyn HostObject>,
    methods: HashMap<String, MethodSignature>,
}

impl BoundObject {
    /// Resolve `method_names` against `object`.
    ///
    /// Every name must match exactly one method; overloaded names cannot be
    /// dispatched from untyped script calls and are rejected.
    pub fn resolve(
        name: impl Into<String>,
        object: Rc<dyn HostObject>,
        method_names: &[&str],
    ) -> BridgeResult<Self> {
        let available = object.methods();
        let mut methods = HashMap::with_capacity(method_names.len());

        for &method in method_names {
            let mut candidates = available.iter().filter(|sig| sig.name == method);
            let signature = match (candidates.next(), candidates.next()) {
                (Some(signature), None) => signature.clone(),
                (None, _) => {
                    return Err(BridgeError::unresolved_method(
                        object.type_name(),
                        method,
                        "no such method",
                    ));
                }
                (Some(_), Some(_)) => {
                    return Err(BridgeError::unresolved_method(
                        object.type_name(),
                        method,
                        "overloaded methods are not supported",
                    ));
                }
            };
            methods.insert(method.to_string(), signature);
        }

        Ok(Self {
            name: name.into(),
            object,
            methods,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object(&self) -> &Rc<dyn HostObject> {
        &self.object
    }

    pub fn method(&self, name: &str) -> Option<&MethodSignature> {
        self.methods.get(name)
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }
}

/// Per-context map of bound names
#[derive(Default)]
pub struct MethodRegistry {
    bindings: HashMap<String, Rc<BoundObject>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Register a binding; a name can be bound only once
    pub fn insert(&mut self, bound: BoundObject) -> BridgeResult<Rc<BoundObject>> {
        if self.bindings.contains_key(bound.name()) {
            return Err(BridgeError::DuplicateBinding(bound.name().to_string()));
        }
        let bound = Rc::new(bound);
        self.bindings
            .insert(bound.name().to_string(), Rc::clone(&bound));
        Ok(bound)
    }

    /// Undo an `insert` whose script-side installation failed
    pub(crate) fn remove(&mut self, name: &str) -> Option<Rc<BoundObject>> {
        self.bindings.remove(name)
    }

    /// Find the target of a script call to `binding.method`
    pub fn lookup(
        &self,
        binding: &str,
        method: &str,
    ) -> BridgeResult<(Rc<BoundObject>, MethodSignature)> {
        let bound = self.bindings.get(binding).ok_or_else(|| {
            BridgeError::unresolved_method(binding, method, "binding does not exist")
        })?;
        let signature = bound.method(method).cloned().ok_or_else(|| {
            BridgeError::unresolved_method(bound.object().type_name(), method, "method is not bound")
        })?;
        Ok((Rc::clone(bound), signature))
    }
}
