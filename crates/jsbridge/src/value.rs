//! Host-side value and method descriptor types

use std::fmt;

/// Declared type of a host method parameter or return value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostType {
    /// No value; only meaningful as a return type
    Void,
    Boolean,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer, limited to the script safe-integer range
    Long,
    Double,
    String,
    /// Dynamically typed value, mapped by its own runtime variant
    Object,
    /// Homogeneous array of the element type
    Array(Box<HostType>),
    /// Arbitrary JSON-compatible value
    Json,
}

impl HostType {
    /// Array type with the given element type
    pub fn array_of(element: HostType) -> Self {
        Self::Array(Box::new(element))
    }

    /// Whether `HostValue::Null` is a valid value of this type
    pub fn is_nullable(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Object | Self::Array(_) | Self::Json
        )
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Boolean => f.write_str("boolean"),
            Self::Int => f.write_str("int"),
            Self::Long => f.write_str("long"),
            Self::Double => f.write_str("double"),
            Self::String => f.write_str("String"),
            Self::Object => f.write_str("Object"),
            Self::Array(element) => write!(f, "{}[]", element),
            Self::Json => f.write_str("JSON"),
        }
    }
}

/// A value on the host side of the boundary
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    Array(Vec<HostValue>),
    Json(serde_json::Value),
}

impl HostValue {
    /// Short description of the value's variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Double(_) => "double",
            Self::String(_) => "String",
            Self::Array(_) => "array",
            Self::Json(_) => "JSON",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Human-readable rendering, mirroring the script `String()` conversion
    /// for primitives.
    pub fn display(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Long(l) => l.to_string(),
            Self::Double(d) => d.to_string(),
            Self::String(s) => s.clone(),
            Self::Array(items) => items
                .iter()
                .map(HostValue::display)
                .collect::<Vec<_>>()
                .join(","),
            Self::Json(json) => json.to_string(),
        }
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i32> for HostValue {
    fn from(i: i32) -> Self {
        Self::Int(i)
    }
}

impl From<i64> for HostValue {
    fn from(l: i64) -> Self {
        Self::Long(l)
    }
}

impl From<f64> for HostValue {
    fn from(d: f64) -> Self {
        Self::Double(d)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<serde_json::Value> for HostValue {
    fn from(json: serde_json::Value) -> Self {
        Self::Json(json)
    }
}

/// Reflective descriptor of one host method
///
/// A varargs method declares its last parameter as `HostType::Array(T)`;
/// script callers pass the trailing arguments individually and the bridge
/// collects them into that array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: String,
    pub params: Vec<HostType>,
    pub returns: HostType,
    pub varargs: bool,
}

impl MethodSignature {
    /// Create a signature with no parameters returning `Void`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: HostType::Void,
            varargs: false,
        }
    }

    /// Append a parameter type
    pub fn param(mut self, ty: HostType) -> Self {
        self.params.push(ty);
        self
    }

    /// Set the return type
    pub fn returns(mut self, ty: HostType) -> Self {
        self.returns = ty;
        self
    }

    /// Append a trailing varargs parameter collecting elements of `element`
    pub fn varargs(mut self, element: HostType) -> Self {
        self.params.push(HostType::array_of(element));
        self.varargs = true;
        self
    }

    /// Element type of the varargs parameter, if any
    pub fn varargs_element(&self) -> Option<&HostType> {
        if !self.varargs {
            return None;
        }
        match self.params.last() {
            Some(HostType::Array(element)) => Some(element),
            _ => None,
        }
    }

    /// Number of parameters that must always be supplied
    pub fn fixed_arity(&self) -> usize {
        if self.varargs_element().is_some() {
            self.params.len() - 1
        } else {
            self.params.len()
        }
    }

    /// Human-readable description of the accepted argument count
    pub fn arity_description(&self) -> String {
        if self.varargs_element().is_some() {
            format!("at least {}", self.fixed_arity())
        } else {
            self.params.len().to_string()
        }
    }

    /// Check an argument count against this signature
    pub fn accepts_arity(&self, count: usize) -> bool {
        if self.varargs_element().is_some() {
            count >= self.fixed_arity()
        } else {
            count == self.params.len()
        }
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.returns, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match param {
                HostType::Array(element) if self.varargs && i == self.params.len() - 1 => {
                    write!(f, "{}...", element)?
                }
                other => write!(f, "{}", other)?,
            }
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_display() {
        let sig = MethodSignature::new("greet")
            .param(HostType::String)
            .param(HostType::Int)
            .returns(HostType::String);
        assert_eq!(sig.to_string(), "String greet(String, int)");
    }

    #[test]
    fn test_varargs_arity() {
        let sig = MethodSignature::new("log")
            .param(HostType::String)
            .varargs(HostType::Object);

        assert_eq!(sig.fixed_arity(), 1);
        assert_eq!(sig.varargs_element(), Some(&HostType::Object));
        assert!(!sig.accepts_arity(0));
        assert!(sig.accepts_arity(1));
        assert!(sig.accepts_arity(5));
        assert_eq!(sig.arity_description(), "at least 1");
        assert_eq!(sig.to_string(), "void log(String, Object...)");
    }

    #[test]
    fn test_fixed_arity() {
        let sig = MethodSignature::new("add")
            .param(HostType::Int)
            .param(HostType::Int)
            .returns(HostType::Int);

        assert!(sig.accepts_arity(2));
        assert!(!sig.accepts_arity(1));
        assert!(!sig.accepts_arity(3));
    }

    #[test]
    fn test_nullable_types() {
        assert!(HostType::String.is_nullable());
        assert!(HostType::array_of(HostType::Int).is_nullable());
        assert!(!HostType::Int.is_nullable());
        assert!(!HostType::Boolean.is_nullable());
    }

    #[test]
    fn test_host_value_display() {
        let value = HostValue::Array(vec![1.into(), "two".into(), HostValue::Null]);
        assert_eq!(value.display(), "1,two,null");
        assert_eq!(value.kind(), "array");
    }
}
