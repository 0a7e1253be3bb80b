//! Host-side `console` bound into scripts run by the CLI.

use std::cell::RefCell;
use std::io::Write;

use jsbridge::{HostException, HostObject, HostType, HostValue, MethodSignature};

/// Console methods bound under the `console` global
pub const METHODS: &[&str] = &["log", "info", "warn", "error"];

/// Writes console output to stdout (`log`, `info`) or stderr (`warn`,
/// `error`). When capturing, lines are kept instead.
#[derive(Default)]
pub struct Console {
    captured: Option<RefCell<Vec<String>>>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn capturing() -> Self {
        Self {
            captured: Some(RefCell::new(Vec::new())),
        }
    }

    #[cfg(test)]
    pub fn lines(&self) -> Vec<String> {
        self.captured
            .as_ref()
            .map(|lines| lines.borrow().clone())
            .unwrap_or_default()
    }

    fn emit(&self, method: &str, line: String) -> Result<(), HostException> {
        if let Some(captured) = &self.captured {
            captured.borrow_mut().push(line);
            return Ok(());
        }
        let result = match method {
            "warn" | "error" => writeln!(std::io::stderr(), "{}", line),
            _ => writeln!(std::io::stdout(), "{}", line),
        };
        result.map_err(|e| HostException::new("IOException", e.to_string()))
    }
}

/// Render one console argument; strings print without quotes and
/// `undefined` prints as `null`
fn render(value: &HostValue) -> String {
    match value {
        HostValue::Json(serde_json::Value::String(s)) => s.clone(),
        HostValue::Json(json) => json.to_string(),
        other => other.display(),
    }
}

impl HostObject for Console {
    fn type_name(&self) -> &str {
        "Console"
    }

    fn methods(&self) -> Vec<MethodSignature> {
        METHODS
            .iter()
            .map(|name| MethodSignature::new(*name).varargs(HostType::Json))
            .collect()
    }

    fn invoke(&self, method: &str, args: Vec<HostValue>) -> Result<HostValue, HostException> {
        let parts = match args.into_iter().next() {
            Some(HostValue::Array(parts)) => parts,
            _ => Vec::new(),
        };
        let line = parts.iter().map(render).collect::<Vec<_>>().join(" ");
        self.emit(method, line)?;
        Ok(HostValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsbridge::BridgeContext;
    use std::rc::Rc;

    #[test]
    fn test_console_renders_arguments() {
        let ctx = BridgeContext::new().unwrap();
        let console = Rc::new(Console::capturing());
        ctx.bind("console", console.clone(), METHODS).unwrap();

        ctx.evaluate(
            "console.log('hello', 1, true, {a: [1]}); console.warn(); console.error(null, undefined)",
            "console.js",
        )
        .unwrap();

        assert_eq!(
            console.lines(),
            vec![
                "hello 1 true {\"a\":[1]}".to_string(),
                String::new(),
                "null null".to_string(),
            ]
        );
    }
}
