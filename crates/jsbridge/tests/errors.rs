//! Script errors surfacing at the host boundary

use jsbridge::{BridgeContext, BridgeError, HostType, HostValue};

#[test]
fn test_syntax_error_names_source() {
    let ctx = BridgeContext::new().unwrap();
    let err = ctx.evaluate("function( {", "broken.js").unwrap_err();

    assert!(err.is_script_error());
    assert_eq!(err.error_type(), "SyntaxError");
    assert!(err.to_string().contains("broken.js"), "{err}");
    assert_eq!(err.location().and_then(|(name, _)| name), Some("broken.js"));

    // Still usable afterwards
    assert_eq!(ctx.evaluate("'fine'", "ok.js").unwrap(), "fine");
}

#[test]
fn test_runtime_error_fields() {
    let ctx = BridgeContext::new().unwrap();
    let err = ctx
        .evaluate("var x = 1;\nnull.property;", "npe.js")
        .unwrap_err();

    match &err {
        BridgeError::Script {
            error_type,
            source_name,
            ..
        } => {
            assert_eq!(error_type, "TypeError");
            assert_eq!(source_name.as_deref(), Some("npe.js"));
        }
        other => panic!("expected script error, got {other:?}"),
    }
}

#[test]
fn test_thrown_error_line() {
    let ctx = BridgeContext::new().unwrap();
    let err = ctx
        .evaluate(
            "function fail() {\n  throw new Error('deep');\n}\nfail();",
            "deep.js",
        )
        .unwrap_err();
    assert_eq!(err.error_type(), "Error");
    assert!(err.to_string().ends_with(": deep"), "{err}");
    assert_eq!(err.location().and_then(|(_, line)| line), Some(2));
    assert!(err.stack_trace().is_some_and(|stack| stack.contains("fail")));
}

#[test]
fn test_primitive_throw() {
    let ctx = BridgeContext::new().unwrap();
    let err = ctx.evaluate("throw 'plain string'", "plain.js").unwrap_err();
    assert_eq!(err.error_type(), "Error");
    assert!(err.to_string().contains("plain string"));

    let err = ctx.evaluate("throw 404", "number.js").unwrap_err();
    assert!(err.to_string().contains("404"));
}

#[test]
fn test_custom_error_name() {
    let ctx = BridgeContext::new().unwrap();
    let err = ctx
        .evaluate(
            "class ValidationError extends Error { constructor(m) { super(m); this.name = 'ValidationError'; } }\nthrow new ValidationError('bad input');",
            "custom.js",
        )
        .unwrap_err();
    assert_eq!(err.error_type(), "ValidationError");
}

#[test]
fn test_evaluate_as_mismatch() {
    let ctx = BridgeContext::new().unwrap();
    let err = ctx.evaluate_as("'text'", "text.js", &HostType::Int).unwrap_err();
    assert_eq!(err.to_string(), "Cannot marshal string to int");
}

#[test]
fn test_throwing_to_string_is_reported() {
    let ctx = BridgeContext::new().unwrap();
    let err = ctx
        .evaluate(
            "({ toString: function () { throw new Error('no string for you'); } })",
            "tostring.js",
        )
        .unwrap_err();
    assert!(err.to_string().contains("no string for you"));
    assert_eq!(ctx.evaluate("'after'", "after.js").unwrap(), "after");
}

#[test]
fn test_bigint_has_no_json_form() {
    let ctx = BridgeContext::new().unwrap();
    let err = ctx
        .evaluate_as("({ n: 10n })", "bigint.js", &HostType::Json)
        .unwrap_err();
    assert!(matches!(err, BridgeError::Marshal { ref to, .. } if to == "JSON"), "{err:?}");
    assert!(err.to_string().contains("TypeError"), "{err}");
    assert_eq!(ctx.evaluate("'clean'", "after.js").unwrap(), "clean");
}

#[test]
fn test_throwing_getter_during_unmarshal() {
    let ctx = BridgeContext::new().unwrap();
    let err = ctx
        .evaluate_as(
            "var a = [1, 2]; Object.defineProperty(a, 1, { get: function () { throw new Error('sealed'); } }); a",
            "getter.js",
            &HostType::array_of(HostType::Int),
        )
        .unwrap_err();
    assert_eq!(err.to_string(), "Cannot marshal array (Error: sealed) to int[]");
    assert_eq!(ctx.evaluate("'clean'", "after.js").unwrap(), "clean");
}

#[test]
fn test_unpaired_surrogate() {
    let ctx = BridgeContext::new().unwrap();
    let expected = "Cannot marshal string (unpaired surrogate) to String";

    let err = ctx.evaluate("'a\\uD800b'", "surrogate.js").unwrap_err();
    assert!(matches!(err, BridgeError::Marshal { .. }), "{err:?}");
    assert_eq!(err.to_string(), expected);

    let err = ctx
        .evaluate_as("'a\\uD800b'", "surrogate.js", &HostType::String)
        .unwrap_err();
    assert_eq!(err.to_string(), expected);

    // Paired surrogates are fine.
    assert_eq!(
        ctx.evaluate_as("'\\uD83D\\uDE00'", "pair.js", &HostType::String).unwrap(),
        HostValue::String("\u{1F600}".into())
    );
}
