//! Value marshalling between host values and script values
//!
//! Conversions are driven by the declared [`HostType`] on the host side.
//! Script numbers are IEEE doubles, so `Long` values are only exchanged
//! within ±(2^53 − 1); anything outside that range is a marshalling error
//! rather than a silently rounded number.
//!
//! Reading a script value can run script code (getters, `toJSON`) or hit a
//! value with no host form (cyclic objects, BigInts, strings holding an
//! unpaired surrogate). Either way the result is a `Marshal` error that
//! names what the engine reported; no pending script exception is left
//! behind.

use rquickjs::{Array, Ctx, Value};

use crate::error::{BridgeError, BridgeResult};
use crate::exception;
use crate::value::{HostType, HostValue, MethodSignature};

/// Largest integer a script number represents exactly (2^53 − 1)
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// Convert a host value of declared type `ty` into a script value
pub fn to_script<'js>(ctx: &Ctx<'js>, ty: &HostType, value: &HostValue) -> BridgeResult<Value<'js>> {
    match (ty, value) {
        (ty, HostValue::Null) if ty.is_nullable() => Ok(Value::new_null(ctx.clone())),
        (HostType::Boolean, HostValue::Boolean(b)) => Ok(Value::new_bool(ctx.clone(), *b)),
        (HostType::Int, HostValue::Int(i)) => Ok(Value::new_int(ctx.clone(), *i)),
        (HostType::Long, HostValue::Int(i)) => Ok(Value::new_int(ctx.clone(), *i)),
        (HostType::Long, HostValue::Long(l)) => long_to_script(ctx, *l),
        (HostType::Double, HostValue::Double(d)) => Ok(Value::new_number(ctx.clone(), *d)),
        (HostType::Double, HostValue::Int(i)) => Ok(Value::new_number(ctx.clone(), f64::from(*i))),
        (HostType::String, HostValue::String(s)) => {
            Ok(rquickjs::String::from_str(ctx.clone(), s)?.into_value())
        }
        (HostType::Array(element), HostValue::Array(items)) => {
            let array = Array::new(ctx.clone())?;
            for (i, item) in items.iter().enumerate() {
                array.set(i, to_script(ctx, element, item)?)?;
            }
            Ok(array.into_value())
        }
        (HostType::Json, HostValue::Json(json)) => json_to_script(ctx, json),
        (HostType::Object, value) => dynamic_to_script(ctx, value),
        (ty, value) => Err(BridgeError::marshal(value.kind(), ty.to_string())),
    }
}

/// Convert a host value into a script value using its own variant
fn dynamic_to_script<'js>(ctx: &Ctx<'js>, value: &HostValue) -> BridgeResult<Value<'js>> {
    match value {
        HostValue::Null => Ok(Value::new_null(ctx.clone())),
        HostValue::Boolean(_) => to_script(ctx, &HostType::Boolean, value),
        HostValue::Int(_) => to_script(ctx, &HostType::Int, value),
        HostValue::Long(_) => to_script(ctx, &HostType::Long, value),
        HostValue::Double(_) => to_script(ctx, &HostType::Double, value),
        HostValue::String(_) => to_script(ctx, &HostType::String, value),
        HostValue::Array(_) => to_script(ctx, &HostType::array_of(HostType::Object), value),
        HostValue::Json(json) => json_to_script(ctx, json),
    }
}

fn long_to_script<'js>(ctx: &Ctx<'js>, value: i64) -> BridgeResult<Value<'js>> {
    if !(-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&value) {
        return Err(BridgeError::marshal(
            format!("long {} (outside the safe integer range)", value),
            "number",
        ));
    }
    match i32::try_from(value) {
        Ok(small) => Ok(Value::new_int(ctx.clone(), small)),
        Err(_) => Ok(Value::new_number(ctx.clone(), value as f64)),
    }
}

fn json_to_script<'js>(ctx: &Ctx<'js>, json: &serde_json::Value) -> BridgeResult<Value<'js>> {
    let text = serde_json::to_string(json)?;
    Ok(ctx.json_parse(text)?)
}

/// Convert a script value into a host value of declared type `ty`
pub fn from_script<'js>(ctx: &Ctx<'js>, ty: &HostType, value: &Value<'js>) -> BridgeResult<HostValue> {
    if ty.is_nullable() && (value.is_null() || value.is_undefined()) {
        return Ok(HostValue::Null);
    }

    match ty {
        HostType::Void => Ok(HostValue::Null),
        HostType::Boolean => value
            .as_bool()
            .map(HostValue::Boolean)
            .ok_or_else(|| mismatch(value, ty)),
        HostType::Int => {
            if let Some(i) = value.as_int() {
                return Ok(HostValue::Int(i));
            }
            value
                .as_float()
                .filter(|f| f.fract() == 0.0 && *f >= f64::from(i32::MIN) && *f <= f64::from(i32::MAX))
                .map(|f| HostValue::Int(f as i32))
                .ok_or_else(|| mismatch(value, ty))
        }
        HostType::Long => {
            if let Some(i) = value.as_int() {
                return Ok(HostValue::Long(i64::from(i)));
            }
            value
                .as_float()
                .filter(|f| f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER as f64)
                .map(|f| HostValue::Long(f as i64))
                .ok_or_else(|| mismatch(value, ty))
        }
        HostType::Double => value
            .as_number()
            .map(HostValue::Double)
            .ok_or_else(|| mismatch(value, ty)),
        HostType::String => match value.as_string() {
            Some(s) => s
                .to_string()
                .map(HostValue::String)
                .map_err(|e| read_failure(ctx, e, value, ty)),
            None => Err(mismatch(value, ty)),
        },
        HostType::Array(element) => match value.as_array() {
            Some(array) => {
                let mut items = Vec::with_capacity(array.len());
                for i in 0..array.len() {
                    let item: Value = array.get(i).map_err(|e| read_failure(ctx, e, value, ty))?;
                    items.push(from_script(ctx, element, &item)?);
                }
                Ok(HostValue::Array(items))
            }
            None => Err(mismatch(value, ty)),
        },
        HostType::Object => dynamic_from_script(ctx, value),
        HostType::Json => {
            let text = ctx
                .json_stringify(value.clone())
                .and_then(|text| text.map(|t| t.to_string()).transpose())
                .map_err(|e| read_failure(ctx, e, value, ty))?;
            match text {
                Some(text) => Ok(HostValue::Json(serde_json::from_str(&text)?)),
                // Functions and symbols have no JSON form.
                None => Err(mismatch(value, ty)),
            }
        }
    }
}

/// Unmarshal the arguments of a script call into a host method.
///
/// For varargs signatures the trailing arguments are collected into the
/// final array parameter.
pub fn arguments_from_script<'js>(
    ctx: &Ctx<'js>,
    signature: &MethodSignature,
    args: &[Value<'js>],
) -> BridgeResult<Vec<HostValue>> {
    if !signature.accepts_arity(args.len()) {
        return Err(BridgeError::ArgumentCount {
            method: signature.name.clone(),
            expected: signature.arity_description(),
            actual: args.len(),
        });
    }

    let fixed = signature.fixed_arity();
    let mut values = Vec::with_capacity(signature.params.len());
    for (ty, arg) in signature.params.iter().zip(args).take(fixed) {
        values.push(from_script(ctx, ty, arg)?);
    }
    if let Some(element) = signature.varargs_element() {
        let rest = args[fixed..]
            .iter()
            .map(|arg| from_script(ctx, element, arg))
            .collect::<BridgeResult<Vec<_>>>()?;
        values.push(HostValue::Array(rest));
    }
    Ok(values)
}

/// Marshal host arguments for a call into a script function.
///
/// The host passes one value per declared parameter; a varargs array is
/// spread into individual script arguments.
pub fn arguments_to_script<'js>(
    ctx: &Ctx<'js>,
    signature: &MethodSignature,
    args: &[HostValue],
) -> BridgeResult<Vec<Value<'js>>> {
    if args.len() != signature.params.len() {
        return Err(BridgeError::ArgumentCount {
            method: signature.name.clone(),
            expected: signature.params.len().to_string(),
            actual: args.len(),
        });
    }

    let fixed = signature.fixed_arity();
    let mut values = Vec::with_capacity(args.len());
    for (ty, arg) in signature.params.iter().zip(args).take(fixed) {
        values.push(to_script(ctx, ty, arg)?);
    }
    if let Some(element) = signature.varargs_element() {
        match &args[fixed] {
            HostValue::Array(rest) => {
                for arg in rest {
                    values.push(to_script(ctx, element, arg)?);
                }
            }
            HostValue::Null => {}
            other => return Err(BridgeError::marshal(other.kind(), signature.params[fixed].to_string())),
        }
    }
    Ok(values)
}

/// Marshal a host method's result for its declared return type
pub fn return_to_script<'js>(
    ctx: &Ctx<'js>,
    signature: &MethodSignature,
    value: &HostValue,
) -> BridgeResult<Value<'js>> {
    match signature.returns {
        HostType::Void => Ok(Value::new_undefined(ctx.clone())),
        ref ty => to_script(ctx, ty, value),
    }
}

/// Convert a script value into a host value chosen by the script value's type
fn dynamic_from_script<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> BridgeResult<HostValue> {
    if value.is_null() || value.is_undefined() {
        Ok(HostValue::Null)
    } else if let Some(b) = value.as_bool() {
        Ok(HostValue::Boolean(b))
    } else if let Some(i) = value.as_int() {
        Ok(HostValue::Int(i))
    } else if let Some(f) = value.as_float() {
        Ok(HostValue::Double(f))
    } else if value.is_string() {
        from_script(ctx, &HostType::String, value)
    } else if value.is_array() {
        from_script(ctx, &HostType::array_of(HostType::Object), value)
    } else {
        Err(mismatch(value, &HostType::Object))
    }
}

fn mismatch(value: &Value<'_>, ty: &HostType) -> BridgeError {
    BridgeError::marshal(script_kind(value), ty.to_string())
}

/// Marshal error for an engine failure while reading `value` as `ty`.
/// A script exception is consumed and its text kept.
fn read_failure<'js>(ctx: &Ctx<'js>, error: rquickjs::Error, value: &Value<'js>, ty: &HostType) -> BridgeError {
    let detail = if error.is_exception() {
        let thrown = ctx.catch();
        exception::describe(ctx, &thrown)
    } else if matches!(error, rquickjs::Error::Utf8(_)) {
        "unpaired surrogate".to_string()
    } else {
        error.to_string()
    };
    BridgeError::marshal(format!("{} ({})", script_kind(value), detail), ty.to_string())
}

/// Short description of a script value's type, used in error messages
pub(crate) fn script_kind(value: &Value<'_>) -> &'static str {
    if value.is_undefined() {
        "undefined"
    } else if value.is_null() {
        "null"
    } else if value.is_bool() {
        "boolean"
    } else if value.is_int() || value.is_float() {
        "number"
    } else if value.is_string() {
        "string"
    } else if value.is_symbol() {
        "symbol"
    } else if value.is_array() {
        "array"
    } else if value.is_function() {
        "function"
    } else if value.is_object() {
        "object"
    } else {
        "unknown"
    }
}
