use std::collections::BTreeMap;

use ch_core::{CiValue, HostError, ReturnValue};
use rhai::{Array, Dynamic, ImmutableString, Map, FLOAT, INT};

pub(crate) fn civalue_to_dynamic(value: &CiValue) -> Dynamic {
    match value {
        CiValue::Bool(value) => Dynamic::from_bool(*value),
        CiValue::Int(value) => Dynamic::from_int(*value as INT),
        CiValue::Number(value) => Dynamic::from_float(*value as FLOAT),
        CiValue::String(value) => Dynamic::from(value.clone()),
        CiValue::Array(values) => {
            Dynamic::from_array(values.iter().map(civalue_to_dynamic).collect::<Array>())
        }
        CiValue::Map(values) => {
            let mut map = Map::new();
            for (key, value) in values {
                map.insert(key.as_str().into(), civalue_to_dynamic(value));
            }
            Dynamic::from_map(map)
        }
    }
}

/// Copies a script value out of the runtime. Shared values are read through.
pub(crate) fn dynamic_to_civalue(value: Dynamic) -> Result<CiValue, HostError> {
    let value = value.flatten();
    if value.is::<bool>() {
        return Ok(CiValue::Bool(value.cast::<bool>()));
    }
    if value.is::<INT>() {
        return Ok(CiValue::Int(value.cast::<INT>()));
    }
    if value.is::<FLOAT>() {
        return Ok(CiValue::Number(value.cast::<FLOAT>()));
    }
    if value.is::<ImmutableString>() {
        return Ok(CiValue::String(value.cast::<ImmutableString>().to_string()));
    }
    if value.is::<Array>() {
        let array = value.cast::<Array>();
        let mut out = Vec::with_capacity(array.len());
        for item in array {
            out.push(dynamic_to_civalue(item)?);
        }
        return Ok(CiValue::Array(out));
    }
    if value.is::<Map>() {
        let map = value.cast::<Map>();
        let mut out = BTreeMap::new();
        for (key, value) in map {
            out.insert(key.to_string(), dynamic_to_civalue(value)?);
        }
        return Ok(CiValue::Map(out));
    }

    Err(HostError::new(
        "HOST_VALUE_UNSUPPORTED",
        format!("Unsupported Rhai value type '{}'.", value.type_name()),
    ))
}

/// Reduces a handler's return value to the shapes a call-in contract knows.
pub(crate) fn dynamic_to_return(value: &Dynamic) -> ReturnValue {
    if let Ok(flag) = value.as_bool() {
        return ReturnValue::Bool(flag);
    }
    if let Ok(number) = value.as_int() {
        return ReturnValue::Number(number as f64);
    }
    if let Ok(number) = value.as_float() {
        return ReturnValue::Number(number);
    }
    if let Some(text) = value.read_lock::<ImmutableString>() {
        return ReturnValue::String(text.to_string());
    }
    ReturnValue::None
}
