use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A host-side value marshaled into a call-in argument list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CiValue {
    Bool(bool),
    Int(i64),
    Number(f64),
    String(String),
    Array(Vec<CiValue>),
    Map(BTreeMap<String, CiValue>),
}

impl CiValue {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
        }
    }
}

impl From<bool> for CiValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for CiValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for CiValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for CiValue {
    fn from(value: f32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<f64> for CiValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for CiValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for CiValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// What a script handed back from a call-in, reduced to the shapes a
/// call-in contract can ask for.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValue {
    Bool(bool),
    Number(f64),
    String(String),
    /// No value, or a value of a shape no contract accepts.
    None,
}

impl ReturnValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::None => "nil",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn satisfies(&self, contract: ReturnContract) -> bool {
        match contract {
            ReturnContract::Nothing => true,
            ReturnContract::Bool | ReturnContract::BoolPair => matches!(self, Self::Bool(_)),
            ReturnContract::Number => matches!(self, Self::Number(_)),
            ReturnContract::String => matches!(self, Self::String(_)),
        }
    }
}

/// The typed return a call-in expects from its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReturnContract {
    Nothing,
    Bool,
    Number,
    String,
    /// Two booleans, returned by the handler as a two-element array.
    BoolPair,
}

impl ReturnContract {
    pub fn expected_name(self) -> &'static str {
        match self {
            Self::Nothing => "nothing",
            Self::Bool => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::BoolPair => "[boolean, boolean]",
        }
    }
}

#[cfg(test)]
mod value_tests {
    use super::*;

    #[test]
    fn return_value_contract_checks_match_declared_type() {
        assert!(ReturnValue::Bool(true).satisfies(ReturnContract::Bool));
        assert!(!ReturnValue::String("yes".to_string()).satisfies(ReturnContract::Bool));
        assert!(ReturnValue::Number(3.0).satisfies(ReturnContract::Number));
        assert!(!ReturnValue::None.satisfies(ReturnContract::String));
        assert!(ReturnValue::None.satisfies(ReturnContract::Nothing));
    }

    #[test]
    fn civalue_conversions_keep_shape() {
        assert_eq!(CiValue::from(7), CiValue::Int(7));
        assert_eq!(CiValue::from(7).as_number(), Some(7.0));
        assert_eq!(CiValue::from(2.5f32), CiValue::Number(2.5));
        assert_eq!(CiValue::from("ab").as_string(), Some("ab"));
        assert_eq!(CiValue::from(true).type_name(), "boolean");
        assert_eq!(ReturnContract::BoolPair.expected_name(), "[boolean, boolean]");
    }

    #[test]
    fn civalue_serializes_untagged() {
        let json = serde_json::to_string(&CiValue::Array(vec![
            CiValue::Number(1.0),
            CiValue::String("x".to_string()),
        ]))
        .expect("serialize");
        assert_eq!(json, "[1.0,\"x\"]");
    }
}
