use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A self-contained argument or return value.
///
/// Request arguments and response data must round-trip through every body
/// serializer, including the non-self-describing binary ones. A derived enum
/// works with all of them, where a dynamically-typed JSON value would not
/// survive a binary decode.
///
/// # Example
///
/// ```
/// use keelrpc_common::protocol::value::RpcValue;
///
/// let v = RpcValue::from("hi");
/// assert_eq!(v.type_name(), "string");
/// assert_eq!(v.as_str(), Some("hi"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RpcValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<RpcValue>),
    Map(BTreeMap<String, RpcValue>),
}

impl RpcValue {
    /// Positional type identifier carried in a request's parameter type list.
    pub fn type_name(&self) -> &'static str {
        match self {
            RpcValue::Null => "null",
            RpcValue::Bool(_) => "bool",
            RpcValue::Int(_) => "int",
            RpcValue::Float(_) => "float",
            RpcValue::Str(_) => "string",
            RpcValue::Bytes(_) => "bytes",
            RpcValue::List(_) => "list",
            RpcValue::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RpcValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RpcValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            RpcValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            RpcValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RpcValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RpcValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[RpcValue]> {
        match self {
            RpcValue::List(l) => Some(l),
            _ => None,
        }
    }
}

impl From<bool> for RpcValue {
    fn from(v: bool) -> Self {
        RpcValue::Bool(v)
    }
}

impl From<i64> for RpcValue {
    fn from(v: i64) -> Self {
        RpcValue::Int(v)
    }
}

impl From<i32> for RpcValue {
    fn from(v: i32) -> Self {
        RpcValue::Int(v as i64)
    }
}

impl From<f64> for RpcValue {
    fn from(v: f64) -> Self {
        RpcValue::Float(v)
    }
}

impl From<&str> for RpcValue {
    fn from(v: &str) -> Self {
        RpcValue::Str(v.to_string())
    }
}

impl From<String> for RpcValue {
    fn from(v: String) -> Self {
        RpcValue::Str(v)
    }
}

impl From<Vec<u8>> for RpcValue {
    fn from(v: Vec<u8>) -> Self {
        RpcValue::Bytes(v)
    }
}

impl From<Vec<RpcValue>> for RpcValue {
    fn from(v: Vec<RpcValue>) -> Self {
        RpcValue::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(RpcValue::Null.type_name(), "null");
        assert_eq!(RpcValue::from(true).type_name(), "bool");
        assert_eq!(RpcValue::from(7i64).type_name(), "int");
        assert_eq!(RpcValue::from(1.5).type_name(), "float");
        assert_eq!(RpcValue::from("x").type_name(), "string");
        assert_eq!(RpcValue::from(vec![1u8, 2]).type_name(), "bytes");
    }

    #[test]
    fn test_accessors() {
        assert_eq!(RpcValue::from(42i64).as_int(), Some(42));
        assert_eq!(RpcValue::from("hi").as_str(), Some("hi"));
        assert_eq!(RpcValue::from(42i64).as_str(), None);
        assert!(RpcValue::Null.is_null());
    }

    #[test]
    fn test_nested_value_roundtrip_json() {
        let mut map = BTreeMap::new();
        map.insert("k".to_string(), RpcValue::List(vec![RpcValue::Int(1), RpcValue::Null]));
        let value = RpcValue::Map(map);

        let bytes = serde_json::to_vec(&value).unwrap();
        let back: RpcValue = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, back);
    }

    #[test]
    fn test_nested_value_roundtrip_postcard() {
        let value = RpcValue::List(vec![
            RpcValue::Str("a".to_string()),
            RpcValue::Bytes(vec![0, 255]),
            RpcValue::Float(3.25),
        ]);

        let bytes = postcard::to_allocvec(&value).unwrap();
        let back: RpcValue = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(value, back);
    }
}
