// ============================================================================
// spark-observe - Value Model
// The dynamic data graph that the tracking core observes
// ============================================================================
//
// Records and sequences are shared handles: cloning a `Value::Record` clones
// the handle, not the fields, so two clones are the same tracked value.
// Primitives are plain data and never tracked.
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::collections::{Record, Sequence};
use crate::reactivity::observer::Observer;

// =============================================================================
// VALUE
// =============================================================================

/// Any value reachable from application state.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Record(Record),
    Sequence(Sequence),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for records and sequences, the only values that can be tracked.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Record(_) | Value::Sequence(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// The observer attached to this value, if it is tracked.
    pub fn observer(&self) -> Option<Rc<Observer>> {
        match self {
            Value::Record(r) => r.observer(),
            Value::Sequence(s) => s.observer(),
            _ => None,
        }
    }

    /// Short type name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Record(_) => "record",
            Value::Sequence(_) => "sequence",
        }
    }
}

// Identity for records and sequences, plain equality otherwise.
// NaN != NaN here; the write path uses `same_value` instead.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a.ptr_eq(b),
            (Value::Sequence(a), Value::Sequence(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Record(r) => r.fmt(f),
            Value::Sequence(s) => s.fmt(f),
        }
    }
}

/// String form used by the default sequence sort.
///
/// Integral numbers print without a fractional part, records print as
/// `[object Object]`, and sequences join their elements with commas.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => fmt_number(*n, f),
            Value::Str(s) => f.write_str(s),
            Value::Record(_) => f.write_str("[object Object]"),
            Value::Sequence(s) => join_sequence(s, f, &mut Vec::new()),
        }
    }
}

/// Comma-join `seq`. A sequence already being joined prints as empty.
fn join_sequence(
    seq: &Sequence,
    f: &mut fmt::Formatter<'_>,
    open: &mut Vec<Sequence>,
) -> fmt::Result {
    if open.iter().any(|s| s.ptr_eq(seq)) {
        return Ok(());
    }
    open.push(seq.clone());
    for (i, item) in seq.to_vec().iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        match item {
            Value::Null => {}
            Value::Sequence(inner) => join_sequence(inner, f, open)?,
            other => write!(f, "{other}")?,
        }
    }
    open.pop();
    Ok(())
}

fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        write!(f, "{}", n as i128)
    } else {
        write!(f, "{n}")
    }
}

// =============================================================================
// CONVERSIONS
// =============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::Str(s)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl From<Sequence> for Value {
    fn from(s: Sequence) -> Self {
        Value::Sequence(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(Sequence::from_vec(items))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::from(s),
            Json::Array(items) => Value::Sequence(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Value::Record(map.into_iter().collect()),
        }
    }
}

#[cfg(feature = "json")]
impl Value {
    /// Snapshot this value as JSON without tracking any reads.
    ///
    /// Accessor fields are evaluated; non-finite numbers become `null`.
    /// A container that (directly or not) contains itself is cut off with
    /// `null` where it recurs.
    pub fn to_json(&self) -> serde_json::Value {
        crate::core::context::untracked(|| self.to_json_within(&mut Vec::new()))
    }

    fn to_json_within(&self, open: &mut Vec<Value>) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Json::from(*n as i64),
            Value::Number(n) => serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number),
            Value::Str(s) => Json::String(s.to_string()),
            Value::Record(_) | Value::Sequence(_) if open.contains(self) => {
                tracing::debug!(kind = self.kind(), "cyclic value serialized as null");
                Json::Null
            }
            Value::Sequence(seq) => {
                open.push(self.clone());
                let items = seq.to_vec().iter().map(|v| v.to_json_within(open)).collect();
                open.pop();
                Json::Array(items)
            }
            Value::Record(record) => {
                open.push(self.clone());
                let fields = record
                    .entries()
                    .into_iter()
                    .map(|(key, value)| (key, value.to_json_within(open)))
                    .collect();
                open.pop();
                Json::Object(fields)
            }
        }
    }
}

// =============================================================================
// KEY
// =============================================================================

/// A field name or sequence position, as accepted by `set` and `del`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Index(usize),
    Name(String),
}

/// Largest position a sequence index may name (one below `u32::MAX`).
pub const MAX_INDEX: usize = u32::MAX as usize - 1;

impl Key {
    /// The position this key denotes, if it is a valid sequence index.
    ///
    /// Names count when they spell a finite, non-negative integer. Positions
    /// above [`MAX_INDEX`] are not indices.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(i) => (*i <= MAX_INDEX).then_some(*i),
            Key::Name(name) => {
                let n: f64 = name.trim().parse().ok()?;
                (n.is_finite() && n >= 0.0 && n.floor() == n && n <= MAX_INDEX as f64)
                    .then_some(n as usize)
            }
        }
    }

    pub fn is_valid_index(&self) -> bool {
        self.as_index().is_some()
    }

    /// The field name this key denotes on a record.
    pub fn to_name(&self) -> String {
        match self {
            Key::Index(i) => i.to_string(),
            Key::Name(name) => name.clone(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{i}"),
            Key::Name(name) => f.write_str(name),
        }
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl From<&String> for Key {
    fn from(name: &String) -> Self {
        Key::Name(name.clone())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_compare_by_identity() {
        let a = Record::new();
        let b = Record::new();
        assert_eq!(Value::from(a.clone()), Value::from(a.clone()));
        assert_ne!(Value::from(a), Value::from(b));

        let s = Sequence::new();
        assert_eq!(Value::from(s.clone()), Value::from(s));
        assert_ne!(Value::from(Sequence::new()), Value::from(Sequence::new()));
    }

    #[test]
    fn primitive_equality() {
        assert_eq!(Value::from(1), Value::from(1.0));
        assert_eq!(Value::from("x"), Value::from(String::from("x")));
        assert_ne!(Value::from(1), Value::from("1"));
        assert_ne!(Value::from(f64::NAN), Value::from(f64::NAN));
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }

    #[test]
    fn display_matches_sort_keys() {
        assert_eq!(Value::from(10).to_string(), "10");
        assert_eq!(Value::from(1.5).to_string(), "1.5");
        assert_eq!(Value::from(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::from(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from(Record::new()).to_string(), "[object Object]");

        let seq = Sequence::from_vec(vec![Value::from(1), Value::Null, Value::from("a")]);
        assert_eq!(Value::from(seq).to_string(), "1,,a");
    }

    #[test]
    fn self_containing_sequence_joins_without_recursing() {
        let seq = Sequence::from_vec(vec![Value::from(1)]);
        seq.set_index(1, seq.clone());
        seq.set_index(2, Sequence::from_vec(vec![Value::from(seq.clone()), Value::from(2)]));
        assert_eq!(Value::from(seq).to_string(), "1,,,2");
    }

    #[test]
    fn key_index_parsing() {
        assert_eq!(Key::from(3usize).as_index(), Some(3));
        assert_eq!(Key::from("4").as_index(), Some(4));
        assert_eq!(Key::from("4.0").as_index(), Some(4));
        assert_eq!(Key::from("-1").as_index(), None);
        assert_eq!(Key::from("1.5").as_index(), None);
        assert_eq!(Key::from("name").as_index(), None);
        assert_eq!(Key::from("Infinity").as_index(), None);
        assert_eq!(Key::from(MAX_INDEX).as_index(), Some(MAX_INDEX));
        assert_eq!(Key::from(MAX_INDEX + 1).as_index(), None);
        assert_eq!(Key::from(usize::MAX).as_index(), None);
        assert_eq!(Key::from("10000000000000000000").as_index(), None);
        assert_eq!(Key::from("1e19").as_index(), None);
        assert_eq!(Key::from(2usize).to_name(), "2");
        assert!(Key::from("0").is_valid_index());
    }

    #[test]
    fn accessors() {
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(2).as_number(), Some(2.0));
        assert_eq!(Value::from("s").as_str(), Some("s"));
        assert!(Value::from(Record::new()).as_record().is_some());
        assert!(Value::from(Sequence::new()).as_sequence().is_some());
        assert!(Value::from(Sequence::new()).is_object());
        assert!(!Value::from(1).is_object());
        assert_eq!(Value::from(1).kind(), "number");
    }

    #[cfg(feature = "json")]
    #[test]
    fn json_conversion() {
        let json = serde_json::json!({ "a": 1, "b": { "c": [1, 2, "x"] }, "d": null });
        let value = Value::from(json.clone());

        let record = value.as_record().expect("record");
        assert_eq!(record.keys(), vec!["a", "b", "d"]);
        assert_eq!(value.to_json(), json);
    }

    #[cfg(feature = "json")]
    #[test]
    fn json_cuts_cycles_with_null() {
        let record = Record::new();
        let list = Sequence::from_vec(vec![Value::from(1)]);
        record.put("list", list.clone());
        list.push(record.clone());
        list.push(list.clone());

        let json = Value::from(record.clone()).to_json();
        assert_eq!(json, serde_json::json!({ "list": [1, null, null] }));

        // A value shared twice without a cycle is written out both times
        let shared = Sequence::from_vec(vec![Value::from(2)]);
        let pair = Sequence::from_vec(vec![Value::from(shared.clone()), Value::from(shared)]);
        assert_eq!(Value::from(pair).to_json(), serde_json::json!([[2], [2]]));
    }
}
