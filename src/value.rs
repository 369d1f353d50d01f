use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// The items of a sequence value, shared between every alias of it.
pub type Sequence = Rc<RefCell<Vec<Value>>>;

/// The entries of a mapping value in insertion order, shared between every
/// alias of it. Keys are unique.
pub type Mapping = Rc<RefCell<Vec<(Value, Value)>>>;

/// A loaded YAML value.
///
/// Collections are reference counted: a node reached through several
/// aliases becomes one shared container, and a node that contains itself
/// becomes a container holding a clone of its own `Rc`. Such cycles are
/// never freed automatically.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Binary(Vec<u8>),
    Sequence(Sequence),
    Mapping(Mapping),
    /// A host value with no YAML counterpart.
    Object(Object),
}

/// An opaque host value, known by its type name.
#[derive(Clone)]
pub struct Object {
    type_name: &'static str,
    value: Rc<dyn Any>,
}

impl Object {
    pub fn new<T: Any>(value: T) -> Self {
        Object {
            type_name: core::any::type_name::<T>(),
            value: Rc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }
}

impl Value {
    /// A new sequence holding `items`.
    pub fn sequence(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Sequence(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    /// A new mapping holding `entries`. A repeated key keeps its first
    /// position and its last value.
    pub fn mapping(entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
        let mapping = Rc::new(RefCell::new(Vec::new()));
        let mut index = KeyIndex::default();
        for (key, value) in entries {
            index.insert(&mapping, key, value);
        }
        Value::Mapping(mapping)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            Value::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Value::Sequence(sequence) => Some(sequence),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    /// Look up a string key in a mapping.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.as_mapping()?
            .borrow()
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, value)| value.clone())
    }

    /// Whether both values are the same shared container.
    pub fn same_container(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Sequence(a), Value::Sequence(b)) => Rc::ptr_eq(a, b),
            (Value::Mapping(a), Value::Mapping(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn container_ptr(&self) -> Option<*const ()> {
        match self {
            Value::Sequence(sequence) => Some(Rc::as_ptr(sequence).cast()),
            Value::Mapping(mapping) => Some(Rc::as_ptr(mapping).cast()),
            _ => None,
        }
    }
}

/// Insert or replace an entry, comparing keys by content.
pub(crate) fn insert(mapping: &Mapping, key: Value, value: Value) {
    let position = mapping.borrow().iter().position(|(k, _)| *k == key);
    let mut entries = mapping.borrow_mut();
    match position {
        Some(index) => entries[index].1 = value,
        None => entries.push((key, value)),
    }
}

/// A scalar key in hashable form. Floats hash by their bits with every NaN
/// folded into one and `-0.0` into `0.0`, matching [`Value`] equality.
#[derive(PartialEq, Eq, Hash)]
enum ScalarKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    String(String),
    Binary(Vec<u8>),
}

impl ScalarKey {
    fn of(value: &Value) -> Option<ScalarKey> {
        Some(match value {
            Value::Null => ScalarKey::Null,
            Value::Bool(value) => ScalarKey::Bool(*value),
            Value::Int(value) => ScalarKey::Int(*value),
            Value::Float(value) if value.is_nan() => ScalarKey::Float(f64::NAN.to_bits()),
            Value::Float(value) if *value == 0.0 => ScalarKey::Float(0f64.to_bits()),
            Value::Float(value) => ScalarKey::Float(value.to_bits()),
            Value::String(value) => ScalarKey::String(value.clone()),
            Value::Binary(value) => ScalarKey::Binary(value.clone()),
            Value::Sequence(_) | Value::Mapping(_) | Value::Object(_) => return None,
        })
    }
}

/// Positions of the scalar keys of a mapping that is being filled.
///
/// Only valid while every insert into the mapping goes through it. Keys
/// that cannot be hashed fall back to comparing against each entry.
#[derive(Default)]
pub(crate) struct KeyIndex {
    positions: HashMap<ScalarKey, usize>,
}

impl KeyIndex {
    pub(crate) fn insert(&mut self, mapping: &Mapping, key: Value, value: Value) {
        let Some(scalar) = ScalarKey::of(&key) else {
            insert(mapping, key, value);
            return;
        };
        let mut entries = mapping.borrow_mut();
        match self.positions.entry(scalar) {
            Entry::Occupied(position) => entries[*position.get()].1 = value,
            Entry::Vacant(position) => {
                position.insert(entries.len());
                entries.push((key, value));
            }
        }
    }
}

/// Take the children out of containers nobody else holds, so that dropping
/// a deeply nested value does not recurse once per level.
impl Drop for Value {
    fn drop(&mut self) {
        let mut orphans = Vec::new();
        detach_children(self, &mut orphans);
        while let Some(mut orphan) = orphans.pop() {
            detach_children(&mut orphan, &mut orphans);
        }
    }
}

fn detach_children(value: &mut Value, orphans: &mut Vec<Value>) {
    match value {
        Value::Sequence(sequence) if Rc::strong_count(sequence) == 1 => {
            if let Ok(mut items) = sequence.try_borrow_mut() {
                orphans.append(&mut items);
            }
        }
        Value::Mapping(mapping) if Rc::strong_count(mapping) == 1 => {
            if let Ok(mut entries) = mapping.try_borrow_mut() {
                for (key, value) in entries.drain(..) {
                    orphans.push(key);
                    orphans.push(value);
                }
            }
        }
        _ => {}
    }
}

/// Content equality. Cycles compare equal when they unfold alike.
fn equal(a: &Value, b: &Value, visiting: &mut Vec<(*const (), *const ())>) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b || a.is_nan() && b.is_nan(),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Binary(a), Value::Binary(b)) => a == b,
        (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(&a.value, &b.value),
        (Value::Sequence(_), Value::Sequence(_)) | (Value::Mapping(_), Value::Mapping(_)) => {
            if a.same_container(b) {
                return true;
            }
            let (Some(pa), Some(pb)) = (a.container_ptr(), b.container_ptr()) else {
                return false;
            };
            if visiting.contains(&(pa, pb)) {
                return true;
            }
            visiting.push((pa, pb));
            let result = match (a, b) {
                (Value::Sequence(a), Value::Sequence(b)) => {
                    let (a, b) = (a.borrow(), b.borrow());
                    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| equal(x, y, visiting))
                }
                (Value::Mapping(a), Value::Mapping(b)) => {
                    let (a, b) = (a.borrow(), b.borrow());
                    a.len() == b.len()
                        && a.iter().zip(b.iter()).all(|((ka, va), (kb, vb))| {
                            equal(ka, kb, visiting) && equal(va, vb, visiting)
                        })
                }
                _ => false,
            };
            visiting.pop();
            result
        }
        _ => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        equal(self, other, &mut Vec::new())
    }
}

struct Printer<'a> {
    value: &'a Value,
    visiting: &'a RefCell<Vec<*const ()>>,
}

impl<'a> Printer<'a> {
    fn nested<'b>(&'b self, value: &'b Value) -> Printer<'b> {
        Printer {
            value,
            visiting: self.visiting,
        }
    }
}

impl core::fmt::Debug for Printer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(ptr) = self.value.container_ptr() {
            if self.visiting.borrow().contains(&ptr) {
                return f.write_str("<recursive>");
            }
            self.visiting.borrow_mut().push(ptr);
        }
        let result = match self.value {
            Value::Null => f.write_str("Null"),
            Value::Bool(value) => write!(f, "Bool({value})"),
            Value::Int(value) => write!(f, "Int({value})"),
            Value::Float(value) => write!(f, "Float({value:?})"),
            Value::String(value) => write!(f, "String({value:?})"),
            Value::Binary(value) => write!(f, "Binary({value:?})"),
            Value::Object(object) => write!(f, "Object({})", object.type_name),
            Value::Sequence(sequence) => f
                .debug_list()
                .entries(sequence.borrow().iter().map(|item| self.nested(item)))
                .finish(),
            Value::Mapping(mapping) => f
                .debug_map()
                .entries(
                    mapping
                        .borrow()
                        .iter()
                        .map(|(key, value)| (self.nested(key), self.nested(value))),
                )
                .finish(),
        };
        if self.value.container_ptr().is_some() {
            self.visiting.borrow_mut().pop();
        }
        result
    }
}

impl core::fmt::Debug for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let visiting = RefCell::new(Vec::new());
        Printer {
            value: self,
            visiting: &visiting,
        }
        .fmt(f)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(String::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Binary(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mapping_keeps_last_value() {
        let value = Value::mapping([
            (Value::from("a"), Value::Int(1)),
            (Value::from("b"), Value::Int(2)),
            (Value::from("a"), Value::Int(3)),
        ]);
        assert_eq!(value.get("a"), Some(Value::Int(3)));
        assert_eq!(value.as_mapping().unwrap().borrow().len(), 2);
    }

    #[test]
    fn scalar_keys_follow_value_equality() {
        let value = Value::mapping([
            (Value::Float(f64::NAN), Value::Int(1)),
            (Value::Float(0.0), Value::Int(2)),
            (Value::Int(0), Value::Int(3)),
            (Value::Float(f64::NAN), Value::Int(4)),
            (Value::Float(-0.0), Value::Int(5)),
            (Value::sequence([Value::Int(1)]), Value::Int(6)),
            (Value::sequence([Value::Int(1)]), Value::Int(7)),
        ]);
        let values = value
            .as_mapping()
            .unwrap()
            .borrow()
            .iter()
            .map(|(_, value)| value.as_i64())
            .collect::<Vec<_>>();
        assert_eq!(values, [Some(4), Some(5), Some(3), Some(7)]);
    }

    #[test]
    fn many_keys() {
        let value = Value::mapping((0..50_000).map(|n| (Value::Int(n % 25_000), Value::Int(n))));
        let mapping = value.as_mapping().unwrap().borrow();
        assert_eq!(mapping.len(), 25_000);
        assert_eq!(mapping[7].1, Value::Int(25_007));
    }

    #[test]
    fn deep_value_drops() {
        let mut value = Value::Null;
        for _ in 0..200_000 {
            value = Value::sequence([value]);
        }
        drop(value);
    }

    #[test]
    fn cyclic_values_compare_and_print() {
        let a = Value::sequence([Value::from("x")]);
        a.as_sequence().unwrap().borrow_mut().push(a.clone());
        let b = Value::sequence([Value::from("x")]);
        b.as_sequence().unwrap().borrow_mut().push(b.clone());
        assert!(a == b);
        assert!(!a.same_container(&b));
        assert_eq!(format!("{a:?}"), "[String(\"x\"), <recursive>]");
    }

    #[test]
    fn nan_equals_nan() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(1.0), Value::Int(1));
    }

    #[test]
    fn objects_compare_by_identity() {
        struct Thing;
        let object = Object::new(Thing);
        assert!(object.type_name().ends_with("Thing"));
        assert!(object.downcast_ref::<Thing>().is_some());
        let value = Value::Object(object.clone());
        assert_eq!(value, Value::Object(object));
        assert_ne!(value, Value::Object(Object::new(Thing)));
    }
}
