use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use std::collections::HashMap;

use crate::serializer::encode_binary;
use crate::{
    Document, MappingStyle, NodeId, Object, RepresenterError, ScalarStyle, SequenceStyle, Tag,
    Value,
};

type RepresentFn = Box<dyn Fn(&Object) -> Result<Value, RepresenterError>>;

/// Turns [`Value`]s into documents.
///
/// Containers shared between several places become one node, which the
/// serializer then writes once with an anchor. Host objects need a
/// representation registered for their type.
#[derive(Default)]
pub struct Representer {
    objects: HashMap<&'static str, RepresentFn>,
}

impl Representer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register how values of type `T` are written, as another value.
    pub fn register<T: Any>(&mut self, represent: impl Fn(&T) -> Value + 'static) {
        let type_name = core::any::type_name::<T>();
        self.objects.insert(
            type_name,
            Box::new(move |object: &Object| {
                object.downcast_ref::<T>().map(&represent).ok_or_else(|| {
                    RepresenterError::Problem(format!(
                        "{} is not a {type_name}",
                        object.type_name()
                    ))
                })
            }),
        );
    }

    /// Build the document for `value`. Nothing is written, so a failure
    /// leaves no partial output behind.
    pub fn represent(&self, value: &Value) -> Result<Document, RepresenterError> {
        let mut builder = Builder {
            document: Document::new(),
            shared: HashMap::new(),
            pending: Vec::new(),
        };
        let root = self.add_node(&mut builder, value.clone())?;
        builder.document.set_root(root);
        // Children are attached depth first, in order, without recursing.
        while let Some(child) = builder.pending.pop() {
            match child {
                Child::Item(sequence, item) => {
                    let item = self.add_node(&mut builder, item)?;
                    builder.document.append_sequence_item(sequence, item);
                }
                Child::Pair(mapping, key, value) => {
                    let key = self.add_node(&mut builder, key)?;
                    let value = self.add_node(&mut builder, value)?;
                    builder.document.append_mapping_pair(mapping, key, value);
                }
            }
        }
        Ok(builder.document)
    }

    /// Add the node for `value`. The children of a new collection are queued
    /// rather than added.
    fn add_node(&self, builder: &mut Builder, mut value: Value) -> Result<NodeId, RepresenterError> {
        while let Value::Object(object) = &value {
            let Some(represent) = self.objects.get(object.type_name()) else {
                return Err(RepresenterError::Undefined {
                    type_name: object.type_name(),
                });
            };
            let represented = represent(object)?;
            value = represented;
        }

        let document = &mut builder.document;
        let scalar = |document: &mut Document, tag: Tag, text: &str| {
            document.add_scalar(Some(tag), text, ScalarStyle::Any)
        };
        let id = match &value {
            Value::Null => scalar(document, Tag::NULL, "null"),
            Value::Bool(value) => scalar(document, Tag::BOOL, if *value { "true" } else { "false" }),
            Value::Int(value) => scalar(document, Tag::INT, &value.to_string()),
            Value::Float(value) => scalar(document, Tag::FLOAT, &represent_float(*value)),
            Value::String(value) => scalar(document, Tag::STR, value),
            Value::Binary(bytes) => {
                document.add_scalar(Some(Tag::BINARY), &encode_binary(bytes), ScalarStyle::Literal)
            }
            Value::Sequence(sequence) => {
                let key = Rc::as_ptr(sequence).cast::<()>();
                if let Some(&id) = builder.shared.get(&key) {
                    return Ok(id);
                }
                let id = document.add_sequence(Some(Tag::SEQ), SequenceStyle::Any);
                builder.shared.insert(key, id);
                builder.pending.extend(
                    sequence
                        .borrow()
                        .iter()
                        .rev()
                        .map(|item| Child::Item(id, item.clone())),
                );
                id
            }
            Value::Mapping(mapping) => {
                let key = Rc::as_ptr(mapping).cast::<()>();
                if let Some(&id) = builder.shared.get(&key) {
                    return Ok(id);
                }
                let id = document.add_mapping(Some(Tag::MAP), MappingStyle::Any);
                builder.shared.insert(key, id);
                builder.pending.extend(
                    mapping
                        .borrow()
                        .iter()
                        .rev()
                        .map(|(key, value)| Child::Pair(id, key.clone(), value.clone())),
                );
                id
            }
            Value::Object(object) => {
                return Err(RepresenterError::Undefined {
                    type_name: object.type_name(),
                })
            }
        };
        Ok(id)
    }
}

/// A document under construction.
struct Builder {
    document: Document,
    /// Nodes of containers already added, by container address.
    shared: HashMap<*const (), NodeId>,
    pending: Vec<Child>,
}

/// A child still to be attached to its collection.
enum Child {
    Item(NodeId, Value),
    Pair(NodeId, Value, Value),
}

/// Float text that reads back as a float.
fn represent_float(value: f64) -> String {
    if value.is_nan() {
        String::from(".nan")
    } else if value.is_infinite() {
        String::from(if value > 0.0 { ".inf" } else { "-.inf" })
    } else {
        format!("{value:?}")
    }
}
