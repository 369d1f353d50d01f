use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use std::collections::HashMap;

use base64::Engine as _;

use crate::value::{insert, KeyIndex};
use crate::{
    ConstructorError, Document, LoadSettings, Mapping, MarkedError, Node, NodeData, NodeId,
    NodePair, Sequence, Tag, Value,
};

/// Builds [`Value`]s from composed documents.
///
/// A collection is created empty before its children, so an alias back to
/// it inside its own content finds the same container. Mapping entries whose
/// key is recursive are held back until the whole document is built, because
/// the key is not final when it is reached; every other entry is inserted in
/// source order.
pub struct Constructor {
    label: String,
    constructed: HashMap<NodeId, Value>,
    deferred: Vec<(Mapping, Value, Value)>,
}

/// A collection whose children are still being built.
enum Frame<'d> {
    Sequence {
        sequence: Sequence,
        items: core::slice::Iter<'d, NodeId>,
    },
    Mapping {
        mapping: Mapping,
        pairs: core::slice::Iter<'d, NodePair>,
        /// The pair being built, with its key once that is done.
        pair: Option<(NodePair, Option<Value>)>,
        index: KeyIndex,
    },
}

impl Default for Constructor {
    fn default() -> Self {
        Self::new()
    }
}

impl Constructor {
    pub fn new() -> Self {
        Self::with_settings(&LoadSettings::default())
    }

    pub fn with_settings(settings: &LoadSettings) -> Self {
        Constructor {
            label: String::from(settings.label()),
            constructed: HashMap::new(),
            deferred: Vec::new(),
        }
    }

    /// Build the value of a document. A document without a root is `Null`.
    pub fn construct_document(&mut self, document: &Document) -> Result<Value, ConstructorError> {
        let Some(root) = document.root() else {
            return Ok(Value::Null);
        };
        let result = self.construct_tree(document, root);
        let deferred = core::mem::take(&mut self.deferred);
        self.constructed.clear();
        let value = result?;

        for (mapping, key, entry) in deferred {
            insert(&mapping, key, entry);
        }
        Ok(value)
    }

    /// Depth first over the node graph with an explicit stack, so nesting
    /// depth is bounded by memory rather than the call stack.
    fn construct_tree(&mut self, document: &Document, root: NodeId) -> Result<Value, ConstructorError> {
        let mut stack = Vec::new();
        let value = self.start_node(document, root, &mut stack)?;
        while let Some(frame) = stack.last_mut() {
            let child = match frame {
                Frame::Sequence { items, .. } => items.next().copied(),
                Frame::Mapping { pairs, pair, .. } => {
                    if let Some((current, Some(_))) = pair {
                        Some(current.value)
                    } else {
                        let next = pairs.next().copied();
                        *pair = next.map(|next| (next, None));
                        next.map(|next| next.key)
                    }
                }
            };
            let Some(child) = child else {
                stack.pop();
                continue;
            };

            let parent = stack.len() - 1;
            let built = self.start_node(document, child, &mut stack)?;
            match &mut stack[parent] {
                Frame::Sequence { sequence, .. } => sequence.borrow_mut().push(built),
                Frame::Mapping {
                    mapping,
                    pair,
                    index,
                    ..
                } => match pair.take() {
                    Some((current, None)) => *pair = Some((current, Some(built))),
                    Some((current, Some(key))) => {
                        if document.get(current.key).recursive {
                            self.deferred.push((Rc::clone(mapping), key, built));
                        } else {
                            index.insert(mapping, key, built);
                        }
                    }
                    None => {}
                },
            }
        }
        Ok(value)
    }

    /// The value of a node. A collection comes back empty, with a frame
    /// pushed to fill it.
    fn start_node<'d>(
        &mut self,
        document: &'d Document,
        id: NodeId,
        stack: &mut Vec<Frame<'d>>,
    ) -> Result<Value, ConstructorError> {
        if let Some(value) = self.constructed.get(&id) {
            return Ok(value.clone());
        }
        let node = document.get(id);
        let value = match &node.data {
            NodeData::Scalar { value, .. } => self.construct_scalar(node, value)?,
            NodeData::Sequence { items, .. } => {
                self.check_tag(node, &Tag::SEQ)?;
                let sequence: Sequence = Rc::new(RefCell::new(Vec::with_capacity(items.len())));
                stack.push(Frame::Sequence {
                    sequence: Rc::clone(&sequence),
                    items: items.iter(),
                });
                Value::Sequence(sequence)
            }
            NodeData::Mapping { pairs, .. } => {
                self.check_tag(node, &Tag::MAP)?;
                let mapping: Mapping = Rc::new(RefCell::new(Vec::with_capacity(pairs.len())));
                stack.push(Frame::Mapping {
                    mapping: Rc::clone(&mapping),
                    pairs: pairs.iter(),
                    pair: None,
                    index: KeyIndex::default(),
                });
                Value::Mapping(mapping)
            }
        };
        self.constructed.insert(id, value.clone());
        Ok(value)
    }

    fn construct_scalar(&self, node: &Node, value: &str) -> Result<Value, ConstructorError> {
        let tag = &node.tag;
        let constructed = if *tag == Tag::STR {
            Some(Value::String(String::from(value)))
        } else if *tag == Tag::NULL {
            Some(Value::Null)
        } else if *tag == Tag::BOOL {
            Some(Value::Bool(matches!(value, "true" | "True" | "TRUE")))
        } else if *tag == Tag::INT {
            construct_int(value).map(Value::Int)
        } else if *tag == Tag::FLOAT {
            construct_float(value).map(Value::Float)
        } else if *tag == Tag::BINARY {
            let text: String = value.chars().filter(|ch| !ch.is_whitespace()).collect();
            base64::engine::general_purpose::STANDARD
                .decode(text)
                .ok()
                .map(Value::Binary)
        } else {
            return Err(self.error(
                node,
                format!("could not determine a constructor for the tag {tag}"),
            ));
        };
        constructed.ok_or_else(|| self.error(node, format!("cannot construct {tag} from {value:?}")))
    }

    fn check_tag(&self, node: &Node, expected: &Tag) -> Result<(), ConstructorError> {
        if node.tag == *expected {
            Ok(())
        } else {
            Err(self.error(
                node,
                format!("could not determine a constructor for the tag {}", node.tag),
            ))
        }
    }

    fn error(&self, node: &Node, problem: String) -> ConstructorError {
        ConstructorError::Problem(MarkedError::new(
            &self.label,
            Some((
                String::from("while constructing a value"),
                node.start_mark,
                None,
            )),
            problem,
            Some((node.start_mark, None)),
        ))
    }
}

fn construct_int(value: &str) -> Option<i64> {
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let magnitude = if let Some(octal) = digits.strip_prefix("0o") {
        i128::from_str_radix(octal, 8).ok()?
    } else if let Some(hex) = digits.strip_prefix("0x") {
        i128::from_str_radix(hex, 16).ok()?
    } else {
        digits.parse::<i128>().ok()?
    };
    i64::try_from(if negative { -magnitude } else { magnitude }).ok()
}

fn construct_float(value: &str) -> Option<f64> {
    match value {
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => Some(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => Some(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => Some(f64::NAN),
        _ => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Composer;
    use pretty_assertions::assert_eq;

    fn construct(input: &str) -> Result<Value, ConstructorError> {
        let mut composer = Composer::new();
        composer.set_input_string(input);
        let document = composer.single_document().unwrap().unwrap();
        Constructor::new().construct_document(&document)
    }

    #[test]
    fn core_scalars() {
        let value = construct(
            "[~, null, true, False, 12, 0o17, 0x1F, 1.5, -.inf, .nan, '12', !!binary aGk=]",
        )
        .unwrap();
        let items = value.as_sequence().unwrap().borrow().clone();
        assert_eq!(
            items,
            vec![
                Value::Null,
                Value::Null,
                Value::Bool(true),
                Value::Bool(false),
                Value::Int(12),
                Value::Int(15),
                Value::Int(31),
                Value::Float(1.5),
                Value::Float(f64::NEG_INFINITY),
                Value::Float(f64::NAN),
                Value::from("12"),
                Value::Binary(b"hi".to_vec()),
            ]
        );
    }

    #[test]
    fn flow_mapping() {
        let value = construct("{a: 1}").unwrap();
        assert_eq!(value, Value::mapping([(Value::from("a"), Value::Int(1))]));
    }

    #[test]
    fn aliases_share_containers() {
        let value = construct("a: &x [1]\nb: *x\n").unwrap();
        let (a, b) = (value.get("a").unwrap(), value.get("b").unwrap());
        assert!(a.same_container(&b));
        a.as_sequence().unwrap().borrow_mut().push(Value::Int(2));
        assert_eq!(b.as_sequence().unwrap().borrow().len(), 2);
    }

    #[test]
    fn recursive_mapping() {
        let value = construct("&m\nname: root\nself: *m\n").unwrap();
        let inner = value.get("self").unwrap();
        assert!(inner.same_container(&value));
        assert_eq!(inner.get("name"), Some(Value::from("root")));
        let keys = value
            .as_mapping()
            .unwrap()
            .borrow()
            .iter()
            .map(|(key, _)| key.as_str().map(String::from))
            .collect::<Vec<_>>();
        assert_eq!(keys, vec![Some(String::from("name")), Some(String::from("self"))]);
    }

    #[test]
    fn recursive_value_keeps_its_place() {
        let value = construct("&m\nself: *m\nname: root\n").unwrap();
        let keys = value
            .as_mapping()
            .unwrap()
            .borrow()
            .iter()
            .map(|(key, _)| key.as_str().map(String::from))
            .collect::<Vec<_>>();
        assert_eq!(keys, vec![Some(String::from("self")), Some(String::from("name"))]);
        assert!(value.get("self").unwrap().same_container(&value));
    }

    #[test]
    fn later_duplicate_beats_recursive_value() {
        let value = construct("&m\na: *m\na: 1\n").unwrap();
        assert_eq!(value.get("a"), Some(Value::Int(1)));
        assert_eq!(value.as_mapping().unwrap().borrow().len(), 1);
    }

    #[test]
    fn recursive_key_is_inserted_last() {
        let settings = LoadSettings::default().with_allow_recursive_keys(true);
        let mut composer = Composer::with_settings(&settings);
        composer.set_input_string("&m {*m: 1, b: 2}");
        let document = composer.single_document().unwrap().unwrap();
        let value = Constructor::with_settings(&settings)
            .construct_document(&document)
            .unwrap();
        let entries = value.as_mapping().unwrap().borrow().clone();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, Value::from("b"));
        assert!(entries[1].0.same_container(&value));
    }

    #[test]
    fn deep_nesting() {
        let depth = 20_000;
        let input = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
        let mut value = construct(&input).unwrap();
        let mut levels = 0;
        loop {
            let Some(inner) = value.as_sequence().and_then(|items| items.borrow().first().cloned())
            else {
                break;
            };
            value = inner;
            levels += 1;
        }
        assert_eq!(levels, depth - 1);
    }

    #[test]
    fn recursive_sequence() {
        let value = construct("&s [1, *s]").unwrap();
        let items = value.as_sequence().unwrap().borrow().clone();
        assert_eq!(items.len(), 2);
        assert!(items[1].same_container(&value));
    }

    #[test]
    fn later_duplicate_wins() {
        let value = construct("a: 1\nb: 2\na: 3\n").unwrap();
        assert_eq!(value.get("a"), Some(Value::Int(3)));
        assert_eq!(value.as_mapping().unwrap().borrow().len(), 2);
    }

    #[test]
    fn unknown_tag() {
        let error = construct("!thing x").unwrap_err();
        assert_eq!(
            error.to_string(),
            "while constructing a value\ncould not determine a constructor for the tag !thing\n \
             in reader, line 1, column 1:"
        );
    }

    #[test]
    fn bad_int() {
        let error = construct("!!int 99999999999999999999").unwrap_err();
        let ConstructorError::Problem(problem) = error;
        assert_eq!(
            problem.problem,
            "cannot construct tag:yaml.org,2002:int from \"99999999999999999999\""
        );
    }

    #[test]
    fn empty_document_is_null() {
        let document = Document::new();
        assert_eq!(Constructor::new().construct_document(&document).unwrap(), Value::Null);
    }
}
