use std::collections::HashMap;

use pretty_assertions::assert_eq;
use yaml_engine::{
    Composer, Document, Dump, DumpSettings, Emitter, Encoding, Event, Load, LoadSettings,
    NodeData, NodeId, Object, Parser, ScalarStyle, Value,
};

const SAMPLE: &str = "\
base: &b {x: 1, y: [a, 'b c']}
list:
- *b
- !!str 12
- \"two\\nlines\"
- |
  block
  text
self: &s [*s]
";

fn compose(input: &str) -> Document {
    let mut composer = Composer::new();
    composer.set_input_string(input);
    composer.single_document().unwrap().unwrap()
}

fn emit(document: &Document) -> String {
    let mut output = Vec::new();
    Dump::default()
        .write_documents(core::slice::from_ref(document), &mut output)
        .unwrap();
    String::from_utf8(output).unwrap()
}

/// Same shape, tags and scalar values, with shared nodes shared in the same places.
fn assert_isomorphic(left: &Document, right: &Document) {
    let mut seen = HashMap::new();
    let (Some(a), Some(b)) = (left.root(), right.root()) else {
        assert_eq!(left.root().is_some(), right.root().is_some());
        return;
    };
    compare(left, right, a, b, &mut seen);
}

fn compare(
    left: &Document,
    right: &Document,
    a: NodeId,
    b: NodeId,
    seen: &mut HashMap<NodeId, NodeId>,
) {
    if let Some(&known) = seen.get(&a) {
        assert_eq!(known, b, "node {} is shared differently", a.index());
        return;
    }
    seen.insert(a, b);
    let (node_a, node_b) = (left.get(a), right.get(b));
    assert_eq!(node_a.tag, node_b.tag);
    assert_eq!(node_a.recursive, node_b.recursive);
    match (&node_a.data, &node_b.data) {
        (NodeData::Scalar { value: x, .. }, NodeData::Scalar { value: y, .. }) => {
            assert_eq!(x, y);
        }
        (NodeData::Sequence { items: x, .. }, NodeData::Sequence { items: y, .. }) => {
            assert_eq!(x.len(), y.len());
            for (&x, &y) in x.iter().zip(y) {
                compare(left, right, x, y, seen);
            }
        }
        (NodeData::Mapping { pairs: x, .. }, NodeData::Mapping { pairs: y, .. }) => {
            assert_eq!(x.len(), y.len());
            for (x, y) in x.iter().zip(y) {
                compare(left, right, x.key, y.key, seen);
                compare(left, right, x.value, y.value, seen);
            }
        }
        (x, y) => panic!("{x:?} does not match {y:?}"),
    }
}

#[test]
fn input_sources_agree() {
    let from_string = compose(SAMPLE);
    let mut composer = Composer::new();
    composer.set_input_reader(SAMPLE.as_bytes());
    let from_reader = composer.single_document().unwrap().unwrap();
    assert_isomorphic(&from_string, &from_reader);

    let mut parser = Parser::new();
    parser.set_input_string(SAMPLE);
    let events = parser.collect::<Result<Vec<_>, _>>().unwrap();
    assert!(matches!(
        events.last().map(Event::kind),
        Some(yaml_engine::EventKind::StreamEnd)
    ));
}

#[test]
fn round_trip_keeps_the_graph() {
    let document = compose(SAMPLE);
    let text = emit(&document);
    assert_isomorphic(&document, &compose(&text));
}

#[test]
fn emitting_twice_is_identical() {
    let document = compose(SAMPLE);
    assert_eq!(emit(&document), emit(&document));
}

#[test]
fn one_anchor_one_alias() {
    let document = compose("a: &x [1]\nb: *x\n");
    let root = document.root().unwrap();
    assert_eq!(document.lookup(root, "a"), document.lookup(root, "b"));

    let text = emit(&document);
    assert_eq!(text.matches('&').count(), 1, "{text}");
    assert_eq!(text.matches('*').count(), 1, "{text}");
}

#[test]
fn recursive_key_is_refused() {
    let mut composer = Composer::new();
    composer.set_input_string("&m {*m: 1}");
    let error = composer.single_document().unwrap_err();
    assert!(error
        .to_string()
        .contains("Recursive key for mapping is detected but it is not configured to be allowed."));
}

#[test]
fn one_entry_flow_mapping() {
    let value = Load::default().load_from_string("{a: 1}").unwrap();
    assert_eq!(
        value,
        Value::mapping([(Value::from("a"), Value::Int(1))])
    );
}

#[test]
fn tab_cannot_start_a_flow_token() {
    let error = Load::default()
        .load_from_string("{\n\t\"x\": \"y\"\n}")
        .unwrap_err();
    assert!(
        error
            .to_string()
            .contains("found character '\t(TAB)' that cannot start any token"),
        "{error}"
    );
}

#[test]
fn empty_plain_scalar_is_quoted() {
    let mut output = Vec::new();
    let mut emitter = Emitter::new();
    emitter.set_output(&mut output);
    for event in [
        Event::stream_start(Encoding::Utf8),
        Event::document_start(None, &[], true),
        Event::scalar(None, None, "", true, true, ScalarStyle::Plain),
        Event::document_end(true),
        Event::stream_end(),
    ] {
        emitter.emit(event).unwrap();
    }
    drop(emitter);
    assert_eq!(String::from_utf8(output).unwrap(), "''\n");
}

#[test]
fn errors_name_their_stream() {
    let mut composer = Composer::with_settings(&LoadSettings::default().with_label("config.yaml"));
    composer.set_input_string("a: [1\n");
    let error = composer.single_document().unwrap_err();
    let yaml_engine::ComposerError::Parser(yaml_engine::ParserError::Problem(problem)) = &error
    else {
        panic!("{error:?}");
    };
    assert_eq!(problem.label, "config.yaml");
    assert!(problem.problem_mark.is_some());
    assert!(error.to_string().contains(" in config.yaml, line "), "{error}");
}

#[test]
fn crlf_is_one_line_break() {
    let error = Load::default().load_from_string("\r\n[").unwrap_err();
    let message = error.to_string();
    assert!(message.contains("line 2,"), "{message}");
    assert!(!message.contains("line 3,"), "{message}");
}

#[test]
fn unrepresentable_value_writes_nothing() {
    struct Unknown;
    let dump = Dump::new(DumpSettings::default());
    let value = Value::mapping([
        (Value::from("before"), Value::from("bla")),
        (Value::from("nested"), Value::Object(Object::new(Unknown))),
    ]);
    let mut output = Vec::new();
    let error = dump.dump(&value, &mut output).unwrap_err();
    assert!(error
        .to_string()
        .starts_with("Representer is not defined for class"));
    assert!(output.is_empty());

    let value = Value::mapping([(Value::from("before"), Value::from("bla"))]);
    assert_eq!(dump.dump_to_string(&value).unwrap(), "before: bla\n");
}

#[test]
fn code_point_limit_is_per_document() {
    let settings = LoadSettings::default().with_code_point_limit(16);
    let mut documents = Load::new(settings)
        .load_all_from_string("--- short\n--- [a, b]\n--- this document is far too long\n");
    assert_eq!(documents.next().unwrap().unwrap(), Value::from("short"));
    assert_eq!(
        documents.next().unwrap().unwrap(),
        Value::sequence([Value::from("a"), Value::from("b")])
    );
    let error = documents.next().unwrap().unwrap_err();
    assert!(
        error
            .to_string()
            .contains("exceeds the limit: 16 code points"),
        "{error}"
    );
    assert!(documents.next().is_none());
}

#[test]
fn documents_after_an_oversized_one_still_load() {
    let settings = LoadSettings::default().with_code_point_limit(16);
    let mut documents =
        Load::new(settings).load_all_from_string("--- a\n--- this document is far too long\n--- c\n");
    assert_eq!(documents.next().unwrap().unwrap(), Value::from("a"));
    assert!(documents.next().unwrap().is_err());
    assert_eq!(documents.next().unwrap().unwrap(), Value::from("c"));
    assert!(documents.next().is_none());
}

#[test]
fn bad_character_fails_only_its_document() {
    let mut documents = Load::default().load_all_from_string("--- first\n--- \"x\x07\"\n");
    assert_eq!(documents.next().unwrap().unwrap(), Value::from("first"));
    let error = documents.next().unwrap().unwrap_err();
    assert!(
        error.to_string().contains("control characters are not allowed"),
        "{error}"
    );
    assert!(documents.next().is_none());
}

#[test]
fn recursive_value_keeps_key_order() {
    let value = Load::default()
        .load_from_string("&m\nself: *m\nname: root\n")
        .unwrap();
    let entries = value.as_mapping().unwrap().borrow().clone();
    let keys = entries
        .iter()
        .map(|(key, _)| key.as_str().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(keys, ["self", "name"]);
    assert!(entries[0].1.same_container(&value));
}

#[test]
fn duplicate_key_after_recursive_value() {
    let value = Load::default().load_from_string("&m\na: *m\na: 1\n").unwrap();
    assert_eq!(value.get("a"), Some(Value::Int(1)));
    assert_eq!(value.as_mapping().unwrap().borrow().len(), 1);
}

#[test]
fn deep_nesting_loads_and_dumps() {
    let depth = 20_000;
    let input = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
    let value = Load::default().load_from_string(&input).unwrap();
    let text = Dump::default().dump_to_string(&value).unwrap();
    assert_eq!(text.matches('-').count(), depth - 1);
    assert!(text.ends_with("[]\n"), "{}", &text[text.len() - 20..]);
}
