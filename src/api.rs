use alloc::string::String;
use alloc::vec::Vec;

use crate::{
    Composer, Constructor, Document, DumpSettings, Emitter, Error, LoadSettings, Representer,
    Serializer, Value,
};

/// Reads YAML text into [`Value`]s.
#[derive(Clone, Debug, Default)]
pub struct Load {
    settings: LoadSettings,
}

impl Load {
    pub fn new(settings: LoadSettings) -> Self {
        Load { settings }
    }

    /// Load a stream holding at most one document. An empty stream is
    /// `Null`.
    pub fn load_from_string(&self, yaml: &str) -> Result<Value, Error> {
        let mut composer = Composer::with_settings(&self.settings);
        composer.set_input_string(yaml);
        self.load_single(composer)
    }

    /// Like [`load_from_string`](Load::load_from_string), decoding bytes
    /// in UTF-8 or UTF-16 as the byte order mark says.
    pub fn load_from_reader<R: std::io::Read>(&self, reader: R) -> Result<Value, Error> {
        let mut composer = Composer::with_settings(&self.settings);
        composer.set_input_reader(reader);
        self.load_single(composer)
    }

    /// Load every document of a stream, one at a time.
    ///
    /// A failing document ends the iteration; the documents before it have
    /// already been produced.
    pub fn load_all_from_string<'r>(&self, yaml: &'r str) -> LoadAll<'r> {
        let mut composer = Composer::with_settings(&self.settings);
        composer.set_input_string(yaml);
        LoadAll {
            composer,
            constructor: Constructor::with_settings(&self.settings),
        }
    }

    pub fn load_all_from_reader<'r, R: std::io::Read + 'r>(&self, reader: R) -> LoadAll<'r> {
        let mut composer = Composer::with_settings(&self.settings);
        composer.set_input_reader(reader);
        LoadAll {
            composer,
            constructor: Constructor::with_settings(&self.settings),
        }
    }

    fn load_single(&self, mut composer: Composer<'_>) -> Result<Value, Error> {
        match composer.single_document()? {
            Some(document) => {
                Ok(Constructor::with_settings(&self.settings).construct_document(&document)?)
            }
            None => Ok(Value::Null),
        }
    }
}

/// The documents of a stream as values. See [`Load::load_all_from_string`].
pub struct LoadAll<'r> {
    composer: Composer<'r>,
    constructor: Constructor,
}

impl Iterator for LoadAll<'_> {
    type Item = Result<Value, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let document = match self.composer.next()? {
            Ok(document) => document,
            Err(error) => return Some(Err(error.into())),
        };
        Some(
            self.constructor
                .construct_document(&document)
                .map_err(Error::from),
        )
    }
}

/// Writes [`Value`]s as YAML text.
///
/// Every value is represented in full before the first character is
/// written, so a value that cannot be represented produces no output.
#[derive(Default)]
pub struct Dump {
    settings: DumpSettings,
    representer: Representer,
}

impl Dump {
    pub fn new(settings: DumpSettings) -> Self {
        Dump {
            settings,
            representer: Representer::new(),
        }
    }

    /// The representer, to register host object types.
    pub fn representer_mut(&mut self) -> &mut Representer {
        &mut self.representer
    }

    pub fn dump_to_string(&self, value: &Value) -> Result<String, Error> {
        self.dump_all_to_string(core::slice::from_ref(value))
    }

    /// Write several values as a multi-document stream.
    pub fn dump_all_to_string(&self, values: &[Value]) -> Result<String, Error> {
        let mut output = Vec::new();
        self.dump_all(values, &mut output)?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    pub fn dump(&self, value: &Value, output: &mut dyn std::io::Write) -> Result<(), Error> {
        self.dump_all(core::slice::from_ref(value), output)
    }

    pub fn dump_all(&self, values: &[Value], output: &mut dyn std::io::Write) -> Result<(), Error> {
        let documents = values
            .iter()
            .map(|value| self.representer.represent(value))
            .collect::<Result<Vec<_>, _>>()?;
        self.write_documents(&documents, output)
    }

    /// Write already built documents.
    pub fn write_documents(
        &self,
        documents: &[Document],
        output: &mut dyn std::io::Write,
    ) -> Result<(), Error> {
        let mut emitter = Emitter::with_settings(self.settings.clone());
        emitter.set_output(output);
        let mut serializer = Serializer::with_settings(&mut emitter, self.settings.clone());
        serializer.open()?;
        for document in documents {
            serializer.serialize(document)?;
        }
        serializer.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FlowStyle, Object};
    use pretty_assertions::assert_eq;

    #[test]
    fn load_single() {
        let load = Load::default();
        let value = load.load_from_string("{a: 1}").unwrap();
        assert_eq!(value.get("a"), Some(Value::Int(1)));
        assert_eq!(load.load_from_string("").unwrap(), Value::Null);
        assert_eq!(
            load.load_from_reader(&b"- x\n"[..]).unwrap(),
            Value::sequence([Value::from("x")])
        );
        assert!(load.load_from_string("a\n--- b\n").is_err());
    }

    #[test]
    fn load_all() {
        let values = Load::default()
            .load_all_from_string("1\n--- two\n--- [3]\n")
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(
            values,
            vec![
                Value::Int(1),
                Value::from("two"),
                Value::sequence([Value::Int(3)])
            ]
        );
    }

    #[test]
    fn dump_round_trip() {
        let value = Value::mapping([
            (Value::from("name"), Value::from("yaml")),
            (Value::from("empty"), Value::from("")),
            (Value::from("number"), Value::from("12")),
            (
                Value::from("list"),
                Value::sequence([Value::Int(1), Value::Float(0.5), Value::Null]),
            ),
        ]);
        let text = Dump::default().dump_to_string(&value).unwrap();
        assert_eq!(
            text,
            "name: yaml\nempty: ''\nnumber: '12'\nlist:\n- 1\n- 0.5\n- null\n"
        );
        assert_eq!(Load::default().load_from_string(&text).unwrap(), value);
    }

    #[test]
    fn failed_dump_writes_nothing() {
        struct Opaque;
        let dump = Dump::default();
        let value = Value::mapping([
            (Value::from("before"), Value::from("bla")),
            (Value::from("nested"), Value::Object(Object::new(Opaque))),
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
    fn dump_all_and_settings() {
        let dump = Dump::new(DumpSettings::default().with_default_flow_style(FlowStyle::Flow));
        let text = dump
            .dump_all_to_string(&[
                Value::sequence([Value::Int(1), Value::Int(2)]),
                Value::from("x"),
            ])
            .unwrap();
        assert_eq!(text, "[1, 2]\n--- x\n");
    }
}
