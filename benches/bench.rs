use std::fmt::Write as _;

use criterion::{criterion_group, criterion_main, Criterion};
use yaml_engine::{Composer, Document, DumpSettings, Emitter, Parser, Serializer};

/// A few megabytes of nested mappings, sequences and quoted scalars.
fn large_yaml() -> String {
    let mut yaml = String::new();
    for record in 0..20_000 {
        let _ = write!(
            yaml,
            "- id: {record}\n  name: \"record {record}\"\n  tags: [alpha, beta, 'gamma {record}']\n  \
             nested:\n    ratio: {ratio}\n    note: |\n      line one\n      line two\n",
            ratio = f64::from(record) / 7.0,
        );
    }
    yaml
}

fn compose(yaml: &str) -> Document {
    let mut composer = Composer::new();
    composer.set_input_string(yaml);
    composer
        .single_document()
        .expect("benchmark input is valid")
        .expect("benchmark input has a document")
}

pub fn pipeline(c: &mut Criterion) {
    let yaml = large_yaml();

    c.bench_function("parse large", |b| {
        b.iter(|| {
            let mut parser = Parser::new();
            parser.set_input_string(&yaml);
            parser.filter(Result::is_ok).count()
        });
    });

    c.bench_function("compose large", |b| {
        b.iter_with_large_drop(|| compose(&yaml));
    });

    c.bench_function("emit large", |b| {
        let document = compose(&yaml);
        let mut buffer = Vec::with_capacity(yaml.len() * 2);
        b.iter(|| {
            buffer.clear();
            let mut emitter = Emitter::new();
            emitter.set_output(&mut buffer);
            let mut serializer = Serializer::with_settings(&mut emitter, DumpSettings::default());
            serializer.open().unwrap();
            serializer.serialize(&document).unwrap();
            serializer.close().unwrap();
        });
    });
}

criterion_group!(benches, pipeline);
criterion_main!(benches);
