#![warn(clippy::pedantic)]

use std::env;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use yaml_engine::{EventData, LoadSettings, Parser, ScalarStyle};

/// Print the events of one file in the yaml-test-suite notation.
fn print_events(path: &str, stdout: &mut dyn Write) -> Result<(), Box<dyn Error>> {
    let file = BufReader::new(File::open(path)?);
    let mut parser = Parser::with_settings(&LoadSettings::default().with_label(path));
    parser.set_input_reader(file);

    for event in parser {
        let event = event?;
        match &event.data {
            EventData::StreamStart { .. } => writeln!(stdout, "+STR")?,
            EventData::StreamEnd => writeln!(stdout, "-STR")?,
            EventData::DocumentStart { implicit, .. } => {
                writeln!(stdout, "+DOC{}", if *implicit { "" } else { " ---" })?;
            }
            EventData::DocumentEnd { implicit } => {
                writeln!(stdout, "-DOC{}", if *implicit { "" } else { " ..." })?;
            }
            EventData::Alias { anchor } => writeln!(stdout, "=ALI *{anchor}")?,
            EventData::Scalar {
                anchor,
                tag,
                value,
                style,
                ..
            } => {
                write!(stdout, "=VAL")?;
                if let Some(anchor) = anchor {
                    write!(stdout, " &{anchor}")?;
                }
                if let Some(tag) = tag {
                    write!(stdout, " <{tag}>")?;
                }
                let indicator = match style {
                    ScalarStyle::SingleQuoted => '\'',
                    ScalarStyle::DoubleQuoted => '"',
                    ScalarStyle::Literal => '|',
                    ScalarStyle::Folded => '>',
                    _ => ':',
                };
                writeln!(stdout, " {indicator}{}", escape(value))?;
            }
            EventData::SequenceStart { anchor, tag, .. }
            | EventData::MappingStart { anchor, tag, .. } => {
                let name = if event.data.kind() == yaml_engine::EventKind::SequenceStart {
                    "+SEQ"
                } else {
                    "+MAP"
                };
                write!(stdout, "{name}")?;
                if let Some(anchor) = anchor {
                    write!(stdout, " &{anchor}")?;
                }
                if let Some(tag) = tag {
                    write!(stdout, " <{tag}>")?;
                }
                writeln!(stdout)?;
            }
            EventData::SequenceEnd => writeln!(stdout, "-SEQ")?,
            EventData::MappingEnd => writeln!(stdout, "-MAP")?,
            EventData::Comment { .. } => {}
        }
        if matches!(event.data, EventData::StreamEnd) {
            break;
        }
    }
    Ok(())
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\0' => escaped.push_str("\\0"),
            '\x08' => escaped.push_str("\\b"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            ch => escaped.push(ch),
        }
    }
    escaped
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        eprintln!("Usage: run-parser-test-suite <in.yaml>...");
        return ExitCode::FAILURE;
    }
    let mut stdout = io::stdout().lock();
    for path in &args {
        if let Err(error) = print_events(path, &mut stdout) {
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
