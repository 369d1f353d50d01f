#![warn(clippy::pedantic)]

use std::env;
use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use yaml_engine::{
    Anchor, Emitter, Encoding, Event, MappingStyle, ScalarStyle, SequenceStyle,
};

/// Read yaml-test-suite event notation and emit it as YAML.
fn emit_events(path: &str, stdout: &mut dyn Write) -> Result<(), Box<dyn Error>> {
    let input = fs::read_to_string(path)?;
    let mut emitter = Emitter::new();
    emitter.set_output(stdout);

    for line in input.lines() {
        let event = if line.starts_with("+STR") {
            Event::stream_start(Encoding::Utf8)
        } else if line.starts_with("-STR") {
            Event::stream_end()
        } else if let Some(rest) = line.strip_prefix("+DOC") {
            Event::document_start(None, &[], !rest.starts_with(" ---"))
        } else if let Some(rest) = line.strip_prefix("-DOC") {
            Event::document_end(!rest.starts_with(" ..."))
        } else if line.starts_with("+MAP") {
            let style = if line.contains(" {}") {
                MappingStyle::Flow
            } else {
                MappingStyle::Block
            };
            let tag = get_tag(line);
            Event::mapping_start(get_anchor('&', line)?, tag, tag.is_none(), style)
        } else if line.starts_with("-MAP") {
            Event::mapping_end()
        } else if line.starts_with("+SEQ") {
            let style = if line.contains(" []") {
                SequenceStyle::Flow
            } else {
                SequenceStyle::Block
            };
            let tag = get_tag(line);
            Event::sequence_start(get_anchor('&', line)?, tag, tag.is_none(), style)
        } else if line.starts_with("-SEQ") {
            Event::sequence_end()
        } else if line.starts_with("=VAL") {
            let (value, style) = get_value(line)?;
            let tag = get_tag(line);
            let implicit = tag.is_none();
            Event::scalar(get_anchor('&', line)?, tag, &value, implicit, implicit, style)
        } else if line.starts_with("=ALI") {
            let anchor = get_anchor('*', line)?.ok_or("no alias name")?;
            Event::alias(anchor)
        } else {
            return Err(format!("Unknown event: '{line}'").into());
        };
        emitter.emit(event)?;
    }
    Ok(())
}

fn get_anchor(sigil: char, line: &str) -> Result<Option<Anchor>, Box<dyn Error>> {
    let Some((_, from_sigil)) = line.split_once(sigil) else {
        return Ok(None);
    };
    let name = from_sigil.split_once(' ').map_or(from_sigil, |(name, _)| name);
    if name.is_empty() {
        return Ok(None);
    }
    Ok(Some(Anchor::new(name)?))
}

fn get_tag(line: &str) -> Option<&str> {
    let (_, from_angle_open) = line.split_once('<')?;
    let (until_angle_close, _) = from_angle_open.split_once('>')?;
    Some(until_angle_close)
}

fn get_value(line: &str) -> Result<(String, ScalarStyle), Box<dyn Error>> {
    let mut remainder = line;
    let (style, value) = loop {
        let (_, tail) = remainder
            .split_once(' ')
            .ok_or_else(|| format!("invalid line: {line}"))?;
        let style = match tail.chars().next() {
            Some(':') => ScalarStyle::Plain,
            Some('\'') => ScalarStyle::SingleQuoted,
            Some('"') => ScalarStyle::DoubleQuoted,
            Some('|') => ScalarStyle::Literal,
            Some('>') => ScalarStyle::Folded,
            _ => {
                // an anchor or a tag
                remainder = tail;
                continue;
            }
        };
        break (style, &tail[1..]);
    };

    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            unescaped.push(ch);
            continue;
        }
        unescaped.push(match chars.next() {
            Some('\\') => '\\',
            Some('0') => '\0',
            Some('b') => '\x08',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            other => return Err(format!("invalid escape {other:?} in: {line}").into()),
        });
    }
    Ok((unescaped, style))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        eprintln!("Usage: run-emitter-test-suite <test.event>...");
        return ExitCode::FAILURE;
    }
    let mut stdout = io::stdout().lock();
    for path in &args {
        if let Err(error) = emit_events(path, &mut stdout) {
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
